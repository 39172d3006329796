use chrono::{Duration, TimeZone, Utc};

use super::common::*;
use crate::workflows::registration::session::{Advance, SubmissionStatus};
use crate::workflows::registration::{
    ClientContext, FormSession, KeyPress, MasterclassFlow, MessageKind, RegistrationInput,
    SessionPhase, StoreError, ValidationError, UNIQUE_VIOLATION,
};

fn at(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 20, 10, minute, 0).unwrap()
}

fn filled_session(flow: &MasterclassFlow) -> FormSession<MasterclassFlow> {
    let mut session = FormSession::open(flow, Default::default(), at(0));
    for input in answers("ada@example.com") {
        session.apply(flow, input, at(1)).expect("editable");
    }
    session
}

fn walk_to_last(flow: &MasterclassFlow, session: &mut FormSession<MasterclassFlow>) {
    let context = ClientContext::default();
    while session.step() < 7 {
        match session.advance(flow, &context, at(2)) {
            Advance::Moved { .. } => {}
            other => panic!("expected move, got {other:?}"),
        }
    }
}

#[test]
fn failed_validation_keeps_the_step_and_sets_message() {
    let flow = masterclass_flow();
    let mut session = FormSession::open(flow.as_ref(), Default::default(), at(0));

    match session.advance(&flow, &ClientContext::default(), at(1)) {
        Advance::Rejected(ValidationError::MissingName) => {}
        other => panic!("expected missing name, got {other:?}"),
    }
    assert_eq!(session.step(), 0);
    let message = session.message().expect("message shown");
    assert_eq!(message.kind, MessageKind::Validation);
    assert_eq!(message.text, "Please enter your name");

    session
        .apply(&flow, RegistrationInput::Name("Ada".to_string()), at(1))
        .expect("editable");
    assert!(matches!(
        session.advance(&flow, &ClientContext::default(), at(1)),
        Advance::Moved { step: 1 }
    ));
    assert!(session.message().is_none());
}

#[test]
fn invalid_email_blocks_the_email_step() {
    let flow = masterclass_flow();
    let mut session = FormSession::open(flow.as_ref(), Default::default(), at(0));
    session
        .apply(&flow, RegistrationInput::Name("Ada".to_string()), at(0))
        .expect("editable");
    session
        .apply(&flow, RegistrationInput::Email("ada@example".to_string()), at(0))
        .expect("editable");
    session.advance(&flow, &ClientContext::default(), at(0));

    assert!(matches!(
        session.advance(&flow, &ClientContext::default(), at(0)),
        Advance::Rejected(ValidationError::InvalidEmail)
    ));
    assert_eq!(session.step(), 1);
}

#[test]
fn retreat_never_validates_and_stops_at_first_step() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    assert!(!session.retreat(at(2)));

    session.advance(&flow, &ClientContext::default(), at(2));
    session
        .apply(&flow, RegistrationInput::Name("  ".to_string()), at(2))
        .expect("editable");
    assert!(session.retreat(at(2)));
    assert_eq!(session.step(), 0);
    assert!(session.message().is_none());
}

#[test]
fn only_unmodified_enter_advances() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    let context = ClientContext::default();

    let shift_enter = KeyPress {
        shift: true,
        ..KeyPress::enter()
    };
    let tab = KeyPress {
        key: "Tab".to_string(),
        ..KeyPress::default()
    };
    assert!(session.key_press(&flow, &shift_enter, &context, at(2)).is_none());
    assert!(session.key_press(&flow, &tab, &context, at(2)).is_none());
    assert_eq!(session.step(), 0);

    assert!(matches!(
        session.key_press(&flow, &KeyPress::enter(), &context, at(2)),
        Some(Advance::Moved { step: 1 })
    ));
}

#[test]
fn last_step_composes_once_and_reports_busy_until_resolved() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    walk_to_last(&flow, &mut session);

    let pending = match session.advance(&flow, &page_context(), at(5)) {
        Advance::Submit(pending) => pending,
        other => panic!("expected submission, got {other:?}"),
    };
    assert_eq!(pending.collection, COLLECTION);
    assert_eq!(pending.session_id, session.id());
    assert_eq!(pending.record.form_completion_time, 300);
    assert_eq!(pending.record.attribution.utm_source.as_deref(), Some("linkedin"));
    assert_eq!(pending.lead_score, Some(100));
    assert_eq!(session.phase(), SessionPhase::Submitting);

    assert!(matches!(
        session.advance(&flow, &page_context(), at(5)),
        Advance::Busy
    ));
    assert!(matches!(
        session.key_press(&flow, &KeyPress::enter(), &page_context(), at(5)),
        Some(Advance::Busy)
    ));
    assert!(session
        .apply(&flow, RegistrationInput::Name("Eve".to_string()), at(5))
        .is_err());

    assert_eq!(session.resolve(&flow, &Ok(())), SubmissionStatus::Submitted);
    assert_eq!(session.phase(), SessionPhase::Submitted);
    assert!(matches!(
        session.advance(&flow, &page_context(), at(6)),
        Advance::Finished
    ));
    assert!(session
        .key_press(&flow, &KeyPress::enter(), &page_context(), at(6))
        .is_none());
}

#[test]
fn conflict_and_failure_return_to_editing_on_last_step() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    walk_to_last(&flow, &mut session);
    session.advance(&flow, &page_context(), at(5));

    let conflict = Err(StoreError::Rejected {
        code: UNIQUE_VIOLATION.to_string(),
        message: "duplicate".to_string(),
    });
    assert_eq!(session.resolve(&flow, &conflict), SubmissionStatus::Duplicate);
    assert_eq!(session.phase(), SessionPhase::Editing);
    assert_eq!(session.step(), 7);
    let message = session.message().expect("duplicate message");
    assert_eq!(message.kind, MessageKind::Duplicate);
    assert_eq!(message.text, "This email is already registered for the masterclass!");
    assert_eq!(session.draft().email, "ada@example.com");

    session.advance(&flow, &page_context(), at(6));
    let outage = Err(StoreError::Unavailable("timeout".to_string()));
    assert_eq!(session.resolve(&flow, &outage), SubmissionStatus::Failed);
    assert_eq!(
        session.message().map(|message| message.text.as_str()),
        Some("Unable to complete registration. Please try again or contact support.")
    );
    assert_eq!(session.step(), 7);
}

#[test]
fn last_step_sends_the_cursor_back_to_an_invalidated_answer() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    walk_to_last(&flow, &mut session);
    session
        .apply(&flow, RegistrationInput::Email("not-an-email".to_string()), at(3))
        .expect("editable");

    assert!(matches!(
        session.advance(&flow, &page_context(), at(3)),
        Advance::Rejected(ValidationError::InvalidEmail)
    ));
    assert_eq!(session.step(), 1);
    assert_eq!(session.phase(), SessionPhase::Editing);
}

#[test]
fn progress_and_view_follow_the_cursor() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    assert_eq!(session.progress_percent(&flow), 12);

    walk_to_last(&flow, &mut session);
    let view = session.view(&flow);
    assert_eq!(view.progress_percent, 100);
    assert_eq!(view.step_index, 7);
    assert_eq!(view.step_count, 8);
    assert_eq!(view.step.key, "learning_goal");
}

#[test]
fn idle_sessions_expire_unless_submitting() {
    let flow = masterclass_flow();
    let mut session = filled_session(&flow);
    let ttl = Duration::minutes(30);
    assert!(!session.is_expired(at(30), ttl));
    assert!(session.is_expired(at(32), ttl));

    walk_to_last(&flow, &mut session);
    session.advance(&flow, &page_context(), at(3));
    assert!(!session.is_expired(at(59), ttl));
}
