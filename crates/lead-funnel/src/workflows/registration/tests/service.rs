use std::sync::Arc;

use chrono::{Duration, Utc};

use super::common::*;
use crate::workflows::registration::{
    AdvanceOutcome, KeyPress, MasterclassRegistration, MemoryRecordStore, MessageKind,
    RegistrationInput, ServiceError, SessionPhase,
};

#[tokio::test]
async fn completed_flow_stores_one_scored_record() {
    let store = unique_email_store();
    let service = build_service(store.clone());
    let id = fill_to_last_step(&service, "ada@example.com").await;

    let report = service
        .advance(id, &page_context())
        .await
        .expect("session exists");
    assert_eq!(report.outcome, AdvanceOutcome::Submitted);
    assert_eq!(report.lead_score, Some(100));
    assert_eq!(report.session.phase, SessionPhase::Submitted);

    let rows = store.rows(COLLECTION);
    assert_eq!(rows.len(), 1);
    let stored: MasterclassRegistration =
        serde_json::from_value(rows[0].clone()).expect("row decodes");
    assert_eq!(stored.email, "ada@example.com");
    assert_eq!(stored.lead_score, 100);
    assert_eq!(stored.event_date.to_string(), "2025-10-04");
    assert_eq!(stored.attribution.utm_campaign.as_deref(), Some("october"));
    assert_eq!(stored.draft(), report.session.draft);
}

#[tokio::test]
async fn duplicate_email_keeps_draft_and_accepts_corrected_resubmission() {
    let store = unique_email_store();
    let service = build_service(store.clone());

    let first = fill_to_last_step(&service, "ada@example.com").await;
    service
        .advance(first, &page_context())
        .await
        .expect("session exists");

    let second = fill_to_last_step(&service, "ada@example.com").await;
    let report = service
        .advance(second, &page_context())
        .await
        .expect("session exists");
    assert_eq!(report.outcome, AdvanceOutcome::Duplicate);
    assert_eq!(report.session.phase, SessionPhase::Editing);
    assert_eq!(report.session.step_index, 7);
    let message = report.session.message.expect("duplicate message");
    assert_eq!(message.kind, MessageKind::Duplicate);
    assert_eq!(message.text, "This email is already registered for the masterclass!");
    assert_eq!(report.session.draft.name, "Ada Lovelace");

    service
        .apply(second, RegistrationInput::Email("ada.l@example.com".to_string()))
        .expect("editable again");
    let report = service
        .advance(second, &page_context())
        .await
        .expect("session exists");
    assert_eq!(report.outcome, AdvanceOutcome::Submitted);
    assert_eq!(store.rows(COLLECTION).len(), 2);
    assert_eq!(store.insert_attempts(), 3);
}

#[tokio::test]
async fn conflicting_store_never_reports_success() {
    let service = build_service(Arc::new(ConflictStore));
    let id = fill_to_last_step(&service, "ada@example.com").await;

    for _ in 0..3 {
        let report = service
            .advance(id, &page_context())
            .await
            .expect("session exists");
        assert_eq!(report.outcome, AdvanceOutcome::Duplicate);
        assert_eq!(report.lead_score, None);
    }
}

#[tokio::test]
async fn store_outage_reports_failure_and_allows_retry() {
    let service = build_service(Arc::new(UnavailableStore));
    let id = fill_to_last_step(&service, "ada@example.com").await;

    for _ in 0..2 {
        let report = service
            .advance(id, &page_context())
            .await
            .expect("session exists");
        assert_eq!(report.outcome, AdvanceOutcome::Failed);
        assert_eq!(report.session.phase, SessionPhase::Editing);
        assert_eq!(
            report.session.message.map(|message| message.kind),
            Some(MessageKind::Failure)
        );
    }
}

#[tokio::test]
async fn concurrent_advances_issue_exactly_one_insert() {
    let store = Arc::new(GatedStore::default());
    let service = build_service(store.clone());
    let id = fill_to_last_step(&service, "ada@example.com").await;
    let context = page_context();
    let enter = KeyPress::enter();

    let (first, second, third, ()) = tokio::join!(
        service.advance(id, &context),
        service.advance(id, &context),
        service.key_press(id, &enter, &context),
        async { store.gate.notify_one() },
    );

    assert_eq!(first.expect("session").outcome, AdvanceOutcome::Submitted);
    assert_eq!(second.expect("session").outcome, AdvanceOutcome::Busy);
    let third = third.expect("session").expect("enter advances");
    assert_eq!(third.outcome, AdvanceOutcome::Busy);
    assert_eq!(store.inner.insert_attempts(), 1);
    assert_eq!(store.inner.rows(COLLECTION).len(), 1);

    let after = service
        .advance(id, &context)
        .await
        .expect("session exists");
    assert_eq!(after.outcome, AdvanceOutcome::Finished);
    assert_eq!(store.inner.insert_attempts(), 1);
}

#[tokio::test]
async fn validation_failure_issues_no_insert() {
    let store = Arc::new(MemoryRecordStore::new());
    let service = build_service(store.clone());
    let view = service.open(Default::default());

    let report = service
        .advance(view.session_id, &page_context())
        .await
        .expect("session exists");
    assert_eq!(report.outcome, AdvanceOutcome::Rejected);
    assert_eq!(report.session.step_index, 0);
    assert_eq!(store.insert_attempts(), 0);
}

#[tokio::test]
async fn closed_sessions_reject_further_events() {
    let service = build_service(unique_email_store());
    let view = service.open(Default::default());
    let id = view.session_id;

    assert_eq!(service.close(id), Ok(true));
    assert_eq!(service.close(id), Ok(false));
    assert_eq!(service.open_sessions(), 0);

    match service.key_press(id, &KeyPress::enter(), &page_context()).await {
        Err(ServiceError::SessionNotFound(missing)) => assert_eq!(missing, id),
        other => panic!("expected missing session, got {other:?}"),
    }
    assert!(matches!(
        service.apply(id, RegistrationInput::Name("Ada".to_string())),
        Err(ServiceError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn session_with_outstanding_insert_cannot_be_closed() {
    let store = Arc::new(GatedStore::default());
    let service = build_service(store.clone());
    let id = fill_to_last_step(&service, "ada@example.com").await;
    let context = page_context();

    let (report, closed) = tokio::join!(service.advance(id, &context), async {
        let closed = service.close(id);
        store.gate.notify_one();
        closed
    });

    assert!(matches!(
        closed,
        Err(ServiceError::NotEditable {
            phase: SessionPhase::Submitting,
            ..
        })
    ));
    assert_eq!(report.expect("session").outcome, AdvanceOutcome::Submitted);
}

#[tokio::test]
async fn sweep_discards_idle_sessions() {
    let service = build_service(unique_email_store());
    service.open(Default::default());
    service.open(Default::default());
    assert_eq!(service.open_sessions(), 2);

    assert_eq!(service.sweep_expired(Utc::now()), 0);
    assert_eq!(service.sweep_expired(Utc::now() + Duration::minutes(61)), 2);
    assert_eq!(service.open_sessions(), 0);
}
