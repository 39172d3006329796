use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attribution::{Attribution, AttributionSource};
use super::flow::{FormFlow, StepPrompt, SubmissionContext, ValidationError};
use super::store::StoreError;

/// Identifier for one form session; also stored on lead rows as `session_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Editing,
    /// Exactly one insert is outstanding.
    Submitting,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Validation,
    Duplicate,
    Failure,
}

/// Inline message rendered under the active question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// Key event delivered while the form is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyPress {
    pub key: String,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyPress {
    pub fn enter() -> Self {
        Self {
            key: "Enter".to_string(),
            ..Self::default()
        }
    }

    pub fn is_advance_shortcut(&self) -> bool {
        self.key == "Enter" && !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// Record ready to be inserted; produced at most once per outstanding submission.
#[derive(Debug)]
pub struct PendingSubmission<R> {
    pub session_id: SessionId,
    pub collection: String,
    pub record: R,
    pub lead_score: Option<u8>,
}

#[derive(Debug)]
pub enum Advance<R> {
    Moved { step: usize },
    Rejected(ValidationError),
    Submit(PendingSubmission<R>),
    /// A submission is already in flight; nothing was issued.
    Busy,
    /// The session already reached the terminal state.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Submitted,
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is not accepting changes while {0:?}")]
    NotEditable(SessionPhase),
}

/// Serializable snapshot of a session for the browser client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView<D> {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub step_index: usize,
    pub step_count: usize,
    pub step: StepPrompt,
    pub progress_percent: u8,
    pub message: Option<FlowMessage>,
    pub draft: D,
}

/// One visitor's pass through a flow: the owned draft plus the step cursor.
pub struct FormSession<F: FormFlow> {
    id: SessionId,
    draft: F::Draft,
    step: usize,
    phase: SessionPhase,
    message: Option<FlowMessage>,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl<F: FormFlow> FormSession<F> {
    pub fn open(flow: &F, opening: F::Opening, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::random(),
            draft: flow.open(opening),
            step: 0,
            phase: SessionPhase::Editing,
            message: None,
            started_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn draft(&self) -> &F::Draft {
        &self.draft
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn message(&self) -> Option<&FlowMessage> {
        self.message.as_ref()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Idle longer than `ttl`. A session waiting on the store never expires.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.phase != SessionPhase::Submitting && now - self.last_activity > ttl
    }

    pub fn apply(
        &mut self,
        flow: &F,
        input: F::Input,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Editing {
            return Err(SessionError::NotEditable(self.phase));
        }
        flow.apply(&mut self.draft, input);
        self.last_activity = now;
        Ok(())
    }

    /// Validates the active step, then either moves forward or, on the last step, freezes the
    /// draft into a record. Attribution is read only in the latter case.
    pub fn advance(
        &mut self,
        flow: &F,
        source: &dyn AttributionSource,
        now: DateTime<Utc>,
    ) -> Advance<F::Record> {
        match self.phase {
            SessionPhase::Submitted => return Advance::Finished,
            SessionPhase::Submitting => return Advance::Busy,
            SessionPhase::Editing => {}
        }
        self.last_activity = now;

        // the last step re-checks every earlier answer and jumps back to the first bad one
        let last = flow.steps().len().saturating_sub(1);
        let checked = if self.step < last {
            self.step..=self.step
        } else {
            0..=last
        };
        let failure = checked
            .into_iter()
            .find_map(|step| flow.validate(step, &self.draft).err().map(|error| (step, error)));
        if let Some((step, error)) = failure {
            self.step = step;
            self.message = Some(FlowMessage {
                kind: MessageKind::Validation,
                text: error.to_string(),
            });
            return Advance::Rejected(error);
        }
        self.message = None;

        if self.step < last {
            self.step += 1;
            return Advance::Moved { step: self.step };
        }

        let elapsed = (now - self.started_at).num_seconds().max(0);
        let context = SubmissionContext {
            session_id: self.id,
            submitted_at: now,
            completion_time_secs: u32::try_from(elapsed).unwrap_or(u32::MAX),
            attribution: Attribution::capture(source),
        };
        let record = flow.compose(&self.draft, &context);
        let lead_score = flow.lead_score(&record);
        self.phase = SessionPhase::Submitting;

        Advance::Submit(PendingSubmission {
            session_id: self.id,
            collection: flow.collection().to_string(),
            record,
            lead_score,
        })
    }

    /// Moves back one step without validating. Returns whether the cursor moved.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != SessionPhase::Editing || self.step == 0 {
            return false;
        }
        self.step -= 1;
        self.message = None;
        self.last_activity = now;
        true
    }

    /// Enter without modifiers advances; every other key, and any key once submitted, is ignored.
    pub fn key_press(
        &mut self,
        flow: &F,
        key: &KeyPress,
        source: &dyn AttributionSource,
        now: DateTime<Utc>,
    ) -> Option<Advance<F::Record>> {
        if !key.is_advance_shortcut() || self.phase == SessionPhase::Submitted {
            return None;
        }
        Some(self.advance(flow, source, now))
    }

    /// Applies the store's answer to the outstanding submission.
    pub fn resolve(&mut self, flow: &F, outcome: &Result<(), StoreError>) -> SubmissionStatus {
        match outcome {
            Ok(()) => {
                self.phase = SessionPhase::Submitted;
                self.message = None;
                SubmissionStatus::Submitted
            }
            Err(error) if error.is_unique_violation() => {
                self.phase = SessionPhase::Editing;
                self.message = Some(FlowMessage {
                    kind: MessageKind::Duplicate,
                    text: flow.duplicate_message().to_string(),
                });
                SubmissionStatus::Duplicate
            }
            Err(_) => {
                self.phase = SessionPhase::Editing;
                self.message = Some(FlowMessage {
                    kind: MessageKind::Failure,
                    text: flow.failure_message().to_string(),
                });
                SubmissionStatus::Failed
            }
        }
    }

    pub fn progress_percent(&self, flow: &F) -> u8 {
        let total = flow.steps().len().max(1);
        (((self.step + 1) * 100) / total).min(100) as u8
    }

    pub fn view(&self, flow: &F) -> SessionView<F::Draft> {
        let steps = flow.steps();
        SessionView {
            session_id: self.id,
            phase: self.phase,
            step_index: self.step,
            step_count: steps.len(),
            step: steps[self.step.min(steps.len().saturating_sub(1))],
            progress_percent: self.progress_percent(flow),
            message: self.message.clone(),
            draft: self.draft.clone(),
        }
    }
}
