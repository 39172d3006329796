use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::attribution::Attribution;
use super::session::SessionId;

/// Copy shown for one question step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepPrompt {
    pub key: &'static str,
    pub question: &'static str,
    pub subtitle: &'static str,
}

/// Inline, recoverable error raised when the active step is incomplete.
///
/// The display text is the message shown under the question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    MissingName,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please select an option")]
    MissingSelection,
    #[error("Please select your technical level")]
    MissingTechnicalLevel,
}

/// Values derived when the final step is accepted, shared with record composition.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionContext {
    pub session_id: SessionId,
    pub submitted_at: DateTime<Utc>,
    pub completion_time_secs: u32,
    pub attribution: Attribution,
}

/// A fixed sequence of question steps that fills one draft and yields one store record.
pub trait FormFlow: Send + Sync + 'static {
    type Draft: Clone + Serialize + Send + Sync + 'static;
    /// Payload accepted when a session is opened (prefill, placement source, ...).
    type Opening: DeserializeOwned + Default + Send + 'static;
    type Input: DeserializeOwned + Send + 'static;
    type Record: Serialize + Send + Sync + 'static;

    fn collection(&self) -> &str;

    fn steps(&self) -> &'static [StepPrompt];

    fn open(&self, opening: Self::Opening) -> Self::Draft;

    fn apply(&self, draft: &mut Self::Draft, input: Self::Input);

    /// Validator for the step at `step`; steps without required input always pass.
    fn validate(&self, step: usize, draft: &Self::Draft) -> Result<(), ValidationError>;

    fn compose(&self, draft: &Self::Draft, context: &SubmissionContext) -> Self::Record;

    /// Message shown when the store reports the identity is already present.
    fn duplicate_message(&self) -> &'static str;

    fn failure_message(&self) -> &'static str {
        "Unable to complete registration. Please try again or contact support."
    }

    fn lead_score(&self, _record: &Self::Record) -> Option<u8> {
        None
    }
}
