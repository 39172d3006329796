//! Multi-step registration funnels.
//!
//! A [`FormFlow`] describes the questions, validators and stored record of one funnel. Each
//! visitor gets a [`FormSession`] that walks the steps; the [`RegistrationService`] owns open
//! sessions and performs the single store insert when the last step is accepted.

pub mod attribution;
pub mod domain;
pub mod flow;
pub mod lead_capture;
pub mod masterclass;
pub mod postgrest;
pub mod router;
pub(crate) mod scoring;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use attribution::{
    Attribution, AttributionSource, CampaignAttribution, ClientContext, DeviceType,
};
pub use domain::{
    is_valid_email, CompanySize, RegistrationDraft, RoleType, TechnicalLevel, Tool, ToolSelection,
};
pub use flow::{FormFlow, StepPrompt, SubmissionContext, ValidationError};
pub use lead_capture::{Lead, LeadCaptureFlow, LeadDraft, LeadInput, LeadOpening, LeadUserType};
pub use masterclass::{
    MasterclassFlow, MasterclassOpening, MasterclassRegistration, RegistrationInput,
    MASTERCLASS_STEPS,
};
pub use postgrest::PostgrestStore;
pub use router::registration_router;
pub use scoring::{score_draft, LeadScore, ScoreComponent, ScoreFactor, MAX_LEAD_SCORE};
pub use service::{AdvanceOutcome, AdvanceReport, RegistrationService, ServiceError};
pub use session::{
    Advance, FlowMessage, FormSession, KeyPress, MessageKind, SessionError, SessionId,
    SessionPhase, SessionView, SubmissionStatus,
};
pub use store::{MemoryRecordStore, RecordStore, StoreError, UNIQUE_VIOLATION};
