use serde::{Deserialize, Serialize};

use super::attribution::Attribution;
use super::domain::is_valid_email;
use super::flow::{FormFlow, StepPrompt, SubmissionContext, ValidationError};
use super::session::SessionId;
use crate::config::FunnelConfig;

const DEFAULT_SOURCE: &str = "website";

pub const LEAD_CAPTURE_STEPS: [StepPrompt; 3] = [
    StepPrompt {
        key: "email",
        question: "What's your email?",
        subtitle: "Start your journey",
    },
    StepPrompt {
        key: "name",
        question: "What's your name?",
        subtitle: "Full name",
    },
    StepPrompt {
        key: "user_type",
        question: "Tell us about yourself",
        subtitle: "I'm a...",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadUserType {
    CompleteBeginner,
    Student,
    CareerSwitcher,
    Professional,
}

impl LeadUserType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CompleteBeginner => "Complete Beginner",
            Self::Student => "Student",
            Self::CareerSwitcher => "Career Switcher",
            Self::Professional => "Working Professional",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub source: String,
    pub email: String,
    pub name: String,
    pub user_type: Option<LeadUserType>,
}

/// Page placement that opened the capture form, e.g. `hero` or `exit_intent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadOpening {
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum LeadInput {
    Email(String),
    Name(String),
    UserType(LeadUserType),
}

/// Row written to the leads table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub email: String,
    pub name: String,
    pub source: String,
    pub user_type: LeadUserType,
    #[serde(flatten)]
    pub attribution: Attribution,
    pub session_id: SessionId,
}

/// Short three-question capture used by the site's call-to-action buttons.
#[derive(Debug, Clone)]
pub struct LeadCaptureFlow {
    collection: String,
}

impl LeadCaptureFlow {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    pub fn from_config(config: &FunnelConfig) -> Self {
        Self::new(config.leads_collection.clone())
    }
}

impl FormFlow for LeadCaptureFlow {
    type Draft = LeadDraft;
    type Opening = LeadOpening;
    type Input = LeadInput;
    type Record = Lead;

    fn collection(&self) -> &str {
        &self.collection
    }

    fn steps(&self) -> &'static [StepPrompt] {
        &LEAD_CAPTURE_STEPS
    }

    fn open(&self, opening: LeadOpening) -> LeadDraft {
        let source = opening
            .source
            .map(|source| source.trim().to_string())
            .filter(|source| !source.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        LeadDraft {
            source,
            ..LeadDraft::default()
        }
    }

    fn apply(&self, draft: &mut LeadDraft, input: LeadInput) {
        match input {
            LeadInput::Email(email) => draft.email = email.trim().to_string(),
            LeadInput::Name(name) => draft.name = name.trim().to_string(),
            LeadInput::UserType(user_type) => draft.user_type = Some(user_type),
        }
    }

    fn validate(&self, step: usize, draft: &LeadDraft) -> Result<(), ValidationError> {
        match step {
            0 if !is_valid_email(&draft.email) => Err(ValidationError::InvalidEmail),
            1 if draft.name.is_empty() => Err(ValidationError::MissingName),
            2 if draft.user_type.is_none() => Err(ValidationError::MissingSelection),
            _ => Ok(()),
        }
    }

    fn compose(&self, draft: &LeadDraft, context: &SubmissionContext) -> Lead {
        Lead {
            email: draft.email.clone(),
            name: draft.name.clone(),
            source: draft.source.clone(),
            // the last step only accepts a chosen type
            user_type: draft.user_type.unwrap_or(LeadUserType::CompleteBeginner),
            attribution: context.attribution.clone(),
            session_id: context.session_id,
        }
    }

    fn duplicate_message(&self) -> &'static str {
        "This email is already registered!"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::workflows::registration::attribution::DeviceType;

    #[test]
    fn blank_source_falls_back_to_website() {
        let flow = LeadCaptureFlow::new("leads");
        assert_eq!(flow.open(LeadOpening::default()).source, "website");
        assert_eq!(
            flow.open(LeadOpening {
                source: Some("  ".to_string())
            })
            .source,
            "website"
        );
        assert_eq!(
            flow.open(LeadOpening {
                source: Some("exit_intent".to_string())
            })
            .source,
            "exit_intent"
        );
    }

    #[test]
    fn each_step_has_its_own_validator() {
        let flow = LeadCaptureFlow::new("leads");
        let mut draft = flow.open(LeadOpening::default());
        assert_eq!(flow.validate(0, &draft), Err(ValidationError::InvalidEmail));

        flow.apply(&mut draft, LeadInput::Email(" jane@example.com ".to_string()));
        assert_eq!(flow.validate(0, &draft), Ok(()));
        assert_eq!(flow.validate(1, &draft), Err(ValidationError::MissingName));

        flow.apply(&mut draft, LeadInput::Name("Jane Doe".to_string()));
        assert_eq!(flow.validate(2, &draft), Err(ValidationError::MissingSelection));

        flow.apply(&mut draft, LeadInput::UserType(LeadUserType::CareerSwitcher));
        assert_eq!(flow.validate(2, &draft), Ok(()));
    }

    #[test]
    fn lead_row_flattens_full_attribution_and_session() {
        let flow = LeadCaptureFlow::new("leads");
        let mut draft = flow.open(LeadOpening {
            source: Some("hero".to_string()),
        });
        flow.apply(&mut draft, LeadInput::Email("jane@example.com".to_string()));
        flow.apply(&mut draft, LeadInput::Name("Jane".to_string()));
        flow.apply(&mut draft, LeadInput::UserType(LeadUserType::Professional));

        let session_id = SessionId::random();
        let context = SubmissionContext {
            session_id,
            submitted_at: Utc::now(),
            completion_time_secs: 12,
            attribution: Attribution {
                utm_term: Some("analytics".to_string()),
                landing_page: Some("/".to_string()),
                device_type: DeviceType::Desktop,
                ..Attribution::default()
            },
        };
        let lead = flow.compose(&draft, &context);
        assert_eq!(flow.lead_score(&lead), None);

        let row = serde_json::to_value(&lead).expect("serializes");
        assert_eq!(row["source"], "hero");
        assert_eq!(row["user_type"], "professional");
        assert_eq!(row["utm_term"], "analytics");
        assert_eq!(row["landing_page"], "/");
        assert_eq!(row["device_type"], "desktop");
        assert_eq!(row["session_id"], session_id.to_string());
        assert!(row["utm_source"].is_null());
    }
}
