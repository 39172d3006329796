use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::attribution::CampaignAttribution;
use super::domain::{
    is_valid_email, non_blank, CompanySize, RegistrationDraft, RoleType, TechnicalLevel, Tool,
    ToolSelection,
};
use super::flow::{FormFlow, StepPrompt, SubmissionContext, ValidationError};
use super::scoring::score_draft;
use crate::config::FunnelConfig;

pub const MASTERCLASS_STEPS: [StepPrompt; 8] = [
    StepPrompt {
        key: "name",
        question: "Let's start with your name",
        subtitle: "What should we call you?",
    },
    StepPrompt {
        key: "email",
        question: "What's your email?",
        subtitle: "We'll send your masterclass link here",
    },
    StepPrompt {
        key: "role",
        question: "Which best describes you?",
        subtitle: "This helps us personalize your experience",
    },
    StepPrompt {
        key: "technical_level",
        question: "What's your technical background?",
        subtitle: "No judgment - we meet you where you are",
    },
    StepPrompt {
        key: "tools",
        question: "Which tools do you currently use?",
        subtitle: "Select all that apply (or skip if none)",
    },
    StepPrompt {
        key: "background",
        question: "Tell us about your work",
        subtitle: "Optional - helps us understand your background",
    },
    StepPrompt {
        key: "challenge",
        question: "What's your biggest data challenge?",
        subtitle: "What problem would you most like to solve?",
    },
    StepPrompt {
        key: "learning_goal",
        question: "What do you hope to learn?",
        subtitle: "What's your main goal for this masterclass?",
    },
];

const NAME_STEP: usize = 0;
const EMAIL_STEP: usize = 1;
const ROLE_STEP: usize = 2;
const LEVEL_STEP: usize = 3;

/// Single-field edit sent by the form as the visitor types or clicks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RegistrationInput {
    Name(String),
    Email(String),
    RoleType(RoleType),
    TechnicalLevel(TechnicalLevel),
    ToggleTool(Tool),
    OtherTools(String),
    JobTitle(String),
    CompanySize(Option<CompanySize>),
    YearsExperience(Option<u32>),
    BiggestChallenge(String),
    LearningGoal(String),
}

/// Optional prefill when the visitor arrives from an earlier capture form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MasterclassOpening {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Row written to the masterclass registrations table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterclassRegistration {
    pub name: String,
    pub email: String,
    pub role_type: Option<RoleType>,
    pub technical_level: Option<TechnicalLevel>,
    pub current_tools: BTreeSet<Tool>,
    pub tools_other: Option<String>,
    pub job_title: Option<String>,
    pub company_size: Option<CompanySize>,
    pub years_experience: Option<u32>,
    pub biggest_challenge: Option<String>,
    pub learning_goal: Option<String>,
    pub lead_score: u8,
    pub form_completion_time: u32,
    pub event_date: NaiveDate,
    pub registered_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attribution: CampaignAttribution,
}

impl MasterclassRegistration {
    /// Recovers the answers the record was composed from.
    pub fn draft(&self) -> RegistrationDraft {
        RegistrationDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            role_type: self.role_type,
            technical_level: self.technical_level,
            current_tools: ToolSelection::from_parts(
                self.current_tools.iter().copied(),
                self.tools_other.clone(),
            ),
            job_title: self.job_title.clone(),
            company_size: self.company_size,
            years_experience: self.years_experience,
            biggest_challenge: self.biggest_challenge.clone(),
            learning_goal: self.learning_goal.clone(),
        }
    }
}

/// The critical-thinking masterclass registration funnel.
#[derive(Debug, Clone)]
pub struct MasterclassFlow {
    collection: String,
    event_date: NaiveDate,
}

impl MasterclassFlow {
    pub fn new(collection: impl Into<String>, event_date: NaiveDate) -> Self {
        Self {
            collection: collection.into(),
            event_date,
        }
    }

    pub fn from_config(config: &FunnelConfig) -> Self {
        Self::new(config.masterclass_collection.clone(), config.event_date)
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_date
    }
}

impl FormFlow for MasterclassFlow {
    type Draft = RegistrationDraft;
    type Opening = MasterclassOpening;
    type Input = RegistrationInput;
    type Record = MasterclassRegistration;

    fn collection(&self) -> &str {
        &self.collection
    }

    fn steps(&self) -> &'static [StepPrompt] {
        &MASTERCLASS_STEPS
    }

    fn open(&self, opening: MasterclassOpening) -> RegistrationDraft {
        RegistrationDraft {
            name: opening.name.map(|name| name.trim().to_string()).unwrap_or_default(),
            email: opening
                .email
                .map(|email| email.trim().to_string())
                .unwrap_or_default(),
            ..RegistrationDraft::default()
        }
    }

    fn apply(&self, draft: &mut RegistrationDraft, input: RegistrationInput) {
        match input {
            RegistrationInput::Name(name) => draft.name = name.trim().to_string(),
            RegistrationInput::Email(email) => draft.email = email.trim().to_string(),
            RegistrationInput::RoleType(role) => draft.role_type = Some(role),
            RegistrationInput::TechnicalLevel(level) => draft.technical_level = Some(level),
            RegistrationInput::ToggleTool(tool) => {
                draft.current_tools.toggle(tool);
            }
            RegistrationInput::OtherTools(other) => draft.current_tools.set_other(&other),
            RegistrationInput::JobTitle(title) => draft.job_title = non_blank(&title),
            RegistrationInput::CompanySize(size) => draft.company_size = size,
            RegistrationInput::YearsExperience(years) => draft.years_experience = years,
            RegistrationInput::BiggestChallenge(text) => draft.biggest_challenge = non_blank(&text),
            RegistrationInput::LearningGoal(text) => draft.learning_goal = non_blank(&text),
        }
    }

    fn validate(&self, step: usize, draft: &RegistrationDraft) -> Result<(), ValidationError> {
        match step {
            NAME_STEP if draft.name.trim().is_empty() => Err(ValidationError::MissingName),
            EMAIL_STEP if !is_valid_email(&draft.email) => Err(ValidationError::InvalidEmail),
            ROLE_STEP if draft.role_type.is_none() => Err(ValidationError::MissingSelection),
            LEVEL_STEP if draft.technical_level.is_none() => {
                Err(ValidationError::MissingTechnicalLevel)
            }
            _ => Ok(()),
        }
    }

    fn compose(&self, draft: &RegistrationDraft, context: &SubmissionContext) -> MasterclassRegistration {
        let score = score_draft(draft);

        MasterclassRegistration {
            name: draft.name.clone(),
            email: draft.email.clone(),
            role_type: draft.role_type,
            technical_level: draft.technical_level,
            current_tools: draft.current_tools.selected().clone(),
            tools_other: draft.current_tools.other().map(str::to_string),
            job_title: draft.job_title.clone(),
            company_size: draft.company_size,
            years_experience: draft.years_experience,
            biggest_challenge: draft.biggest_challenge.clone(),
            learning_goal: draft.learning_goal.clone(),
            lead_score: score.total,
            form_completion_time: context.completion_time_secs,
            event_date: self.event_date,
            registered_at: context.submitted_at,
            attribution: context.attribution.campaign(),
        }
    }

    fn duplicate_message(&self) -> &'static str {
        "This email is already registered for the masterclass!"
    }

    fn lead_score(&self, record: &MasterclassRegistration) -> Option<u8> {
        Some(record.lead_score)
    }
}
