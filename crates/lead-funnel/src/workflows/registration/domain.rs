use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Self-reported description of where the registrant is in their career.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Student,
    Professional,
    CareerChanger,
    Entrepreneur,
}

impl RoleType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Student,
            Self::Professional,
            Self::CareerChanger,
            Self::Entrepreneur,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Professional => "Working Professional",
            Self::CareerChanger => "Career Changer",
            Self::Entrepreneur => "Entrepreneur",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalLevel {
    NonTechnical,
    Beginner,
    Intermediate,
    Advanced,
}

impl TechnicalLevel {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::NonTechnical,
            Self::Beginner,
            Self::Intermediate,
            Self::Advanced,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NonTechnical => "Non-Technical",
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Solo,
    Small,
    Medium,
    Large,
}

impl CompanySize {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solo => "Just me",
            Self::Small => "2-50 employees",
            Self::Medium => "51-500 employees",
            Self::Large => "500+ employees",
        }
    }
}

/// Fixed catalog of analytics tools offered on the tools step.
///
/// Serialized with the display label so stored rows read the same as the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "Excel")]
    Excel,
    #[serde(rename = "Google Sheets")]
    GoogleSheets,
    #[serde(rename = "Tableau")]
    Tableau,
    #[serde(rename = "Power BI")]
    PowerBi,
    #[serde(rename = "SQL")]
    Sql,
    #[serde(rename = "Python")]
    Python,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "Looker")]
    Looker,
    #[serde(rename = "Metabase")]
    Metabase,
    #[serde(rename = "None yet")]
    NoneYet,
}

impl Tool {
    pub const fn catalog() -> [Self; 10] {
        [
            Self::Excel,
            Self::GoogleSheets,
            Self::Tableau,
            Self::PowerBi,
            Self::Sql,
            Self::Python,
            Self::R,
            Self::Looker,
            Self::Metabase,
            Self::NoneYet,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excel => "Excel",
            Self::GoogleSheets => "Google Sheets",
            Self::Tableau => "Tableau",
            Self::PowerBi => "Power BI",
            Self::Sql => "SQL",
            Self::Python => "Python",
            Self::R => "R",
            Self::Looker => "Looker",
            Self::Metabase => "Metabase",
            Self::NoneYet => "None yet",
        }
    }
}

/// Catalog selections plus the single free-text "other tools" answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSelection {
    selected: BTreeSet<Tool>,
    other: Option<String>,
}

impl ToolSelection {
    pub fn from_parts(selected: impl IntoIterator<Item = Tool>, other: Option<String>) -> Self {
        Self {
            selected: selected.into_iter().collect(),
            other: other.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Flips the selection state of `tool`, returning whether it is now selected.
    pub fn toggle(&mut self, tool: Tool) -> bool {
        if self.selected.remove(&tool) {
            false
        } else {
            self.selected.insert(tool);
            true
        }
    }

    pub fn set_other(&mut self, raw: &str) {
        self.other = non_blank(raw);
    }

    pub fn contains(&self, tool: Tool) -> bool {
        self.selected.contains(&tool)
    }

    pub fn selected(&self) -> &BTreeSet<Tool> {
        &self.selected
    }

    pub fn other(&self) -> Option<&str> {
        self.other.as_deref()
    }

    /// True when no catalog tool is selected; the free-text answer is tracked separately.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// In-progress answers for one masterclass registration session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub role_type: Option<RoleType>,
    pub technical_level: Option<TechnicalLevel>,
    pub current_tools: ToolSelection,
    pub job_title: Option<String>,
    pub company_size: Option<CompanySize>,
    pub years_experience: Option<u32>,
    pub biggest_challenge: Option<String>,
    pub learning_goal: Option<String>,
}

/// Matches `local@domain.tld`: no whitespace, exactly one `@`, and a `.` after it.
pub fn is_valid_email(raw: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
        .is_match(raw)
}

pub(crate) fn non_blank(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
