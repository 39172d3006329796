use serde::{Deserialize, Serialize};

use super::domain::{CompanySize, RegistrationDraft, RoleType, TechnicalLevel};

pub const MAX_LEAD_SCORE: u8 = 100;

const CHALLENGE_DETAIL_CHARS: usize = 50;
const GOAL_DETAIL_CHARS: usize = 30;

/// Attribute of a draft that can contribute to the lead score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    RoleType,
    TechnicalLevel,
    ToolUsage,
    CompanySize,
    ChallengeDetail,
    GoalDetail,
}

/// Discrete contribution to a lead score so qualification stays auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub score: u8,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScore {
    pub total: u8,
    pub components: Vec<ScoreComponent>,
}

impl LeadScore {
    /// Sum of contributions before clamping.
    pub fn raw_total(&self) -> u16 {
        self.components
            .iter()
            .map(|component| u16::from(component.score))
            .sum()
    }
}

/// Additive qualification rubric. Each factor contributes at most once and the total is
/// clamped to [`MAX_LEAD_SCORE`].
pub fn score_draft(draft: &RegistrationDraft) -> LeadScore {
    let mut components = Vec::new();

    let role_points = match draft.role_type {
        Some(RoleType::Professional) => 30,
        Some(RoleType::CareerChanger) => 25,
        Some(RoleType::Student) => 15,
        Some(RoleType::Entrepreneur) | None => 0,
    };
    if let Some(role) = draft.role_type.filter(|_| role_points > 0) {
        components.push(ScoreComponent {
            factor: ScoreFactor::RoleType,
            score: role_points,
            notes: format!("role {}", role.label()),
        });
    }

    // no points for advanced
    let level_points = match draft.technical_level {
        Some(TechnicalLevel::NonTechnical) => 25,
        Some(TechnicalLevel::Beginner) | Some(TechnicalLevel::Intermediate) => 20,
        Some(TechnicalLevel::Advanced) | None => 0,
    };
    if let Some(level) = draft.technical_level.filter(|_| level_points > 0) {
        components.push(ScoreComponent {
            factor: ScoreFactor::TechnicalLevel,
            score: level_points,
            notes: format!("technical level {}", level.label()),
        });
    }

    if !draft.current_tools.is_empty() {
        components.push(ScoreComponent {
            factor: ScoreFactor::ToolUsage,
            score: 15,
            notes: format!("{} tool(s) in use", draft.current_tools.selected().len()),
        });
    }

    if let Some(size @ (CompanySize::Medium | CompanySize::Large)) = draft.company_size {
        components.push(ScoreComponent {
            factor: ScoreFactor::CompanySize,
            score: 20,
            notes: format!("company size {}", size.label()),
        });
    }

    let challenge_chars = char_count(draft.biggest_challenge.as_deref());
    if challenge_chars > CHALLENGE_DETAIL_CHARS {
        components.push(ScoreComponent {
            factor: ScoreFactor::ChallengeDetail,
            score: 10,
            notes: format!("challenge described in {challenge_chars} characters"),
        });
    }

    let goal_chars = char_count(draft.learning_goal.as_deref());
    if goal_chars > GOAL_DETAIL_CHARS {
        components.push(ScoreComponent {
            factor: ScoreFactor::GoalDetail,
            score: 10,
            notes: format!("learning goal described in {goal_chars} characters"),
        });
    }

    let mut score = LeadScore {
        total: 0,
        components,
    };
    score.total = score.raw_total().min(u16::from(MAX_LEAD_SCORE)) as u8;
    score
}

fn char_count(text: Option<&str>) -> usize {
    text.map(|value| value.chars().count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::registration::domain::{Tool, ToolSelection};

    fn text_of(len: usize) -> Option<String> {
        Some("x".repeat(len))
    }

    fn qualified_draft() -> RegistrationDraft {
        RegistrationDraft {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role_type: Some(RoleType::Professional),
            technical_level: Some(TechnicalLevel::NonTechnical),
            current_tools: ToolSelection::from_parts([Tool::Excel], None),
            company_size: Some(CompanySize::Large),
            biggest_challenge: text_of(51),
            learning_goal: text_of(31),
            ..RegistrationDraft::default()
        }
    }

    #[test]
    fn maximal_draft_is_clamped_to_one_hundred() {
        let score = score_draft(&qualified_draft());
        assert_eq!(score.raw_total(), 110);
        assert_eq!(score.total, 100);
        assert_eq!(score.components.len(), 6);
    }

    #[test]
    fn student_with_advanced_level_scores_role_only() {
        let draft = RegistrationDraft {
            role_type: Some(RoleType::Student),
            technical_level: Some(TechnicalLevel::Advanced),
            ..RegistrationDraft::default()
        };
        let score = score_draft(&draft);
        assert_eq!(score.total, 15);
        assert_eq!(score.components.len(), 1);
        assert_eq!(score.components[0].factor, ScoreFactor::RoleType);
    }

    #[test]
    fn text_thresholds_are_strictly_greater_than() {
        let mut draft = RegistrationDraft {
            biggest_challenge: text_of(50),
            learning_goal: text_of(30),
            ..RegistrationDraft::default()
        };
        assert_eq!(score_draft(&draft).total, 0);

        draft.biggest_challenge = text_of(51);
        draft.learning_goal = text_of(31);
        assert_eq!(score_draft(&draft).total, 20);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let draft = RegistrationDraft {
            learning_goal: Some("é".repeat(20)),
            ..RegistrationDraft::default()
        };
        assert_eq!(score_draft(&draft).total, 0);
    }

    #[test]
    fn each_field_matches_a_single_branch() {
        for (level, expected) in [
            (TechnicalLevel::NonTechnical, 25),
            (TechnicalLevel::Beginner, 20),
            (TechnicalLevel::Intermediate, 20),
            (TechnicalLevel::Advanced, 0),
        ] {
            let draft = RegistrationDraft {
                technical_level: Some(level),
                ..RegistrationDraft::default()
            };
            assert_eq!(score_draft(&draft).total, expected, "{level:?}");
        }

        for (role, expected) in [
            (RoleType::Professional, 30),
            (RoleType::CareerChanger, 25),
            (RoleType::Student, 15),
            (RoleType::Entrepreneur, 0),
        ] {
            let draft = RegistrationDraft {
                role_type: Some(role),
                ..RegistrationDraft::default()
            };
            assert_eq!(score_draft(&draft).total, expected, "{role:?}");
        }
    }

    #[test]
    fn small_companies_and_other_tools_do_not_score() {
        let draft = RegistrationDraft {
            company_size: Some(CompanySize::Small),
            current_tools: ToolSelection::from_parts(Vec::new(), Some("dbt".to_string())),
            ..RegistrationDraft::default()
        };
        assert_eq!(score_draft(&draft).total, 0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let draft = qualified_draft();
        assert_eq!(score_draft(&draft), score_draft(&draft));
        assert!(score_draft(&RegistrationDraft::default()).total <= MAX_LEAD_SCORE);
    }
}
