use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CritiqueError;

pub type ArtifactId = i64;
pub type RequirementId = i64;

/// Descriptive metadata about the project an artifact belongs to.
///
/// Passed unchanged into every prompt; only non-empty fields are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub ml_task: Option<String>,
    #[serde(default)]
    pub usage_context: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub dataset_description: Option<String>,
}

impl ProjectContext {
    /// Labelled, non-empty context fields in prompt order
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let candidates = [
            ("Project Description", Some(self.project_description.as_str())),
            ("ML Task", self.ml_task.as_deref()),
            ("Usage Context", self.usage_context.as_deref()),
            ("Target Audience", self.target_audience.as_deref()),
            ("Dataset Description", self.dataset_description.as_deref()),
        ];

        candidates
            .into_iter()
            .filter_map(|(label, value)| {
                value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (label, v))
            })
            .collect()
    }
}

/// A requirements document owned by one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    pub context: ProjectContext,
    pub created_at: DateTime<Utc>,
}

/// Represents a single requirement card within an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub artifact_id: ArtifactId,
    /// Position of the card in the artifact editor
    pub card_index: i64,
    pub content: String,
    /// Category tags, sorted by name
    pub categories: Vec<String>,
    /// Last time `content` changed; drives the set-evaluation version digest
    pub content_updated_at: DateTime<Utc>,
}

impl Requirement {
    /// Categories joined into the label used by prompts ("Fairness, Performance")
    pub fn category_label(&self) -> String {
        let mut names: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// True if the requirement is tagged with at least one of `names`
    pub fn has_any_category(&self, names: &[String]) -> bool {
        self.categories.iter().any(|c| names.contains(c))
    }
}

/// Quality criteria evaluated for each individual requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemQuality {
    Necessary,
    Appropriate,
    Unambiguous,
    Complete,
    Singular,
    Feasible,
    Verifiable,
    Correct,
    Conforming,
}

impl ItemQuality {
    pub const ALL: [ItemQuality; 9] = [
        ItemQuality::Necessary,
        ItemQuality::Appropriate,
        ItemQuality::Unambiguous,
        ItemQuality::Complete,
        ItemQuality::Singular,
        ItemQuality::Feasible,
        ItemQuality::Verifiable,
        ItemQuality::Correct,
        ItemQuality::Conforming,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ItemQuality::Necessary => "Necessary",
            ItemQuality::Appropriate => "Appropriate",
            ItemQuality::Unambiguous => "Unambiguous",
            ItemQuality::Complete => "Complete",
            ItemQuality::Singular => "Singular",
            ItemQuality::Feasible => "Feasible",
            ItemQuality::Verifiable => "Verifiable",
            ItemQuality::Correct => "Correct",
            ItemQuality::Conforming => "Conforming",
        }
    }
}

impl fmt::Display for ItemQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ItemQuality {
    type Err = CritiqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemQuality::ALL
            .into_iter()
            .find(|q| q.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CritiqueError::UnknownCriterion(s.to_string()))
    }
}

/// Quality criteria evaluated for a group of requirements as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetQuality {
    Complete,
    Consistent,
    Feasible,
    Comprehensible,
    AbleToBeValidated,
}

impl SetQuality {
    pub const ALL: [SetQuality; 5] = [
        SetQuality::Complete,
        SetQuality::Consistent,
        SetQuality::Feasible,
        SetQuality::Comprehensible,
        SetQuality::AbleToBeValidated,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SetQuality::Complete => "Complete",
            SetQuality::Consistent => "Consistent",
            SetQuality::Feasible => "Feasible",
            SetQuality::Comprehensible => "Comprehensible",
            SetQuality::AbleToBeValidated => "Able to be validated",
        }
    }
}

impl fmt::Display for SetQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SetQuality {
    type Err = CritiqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        SetQuality::ALL
            .into_iter()
            .find(|q| q.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CritiqueError::UnknownCriterion(s.to_string()))
    }
}

/// Three-level judgment returned by the completion capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingLevel {
    High,
    Medium,
    Low,
}

impl RatingLevel {
    pub const ALL: [RatingLevel; 3] = [RatingLevel::High, RatingLevel::Medium, RatingLevel::Low];

    /// Parses a raw `eval_result`; anything outside high/medium/low is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(RatingLevel::High),
            "medium" => Some(RatingLevel::Medium),
            "low" => Some(RatingLevel::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLevel::High => "high",
            RatingLevel::Medium => "medium",
            RatingLevel::Low => "low",
        }
    }

    /// Severity of the feedback this rating produces; high produces none
    pub fn feedback_level(&self) -> Option<FeedbackLevel> {
        match self {
            RatingLevel::High => None,
            RatingLevel::Medium => Some(FeedbackLevel::Warning),
            RatingLevel::Low => Some(FeedbackLevel::Error),
        }
    }
}

impl fmt::Display for RatingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a stored feedback row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLevel {
    Warning,
    Error,
}

impl FeedbackLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackLevel::Warning => "warning",
            FeedbackLevel::Error => "error",
        }
    }

    /// Maximum number of critiques requested for this severity
    pub fn critique_cap(&self) -> usize {
        match self {
            FeedbackLevel::Warning => 2,
            FeedbackLevel::Error => 5,
        }
    }
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(FeedbackLevel::Warning),
            "error" => Ok(FeedbackLevel::Error),
            other => anyhow::bail!("Invalid feedback level: {}", other),
        }
    }
}

/// Persisted warning/error for one (requirement, quality) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub requirement_id: RequirementId,
    pub level: FeedbackLevel,
    pub quality: String,
    pub critiques: Vec<String>,
}

/// A requirement together with its current feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDetail {
    pub requirement: Requirement,
    pub feedback: Vec<Feedback>,
}

/// Result of a per-requirement critique.
///
/// Lists accumulate in completion order and must be treated as sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueStats {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Qualities whose rating was not high/medium/low
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
    /// Qualities whose evaluation task failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

/// Result of a per-set critique
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCritiqueStats {
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

/// Requirement selector: every requirement, or those tagged with any category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCriteria {
    All,
    Categories(Vec<String>),
}

impl FilterCriteria {
    /// Parses "All" or a comma-separated list of category names
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "All" {
            return FilterCriteria::All;
        }

        let mut names: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        FilterCriteria::Categories(names)
    }

    pub fn matches(&self, req: &Requirement) -> bool {
        match self {
            FilterCriteria::All => true,
            FilterCriteria::Categories(names) => req.has_any_category(names),
        }
    }
}

/// A cached set evaluation as stored, before critique normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvaluation {
    pub id: i64,
    pub artifact_id: ArtifactId,
    pub filter_criteria: String,
    pub evaluated_at: DateTime<Utc>,
    pub qualities: Vec<StoredEvaluationQuality>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvaluationQuality {
    pub id: i64,
    pub quality: String,
    pub summary: String,
    pub percentage: u8,
    /// Raw critique blobs (structured JSON or the legacy string form)
    pub critiques: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req_with_categories(categories: &[&str]) -> Requirement {
        Requirement {
            id: 1,
            artifact_id: 1,
            card_index: 0,
            content: "The model shall report accuracy".to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            content_updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rating_to_feedback_level() {
        for rating in RatingLevel::ALL {
            let level = rating.feedback_level();
            match rating {
                RatingLevel::High => assert_eq!(level, None),
                RatingLevel::Medium => assert_eq!(level, Some(FeedbackLevel::Warning)),
                RatingLevel::Low => assert_eq!(level, Some(FeedbackLevel::Error)),
            }
        }
    }

    #[test]
    fn test_rating_parse() {
        assert_eq!(RatingLevel::parse("high"), Some(RatingLevel::High));
        assert_eq!(RatingLevel::parse(" Medium "), Some(RatingLevel::Medium));
        assert_eq!(RatingLevel::parse("LOW"), Some(RatingLevel::Low));
        assert_eq!(RatingLevel::parse("very good"), None);
        assert_eq!(RatingLevel::parse(""), None);
    }

    #[test]
    fn test_critique_caps() {
        assert_eq!(FeedbackLevel::Warning.critique_cap(), 2);
        assert_eq!(FeedbackLevel::Error.critique_cap(), 5);
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("unambiguous".parse::<ItemQuality>().unwrap(), ItemQuality::Unambiguous);
        assert_eq!(
            "Able to be validated".parse::<SetQuality>().unwrap(),
            SetQuality::AbleToBeValidated
        );
        assert_eq!(
            "able-to-be-validated".parse::<SetQuality>().unwrap(),
            SetQuality::AbleToBeValidated
        );
        assert!(matches!(
            "Elegant".parse::<ItemQuality>(),
            Err(CritiqueError::UnknownCriterion(_))
        ));
    }

    #[test]
    fn test_filter_criteria_parse() {
        assert_eq!(FilterCriteria::parse("All"), FilterCriteria::All);
        assert_eq!(
            FilterCriteria::parse("Fairness, Performance,,Fairness"),
            FilterCriteria::Categories(vec!["Fairness".to_string(), "Performance".to_string()])
        );
    }

    #[test]
    fn test_filter_criteria_is_union() {
        let filter = FilterCriteria::parse("Fairness,Security");
        assert!(filter.matches(&req_with_categories(&["Fairness"])));
        assert!(filter.matches(&req_with_categories(&["Security", "Privacy"])));
        assert!(!filter.matches(&req_with_categories(&["Privacy"])));
        assert!(!filter.matches(&req_with_categories(&[])));
        assert!(FilterCriteria::All.matches(&req_with_categories(&[])));
    }

    #[test]
    fn test_category_label_sorted() {
        let req = req_with_categories(&["Performance", "Fairness"]);
        assert_eq!(req.category_label(), "Fairness, Performance");
    }

    #[test]
    fn test_context_fields_skip_empty() {
        let ctx = ProjectContext {
            project_description: "Loan approval model".to_string(),
            ml_task: Some("Binary classification".to_string()),
            usage_context: Some("   ".to_string()),
            target_audience: None,
            dataset_description: Some("Historic loan applications".to_string()),
        };
        let labels: Vec<&str> = ctx.fields().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Project Description", "ML Task", "Dataset Description"]);
    }

    #[test]
    fn test_critique_stats_serialization_omits_empty_extras() {
        let stats = CritiqueStats {
            warnings: vec!["Complete".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json, serde_json::json!({"warnings": ["Complete"], "errors": []}));
    }
}
