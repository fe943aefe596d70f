use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::Rubric;

/// Human-meaningful item identifier such as "TL04".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemCode(pub String);

impl ItemCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assessment identifier handed out by the upstream CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Theme slug, e.g. "financial" or "teaching-learning".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThemeId(pub String);

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of answer shapes. The scorer dispatch matches exhaustively on
/// this enum, so adding a variant without a scorer is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Numeric,
    Percentage,
    AutoCalculated,
    YesNoConditional,
    ShortText,
    LongText,
    MultiYearSeries,
    FileUpload,
    Dropdown,
    MultiSelect,
    PartnerSpecific,
    SalaryBands,
}

impl FieldType {
    /// Types scored via other mechanisms; the orchestrator counts these as
    /// skipped rather than failed.
    pub fn is_scoreable(self) -> bool {
        !matches!(
            self,
            FieldType::FileUpload
                | FieldType::Dropdown
                | FieldType::MultiSelect
                | FieldType::PartnerSpecific
                | FieldType::SalaryBands
        )
    }
}

/// A single question in the assessment hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub code: ItemCode,
    pub theme_id: ThemeId,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_rubric: Option<Rubric>,
    pub weight: f64,
    #[serde(default)]
    pub is_required: bool,
}

/// Weighted grouping of items. Theme weights are not forced to sum to 1;
/// aggregation divides explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    pub weight: f64,
}

/// One respondent answer. `score` stays `None` until a scoring run succeeds
/// for this item; a failed attempt never writes a sentinel value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub item_code: ItemCode,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Answer {
    pub fn new(item_code: ItemCode, value: Value) -> Self {
        Self {
            item_code,
            value,
            score: None,
            feedback: None,
        }
    }
}

/// Workflow status gating what may be triggered against an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Draft,
    Submitted,
    UnderReview,
    Scored,
    Published,
}

impl AssessmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AssessmentStatus::Draft => "draft",
            AssessmentStatus::Submitted => "submitted",
            AssessmentStatus::UnderReview => "under_review",
            AssessmentStatus::Scored => "scored",
            AssessmentStatus::Published => "published",
        }
    }

    /// Scoring may only be triggered from these statuses; moving away from
    /// them is how callers serialize concurrent scoring triggers.
    pub fn is_scorable(self) -> bool {
        matches!(
            self,
            AssessmentStatus::Submitted | AssessmentStatus::UnderReview
        )
    }
}

/// Per-(assessment, theme) aggregate, recomputed wholesale on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeScore {
    pub theme_id: ThemeId,
    pub normalised_score: Option<f64>,
    pub weighted_score: Option<f64>,
}

/// Assessment header as the scoring core sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub status: AssessmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
}

/// Full working set for one scoring run: template structure plus answers.
#[derive(Debug, Clone)]
pub struct AssessmentSnapshot {
    pub assessment: Assessment,
    pub themes: Vec<Theme>,
    pub items: Vec<Item>,
    pub answers: Vec<Answer>,
}

impl AssessmentSnapshot {
    pub fn item(&self, code: &ItemCode) -> Option<&Item> {
        self.items.iter().find(|item| &item.code == code)
    }

    pub fn theme(&self, id: &ThemeId) -> Option<&Theme> {
        self.themes.iter().find(|theme| &theme.id == id)
    }

    pub fn answer(&self, code: &ItemCode) -> Option<&Answer> {
        self.answers.iter().find(|answer| &answer.item_code == code)
    }

    /// Raw values keyed by item code, the shape the consistency checker and
    /// derived-metric calculators consume.
    pub fn responses_by_code(&self) -> BTreeMap<String, Value> {
        self.answers
            .iter()
            .map(|answer| (answer.item_code.0.clone(), answer.value.clone()))
            .collect()
    }
}
