use serde::{Deserialize, Serialize};

use super::domain::{AssessmentId, AssessmentSnapshot, ItemCode, ThemeScore};

/// Freshly computed score and feedback for one answer, committed as a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub item_code: ItemCode,
    pub score: Option<f64>,
    pub feedback: String,
}

/// Score view for an assessment: the overall sum plus per-theme aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentScores {
    pub assessment_id: AssessmentId,
    pub overall_score: Option<f64>,
    pub theme_scores: Vec<ThemeScore>,
}

/// Storage abstraction so the scoring service can be exercised in isolation.
///
/// `commit_scores` is the single batch write at the end of a run: answer
/// scores, wholesale-replaced theme scores, and the overall score land
/// together, so partial results are never visible to other readers mid-run.
pub trait AssessmentRepository: Send + Sync {
    fn snapshot(&self, id: &AssessmentId) -> Result<Option<AssessmentSnapshot>, RepositoryError>;

    fn commit_scores(
        &self,
        id: &AssessmentId,
        answers: &[ScoredAnswer],
        theme_scores: &[ThemeScore],
        overall_score: Option<f64>,
    ) -> Result<(), RepositoryError>;

    fn scores(&self, id: &AssessmentId) -> Result<Option<AssessmentScores>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
