use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::{aggregate, score_answer, Dispatch};
use crate::assessment::{
    AssessmentId, AssessmentRepository, RepositoryError, ScoredAnswer, ThemeScore,
};
use crate::evaluator::TextEvaluator;

/// Coordinates one scoring run: dispatches every answer to its type-scorer,
/// then recomputes theme scores and the overall score, committing everything
/// as one batch.
pub struct ScoringService<R> {
    repository: Arc<R>,
    evaluator: Arc<TextEvaluator>,
    model: String,
}

impl<R> Clone for ScoringService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            evaluator: self.evaluator.clone(),
            model: self.model.clone(),
        }
    }
}

/// Summary returned to the caller that triggered the run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRunSummary {
    pub assessment_id: AssessmentId,
    pub overall_score: Option<f64>,
    pub items_scored: usize,
    pub items_skipped: usize,
    pub theme_scores: Vec<ThemeScore>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl<R> ScoringService<R>
where
    R: AssessmentRepository,
{
    pub fn new(repository: Arc<R>, evaluator: Arc<TextEvaluator>, model: impl Into<String>) -> Self {
        Self {
            repository,
            evaluator,
            model: model.into(),
        }
    }

    /// Score every answer of an assessment and aggregate the results.
    ///
    /// Individual scorer degradation (malformed value, evaluator failure)
    /// never aborts the run; those answers keep a null score with diagnostic
    /// feedback and the rest of the assessment still scores.
    pub async fn score_assessment(
        &self,
        id: &AssessmentId,
    ) -> Result<ScoringRunSummary, ScoringError> {
        let snapshot = self
            .repository
            .snapshot(id)?
            .ok_or_else(|| ScoringError::AssessmentNotFound(id.clone()))?;

        let mut items_scored = 0;
        let mut items_skipped = 0;
        let mut results: Vec<ScoredAnswer> = Vec::with_capacity(snapshot.answers.len());

        for answer in &snapshot.answers {
            let Some(item) = snapshot.item(&answer.item_code) else {
                debug!(item_code = %answer.item_code, "answer references unknown item, ignoring");
                continue;
            };

            let theme_name = snapshot
                .theme(&item.theme_id)
                .map(|theme| theme.name.as_str())
                .unwrap_or("");

            match score_answer(item, &answer.value, theme_name, &self.evaluator, &self.model).await
            {
                Dispatch::Skipped => items_skipped += 1,
                Dispatch::Scored(outcome) => {
                    if outcome.score.is_some() {
                        items_scored += 1;
                    }
                    results.push(ScoredAnswer {
                        item_code: answer.item_code.clone(),
                        score: outcome.score,
                        feedback: outcome.feedback,
                    });
                }
            }
        }

        let (theme_scores, overall_score) = aggregate::aggregate_theme_scores(&snapshot, &results);

        self.repository
            .commit_scores(id, &results, &theme_scores, overall_score)?;

        info!(
            assessment_id = %id,
            items_scored,
            items_skipped,
            overall_score = ?overall_score,
            "scoring run committed"
        );

        Ok(ScoringRunSummary {
            assessment_id: id.clone(),
            overall_score,
            items_scored,
            items_skipped,
            theme_scores,
        })
    }
}
