//! Workflow layer tying assessments, jobs, and the analysis engines
//! together. Triggers validate synchronously, enqueue a job, and hand the
//! heavy work to a background task that reports through the job store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::assessment::{
    AssessmentId, AssessmentRepository, AssessmentScores, RepositoryError,
};
use crate::consistency::{ConsistencyChecker, ConsistencyReport};
use crate::evaluator::TextEvaluator;
use crate::jobs::{Job, JobId, JobStore, JobStoreError, JobType};
use crate::risk::{self, RiskMetrics, RiskPrediction};
use crate::scoring::{ScoringError, ScoringService};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error("assessment {id} is {status} and cannot be scored")]
    NotScorable { id: AssessmentId, status: &'static str },
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
}

/// Facade the HTTP layer and CLI talk to.
pub struct AssessmentService<R, S> {
    repository: Arc<R>,
    jobs: Arc<S>,
    evaluator: Arc<TextEvaluator>,
    model: String,
}

impl<R, S> AssessmentService<R, S>
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    pub fn new(
        repository: Arc<R>,
        jobs: Arc<S>,
        evaluator: Arc<TextEvaluator>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            jobs,
            evaluator,
            model: model.into(),
        }
    }

    /// Validate, enqueue, and launch a scoring run. Returns the queued job
    /// immediately; progress and results flow through the job store.
    pub fn trigger_scoring(&self, id: &AssessmentId) -> Result<Job, WorkflowError> {
        let snapshot = self
            .repository
            .snapshot(id)?
            .ok_or_else(|| WorkflowError::AssessmentNotFound(id.clone()))?;

        if !snapshot.assessment.status.is_scorable() {
            return Err(WorkflowError::NotScorable {
                id: id.clone(),
                status: snapshot.assessment.status.label(),
            });
        }

        let job = Job::new(id.clone(), JobType::Scoring);
        self.jobs.insert(job.clone())?;
        info!(job_id = %job.id, assessment_id = %id, "scoring job queued");

        let scoring =
            ScoringService::new(self.repository.clone(), self.evaluator.clone(), &self.model);
        let jobs = self.jobs.clone();
        let job_id = job.id;
        let assessment_id = id.clone();
        tokio::spawn(async move {
            run_scoring_job(jobs, job_id, assessment_id, scoring).await;
        });

        Ok(job)
    }

    /// Enqueue and launch a risk prediction over the assessment's current
    /// answers and theme scores.
    pub fn trigger_risk(&self, id: &AssessmentId) -> Result<Job, WorkflowError> {
        if self.repository.snapshot(id)?.is_none() {
            return Err(WorkflowError::AssessmentNotFound(id.clone()));
        }

        let job = Job::new(id.clone(), JobType::Risk);
        self.jobs.insert(job.clone())?;
        info!(job_id = %job.id, assessment_id = %id, "risk prediction job queued");

        let repository = self.repository.clone();
        let jobs = self.jobs.clone();
        let job_id = job.id;
        let assessment_id = id.clone();
        tokio::spawn(async move {
            run_risk_job(jobs, job_id, assessment_id, repository).await;
        });

        Ok(job)
    }

    pub fn job(&self, id: &JobId) -> Result<Job, WorkflowError> {
        self.jobs
            .fetch(id)?
            .ok_or(WorkflowError::JobNotFound(*id))
    }

    pub fn scores(&self, id: &AssessmentId) -> Result<AssessmentScores, WorkflowError> {
        self.repository
            .scores(id)?
            .ok_or_else(|| WorkflowError::AssessmentNotFound(id.clone()))
    }

    pub async fn check_consistency(
        &self,
        responses: &BTreeMap<String, Value>,
        use_ai: bool,
    ) -> ConsistencyReport {
        ConsistencyChecker::new(self.evaluator.clone(), &self.model)
            .check(responses, use_ai)
            .await
    }

    pub fn predict_risk(&self, metrics: &RiskMetrics) -> RiskPrediction {
        risk::predict(metrics)
    }
}

async fn run_scoring_job<R, S>(
    jobs: Arc<S>,
    job_id: JobId,
    assessment_id: AssessmentId,
    scoring: ScoringService<R>,
) where
    R: AssessmentRepository,
    S: JobStore,
{
    if let Err(err) = jobs.mark_processing(&job_id) {
        error!(job_id = %job_id, error = %err, "could not start scoring job");
        return;
    }
    let _ = jobs.set_progress(&job_id, 0.1);

    match scoring.score_assessment(&assessment_id).await {
        Ok(summary) => {
            let result = serde_json::to_value(&summary).unwrap_or(Value::Null);
            finish(&*jobs, &job_id, Ok(result));
        }
        Err(ScoringError::AssessmentNotFound(id)) => {
            finish(&*jobs, &job_id, Err(format!("assessment {id} not found")));
        }
        Err(ScoringError::Repository(err)) => {
            finish(&*jobs, &job_id, Err(format!("scoring run failed: {err}")));
        }
    }
}

async fn run_risk_job<R, S>(
    jobs: Arc<S>,
    job_id: JobId,
    assessment_id: AssessmentId,
    repository: Arc<R>,
) where
    R: AssessmentRepository,
    S: JobStore,
{
    if let Err(err) = jobs.mark_processing(&job_id) {
        error!(job_id = %job_id, error = %err, "could not start risk job");
        return;
    }

    let snapshot = match repository.snapshot(&assessment_id) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            finish(
                &*jobs,
                &job_id,
                Err(format!("assessment {assessment_id} not found")),
            );
            return;
        }
        Err(err) => {
            finish(&*jobs, &job_id, Err(format!("risk job failed: {err}")));
            return;
        }
    };

    let theme_scores = match repository.scores(&assessment_id) {
        Ok(Some(scores)) => scores.theme_scores,
        Ok(None) | Err(_) => Vec::new(),
    };

    let metrics = risk::metrics_from_snapshot(&snapshot, &theme_scores);
    let prediction = risk::predict(&metrics);
    let result = serde_json::to_value(&prediction).unwrap_or(Value::Null);
    finish(&*jobs, &job_id, Ok(result));
}

/// Land a terminal state, logging if the store rejects it.
fn finish<S: JobStore + ?Sized>(jobs: &S, job_id: &JobId, outcome: Result<Value, String>) {
    let result = match outcome {
        Ok(result_data) => jobs.complete(job_id, result_data),
        Err(message) => {
            error!(job_id = %job_id, error = %message, "job failed");
            jobs.fail(job_id, &message)
        }
    };
    if let Err(err) = result {
        error!(job_id = %job_id, error = %err, "could not record job outcome");
    }
}
