//! Async job lifecycle for long-running work (scoring runs, risk
//! predictions). Jobs move one way through their states; a stale job is
//! surfaced as failed at read time instead of being mutated by a reaper.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::assessment::AssessmentId;

/// A Queued or Processing job older than this reads as failed.
const STALE_AFTER_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Scoring,
    Report,
    Risk,
    DocumentExtraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub assessment_id: AssessmentId,
    pub job_type: JobType,
    pub status: JobStatus,
    /// Advisory only; readers must not infer state from it.
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(assessment_id: AssessmentId, job_type: JobType) -> Self {
        Self {
            id: JobId::new(),
            assessment_id,
            job_type,
            status: JobStatus::Queued,
            progress: 0.0,
            result_data: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Status as a reader should see it: a non-terminal job whose worker has
    /// gone silent past the staleness window reads as failed. The stored
    /// record is untouched, so a slow worker that eventually finishes still
    /// lands its real result.
    pub fn effective_status(&self, now: DateTime<Utc>) -> JobStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        let anchor = self.started_at.unwrap_or(self.created_at);
        if now - anchor > Duration::minutes(STALE_AFTER_MINUTES) {
            JobStatus::Failed
        } else {
            self.status
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for jobs. Implementations enforce the one-directional
/// lifecycle: Queued -> Processing -> Completed | Failed, with Queued ->
/// Failed allowed for work that dies before starting.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job) -> Result<(), JobStoreError>;
    fn fetch(&self, id: &JobId) -> Result<Option<Job>, JobStoreError>;
    fn mark_processing(&self, id: &JobId) -> Result<(), JobStoreError>;
    fn set_progress(&self, id: &JobId, progress: f32) -> Result<(), JobStoreError>;
    fn complete(&self, id: &JobId, result_data: Value) -> Result<(), JobStoreError>;
    fn fail(&self, id: &JobId, error_message: &str) -> Result<(), JobStoreError>;
}

/// Whether a status change respects the lifecycle. Shared by store
/// implementations so they all reject the same transitions.
pub fn transition_allowed(from: JobStatus, to: JobStatus) -> bool {
    matches!(
        (from, to),
        (JobStatus::Queued, JobStatus::Processing)
            | (JobStatus::Queued, JobStatus::Failed)
            | (JobStatus::Processing, JobStatus::Completed)
            | (JobStatus::Processing, JobStatus::Failed)
    )
}
