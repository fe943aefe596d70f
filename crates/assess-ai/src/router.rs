use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::assessment::{AssessmentId, AssessmentRepository};
use crate::jobs::{Job, JobId, JobStatus, JobStore, JobType};
use crate::risk::RiskMetrics;
use crate::service::{AssessmentService, WorkflowError};

/// Router builder exposing the scoring, job, consistency, and risk endpoints.
pub fn platform_router<R, S>(service: Arc<AssessmentService<R, S>>) -> Router
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments/:assessment_id/scores/trigger",
            post(trigger_scoring_handler::<R, S>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/scores",
            get(scores_handler::<R, S>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/risk/trigger",
            post(trigger_risk_handler::<R, S>),
        )
        .route("/api/v1/jobs/:job_id", get(job_handler::<R, S>))
        .route(
            "/api/v1/consistency/check",
            post(consistency_handler::<R, S>),
        )
        .route("/api/v1/risk/predict", post(risk_predict_handler::<R, S>))
        .with_state(service)
}

/// Job representation handed to clients: the stored record with read-time
/// staleness applied to the status.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub assessment_id: AssessmentId,
    pub job_type: JobType,
    pub status: JobStatus,
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

impl JobView {
    fn from_job(job: Job, now: DateTime<Utc>) -> Self {
        let status = job.effective_status(now);
        let error_message = if status == JobStatus::Failed && job.error_message.is_none() {
            Some("job went stale without reporting a result".to_string())
        } else {
            job.error_message
        };
        Self {
            id: job.id,
            assessment_id: job.assessment_id,
            job_type: job.job_type,
            status,
            progress: job.progress,
            result_data: job.result_data,
            error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsistencyCheckRequest {
    pub(crate) responses_by_code: BTreeMap<String, Value>,
    #[serde(default)]
    pub(crate) use_ai: bool,
}

fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::NotScorable { .. } => StatusCode::BAD_REQUEST,
        WorkflowError::AssessmentNotFound(_) | WorkflowError::JobNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::Repository(_) | WorkflowError::JobStore(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn trigger_scoring_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match service.trigger_scoring(&id) {
        Ok(job) => {
            let view = JobView::from_job(job, Utc::now());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn trigger_risk_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match service.trigger_risk(&id) {
        Ok(job) => {
            let view = JobView::from_job(job, Utc::now());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn scores_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match service.scores(&id) {
        Ok(scores) => (StatusCode::OK, axum::Json(scores)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn job_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let Ok(uuid) = Uuid::parse_str(&job_id) else {
        let payload = json!({ "error": format!("invalid job id: {job_id}") });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };
    match service.job(&JobId(uuid)) {
        Ok(job) => {
            let view = JobView::from_job(job, Utc::now());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn consistency_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    axum::Json(request): axum::Json<ConsistencyCheckRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let report = service
        .check_consistency(&request.responses_by_code, request.use_ai)
        .await;
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn risk_predict_handler<R, S>(
    State(service): State<Arc<AssessmentService<R, S>>>,
    axum::Json(metrics): axum::Json<RiskMetrics>,
) -> Response
where
    R: AssessmentRepository + 'static,
    S: JobStore + 'static,
{
    let prediction = service.predict_risk(&metrics);
    (StatusCode::OK, axum::Json(prediction)).into_response()
}
