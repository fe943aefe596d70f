use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use assess_ai::assessment::{
    AssessmentId, AssessmentRepository, AssessmentScores, AssessmentSnapshot, AssessmentStatus,
    RepositoryError, ScoredAnswer, ThemeScore,
};
use assess_ai::jobs::{transition_allowed, Job, JobId, JobStatus, JobStore, JobStoreError};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
struct StoredAssessment {
    snapshot: AssessmentSnapshot,
    theme_scores: Vec<ThemeScore>,
}

/// Mutex-backed assessment store for the demo deployment and tests.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Arc<Mutex<HashMap<AssessmentId, StoredAssessment>>>,
}

impl InMemoryAssessmentRepository {
    pub(crate) fn insert_snapshot(&self, snapshot: AssessmentSnapshot) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(
            snapshot.assessment.id.clone(),
            StoredAssessment {
                snapshot,
                theme_scores: Vec::new(),
            },
        );
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn snapshot(&self, id: &AssessmentId) -> Result<Option<AssessmentSnapshot>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).map(|stored| stored.snapshot.clone()))
    }

    fn commit_scores(
        &self,
        id: &AssessmentId,
        answers: &[ScoredAnswer],
        theme_scores: &[ThemeScore],
        overall_score: Option<f64>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;

        for scored in answers {
            if let Some(answer) = stored
                .snapshot
                .answers
                .iter_mut()
                .find(|answer| answer.item_code == scored.item_code)
            {
                answer.score = scored.score;
                answer.feedback = Some(scored.feedback.clone());
            }
        }
        stored.theme_scores = theme_scores.to_vec();
        stored.snapshot.assessment.overall_score = overall_score;
        stored.snapshot.assessment.status = AssessmentStatus::Scored;
        Ok(())
    }

    fn scores(&self, id: &AssessmentId) -> Result<Option<AssessmentScores>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).map(|stored| AssessmentScores {
            assessment_id: id.clone(),
            overall_score: stored.snapshot.assessment.overall_score,
            theme_scores: stored.theme_scores.clone(),
        }))
    }
}

/// Mutex-backed job store enforcing the one-directional lifecycle.
#[derive(Default, Clone)]
pub(crate) struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl InMemoryJobStore {
    fn transition<F>(
        &self,
        id: &JobId,
        to: JobStatus,
        apply: F,
    ) -> Result<(), JobStoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut guard = self.jobs.lock().expect("job mutex poisoned");
        let job = guard.get_mut(id).ok_or(JobStoreError::NotFound(*id))?;
        if !transition_allowed(job.status, to) {
            return Err(JobStoreError::InvalidTransition {
                id: *id,
                from: job.status,
                to,
            });
        }
        job.status = to;
        apply(job);
        Ok(())
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<(), JobStoreError> {
        let mut guard = self.jobs.lock().expect("job mutex poisoned");
        guard.insert(job.id, job);
        Ok(())
    }

    fn fetch(&self, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        let guard = self.jobs.lock().expect("job mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn mark_processing(&self, id: &JobId) -> Result<(), JobStoreError> {
        self.transition(id, JobStatus::Processing, |job| {
            job.started_at = Some(Utc::now());
        })
    }

    fn set_progress(&self, id: &JobId, progress: f32) -> Result<(), JobStoreError> {
        let mut guard = self.jobs.lock().expect("job mutex poisoned");
        let job = guard.get_mut(id).ok_or(JobStoreError::NotFound(*id))?;
        job.progress = progress.clamp(0.0, 1.0);
        Ok(())
    }

    fn complete(&self, id: &JobId, result_data: serde_json::Value) -> Result<(), JobStoreError> {
        self.transition(id, JobStatus::Completed, |job| {
            job.progress = 1.0;
            job.result_data = Some(result_data);
            job.completed_at = Some(Utc::now());
        })
    }

    fn fail(&self, id: &JobId, error_message: &str) -> Result<(), JobStoreError> {
        self.transition(id, JobStatus::Failed, |job| {
            job.error_message = Some(error_message.to_string());
            job.completed_at = Some(Utc::now());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_ai::jobs::JobType;
    use serde_json::json;

    fn queued_job(store: &InMemoryJobStore) -> JobId {
        let job = Job::new(AssessmentId("a-1".to_string()), JobType::Scoring);
        let id = job.id;
        store.insert(job).expect("insert succeeds");
        id
    }

    #[test]
    fn completing_a_queued_job_is_rejected() {
        let store = InMemoryJobStore::default();
        let id = queued_job(&store);

        let result = store.complete(&id, json!({}));
        assert!(matches!(
            result,
            Err(JobStoreError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Completed,
                ..
            })
        ));
    }

    #[test]
    fn normal_lifecycle_lands_result_data() {
        let store = InMemoryJobStore::default();
        let id = queued_job(&store);

        store.mark_processing(&id).expect("starts");
        store.set_progress(&id, 0.5).expect("progress recorded");
        store.complete(&id, json!({"overall_score": 72.5})).expect("completes");

        let job = store.fetch(&id).expect("fetch succeeds").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());
        assert_eq!(job.result_data, Some(json!({"overall_score": 72.5})));
    }

    #[test]
    fn terminal_jobs_reject_further_transitions() {
        let store = InMemoryJobStore::default();
        let id = queued_job(&store);

        store.fail(&id, "worker died").expect("queued jobs may fail");
        assert!(store.mark_processing(&id).is_err());
        assert!(store.complete(&id, json!({})).is_err());

        let job = store.fetch(&id).expect("fetch succeeds").expect("exists");
        assert_eq!(job.error_message.as_deref(), Some("worker died"));
    }
}
