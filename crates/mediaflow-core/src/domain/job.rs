//! Job / Task records and the job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::AssetCreationOptions;
use super::ids::{AssetId, JobId, MediaProcessorId, TaskId};

/// Remote job state.
///
/// State transitions (driven by the remote scheduler):
/// - Queued -> Scheduled -> Processing -> Finished
/// - any non-terminal -> Error
/// - any non-terminal -> Canceling -> Canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Scheduled,
    Processing,
    Finished,
    Error,
    Canceled,
    Canceling,
}

impl JobState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Error | JobState::Canceled)
    }
}

/// Output asset to be created by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAssetSpec {
    pub name: String,
    pub storage_account_name: String,
    pub options: AssetCreationOptions,
}

/// One step of a Job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<TaskId>,
    pub name: String,
    pub media_processor_id: MediaProcessorId,
    pub configuration: String,

    /// Percentage in `[0, 100]`.
    pub progress: f64,

    pub input_assets: Vec<AssetId>,
    pub output_assets: Vec<OutputAssetSpec>,
}

/// A unit of remote work.
///
/// `id` is `None` until the job has been submitted; monitoring requires it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Option<JobId>,
    pub name: String,
    pub state: JobState,
    pub tasks: Vec<Task>,
    pub input_assets: Vec<AssetId>,

    /// Filled in by the remote store once output assets exist.
    pub output_assets: Vec<AssetId>,

    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl Job {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            name: name.into(),
            state: JobState::Queued,
            tasks: Vec::new(),
            input_assets: Vec::new(),
            output_assets: Vec::new(),
            created_at: now,
            last_modified_at: now,
        }
    }

    pub fn add_task(&mut self, task: Task) {
        for asset in &task.input_assets {
            if !self.input_assets.contains(asset) {
                self.input_assets.push(*asset);
            }
        }
        self.tasks.push(task);
    }

    /// Mean of all task progress values; `None` for a job without tasks.
    pub fn overall_progress(&self) -> Option<f64> {
        if self.tasks.is_empty() {
            return None;
        }
        let sum: f64 = self.tasks.iter().map(|t| t.progress).sum();
        Some(sum / self.tasks.len() as f64)
    }

    pub fn is_submitted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use ulid::Ulid;

    fn task(progress: f64) -> Task {
        Task {
            id: None,
            name: "Task for sample".to_string(),
            media_processor_id: MediaProcessorId::from_ulid(Ulid::new()),
            configuration: String::new(),
            progress,
            input_assets: vec![],
            output_assets: vec![],
        }
    }

    fn job_with(progress: &[f64]) -> Job {
        let mut job = Job::new("Job for sample", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        for p in progress {
            job.add_task(task(*p));
        }
        job
    }

    #[test]
    fn overall_progress_is_mean_of_tasks() {
        assert_eq!(job_with(&[25.0, 50.0]).overall_progress(), Some(37.5));
        assert_eq!(job_with(&[10.0]).overall_progress(), Some(10.0));
        assert_eq!(job_with(&[0.0, 100.0, 50.0]).overall_progress(), Some(50.0));
    }

    #[test]
    fn overall_progress_without_tasks_is_none() {
        assert_eq!(job_with(&[]).overall_progress(), None);
    }

    #[rstest]
    #[case::queued(JobState::Queued, false)]
    #[case::scheduled(JobState::Scheduled, false)]
    #[case::processing(JobState::Processing, false)]
    #[case::canceling(JobState::Canceling, false)]
    #[case::finished(JobState::Finished, true)]
    #[case::error(JobState::Error, true)]
    #[case::canceled(JobState::Canceled, true)]
    fn terminal_states(#[case] state: JobState, #[case] terminal: bool) {
        assert_eq!(state.is_terminal(), terminal);
    }

    #[test]
    fn new_job_is_not_submitted() {
        let job = job_with(&[0.0]);
        assert!(!job.is_submitted());
        assert_eq!(job.state, JobState::Queued);
    }
}
