//! JobMonitor - Job 完了までのポーリング
//!
//! # フロー
//! 1. 終端状態（Finished / Error / Canceled）なら終了
//! 2. interval だけ待つ（キャンセル可能）
//! 3. 直前の状態と全体進捗を覚えておく
//! 4. MediaStore から Job を再取得（キャンセル可能）
//! 5. 状態か全体進捗が変わったときだけコールバック
//!
//! 再取得の失敗はそのまま呼び出し元へ返し、ループを終了します（リトライしない）。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::config::MediaContextConfig;
use crate::domain::{Job, JobId, MediaError};
use crate::ports::MediaStore;

/// Called with the refreshed job whenever its state or overall progress changed.
pub type JobChangeHandler = Arc<dyn Fn(&Job) + Send + Sync>;

pub struct JobMonitor {
    store: Arc<dyn MediaStore>,
    default_interval: Duration,
}

impl JobMonitor {
    pub fn new(store: Arc<dyn MediaStore>, config: &MediaContextConfig) -> Self {
        Self {
            store,
            default_interval: config.job_refresh_interval(),
        }
    }

    /// Poll until `job` reaches a terminal state and return its last snapshot.
    ///
    /// `refresh_interval` defaults to the configured job refresh interval.
    pub async fn monitor(
        &self,
        job: Job,
        refresh_interval: Option<Duration>,
        on_change: Option<JobChangeHandler>,
        cancel: &CancellationToken,
    ) -> Result<Job, MediaError> {
        let job_id = submitted_id(&job)?;
        poll_until_terminal(
            self.store.clone(),
            job_id,
            job,
            refresh_interval.unwrap_or(self.default_interval),
            on_change,
            cancel.clone(),
        )
        .await
    }

    /// Validate now, then run the polling loop on its own task.
    pub fn start(
        &self,
        job: Job,
        refresh_interval: Option<Duration>,
        on_change: Option<JobChangeHandler>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<Result<Job, MediaError>>, MediaError> {
        let job_id = submitted_id(&job)?;
        Ok(tokio::spawn(poll_until_terminal(
            self.store.clone(),
            job_id,
            job,
            refresh_interval.unwrap_or(self.default_interval),
            on_change,
            cancel,
        )))
    }
}

fn submitted_id(job: &Job) -> Result<JobId, MediaError> {
    job.id.ok_or_else(|| {
        MediaError::invalid_argument(
            "job",
            "The job does not have a valid Id. Please, make sure to submit it first.",
        )
    })
}

async fn poll_until_terminal(
    store: Arc<dyn MediaStore>,
    job_id: JobId,
    mut job: Job,
    interval: Duration,
    on_change: Option<JobChangeHandler>,
    cancel: CancellationToken,
) -> Result<Job, MediaError> {
    while !job.state.is_terminal() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }

        let previous_state = job.state;
        let previous_progress = job.overall_progress();

        job = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::Cancelled),
            refreshed = store.get_job(job_id) => refreshed?,
        };

        let changed =
            job.state != previous_state || job.overall_progress() != previous_progress;
        debug!(
            %job_id,
            state = ?job.state,
            progress = ?job.overall_progress(),
            changed,
            "job refreshed"
        );
        if changed && let Some(handler) = &on_change {
            handler(&job);
        }
    }

    info!(%job_id, state = ?job.state, "job reached terminal state");
    Ok(job)
}
