//! Job preparation helpers.

use std::sync::Arc;

use tracing::debug;

use crate::app::config::MediaContextConfig;
use crate::domain::media_processor::latest_by_name;
use crate::domain::{
    Asset, AssetCreationOptions, Job, MediaError, MediaProcessor, OutputAssetSpec, Task,
};
use crate::ports::{Clock, MediaStore};

pub struct JobPreparer {
    store: Arc<dyn MediaStore>,
    clock: Arc<dyn Clock>,
    config: MediaContextConfig,
}

impl JobPreparer {
    pub fn new(store: Arc<dyn MediaStore>, clock: Arc<dyn Clock>, config: MediaContextConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Highest-versioned media processor called `name`, if any.
    pub async fn latest_media_processor_by_name(
        &self,
        name: &str,
    ) -> Result<Option<MediaProcessor>, MediaError> {
        let processors = self.store.list_media_processors().await?;
        Ok(latest_by_name(&processors, name).cloned())
    }

    /// Build an unsubmitted job running one task of the latest `processor_name`
    /// over `input_asset`, producing a single output asset.
    ///
    /// A blank `output_storage_account_name` falls back to the configured default.
    pub async fn prepare_job_with_single_task(
        &self,
        processor_name: &str,
        configuration: &str,
        input_asset: &Asset,
        output_asset_name: &str,
        output_storage_account_name: Option<&str>,
        output_options: AssetCreationOptions,
    ) -> Result<Job, MediaError> {
        let processor = self
            .latest_media_processor_by_name(processor_name)
            .await?
            .ok_or_else(|| MediaError::UnknownMediaProcessor(processor_name.to_string()))?;

        let mut job = Job::new(format!("Job for {}", input_asset.name), self.clock.now());
        job.add_task(Task {
            id: None,
            name: format!("Task for {}", input_asset.name),
            media_processor_id: processor.id,
            configuration: configuration.to_string(),
            progress: 0.0,
            input_assets: vec![input_asset.id],
            output_assets: vec![OutputAssetSpec {
                name: output_asset_name.to_string(),
                storage_account_name: self
                    .config
                    .storage_account_or_default(output_storage_account_name),
                options: output_options,
            }],
        });

        debug!(
            job_name = %job.name,
            processor = %processor.name,
            version = %processor.version,
            "job prepared"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media_processor::names;
    use crate::domain::{ErrorKind, JobState};
    use crate::impls::InMemoryMediaStore;
    use crate::ports::SystemClock;

    fn setup(store: InMemoryMediaStore) -> (Arc<InMemoryMediaStore>, JobPreparer) {
        let store = Arc::new(store);
        let preparer = JobPreparer::new(
            store.clone(),
            Arc::new(SystemClock),
            MediaContextConfig::default(),
        );
        (store, preparer)
    }

    #[tokio::test]
    async fn picks_highest_numeric_version() {
        let (_, preparer) = setup(
            InMemoryMediaStore::new("mediastorage")
                .with_media_processor(names::MEDIA_ENCODER, "4.9")
                .with_media_processor(names::MEDIA_ENCODER, "4.10")
                .with_media_processor(names::MEDIA_PACKAGER, "9.0"),
        );

        let latest = preparer
            .latest_media_processor_by_name(names::MEDIA_ENCODER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.version, "4.10");
        assert!(preparer
            .latest_media_processor_by_name("Nope")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn prepares_named_single_task_job() {
        let (store, preparer) = setup(
            InMemoryMediaStore::new("mediastorage").with_media_processor(names::MEDIA_ENCODER, "4.7"),
        );
        let input = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();

        let job = preparer
            .prepare_job_with_single_task(
                names::MEDIA_ENCODER,
                "H264 Smooth Streaming 720p",
                &input,
                "movie - encoded",
                Some(" "),
                AssetCreationOptions::None,
            )
            .await
            .unwrap();

        assert_eq!(job.name, "Job for movie");
        assert_eq!(job.state, JobState::Queued);
        assert!(!job.is_submitted());
        assert_eq!(job.input_assets, vec![input.id]);
        let task = &job.tasks[0];
        assert_eq!(task.name, "Task for movie");
        assert_eq!(task.configuration, "H264 Smooth Streaming 720p");
        assert_eq!(task.output_assets[0].storage_account_name, "mediastorage");

        let submitted = store.submit_job(job).await.unwrap();
        assert!(submitted.is_submitted());
        assert_eq!(submitted.output_assets.len(), 1);
        let output = store.get_asset(submitted.output_assets[0]).await.unwrap();
        assert_eq!(output.name, "movie - encoded");
    }

    #[tokio::test]
    async fn unknown_processor_is_reported_by_name() {
        let (store, preparer) = setup(InMemoryMediaStore::new("mediastorage"));
        let input = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();

        let err = preparer
            .prepare_job_with_single_task(
                names::STORAGE_DECRYPTION,
                "",
                &input,
                "out",
                None,
                AssetCreationOptions::None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.to_string(), "Unknown media processor: 'Storage Decryption'");
    }
}
