//! InMemoryMediaStore - 開発用・テスト用のメディアサービス
//!
//! # 学習ポイント
//! - 1 つの構造体で 2 つの port（MediaStore, BlobTransfer）を実装
//! - `std::sync::Mutex` は await を跨がない短いクリティカルセクションだけで使う
//! - Job のリフレッシュ結果をスクリプトで差し込める（monitor のテスト用）

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::app::error_parser::DATA_SERVICES_METADATA_NAMESPACE;
use crate::domain::{
    AccessPermissions, AccessPolicy, AccessPolicyId, Asset, AssetCreationOptions, AssetFile,
    AssetId, Job, JobId, JobState, Locator, LocatorId, LocatorType, MediaError, MediaProcessor,
    TransferDirection, TransferProgress, is_manifest_name,
};
use crate::ports::{
    BlobTransfer, Clock, IdGenerator, MediaStore, ProgressRelay, SystemClock, TransferSettings,
    UlidGenerator,
};

/// Size of one transferred block (and of one progress notification step).
const BLOCK_SIZE: usize = 64 * 1024;

/// One scripted answer to a `get_job` call.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRefresh {
    /// Apply this state and per-task progress (in task order).
    Snapshot { state: JobState, progress: Vec<f64> },
    /// Fail the refresh with a remote service error.
    Fail(String),
}

impl JobRefresh {
    pub fn snapshot(state: JobState, progress: &[f64]) -> Self {
        Self::Snapshot {
            state,
            progress: progress.to_vec(),
        }
    }
}

struct AssetEntry {
    asset: Asset,
    blobs: HashMap<String, Vec<u8>>,
}

struct JobEntry {
    job: Job,
    script: VecDeque<JobRefresh>,
    refreshes: usize,
}

#[derive(Default)]
struct StoreState {
    assets: HashMap<AssetId, AssetEntry>,
    policies: HashMap<AccessPolicyId, AccessPolicy>,
    locators: HashMap<LocatorId, Locator>,
    created_locators: Vec<LocatorId>,
    deleted_locators: Vec<LocatorId>,
    processors: Vec<MediaProcessor>,
    jobs: HashMap<JobId, JobEntry>,
    failing_blobs: HashSet<String>,
    transfer_settings: Vec<TransferSettings>,
}

/// InMemoryMediaStore は開発用のメディアサービス
///
/// # 実装詳細
/// - Asset ごとに blob コンテナ（`HashMap<String, Vec<u8>>`）を持つ
/// - blob の読み書きは生存中の Locator の権限と有効期限で検証する
/// - 失敗はリモートサービスと同じ XML エラー文書で返す
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryMediaStore::new("mediastorage"));
/// let grants = AccessGrantManager::new(store.clone(), clock);
/// ```
pub struct InMemoryMediaStore {
    account_name: String,
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    remote_calls: AtomicUsize,
    simulated_step: Option<f64>,
}

impl InMemoryMediaStore {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self::with_clock(account_name, Arc::new(SystemClock))
    }

    pub fn with_clock(account_name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            account_name: account_name.into(),
            state: Mutex::new(StoreState::default()),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            clock,
            remote_calls: AtomicUsize::new(0),
            simulated_step: None,
        }
    }

    /// Unscripted jobs advance on every refresh, adding `step` percent to each task.
    pub fn with_simulated_processing(mut self, step: f64) -> Self {
        self.simulated_step = Some(step);
        self
    }

    pub fn with_media_processor(self, name: &str, version: &str) -> Self {
        let processor = MediaProcessor {
            id: self.ids.generate(),
            name: name.to_string(),
            vendor: "Microsoft".to_string(),
            version: version.to_string(),
        };
        self.lock().processors.push(processor);
        self
    }

    /// Number of store and blob calls served so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn created_locators(&self) -> Vec<LocatorId> {
        self.lock().created_locators.clone()
    }

    pub fn deleted_locators(&self) -> Vec<LocatorId> {
        self.lock().deleted_locators.clone()
    }

    pub fn live_locators(&self) -> Vec<Locator> {
        self.lock().locators.values().cloned().collect()
    }

    pub fn policy(&self, id: AccessPolicyId) -> Option<AccessPolicy> {
        self.lock().policies.get(&id).cloned()
    }

    /// Settings passed by every blob transfer call, in call order.
    pub fn recorded_transfer_settings(&self) -> Vec<TransferSettings> {
        self.lock().transfer_settings.clone()
    }

    pub fn blob(&self, asset_id: AssetId, name: &str) -> Option<Vec<u8>> {
        self.lock()
            .assets
            .get(&asset_id)
            .and_then(|entry| entry.blobs.get(name).cloned())
    }

    /// AssetFile record as last written by the caller, sizes not recomputed.
    pub fn stored_file(&self, asset_id: AssetId, name: &str) -> Option<AssetFile> {
        self.lock()
            .assets
            .get(&asset_id)
            .and_then(|entry| entry.asset.files.iter().find(|f| f.name == name).cloned())
    }

    /// Write straight into storage, bypassing AssetFile records.
    pub fn put_blob(&self, asset_id: AssetId, name: &str, bytes: Vec<u8>) -> Result<(), MediaError> {
        let mut state = self.lock();
        let entry = state
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;
        entry.blobs.insert(name.to_string(), bytes);
        Ok(())
    }

    /// Every transfer of a blob with this name fails.
    pub fn fail_blob(&self, name: &str) {
        self.lock().failing_blobs.insert(name.to_string());
    }

    pub fn script_job_refreshes(
        &self,
        job_id: JobId,
        steps: impl IntoIterator<Item = JobRefresh>,
    ) -> Result<(), MediaError> {
        let mut state = self.lock();
        let entry = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| MediaError::NotFound(format!("job {job_id}")))?;
        entry.script.extend(steps);
        Ok(())
    }

    pub fn job_refreshes(&self, job_id: JobId) -> usize {
        self.lock()
            .jobs
            .get(&job_id)
            .map(|entry| entry.refreshes)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn new_asset(&self, name: &str, storage_account_name: &str, options: AssetCreationOptions) -> Asset {
        Asset {
            id: self.ids.generate(),
            name: name.to_string(),
            storage_account_name: storage_account_name.to_string(),
            options,
            files: Vec::new(),
            locators: Vec::new(),
            created_at: self.now(),
        }
    }

    fn locator_path(&self, locator_type: LocatorType, asset: &Asset, locator_id: LocatorId) -> String {
        match locator_type {
            LocatorType::Sas => format!(
                "https://{}.blob.mediaflow.local/{}?sv=2012-02-12&sig={}",
                asset.storage_account_name,
                asset.id.as_ulid(),
                locator_id.as_ulid()
            ),
            LocatorType::OnDemandOrigin => format!(
                "https://{}.origin.mediaflow.local/{}/",
                self.account_name,
                locator_id.as_ulid()
            ),
        }
    }

    /// Check the locator is live, in its window and grants `required`.
    fn authorize(
        &self,
        locator: &Locator,
        required: AccessPermissions,
        blob_name: &str,
        settings: &TransferSettings,
    ) -> Result<AssetId, MediaError> {
        let now = self.now();
        let mut state = self.lock();
        state.transfer_settings.push(*settings);

        // the stored locator decides which container is reachable
        let Some(asset_id) = state
            .locators
            .get(&locator.id)
            .filter(|l| l.permits(required, now))
            .map(|l| l.asset_id)
        else {
            return Err(service_error(
                "AuthenticationFailed",
                &format!("Locator {} does not grant {required:?} access", locator.id),
            ));
        };
        if !state.assets.contains_key(&asset_id) {
            return Err(service_error(
                "ContainerNotFound",
                &format!("The container for asset {asset_id} does not exist"),
            ));
        }
        if state.failing_blobs.contains(blob_name) {
            return Err(service_error(
                "InternalError",
                &format!("Transfer of blob '{blob_name}' failed"),
            ));
        }
        Ok(asset_id)
    }

    fn assemble_asset(&self, state: &StoreState, asset_id: AssetId) -> Option<Asset> {
        let entry = state.assets.get(&asset_id)?;
        let mut asset = entry.asset.clone();
        for file in &mut asset.files {
            file.content_size = entry.blobs.get(&file.name).map_or(0, |b| b.len() as u64);
        }
        asset.locators = state
            .locators
            .values()
            .filter(|l| l.asset_id == asset_id)
            .cloned()
            .collect();
        Some(asset)
    }

    fn advance_simulation(&self, state: &mut StoreState, job_id: JobId, step: f64) {
        let now = self.now();
        let Some(entry) = state.jobs.get_mut(&job_id) else {
            return;
        };
        let job = &mut entry.job;
        match job.state {
            JobState::Queued => job.state = JobState::Scheduled,
            JobState::Scheduled => job.state = JobState::Processing,
            JobState::Processing => {
                for task in &mut job.tasks {
                    task.progress = (task.progress + step).min(100.0);
                }
                if job.tasks.iter().all(|t| t.progress >= 100.0) {
                    job.state = JobState::Finished;
                }
            }
            JobState::Canceling => job.state = JobState::Canceled,
            JobState::Finished | JobState::Error | JobState::Canceled => return,
        }
        job.last_modified_at = now;

        if job.state == JobState::Finished {
            let inputs = job.input_assets.clone();
            let outputs = job.output_assets.clone();
            self.materialize_outputs(state, &inputs, &outputs);
        }
    }

    /// Copy every input blob into every output asset.
    fn materialize_outputs(&self, state: &mut StoreState, inputs: &[AssetId], outputs: &[AssetId]) {
        let blobs: Vec<(String, Vec<u8>)> = inputs
            .iter()
            .filter_map(|id| state.assets.get(id))
            .flat_map(|entry| entry.blobs.iter().map(|(n, b)| (n.clone(), b.clone())))
            .collect();

        for output in outputs {
            let Some(entry) = state.assets.get_mut(output) else {
                continue;
            };
            for (name, bytes) in &blobs {
                entry.blobs.insert(name.clone(), bytes.clone());
                entry.asset.files.push(AssetFile {
                    id: self.ids.generate(),
                    asset_id: *output,
                    name: name.clone(),
                    content_size: bytes.len() as u64,
                    is_primary: is_manifest_name(name),
                });
            }
        }
    }
}

/// Remote failures are reported as the service's XML error document.
fn service_error(code: &str, message: &str) -> MediaError {
    MediaError::transport(format!(
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?><error xmlns="{DATA_SERVICES_METADATA_NAMESPACE}"><code>{code}</code><message xml:lang="en-US">{message}</message></error>"#
    ))
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn create_asset(
        &self,
        name: &str,
        storage_account_name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, MediaError> {
        self.count_call();
        let asset = self.new_asset(name, storage_account_name, options);
        self.lock().assets.insert(
            asset.id,
            AssetEntry {
                asset: asset.clone(),
                blobs: HashMap::new(),
            },
        );
        Ok(asset)
    }

    async fn get_asset(&self, asset_id: AssetId) -> Result<Asset, MediaError> {
        self.count_call();
        let state = self.lock();
        self.assemble_asset(&state, asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))
    }

    async fn delete_asset(&self, asset_id: AssetId) -> Result<(), MediaError> {
        self.count_call();
        let mut state = self.lock();
        state
            .assets
            .remove(&asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;
        state.locators.retain(|_, l| l.asset_id != asset_id);
        Ok(())
    }

    async fn create_asset_file(
        &self,
        asset_id: AssetId,
        name: &str,
    ) -> Result<AssetFile, MediaError> {
        self.count_call();
        let file = AssetFile {
            id: self.ids.generate(),
            asset_id,
            name: name.to_string(),
            content_size: 0,
            is_primary: false,
        };
        let mut state = self.lock();
        let entry = state
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;
        entry.asset.files.push(file.clone());
        Ok(file)
    }

    async fn update_asset_file(&self, file: &AssetFile) -> Result<(), MediaError> {
        self.count_call();
        let mut state = self.lock();
        let stored = state
            .assets
            .get_mut(&file.asset_id)
            .and_then(|entry| entry.asset.files.iter_mut().find(|f| f.id == file.id))
            .ok_or_else(|| MediaError::NotFound(format!("asset file {}", file.id)))?;
        *stored = file.clone();
        Ok(())
    }

    async fn list_asset_files(&self, asset_id: AssetId) -> Result<Vec<AssetFile>, MediaError> {
        self.count_call();
        let state = self.lock();
        self.assemble_asset(&state, asset_id)
            .map(|asset| asset.files)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))
    }

    async fn create_file_infos(&self, asset_id: AssetId) -> Result<(), MediaError> {
        self.count_call();
        let mut state = self.lock();
        let entry = state
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;

        let mut names: Vec<String> = entry.blobs.keys().cloned().collect();
        names.sort();
        for name in names {
            if entry.asset.files.iter().any(|f| f.name == name) {
                continue;
            }
            let content_size = entry.blobs.get(&name).map_or(0, |b| b.len() as u64);
            entry.asset.files.push(AssetFile {
                id: self.ids.generate(),
                asset_id,
                name,
                content_size,
                is_primary: false,
            });
        }
        Ok(())
    }

    async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, MediaError> {
        self.count_call();
        let policy = AccessPolicy {
            id: self.ids.generate(),
            name: name.to_string(),
            permissions,
            duration,
        };
        self.lock().policies.insert(policy.id, policy.clone());
        Ok(policy)
    }

    async fn create_locator(
        &self,
        locator_type: LocatorType,
        asset_id: AssetId,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, MediaError> {
        self.count_call();
        let duration = chrono::Duration::from_std(policy.duration)
            .map_err(|_| MediaError::invalid_argument("duration", "access duration is out of range"))?;

        let mut state = self.lock();
        if !state.policies.contains_key(&policy.id) {
            return Err(MediaError::NotFound(format!("access policy {}", policy.id)));
        }
        let asset = state
            .assets
            .get(&asset_id)
            .map(|entry| entry.asset.clone())
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;

        let id: LocatorId = self.ids.generate();
        let begins = start_time.unwrap_or_else(|| self.now());
        let locator = Locator {
            id,
            locator_type,
            asset_id,
            access_policy_id: policy.id,
            permissions: policy.permissions,
            path: self.locator_path(locator_type, &asset, id),
            start_time,
            expiration_time: begins + duration,
        };
        state.locators.insert(id, locator.clone());
        state.created_locators.push(id);
        Ok(locator)
    }

    async fn delete_locator(&self, locator_id: LocatorId) -> Result<(), MediaError> {
        self.count_call();
        let mut state = self.lock();
        state
            .locators
            .remove(&locator_id)
            .ok_or_else(|| MediaError::NotFound(format!("locator {locator_id}")))?;
        state.deleted_locators.push(locator_id);
        Ok(())
    }

    async fn list_locators(&self, asset_id: AssetId) -> Result<Vec<Locator>, MediaError> {
        self.count_call();
        let state = self.lock();
        if !state.assets.contains_key(&asset_id) {
            return Err(MediaError::NotFound(format!("asset {asset_id}")));
        }
        Ok(state
            .locators
            .values()
            .filter(|l| l.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn list_media_processors(&self) -> Result<Vec<MediaProcessor>, MediaError> {
        self.count_call();
        Ok(self.lock().processors.clone())
    }

    async fn submit_job(&self, mut job: Job) -> Result<Job, MediaError> {
        self.count_call();
        if job.is_submitted() {
            return Err(service_error(
                "InvalidOperation",
                &format!("Job '{}' has already been submitted", job.name),
            ));
        }
        if job.tasks.is_empty() {
            return Err(service_error(
                "InvalidJob",
                &format!("Job '{}' must contain at least one task", job.name),
            ));
        }

        let now = self.now();
        let mut outputs = Vec::new();
        for task in &mut job.tasks {
            task.id = Some(self.ids.generate());
            for requested in &task.output_assets {
                outputs.push(self.new_asset(
                    &requested.name,
                    &requested.storage_account_name,
                    requested.options,
                ));
            }
        }
        job.id = Some(self.ids.generate());
        job.state = JobState::Queued;
        job.output_assets = outputs.iter().map(|a| a.id).collect();
        job.created_at = now;
        job.last_modified_at = now;

        let mut state = self.lock();
        for asset in outputs {
            state.assets.insert(
                asset.id,
                AssetEntry {
                    asset,
                    blobs: HashMap::new(),
                },
            );
        }
        if let Some(id) = job.id {
            state.jobs.insert(
                id,
                JobEntry {
                    job: job.clone(),
                    script: VecDeque::new(),
                    refreshes: 0,
                },
            );
        }
        Ok(job)
    }

    async fn get_job(&self, job_id: JobId) -> Result<Job, MediaError> {
        self.count_call();
        let now = self.now();
        let mut state = self.lock();
        let entry = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| MediaError::NotFound(format!("job {job_id}")))?;
        entry.refreshes += 1;

        match entry.script.pop_front() {
            Some(JobRefresh::Fail(message)) => return Err(service_error("InternalError", &message)),
            Some(JobRefresh::Snapshot { state: next, progress }) => {
                entry.job.state = next;
                for (task, p) in entry.job.tasks.iter_mut().zip(progress) {
                    task.progress = p;
                }
                entry.job.last_modified_at = now;
            }
            None => {
                if let Some(step) = self.simulated_step {
                    self.advance_simulation(&mut state, job_id, step);
                }
            }
        }

        state
            .jobs
            .get(&job_id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| MediaError::NotFound(format!("job {job_id}")))
    }
}

#[async_trait]
impl BlobTransfer for InMemoryMediaStore {
    async fn upload(
        &self,
        local_path: &Path,
        locator: &Locator,
        blob_name: &str,
        settings: &TransferSettings,
        progress: ProgressRelay<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64, MediaError> {
        self.count_call();
        self.authorize(locator, AccessPermissions::WRITE, blob_name, settings)?;

        let mut file = tokio::fs::File::open(local_path).await?;
        let total_bytes = file.metadata().await?.len();
        let report = |bytes_transferred: usize| {
            progress(TransferProgress {
                direction: TransferDirection::Upload,
                bytes_transferred: bytes_transferred as u64,
                total_bytes,
            })
        };

        let mut data = Vec::with_capacity(total_bytes as usize);
        let mut block = vec![0u8; BLOCK_SIZE];
        report(0);
        loop {
            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }
            let n = file.read(&mut block).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&block[..n]);
            report(data.len());
            tokio::task::yield_now().await;
        }

        // commit: the locator may have been revoked mid-transfer
        let asset_id = self.authorize(locator, AccessPermissions::WRITE, blob_name, settings)?;
        let written = data.len() as u64;
        let mut state = self.lock();
        let entry = state
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| MediaError::NotFound(format!("asset {asset_id}")))?;
        entry.blobs.insert(blob_name.to_string(), data);
        Ok(written)
    }

    async fn download(
        &self,
        locator: &Locator,
        blob_name: &str,
        local_path: &Path,
        settings: &TransferSettings,
        progress: ProgressRelay<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64, MediaError> {
        self.count_call();
        let asset_id = self.authorize(locator, AccessPermissions::READ, blob_name, settings)?;

        let data = self.blob(asset_id, blob_name).ok_or_else(|| {
            service_error(
                "BlobNotFound",
                &format!("The specified blob '{blob_name}' does not exist"),
            )
        })?;
        let total_bytes = data.len() as u64;
        let report = |bytes_transferred: usize| {
            progress(TransferProgress {
                direction: TransferDirection::Download,
                bytes_transferred: bytes_transferred as u64,
                total_bytes,
            })
        };

        let mut file = tokio::fs::File::create(local_path).await?;
        let mut written = 0;
        report(0);
        for block in data.chunks(BLOCK_SIZE) {
            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }
            file.write_all(block).await?;
            written += block.len();
            report(written);
            tokio::task::yield_now().await;
        }
        file.flush().await?;
        Ok(total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error_parser;
    use crate::ports::FixedClock;
    use chrono::TimeZone;

    fn fixed_store() -> (InMemoryMediaStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        (
            InMemoryMediaStore::with_clock("mediastorage", clock.clone()),
            clock,
        )
    }

    async fn sas_locator(
        store: &InMemoryMediaStore,
        asset_id: AssetId,
        permissions: AccessPermissions,
    ) -> Locator {
        let policy = store
            .create_access_policy("policy", Duration::from_secs(3600), permissions)
            .await
            .unwrap();
        store
            .create_locator(LocatorType::Sas, asset_id, &policy, None)
            .await
            .unwrap()
    }

    fn no_progress() -> impl Fn(TransferProgress) + Send + Sync {
        |_| {}
    }

    #[tokio::test]
    async fn upload_then_download_through_locators() {
        let (store, _) = fixed_store();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wmv");
        std::fs::write(&source, vec![7u8; BLOCK_SIZE * 2 + 5]).unwrap();

        let asset = store
            .create_asset("a.wmv", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let write = sas_locator(&store, asset.id, AccessPermissions::WRITE).await;
        let cancel = CancellationToken::new();
        let settings = TransferSettings::default();
        let relay = no_progress();

        let n = store
            .upload(&source, &write, "a.wmv", &settings, &relay, &cancel)
            .await
            .unwrap();
        assert_eq!(n, (BLOCK_SIZE * 2 + 5) as u64);

        let read = sas_locator(&store, asset.id, AccessPermissions::READ).await;
        let target = dir.path().join("copy.wmv");
        store
            .download(&read, "a.wmv", &target, &settings, &relay, &cancel)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap().len(), BLOCK_SIZE * 2 + 5);
    }

    #[tokio::test]
    async fn revoked_locator_is_rejected_with_service_error() {
        let (store, _) = fixed_store();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wmv");
        std::fs::write(&source, b"bytes").unwrap();

        let asset = store
            .create_asset("a.wmv", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let write = sas_locator(&store, asset.id, AccessPermissions::WRITE).await;
        store.delete_locator(write.id).await.unwrap();

        let relay = no_progress();
        let err = store
            .upload(
                &source,
                &write,
                "a.wmv",
                &TransferSettings::default(),
                &relay,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        let parsed = error_parser::parse(Some(err)).unwrap();
        assert!(parsed.to_string().starts_with("AuthenticationFailed: Locator"));
    }

    #[tokio::test]
    async fn expired_locator_is_rejected() {
        let (store, clock) = fixed_store();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wmv");
        std::fs::write(&source, b"bytes").unwrap();

        let asset = store
            .create_asset("a.wmv", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let write = sas_locator(&store, asset.id, AccessPermissions::WRITE).await;
        clock.advance(chrono::Duration::hours(2));

        let relay = no_progress();
        let result = store
            .upload(
                &source,
                &write,
                "a.wmv",
                &TransferSettings::default(),
                &relay,
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn create_file_infos_registers_out_of_band_blobs() {
        let (store, _) = fixed_store();
        let asset = store
            .create_asset("direct", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        store.put_blob(asset.id, "b.mp4", vec![1, 2, 3]).unwrap();
        store.put_blob(asset.id, "a.mp4", vec![1]).unwrap();

        store.create_file_infos(asset.id).await.unwrap();
        store.create_file_infos(asset.id).await.unwrap();

        let asset = store.get_asset(asset.id).await.unwrap();
        let names: Vec<&str> = asset.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
        assert_eq!(asset.file("b.mp4").unwrap().content_size, 3);
    }

    #[tokio::test]
    async fn submit_job_rejects_empty_job() {
        let (store, clock) = fixed_store();
        let job = Job::new("empty", clock.now());
        let err = store.submit_job(job).await.unwrap_err();
        assert_eq!(
            error_parser::parse(Some(err)).unwrap().to_string(),
            "InvalidJob: Job 'empty' must contain at least one task"
        );
    }
}
