//! FileTransferOrchestrator - 一時アクセス権の下での並列ファイル転送
//!
//! # フロー（アップロード）
//! 1. ローカルの検証（リモート呼び出しの前に行う）
//! 2. Asset を作成
//! 3. Sas の Write | List Locator を発行
//! 4. ファイルごとに AssetFile 作成 → 転送 → `.ism` なら primary に更新（並列）
//! 5. すべての転送の完了を待つ
//! 6. 成否にかかわらず Locator を失効
//! 7. 最新の Asset を返す

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::config::MediaContextConfig;
use crate::app::grant::AccessGrantManager;
use crate::domain::{
    AccessPermissions, Asset, AssetCreationOptions, AssetFile, Locator, LocatorType, MediaError,
    ProgressHandler, TransferProgress,
};
use crate::ports::{BlobTransfer, MediaStore};

pub struct FileTransferOrchestrator {
    store: Arc<dyn MediaStore>,
    blobs: Arc<dyn BlobTransfer>,
    grants: AccessGrantManager,
    config: MediaContextConfig,
}

impl FileTransferOrchestrator {
    pub fn new(
        store: Arc<dyn MediaStore>,
        blobs: Arc<dyn BlobTransfer>,
        config: MediaContextConfig,
    ) -> Self {
        Self {
            grants: AccessGrantManager::new(store.clone()),
            store,
            blobs,
            config,
        }
    }

    /// Upload one local file into a new asset named after the file.
    pub async fn upload_file(
        &self,
        file_path: &Path,
        storage_account_name: Option<&str>,
        options: AssetCreationOptions,
        on_progress: Option<ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<Asset, MediaError> {
        if file_path.as_os_str().is_empty() {
            return Err(MediaError::invalid_argument("file_path", "path is empty"));
        }
        let metadata = tokio::fs::metadata(file_path).await.map_err(|_| {
            MediaError::NotFound(format!("The file '{}' does not exist.", file_path.display()))
        })?;
        if !metadata.is_file() {
            return Err(MediaError::invalid_argument(
                "file_path",
                format!("'{}' is not a file", file_path.display()),
            ));
        }

        let name = base_name(file_path);
        let files = vec![(file_path.to_path_buf(), name.clone())];
        self.upload_batch(&name, files, storage_account_name, options, on_progress, cancel)
            .await
    }

    /// Upload every file directly inside `folder_path` into a new asset
    /// named after the folder.
    pub async fn upload_folder(
        &self,
        folder_path: &Path,
        storage_account_name: Option<&str>,
        options: AssetCreationOptions,
        on_progress: Option<ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<Asset, MediaError> {
        if folder_path.as_os_str().is_empty() {
            return Err(MediaError::invalid_argument("folder_path", "path is empty"));
        }

        let files = list_files(folder_path).await?;
        if files.is_empty() {
            return Err(MediaError::NotFound(format!(
                "No files in directory, check the folder path: '{}'",
                folder_path.display()
            )));
        }

        let name = base_name(folder_path);
        self.upload_batch(&name, files, storage_account_name, options, on_progress, cancel)
            .await
    }

    /// Download every file of `asset` into the existing `folder_path`.
    pub async fn download_all(
        &self,
        asset: &Asset,
        folder_path: &Path,
        on_progress: Option<ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        if folder_path.as_os_str().is_empty() {
            return Err(MediaError::invalid_argument("folder_path", "path is empty"));
        }
        let is_dir = tokio::fs::metadata(folder_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(MediaError::invalid_argument(
                "folder_path",
                format!("The folder '{}' does not exist.", folder_path.display()),
            ));
        }
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let files = self.store.list_asset_files(asset.id).await?;
        if let Some(file) = files.iter().find(|f| !is_plain_file_name(&f.name)) {
            return Err(MediaError::invalid_argument(
                "asset",
                format!("The file name '{}' is not a plain file name.", file.name),
            ));
        }
        let locator = self
            .grants
            .grant(
                asset,
                LocatorType::Sas,
                AccessPermissions::READ,
                self.config.access_duration(),
                None,
            )
            .await?;

        info!(asset_id = %asset.id, files = files.len(), folder = %folder_path.display(), "download started");
        let outcomes = join_all(files.iter().map(|file| {
            self.download_one(
                &locator,
                file,
                folder_path.join(&file.name),
                on_progress.as_ref(),
                cancel,
            )
        }))
        .await;

        let batch = settle(files.len(), outcomes);
        self.release(&locator, batch).await?;
        info!(asset_id = %asset.id, "download finished");
        Ok(())
    }

    async fn upload_batch(
        &self,
        asset_name: &str,
        files: Vec<(PathBuf, String)>,
        storage_account_name: Option<&str>,
        options: AssetCreationOptions,
        on_progress: Option<ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<Asset, MediaError> {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let account = self.config.storage_account_or_default(storage_account_name);
        let asset = self.store.create_asset(asset_name, &account, options).await?;
        let locator = self
            .grants
            .grant(
                &asset,
                LocatorType::Sas,
                AccessPermissions::WRITE | AccessPermissions::LIST,
                self.config.access_duration(),
                None,
            )
            .await?;

        info!(asset_id = %asset.id, asset_name, files = files.len(), "upload started");
        let outcomes = join_all(files.iter().map(|(path, name)| {
            self.upload_one(&asset, &locator, path, name, on_progress.as_ref(), cancel)
        }))
        .await;

        let batch = settle(files.len(), outcomes);
        self.release(&locator, batch).await?;
        info!(asset_id = %asset.id, "upload finished");

        self.store.get_asset(asset.id).await
    }

    async fn upload_one(
        &self,
        asset: &Asset,
        locator: &Locator,
        path: &Path,
        name: &str,
        on_progress: Option<&ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let mut file = self.store.create_asset_file(asset.id, name).await?;

        let bytes = {
            let current = &file;
            let relay = move |progress: TransferProgress| {
                if let Some(handler) = on_progress {
                    handler(current, &progress);
                }
            };
            self.blobs
                .upload(path, locator, name, &self.config.transfer, &relay, cancel)
                .await?
        };

        file.content_size = bytes;
        if file.is_manifest() {
            file.is_primary = true;
            self.store.update_asset_file(&file).await?;
        }
        debug!(file_id = %file.id, name, bytes, primary = file.is_primary, "file uploaded");
        Ok(())
    }

    async fn download_one(
        &self,
        locator: &Locator,
        file: &AssetFile,
        target: PathBuf,
        on_progress: Option<&ProgressHandler>,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let relay = |progress: TransferProgress| {
            if let Some(handler) = on_progress {
                handler(file, &progress);
            }
        };
        let bytes = self
            .blobs
            .download(locator, &file.name, &target, &self.config.transfer, &relay, cancel)
            .await?;
        debug!(file_id = %file.id, name = %file.name, bytes, "file downloaded");
        Ok(())
    }

    /// Revoke the batch's grant whatever the outcome; the batch error wins.
    async fn release(&self, locator: &Locator, batch: Result<(), MediaError>) -> Result<(), MediaError> {
        if let Err(e) = &batch {
            warn!(locator_id = %locator.id, error = %e, "revoking access after failed transfer batch");
        }
        let revoked = self.grants.revoke(locator).await;
        match (batch, revoked) {
            (Err(e), Err(revoke_error)) => {
                warn!(locator_id = %locator.id, error = %revoke_error, "failed to revoke access");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), revoked) => revoked,
        }
    }
}

fn settle(total: usize, outcomes: Vec<Result<(), MediaError>>) -> Result<(), MediaError> {
    let failures: Vec<MediaError> = outcomes.into_iter().filter_map(Result::err).collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(MediaError::Transfer { total, failures })
    }
}

/// Exactly one normal component: no separators, no `..`, not absolute.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Regular files directly inside `folder`, sorted by name.
async fn list_files(folder: &Path) -> Result<Vec<(PathBuf, String)>, MediaError> {
    let mut entries = tokio::fs::read_dir(folder).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            MediaError::NotFound(format!("The folder '{}' does not exist.", folder.display()))
        }
        _ => MediaError::Io(e),
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // follows symlinks
        if tokio::fs::metadata(entry.path()).await?.is_file() {
            files.push((entry.path(), entry.file_name().to_string_lossy().into_owned()));
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}
