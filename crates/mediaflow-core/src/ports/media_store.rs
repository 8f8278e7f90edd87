//! MediaStore port - リモートのメディアサービス（正本）
//!
//! MediaStore は以下を管理します：
//! - Asset / AssetFile
//! - AccessPolicy / Locator
//! - Job / Task / MediaProcessor
//!
//! ワイヤプロトコルと認証は実装側の責務です。リトライ方針を持つ場合も実装側に置きます。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, AssetId, Job, JobId,
    Locator, LocatorId, LocatorType, MediaError, MediaProcessor,
};

/// MediaStore はリモートのエンティティに対する CRUD
///
/// # 設計原則
/// - すべてのメソッドは 1 回のリモート呼び出しに相当する
/// - 取得系は常に最新のスナップショットを返す（キャッシュしない）
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn create_asset(
        &self,
        name: &str,
        storage_account_name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, MediaError>;

    /// Asset とそのファイル・Locator を取得
    async fn get_asset(&self, asset_id: AssetId) -> Result<Asset, MediaError>;

    async fn delete_asset(&self, asset_id: AssetId) -> Result<(), MediaError>;

    async fn create_asset_file(&self, asset_id: AssetId, name: &str)
    -> Result<AssetFile, MediaError>;

    async fn update_asset_file(&self, file: &AssetFile) -> Result<(), MediaError>;

    async fn list_asset_files(&self, asset_id: AssetId) -> Result<Vec<AssetFile>, MediaError>;

    /// ストレージの中身をスキャンして AssetFile レコードを作り直す
    ///
    /// ストレージへ直接アップロードした場合に使います。
    async fn create_file_infos(&self, asset_id: AssetId) -> Result<(), MediaError>;

    async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, MediaError>;

    async fn create_locator(
        &self,
        locator_type: LocatorType,
        asset_id: AssetId,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, MediaError>;

    async fn delete_locator(&self, locator_id: LocatorId) -> Result<(), MediaError>;

    async fn list_locators(&self, asset_id: AssetId) -> Result<Vec<Locator>, MediaError>;

    async fn list_media_processors(&self) -> Result<Vec<MediaProcessor>, MediaError>;

    /// Job を投入し、id が割り当てられた Job を返す
    async fn submit_job(&self, job: Job) -> Result<Job, MediaError>;

    /// Job の最新状態を取得（ポーリング用）
    async fn get_job(&self, job_id: JobId) -> Result<Job, MediaError>;
}
