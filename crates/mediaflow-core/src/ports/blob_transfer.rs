//! BlobTransfer port - Locator 経由のバイト転送
//!
//! 実際のバイト転送は Blob 転送クライアントが担当します。
//! オーケストレータは設定のチューニング値をそのまま渡すだけです。

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::{Locator, MediaError, TransferProgress};

/// 転送クライアントのチューニング値（設定から変更せずに転送）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSettings {
    /// 同時に走らせるブロック転送の最大数
    pub number_of_concurrent_transfers: usize,
    /// 1 転送あたりの並列度
    pub parallel_transfer_thread_count: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            number_of_concurrent_transfers: 2,
            parallel_transfer_thread_count: 10,
        }
    }
}

/// 転送中に呼ばれる進捗通知（転送 1 回分のスコープ）
pub type ProgressRelay<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// BlobTransfer は Locator のパス配下の blob を読み書きする
///
/// # 設計原則
/// - Locator の権限と有効期限の検証はリモート側（実装側）が行う
/// - `cancel` が発火したら `MediaError::Cancelled` で早期に終了する
#[async_trait]
pub trait BlobTransfer: Send + Sync {
    /// ローカルファイルを `blob_name` としてアップロードし、転送したバイト数を返す
    async fn upload(
        &self,
        local_path: &Path,
        locator: &Locator,
        blob_name: &str,
        settings: &TransferSettings,
        progress: ProgressRelay<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64, MediaError>;

    /// `blob_name` を `local_path` にダウンロードし、転送したバイト数を返す
    async fn download(
        &self,
        locator: &Locator,
        blob_name: &str,
        local_path: &Path,
        settings: &TransferSettings,
        progress: ProgressRelay<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64, MediaError>;
}
