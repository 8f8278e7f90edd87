//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（リモートのメディアサービス、Blob ストレージ）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - リモートのメディアサービスが source of truth（正本）
//! - バイト転送は Blob 転送クライアントに委譲
//! - 時刻と ID 生成は差し替え可能（テスト容易性）

pub mod blob_transfer;
pub mod clock;
pub mod id_generator;
pub mod media_store;

// 主要な trait を再エクスポート
pub use self::blob_transfer::{BlobTransfer, ProgressRelay, TransferSettings};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::media_store::MediaStore;
