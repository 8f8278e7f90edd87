//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryMediaStore**: MediaStore と BlobTransfer を 1 つで実装する開発用サービス
//!
//! # 本番用実装
//! リモートのメディアサービスに接続する実装は別クレートに配置します。

pub mod inmem_store;

// 主要な型を再エクスポート
pub use self::inmem_store::{InMemoryMediaStore, JobRefresh};
