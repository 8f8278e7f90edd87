//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AccessGrantManager**: 一時アクセス権（Locator）の発行と失効
//! - **FileTransferOrchestrator**: Locator の下での並列アップロード／ダウンロード
//! - **JobMonitor**: Job が終端状態になるまでのポーリング
//! - **JobPreparer**: 単一タスク Job の組み立て
//! - **streaming**: ストリーミング URL / SAS URL の合成
//! - **error_parser**: リモートの XML エラー文書の解釈

pub mod config;
pub mod error_parser;
pub mod grant;
pub mod jobs;
pub mod monitor;
pub mod streaming;
pub mod transfer;

// 主要な型を再エクスポート
pub use self::config::MediaContextConfig;
pub use self::grant::AccessGrantManager;
pub use self::jobs::JobPreparer;
pub use self::monitor::{JobChangeHandler, JobMonitor};
pub use self::streaming::StreamingKind;
pub use self::transfer::FileTransferOrchestrator;
