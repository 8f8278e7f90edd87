//! Errors - エラー型と分類
//!
//! すべての公開 API は `Result<T, MediaError>` を返します。
//! 呼び出し側は `MediaError::kind()` で運用上の分類を取得できます。

use thiserror::Error;

/// ErrorKind は失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 引数が不正（空のパス、未 submit の Job、存在しない保存先フォルダなど）
    InvalidArgument,
    /// 対象が存在しない（空フォルダ、リモートのエンティティ）
    NotFound,
    /// 未知の media processor 名
    Unknown,
    /// リモートサービスからのエラー
    RemoteService,
    /// 協調キャンセル
    Cancelled,
    /// ローカル I/O
    Io,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Unknown media processor: '{0}'")]
    UnknownMediaProcessor(String),

    /// Flattened `code: message` text, usually produced by `error_parser::parse`.
    #[error("{0}")]
    RemoteService(String),

    /// Raw failure reported by the remote store or blob transport.
    /// `message` may carry an XML error document.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One or more file transfers of a batch failed.
    #[error("{} of {total} file transfers failed: {}", .failures.len(), first_failure(.failures))]
    Transfer {
        total: usize,
        failures: Vec<MediaError>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn first_failure(failures: &[MediaError]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl MediaError {
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Operational classification of this error.
    ///
    /// A `Transfer` aggregate reports `Cancelled` only when every failure was a
    /// cancellation, otherwise the kind of its first failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            MediaError::NotFound(_) => ErrorKind::NotFound,
            MediaError::UnknownMediaProcessor(_) => ErrorKind::Unknown,
            MediaError::RemoteService(_) | MediaError::Transport { .. } => {
                ErrorKind::RemoteService
            }
            MediaError::Transfer { failures, .. } => {
                if !failures.is_empty() && failures.iter().all(MediaError::is_cancelled) {
                    ErrorKind::Cancelled
                } else {
                    failures
                        .first()
                        .map(MediaError::kind)
                        .unwrap_or(ErrorKind::RemoteService)
                }
            }
            MediaError::Cancelled => ErrorKind::Cancelled,
            MediaError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_aggregate_reports_first_failure() {
        let err = MediaError::Transfer {
            total: 3,
            failures: vec![
                MediaError::NotFound("a.wmv".to_string()),
                MediaError::transport("boom"),
            ],
        };

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "2 of 3 file transfers failed: not found: a.wmv"
        );
    }

    #[test]
    fn transfer_aggregate_of_cancellations_is_cancelled() {
        let err = MediaError::Transfer {
            total: 2,
            failures: vec![MediaError::Cancelled, MediaError::Cancelled],
        };
        assert!(err.is_cancelled());
    }
}
