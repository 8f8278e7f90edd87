//! Byte-level transfer progress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::asset::AssetFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    Upload,
    Download,
}

/// One progress notification for a single file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub direction: TransferDirection,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Percentage in `[0, 100]`. An empty file counts as complete.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// Caller-supplied progress callback for a transfer batch.
///
/// Invoked from the transfer's own task, possibly concurrently for different
/// files. It must not block.
pub type ProgressHandler = Arc<dyn Fn(&AssetFile, &TransferProgress) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_derived_from_bytes() {
        let p = TransferProgress {
            direction: TransferDirection::Upload,
            bytes_transferred: 25,
            total_bytes: 200,
        };
        assert_eq!(p.percentage(), 12.5);
    }

    #[test]
    fn empty_file_is_complete() {
        let p = TransferProgress {
            direction: TransferDirection::Download,
            bytes_transferred: 0,
            total_bytes: 0,
        };
        assert_eq!(p.percentage(), 100.0);
    }
}
