//! MediaContextConfig - 接続コンテキストの設定
//!
//! 既定のストレージアカウント、転送クライアントのチューニング値、
//! Locator の既定有効期間、Job のポーリング間隔をまとめて持ちます。
//! グローバル状態は持たず、各コンポーネントの構築時に明示的に渡します。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::MediaError;
use crate::ports::TransferSettings;

/// Locator の既定有効期間（1 日）
pub const DEFAULT_ACCESS_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Job ポーリングの既定間隔
pub const DEFAULT_JOB_REFRESH_INTERVAL: Duration = Duration::from_millis(2500);

const ENV_STORAGE_ACCOUNT: &str = "MEDIAFLOW_STORAGE_ACCOUNT";
const ENV_CONCURRENT_TRANSFERS: &str = "MEDIAFLOW_CONCURRENT_TRANSFERS";
const ENV_PARALLEL_TRANSFER_THREADS: &str = "MEDIAFLOW_PARALLEL_TRANSFER_THREADS";
const ENV_ACCESS_DURATION_SECS: &str = "MEDIAFLOW_ACCESS_DURATION_SECS";
const ENV_JOB_REFRESH_INTERVAL_MS: &str = "MEDIAFLOW_JOB_REFRESH_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaContextConfig {
    /// Storage account used when a caller passes none
    pub default_storage_account_name: String,
    /// Forwarded unchanged to the blob transfer client
    pub transfer: TransferSettings,
    pub access_duration_secs: u64,
    pub job_refresh_interval_ms: u64,
}

impl Default for MediaContextConfig {
    fn default() -> Self {
        Self {
            default_storage_account_name: "mediastorage".to_string(),
            transfer: TransferSettings::default(),
            access_duration_secs: DEFAULT_ACCESS_DURATION.as_secs(),
            job_refresh_interval_ms: DEFAULT_JOB_REFRESH_INTERVAL.as_millis() as u64,
        }
    }
}

impl MediaContextConfig {
    pub fn access_duration(&self) -> Duration {
        Duration::from_secs(self.access_duration_secs)
    }

    pub fn job_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.job_refresh_interval_ms)
    }

    /// Caller-supplied non-blank account name, else the configured default.
    pub fn storage_account_or_default(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_storage_account_name)
            .to_string()
    }

    /// Load from a JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, MediaError> {
        serde_json::from_str(text).map_err(|e| MediaError::invalid_argument("config", e.to_string()))
    }

    /// Defaults overlaid with `MEDIAFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, MediaError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MediaError> {
        let mut config = Self::default();

        if let Some(account) = lookup(ENV_STORAGE_ACCOUNT).filter(|v| !v.trim().is_empty()) {
            config.default_storage_account_name = account.trim().to_string();
        }
        if let Some(value) = parse_var(&lookup, ENV_CONCURRENT_TRANSFERS)? {
            config.transfer.number_of_concurrent_transfers = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_PARALLEL_TRANSFER_THREADS)? {
            config.transfer.parallel_transfer_thread_count = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_ACCESS_DURATION_SECS)? {
            config.access_duration_secs = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_JOB_REFRESH_INTERVAL_MS)? {
            config.job_refresh_interval_ms = value;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, MediaError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MediaError::invalid_argument(key, format!("not a number: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_service_conventions() {
        let config = MediaContextConfig::default();
        assert_eq!(config.access_duration(), Duration::from_secs(86_400));
        assert_eq!(config.job_refresh_interval(), Duration::from_millis(2500));
        assert_eq!(config.transfer, TransferSettings::default());
    }

    #[test]
    fn blank_storage_account_falls_back_to_default() {
        let config = MediaContextConfig::default();
        assert_eq!(config.storage_account_or_default(None), "mediastorage");
        assert_eq!(config.storage_account_or_default(Some("  ")), "mediastorage");
        assert_eq!(config.storage_account_or_default(Some("other")), "other");
    }

    #[test]
    fn json_keeps_defaults_for_missing_fields() {
        let config = MediaContextConfig::from_json(
            r#"{"default_storage_account_name":"archive","transfer":{"number_of_concurrent_transfers":4,"parallel_transfer_thread_count":16}}"#,
        )
        .unwrap();
        assert_eq!(config.default_storage_account_name, "archive");
        assert_eq!(config.transfer.number_of_concurrent_transfers, 4);
        assert_eq!(config.job_refresh_interval_ms, 2500);
    }

    #[test]
    fn env_overlays_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_STORAGE_ACCOUNT, "archive"),
            (ENV_JOB_REFRESH_INTERVAL_MS, "100"),
        ]);
        let config =
            MediaContextConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
        assert_eq!(config.default_storage_account_name, "archive");
        assert_eq!(config.job_refresh_interval(), Duration::from_millis(100));
        assert_eq!(config.access_duration_secs, 86_400);
    }

    #[test]
    fn env_rejects_non_numeric_values() {
        let err = MediaContextConfig::from_lookup(|key| {
            (key == ENV_CONCURRENT_TRANSFERS).then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(ENV_CONCURRENT_TRANSFERS));
    }
}
