//! Asset and AssetFile records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AssetFileId, AssetId};
use super::locator::Locator;

/// File name suffix that designates the adaptive-streaming manifest.
pub const MANIFEST_FILE_EXTENSION: &str = ".ism";

/// Storage-side options applied when an asset is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCreationOptions {
    #[default]
    None,
    StorageEncrypted,
    CommonEncryptionProtected,
    EnvelopeEncryptionProtected,
}

/// A named remote container of files and access grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub storage_account_name: String,
    pub options: AssetCreationOptions,

    /// Files in no particular order.
    pub files: Vec<AssetFile>,

    pub locators: Vec<Locator>,

    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// First file whose name ends with the manifest extension.
    pub fn manifest_file(&self) -> Option<&AssetFile> {
        self.files.iter().find(|f| f.is_manifest())
    }

    pub fn file(&self, name: &str) -> Option<&AssetFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn primary_files(&self) -> impl Iterator<Item = &AssetFile> {
        self.files.iter().filter(|f| f.is_primary)
    }
}

/// One object stored inside an Asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    pub id: AssetFileId,
    pub asset_id: AssetId,
    pub name: String,
    pub content_size: u64,
    pub is_primary: bool,
}

impl AssetFile {
    pub fn is_manifest(&self) -> bool {
        is_manifest_name(&self.name)
    }
}

/// ASCII case-insensitive check for the `.ism` suffix.
pub fn is_manifest_name(name: &str) -> bool {
    let ext = MANIFEST_FILE_EXTENSION.len();
    name.len() >= ext
        && name.is_char_boundary(name.len() - ext)
        && name[name.len() - ext..].eq_ignore_ascii_case(MANIFEST_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lower("manifest.ism", true)]
    #[case::upper("MANIFEST.ISM", true)]
    #[case::mixed("movie.IsM", true)]
    #[case::bare(".ism", true)]
    #[case::client_manifest("movie.ismc", false)]
    #[case::video("a.wmv", false)]
    #[case::short("sm", false)]
    #[case::multibyte("動画ism", false)]
    fn manifest_suffix_is_case_insensitive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_manifest_name(name), expected);
    }
}
