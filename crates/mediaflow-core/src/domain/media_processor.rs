//! Media processors available on the remote service.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::ids::MediaProcessorId;

/// Well-known processor names.
pub mod names {
    pub const MEDIA_ENCODER: &str = "Windows Azure Media Encoder";
    pub const MEDIA_PACKAGER: &str = "Windows Azure Media Packager";
    pub const MEDIA_ENCRYPTOR: &str = "Windows Azure Media Encryptor";
    pub const STORAGE_DECRYPTION: &str = "Storage Decryption";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProcessor {
    pub id: MediaProcessorId,
    pub name: String,
    pub vendor: String,

    /// Dotted numeric version, e.g. `"4.2.1.0"`.
    pub version: String,
}

/// Compare dotted versions component-wise as numbers (`"2.10" > "2.9"`).
///
/// Missing components count as zero; non-numeric components sort first.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<Option<u64>> {
        v.split('.').map(|part| part.trim().parse().ok()).collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(Some(0));
        let y = b.get(i).copied().unwrap_or(Some(0));
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Highest-versioned processor with exactly this name.
pub fn latest_by_name<'a>(
    processors: &'a [MediaProcessor],
    name: &str,
) -> Option<&'a MediaProcessor> {
    processors
        .iter()
        .filter(|p| p.name == name)
        .max_by(|a, b| compare_versions(&a.version, &b.version))
}
