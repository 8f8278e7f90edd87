//! Domain identifiers (strongly-typed IDs).
//!
//! リモートのエンティティ（Asset, AssetFile, Locator, AccessPolicy, Job, Task,
//! MediaProcessor）はすべて ULID ベースの `Id<T>` で識別します。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供しつつ、`T` はマーカー型（PhantomData）として
//! コンパイル時の型安全性だけを提供します。`AssetId` と `LocatorId` は混同できません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"asset-", "locator-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// derive だと `T: Clone` などの境界が付いてしまうので手で実装する
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

macro_rules! id_marker {
    ($marker:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $marker {}

        impl IdMarker for $marker {
            fn prefix() -> &'static str {
                $prefix
            }
        }
    };
}

id_marker!(Asset, "asset-");
id_marker!(AssetFile, "file-");
id_marker!(Locator, "locator-");
id_marker!(AccessPolicy, "policy-");
id_marker!(Job, "job-");
id_marker!(Task, "task-");
id_marker!(MediaProcessor, "processor-");

/// Identifier of an Asset (remote container).
pub type AssetId = Id<Asset>;

/// Identifier of one file inside an Asset.
pub type AssetFileId = Id<AssetFile>;

/// Identifier of a Locator (time-boxed access path).
pub type LocatorId = Id<Locator>;

/// Identifier of the AccessPolicy backing a Locator.
pub type AccessPolicyId = Id<AccessPolicy>;

/// Identifier of a submitted Job.
pub type JobId = Id<Job>;

/// Identifier of a Task within a Job.
pub type TaskId = Id<Task>;

/// Identifier of a MediaProcessor.
pub type MediaProcessorId = Id<MediaProcessor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid = Ulid::new();

        let asset = AssetId::from_ulid(ulid);
        let locator = LocatorId::from_ulid(ulid);

        assert_eq!(asset.as_ulid(), locator.as_ulid());
        assert!(asset.to_string().starts_with("asset-"));
        assert!(locator.to_string().starts_with("locator-"));

        // let _: AssetId = locator; // <- does not compile
    }

    #[test]
    fn ulid_ids_can_be_serialized() {
        let job_id = JobId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&job_id).unwrap();
        let deserialized: JobId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(job_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<AssetId>(), size_of::<Ulid>());
        assert_eq!(size_of::<JobId>(), size_of::<Ulid>());
    }
}
