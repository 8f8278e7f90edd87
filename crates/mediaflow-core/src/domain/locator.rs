//! Locator and AccessPolicy: the time-boxed access grant into an asset's storage.

use std::fmt;
use std::ops::BitOr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccessPolicyId, AssetId, LocatorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorType {
    /// Shared access signature into blob storage (upload, download, progressive download).
    Sas,
    /// Streaming origin path (smooth, HLS, DASH).
    OnDemandOrigin,
}

/// Permission bit set of an AccessPolicy.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPermissions(u8);

impl AccessPermissions {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(1 << 1);
    pub const DELETE: Self = Self(1 << 2);
    pub const LIST: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AccessPermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::READ, "Read"),
            (Self::WRITE, "Write"),
            (Self::DELETE, "Delete"),
            (Self::LIST, "List"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();

        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

/// Permissions + duration backing exactly one Locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: AccessPolicyId,
    pub name: String,
    pub permissions: AccessPermissions,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub id: LocatorId,
    pub locator_type: LocatorType,
    pub asset_id: AssetId,
    pub access_policy_id: AccessPolicyId,
    pub permissions: AccessPermissions,

    /// Base access path; blob names are appended to it.
    pub path: String,

    pub start_time: Option<DateTime<Utc>>,
    pub expiration_time: DateTime<Utc>,
}

impl Locator {
    /// Is this locator usable at `now` for `required`?
    pub fn permits(&self, required: AccessPermissions, now: DateTime<Utc>) -> bool {
        let started = self.start_time.is_none_or(|start| start <= now);
        started && now < self.expiration_time && self.permissions.contains(required)
    }
}
