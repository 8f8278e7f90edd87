//! AccessGrantManager - 一時的なアクセス権（Locator）の発行と失効
//!
//! # 設計原則
//! - AccessPolicy は Locator ごとに 1 つ作り、再利用しない
//! - 失効は grant 1 回につき 1 回だけ試みる
//! - すでに消えている Locator の失効は警告ログのみ（エラーにしない）

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{AccessPermissions, Asset, ErrorKind, Locator, LocatorType, MediaError};
use crate::ports::MediaStore;

pub struct AccessGrantManager {
    store: Arc<dyn MediaStore>,
}

impl AccessGrantManager {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    /// Create a policy named after the asset, then a locator bound to it.
    ///
    /// With `start_time` the locator becomes usable only from that instant.
    pub async fn grant(
        &self,
        asset: &Asset,
        locator_type: LocatorType,
        permissions: AccessPermissions,
        duration: Duration,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, MediaError> {
        if permissions.is_empty() {
            return Err(MediaError::invalid_argument(
                "permissions",
                "at least one permission is required",
            ));
        }
        if duration.is_zero() {
            return Err(MediaError::invalid_argument(
                "duration",
                "access duration must be positive",
            ));
        }

        let policy = self
            .store
            .create_access_policy(&asset.name, duration, permissions)
            .await?;
        let locator = self
            .store
            .create_locator(locator_type, asset.id, &policy, start_time)
            .await?;

        debug!(
            asset_id = %asset.id,
            locator_id = %locator.id,
            ?locator_type,
            ?permissions,
            expires_at = %locator.expiration_time,
            "access granted"
        );
        Ok(locator)
    }

    pub async fn revoke(&self, locator: &Locator) -> Result<(), MediaError> {
        match self.store.delete_locator(locator.id).await {
            Ok(()) => {
                debug!(locator_id = %locator.id, asset_id = %locator.asset_id, "access revoked");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(locator_id = %locator.id, error = %e, "locator already gone, nothing to revoke");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetCreationOptions;
    use crate::impls::InMemoryMediaStore;
    use crate::ports::{Clock, FixedClock};
    use chrono::TimeZone;

    fn setup() -> (Arc<InMemoryMediaStore>, AccessGrantManager, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryMediaStore::with_clock("mediastorage", clock.clone()));
        let grants = AccessGrantManager::new(store.clone());
        (store, grants, clock)
    }

    #[tokio::test]
    async fn grant_creates_policy_named_after_asset() {
        let (store, grants, clock) = setup();
        let asset = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();

        let locator = grants
            .grant(
                &asset,
                LocatorType::Sas,
                AccessPermissions::WRITE | AccessPermissions::LIST,
                Duration::from_secs(3600),
                None,
            )
            .await
            .unwrap();

        let policy = store.policy(locator.access_policy_id).unwrap();
        assert_eq!(policy.name, "movie");
        assert_eq!(locator.asset_id, asset.id);
        assert_eq!(
            locator.expiration_time,
            clock.now() + chrono::Duration::hours(1)
        );
        assert!(locator.permits(AccessPermissions::LIST, clock.now()));
    }

    #[tokio::test]
    async fn deferred_grant_is_not_usable_before_start() {
        let (store, grants, clock) = setup();
        let asset = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let start = clock.now() + chrono::Duration::minutes(5);

        let locator = grants
            .grant(
                &asset,
                LocatorType::OnDemandOrigin,
                AccessPermissions::READ,
                Duration::from_secs(600),
                Some(start),
            )
            .await
            .unwrap();

        assert!(!locator.permits(AccessPermissions::READ, clock.now()));
        assert!(locator.permits(AccessPermissions::READ, start));
        assert_eq!(locator.expiration_time, start + chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn invalid_grant_makes_no_remote_calls() {
        let (store, grants, _) = setup();
        let asset = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let before = store.remote_calls();

        let err = grants
            .grant(
                &asset,
                LocatorType::Sas,
                AccessPermissions::NONE,
                Duration::from_secs(60),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.remote_calls(), before);
    }

    #[tokio::test]
    async fn revoking_twice_is_tolerated() {
        let (store, grants, _) = setup();
        let asset = store
            .create_asset("movie", "mediastorage", AssetCreationOptions::None)
            .await
            .unwrap();
        let locator = grants
            .grant(
                &asset,
                LocatorType::Sas,
                AccessPermissions::READ,
                Duration::from_secs(60),
                None,
            )
            .await
            .unwrap();

        grants.revoke(&locator).await.unwrap();
        grants.revoke(&locator).await.unwrap();

        assert_eq!(store.deleted_locators(), vec![locator.id]);
        assert!(store.live_locators().is_empty());
    }
}
