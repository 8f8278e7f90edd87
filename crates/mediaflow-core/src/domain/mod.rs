//! Domain model (IDs, assets, locators, jobs, progress, errors).

pub mod asset;
pub mod errors;
pub mod ids;
pub mod job;
pub mod locator;
pub mod media_processor;
pub mod progress;

pub use self::asset::{
    Asset, AssetCreationOptions, AssetFile, MANIFEST_FILE_EXTENSION, is_manifest_name,
};
pub use self::errors::{ErrorKind, MediaError};
pub use self::ids::{
    AccessPolicyId, AssetFileId, AssetId, JobId, LocatorId, MediaProcessorId, TaskId,
};
pub use self::job::{Job, JobState, OutputAssetSpec, Task};
pub use self::locator::{AccessPermissions, AccessPolicy, Locator, LocatorType};
pub use self::media_processor::MediaProcessor;
pub use self::progress::{ProgressHandler, TransferDirection, TransferProgress};
