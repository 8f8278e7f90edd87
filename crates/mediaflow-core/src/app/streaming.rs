//! Playback URLs for published assets.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use url::Url;

use crate::domain::{Asset, AssetFile, Locator, LocatorType, MediaError};

/// Adaptive streaming format served by the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingKind {
    SmoothStreaming,
    Hls,
    MpegDash,
}

impl StreamingKind {
    fn manifest_suffix(self) -> &'static str {
        match self {
            StreamingKind::SmoothStreaming => "",
            StreamingKind::Hls => "(format=m3u8-aapl)",
            StreamingKind::MpegDash => "(format=mpd-time-csf)",
        }
    }
}

/// Streaming URL through the earliest-expiring origin locator of `asset`.
///
/// `None` when the asset has no manifest file, no origin locator, or the
/// locator path is not an absolute URL.
pub fn streaming_uri(asset: &Asset, kind: StreamingKind) -> Option<Url> {
    let manifest = asset.manifest_file()?;
    let locator = asset
        .locators
        .iter()
        .filter(|l| l.locator_type == LocatorType::OnDemandOrigin)
        .min_by_key(|l| l.expiration_time)?;
    compose(locator, manifest, kind)
}

/// Streaming URL through a specific origin locator.
pub fn streaming_uri_for_locator(
    locator: &Locator,
    asset: &Asset,
    kind: StreamingKind,
) -> Result<Option<Url>, MediaError> {
    if locator.locator_type != LocatorType::OnDemandOrigin {
        return Err(MediaError::invalid_argument(
            "locator",
            "The locator type must be on-demand origin.",
        ));
    }
    Ok(asset
        .manifest_file()
        .and_then(|manifest| compose(locator, manifest, kind)))
}

/// Progressive download URL of `file` through the latest-expiring SAS locator.
pub fn sas_uri(asset: &Asset, file: &AssetFile) -> Option<Url> {
    let locator = asset
        .locators
        .iter()
        .filter(|l| l.locator_type == LocatorType::Sas)
        .max_by_key(|l| l.expiration_time)?;

    let mut url = Url::parse(&locator.path).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&file.name);
    Some(url)
}

/// Append `url` as one line to the text file at `path`, creating it if needed.
pub async fn save_uri(url: &Url, path: &Path) -> Result<(), MediaError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{url}\n").as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

fn compose(locator: &Locator, manifest: &AssetFile, kind: StreamingKind) -> Option<Url> {
    let text = format!(
        "{}/{}/manifest{}",
        locator.path.trim_end_matches('/'),
        manifest.name,
        kind.manifest_suffix()
    );
    Url::parse(&text).ok()
}
