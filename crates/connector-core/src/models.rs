//! Data model for the video publishing workflow: registry entries, the
//! transient video descriptor built from the asset catalog, and mapping
//! records resolved from the mapping store.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which remote platform a registry entry publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPlatform {
    Facebook,
    Youtube,
    YoutubeDirect,
}

impl TargetPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Facebook => "facebook",
            TargetPlatform::Youtube => "youtube",
            TargetPlatform::YoutubeDirect => "youtube_direct",
        }
    }
}

/// Coarse lifecycle status of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    Notified,
    Active,
    Inactive,
    Deleted,
    Error,
}

/// The verb currently in flight, persisted before its side effect is
/// attempted and cleared once the run reaches a terminal-ish status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntermediateState {
    #[serde(rename = "")]
    None,
    Downloading,
    Uploading,
    Updating,
    Unpublishing,
    Deleting,
}

impl IntermediateState {
    pub fn is_none(&self) -> bool {
        matches!(self, IntermediateState::None)
    }
}

/// Durable record of one (asset, destination) workflow. Field names are part
/// of the on-disk contract and must match the external schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub registry_id: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    #[serde(rename = "mappingId")]
    pub mapping_id: String,
    #[serde(rename = "targetPlatform")]
    pub target_platform: TargetPlatform,
    #[serde(rename = "targetPlatformVideoId")]
    pub target_platform_video_id: String,
    pub status: RegistryStatus,
    #[serde(rename = "intermediateState")]
    pub intermediate_state: IntermediateState,
    pub message: String,
    pub video_hash_code: String,
    pub captions_uploaded: bool,
}

impl RegistryEntry {
    pub fn new(
        registry_id: impl Into<String>,
        video_id: impl Into<String>,
        category_id: impl Into<String>,
        mapping_id: impl Into<String>,
        target_platform: TargetPlatform,
    ) -> Self {
        Self {
            registry_id: registry_id.into(),
            video_id: video_id.into(),
            category_id: category_id.into(),
            mapping_id: mapping_id.into(),
            target_platform,
            target_platform_video_id: String::new(),
            status: RegistryStatus::Notified,
            intermediate_state: IntermediateState::None,
            message: String::new(),
            video_hash_code: String::new(),
            captions_uploaded: false,
        }
    }

    /// Invariant 1: an `active` entry always carries a non-empty remote id.
    pub fn is_consistent(&self) -> bool {
        !(self.status == RegistryStatus::Active && self.target_platform_video_id.is_empty())
    }
}

/// Binding from a registry entry's `mapping_id` to a concrete remote
/// destination. Immutable from the core's perspective; resolved once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRecord {
    pub mapping_id: String,
    /// Platform-specific credential or channel handle: a page access token
    /// for Facebook, a channel id for YouTube MCN, a refresh token for
    /// YouTube Direct.
    pub target_id: String,
    pub target_platform: TargetPlatform,
    pub category_id: String,
}

/// Transient snapshot built from the asset catalog for a single run. Never
/// persisted as-is; `hash_code` is copied into the registry entry on success.
#[derive(Debug, Clone)]
pub struct VideoDescriptor {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub download_url: String,
    pub image_id: Option<String>,
    pub image_filename: Option<String>,
    pub captions_url: Option<String>,
    pub captions_filename: Option<String>,
    pub filename: String,
    pub hash_code: String,
}

/// Raw shape returned by the asset catalog before descriptor construction
/// rules are applied (§4.3): legacy field name fallbacks, tag splitting, and
/// randomized on-disk filenames.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default, rename = "flavourSourceUrl")]
    pub flavour_source_url: Option<String>,
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub captions_url: Option<String>,
}

impl VideoDescriptor {
    pub fn build(video_id: &str, asset: AssetRecord) -> Self {
        let title = asset.title.unwrap_or_default();
        let description = asset.description.unwrap_or_default();
        let keywords = asset
            .tags
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let download_url = asset
            .flavour_source_url
            .or(asset.download_url)
            .unwrap_or_default();
        let hash_code = hash_title_and_description(&title, &description);
        let suffix: String = random_suffix();

        let image_filename = asset
            .image_id
            .as_ref()
            .map(|_| format!("{video_id}-{suffix}-thumb.jpg"));
        let captions_filename = asset
            .captions_url
            .as_ref()
            .map(|_| format!("{video_id}-{suffix}-captions.vtt"));

        Self {
            video_id: video_id.to_string(),
            title,
            description,
            keywords,
            download_url,
            image_id: asset.image_id,
            image_filename,
            captions_url: asset.captions_url,
            captions_filename,
            filename: format!("{video_id}-{suffix}.mpeg"),
            hash_code,
        }
    }
}

/// Hex md5 of UTF-8 `title ∥ description`, standardized in DESIGN.md as the
/// single formula used both at descriptor construction time and by every
/// adapter's tamper-detection comparison.
pub fn hash_title_and_description(title: &str, description: &str) -> String {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(title.as_bytes());
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    let n: u64 = rng.random();
    format!("{n:016x}")
}
