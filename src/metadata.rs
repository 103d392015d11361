// src/metadata.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder written for any string field that could not be resolved.
pub const UNRESOLVED: &str = "NA";

/// Reference to one asset inside an [`AssetStore`](crate::store::AssetStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub id: String,
    pub creation_date: DateTime<Utc>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Photo,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResource {
    pub original_filename: String,
    pub file_size: i64,
}

/// Raw encoded bytes of an asset together with its resource list.
#[derive(Debug, Clone, Default)]
pub struct PrimaryAsset {
    pub data: Vec<u8>,
    pub resources: Vec<AssetResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Format-level key/value tags of an asset, distinct from still-image EXIF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    pub items: Vec<MetadataItem>,
    /// The container holds at least one composable track.
    pub composable: bool,
    /// The store holds adjustment data (an edit) for the asset.
    pub adjusted: bool,
}

impl ContainerMetadata {
    /// Value of the last item carrying any of `keys`, ignoring empty values.
    pub fn value_of(&self, keys: &[&str]) -> Option<&str> {
        self.items
            .iter()
            .filter(|item| keys.contains(&item.key.as_str()))
            .map(|item| item.value.trim())
            .filter(|value| !value.is_empty())
            .last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub id: String,
    pub filename: String,
    pub kind: AssetKind,
    pub creation_date: DateTime<Utc>,
    pub exif_date: String,
    pub offset_time: String,
    pub lens_model: String,
    pub lens_maker: String,
    pub pixel_width: i32,
    pub pixel_height: i32,
    pub size_bytes: i64,
    pub is_favorite: bool,
    pub album_name: String,
    pub content_hash: String,
}

impl AssetMetadata {
    pub fn with_content_hash(mut self, content_hash: String) -> Self {
        self.content_hash = content_hash;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub processed: usize,
    pub duplicates: usize,
    pub non_native: usize,
    pub errors: usize,
}
