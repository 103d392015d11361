use crate::error::AppError;
use crate::metadata::{AssetHandle, ContainerMetadata, PrimaryAsset};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumInfo {
    pub id: String,
    pub name: String,
    pub asset_count: usize,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// An album and its assets, newest first.
#[derive(Debug, Clone)]
pub struct Album {
    pub info: AlbumInfo,
    pub assets: Vec<AssetHandle>,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, AppError>;
    async fn count_assets(&self) -> Result<u64, AppError>;
    async fn enumerate_album(&self, album_id: &str) -> Result<Album, AppError>;
    async fn fetch_primary(&self, handle: &AssetHandle) -> Result<PrimaryAsset, AppError>;
    async fn fetch_container_metadata(&self, handle: &AssetHandle) -> Result<ContainerMetadata, AppError>;
    async fn set_favorite(&self, handle: &AssetHandle, value: bool) -> Result<(), AppError>;
}

/// Orders handles newest first, breaking ties by id.
pub fn sort_for_enumeration(assets: &mut [AssetHandle]) {
    assets.sort_by(|a, b| {
        b.creation_date
            .cmp(&a.creation_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}
