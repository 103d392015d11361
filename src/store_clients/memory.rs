use crate::error::AppError;
use crate::metadata::{AssetHandle, AssetResource, ContainerMetadata, PrimaryAsset};
use crate::store::{sort_for_enumeration, Album, AlbumInfo, AssetStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MemoryAsset {
    pub id: String,
    pub filename: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub data: Vec<u8>,
    pub container: ContainerMetadata,
    pub is_favorite: bool,
    /// Delay applied to the primary fetch, to exercise out-of-order completion.
    pub fetch_delay: Duration,
    pub fail_fetch: bool,
}

impl MemoryAsset {
    pub fn new(id: &str, filename: &str, creation_date: DateTime<Utc>, data: Vec<u8>) -> Self {
        Self {
            id: id.to_string(),
            filename: Some(filename.to_string()),
            creation_date,
            data,
            container: ContainerMetadata::default(),
            is_favorite: false,
            fetch_delay: Duration::ZERO,
            fail_fetch: false,
        }
    }

    pub fn with_container(mut self, container: ContainerMetadata) -> Self {
        self.container = container;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn without_resources(mut self) -> Self {
        self.filename = None;
        self
    }
}

/// Store kept entirely in memory. Favorite changes are recorded rather than
/// written to the assets so repeated scans see the original state.
#[derive(Default)]
pub struct MemoryStore {
    albums: BTreeMap<String, (String, Vec<String>)>,
    assets: HashMap<String, MemoryAsset>,
    favorite_calls: Mutex<Vec<(String, bool)>>,
    failing_favorites: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_album(mut self, id: &str, name: &str, assets: Vec<MemoryAsset>) -> Self {
        let ids = assets.iter().map(|a| a.id.clone()).collect();
        for asset in assets {
            self.assets.insert(asset.id.clone(), asset);
        }
        self.albums.insert(id.to_string(), (name.to_string(), ids));
        self
    }

    pub fn with_failing_favorite(mut self, asset_id: &str) -> Self {
        self.failing_favorites.insert(asset_id.to_string());
        self
    }

    /// Favorite toggles received so far, in arrival order.
    pub fn favorite_calls(&self) -> Vec<(String, bool)> {
        self.favorite_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn asset(&self, handle: &AssetHandle) -> Result<&MemoryAsset, AppError> {
        self.assets.get(&handle.id).ok_or_else(|| AppError::Fetch {
            id: handle.id.clone(),
            reason: "unknown asset".to_string(),
        })
    }

    fn album(&self, id: &str, name: &str, asset_ids: &[String]) -> Album {
        let mut assets: Vec<AssetHandle> = asset_ids
            .iter()
            .filter_map(|asset_id| self.assets.get(asset_id))
            .map(|asset| AssetHandle {
                id: asset.id.clone(),
                creation_date: asset.creation_date,
                is_favorite: asset.is_favorite,
            })
            .collect();
        sort_for_enumeration(&mut assets);
        Album {
            info: AlbumInfo {
                id: id.to_string(),
                name: name.to_string(),
                asset_count: assets.len(),
                start_date: assets.iter().map(|a| a.creation_date).min(),
                end_date: assets.iter().map(|a| a.creation_date).max(),
            },
            assets,
        }
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, AppError> {
        Ok(self
            .albums
            .iter()
            .map(|(id, (name, ids))| self.album(id, name, ids).info)
            .collect())
    }

    async fn count_assets(&self) -> Result<u64, AppError> {
        Ok(self.assets.len() as u64)
    }

    async fn enumerate_album(&self, album_id: &str) -> Result<Album, AppError> {
        let (name, ids) = self
            .albums
            .get(album_id)
            .ok_or_else(|| AppError::AlbumNotFound(album_id.to_string()))?;
        Ok(self.album(album_id, name, ids))
    }

    async fn fetch_primary(&self, handle: &AssetHandle) -> Result<PrimaryAsset, AppError> {
        let asset = self.asset(handle)?;
        if !asset.fetch_delay.is_zero() {
            tokio::time::sleep(asset.fetch_delay).await;
        }
        if asset.fail_fetch {
            return Err(AppError::Fetch {
                id: handle.id.clone(),
                reason: "primary data unavailable".to_string(),
            });
        }
        let resources = asset
            .filename
            .iter()
            .map(|name| AssetResource {
                original_filename: name.clone(),
                file_size: asset.data.len() as i64,
            })
            .collect();
        Ok(PrimaryAsset {
            data: asset.data.clone(),
            resources,
        })
    }

    async fn fetch_container_metadata(&self, handle: &AssetHandle) -> Result<ContainerMetadata, AppError> {
        Ok(self.asset(handle)?.container.clone())
    }

    async fn set_favorite(&self, handle: &AssetHandle, value: bool) -> Result<(), AppError> {
        if let Ok(mut calls) = self.favorite_calls.lock() {
            calls.push((handle.id.clone(), value));
        }
        if self.failing_favorites.contains(&handle.id) {
            return Err(AppError::FavoriteToggle {
                id: handle.id.clone(),
                reason: "store rejected the change".to_string(),
            });
        }
        Ok(())
    }
}
