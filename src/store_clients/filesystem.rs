use crate::config::AppConfig;
use crate::error::AppError;
use crate::metadata::{AssetHandle, AssetResource, ContainerMetadata, PrimaryAsset};
use crate::store::{sort_for_enumeration, Album, AlbumInfo, AssetStore};
use crate::store_clients::quicktime;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use walkdir::WalkDir;

const FAVORITES_FILE: &str = ".favorites.json";
const ADJUSTMENT_EXTENSION: &str = "aae";

/// Library laid out on disk: every subdirectory of the root is an album and
/// the media files directly inside it are its assets.
pub struct FilesystemStore {
    root: PathBuf,
    allowed_extensions: HashSet<String>,
    favorites_lock: Mutex<()>,
}

impl FilesystemStore {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let root = PathBuf::from(&config.library_path);
        log::debug!("Initializing filesystem store at {:?}", root);
        if !root.is_dir() {
            return Err(AppError::Generic(format!(
                "Library path {:?} is not a directory",
                root
            )));
        }
        Ok(Self {
            root,
            allowed_extensions: config.allowed_extensions.clone(),
            favorites_lock: Mutex::new(()),
        })
    }

    fn album_dirs(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn album_dir(&self, album_id: &str) -> Option<PathBuf> {
        if album_id.is_empty() || album_id.contains(&['/', '\\'][..]) || album_id.starts_with('.') {
            return None;
        }
        let dir = self.root.join(album_id);
        dir.is_dir().then_some(dir)
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.allowed_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    fn scan_album(&self, album_id: &str, dir: &Path) -> Result<Album, AppError> {
        let favorites = load_favorites(dir);
        let mut assets = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_media(path) {
                log::trace!("Skipping non-media entry: {:?}", path);
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry.metadata()?;
            let created = metadata.created().or_else(|_| metadata.modified())?;
            assets.push(AssetHandle {
                id: format!("{}/{}", album_id, file_name),
                creation_date: DateTime::<Utc>::from(created),
                is_favorite: favorites.contains(&file_name),
            });
        }
        sort_for_enumeration(&mut assets);

        let info = AlbumInfo {
            id: album_id.to_string(),
            name: album_id.to_string(),
            asset_count: assets.len(),
            start_date: assets.iter().map(|a| a.creation_date).min(),
            end_date: assets.iter().map(|a| a.creation_date).max(),
        };
        Ok(Album { info, assets })
    }

    fn asset_path(&self, handle: &AssetHandle) -> Result<PathBuf, AppError> {
        match handle.id.split_once('/') {
            Some((album, file)) if !file.contains(&['/', '\\'][..]) => Ok(self.root.join(album).join(file)),
            _ => Err(AppError::Fetch {
                id: handle.id.clone(),
                reason: "malformed asset id".to_string(),
            }),
        }
    }
}

fn read_favorites(dir: &Path) -> Result<BTreeSet<String>, AppError> {
    let path = dir.join(FAVORITES_FILE);
    match std::fs::read(&path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e.into()),
    }
}

/// Favorites are best effort: an unreadable file counts as no favorites and is
/// overwritten by the next toggle.
fn load_favorites(dir: &Path) -> BTreeSet<String> {
    read_favorites(dir).unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable favorites in {:?}: {}", dir, e);
        BTreeSet::new()
    })
}

/// `IMG_0001.MOV` is adjusted when `IMG_0001.AAE` (any case) sits beside it.
fn has_adjustment_sidecar(path: &Path) -> bool {
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem()) else {
        return false;
    };
    let stem = stem.to_string_lossy().to_lowercase();
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|entry| {
                let candidate = entry.path();
                let same_stem = candidate
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_lowercase() == stem)
                    .unwrap_or(false);
                let is_adjustment = candidate
                    .extension()
                    .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ADJUSTMENT_EXTENSION))
                    .unwrap_or(false);
                same_stem && is_adjustment
            })
        })
        .unwrap_or(false)
}

#[async_trait]
impl AssetStore for FilesystemStore {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, AppError> {
        let mut albums = Vec::new();
        for dir in self.album_dirs()? {
            let id = match dir.file_name().and_then(|n| n.to_str()) {
                Some(id) if !id.starts_with('.') => id.to_string(),
                _ => continue,
            };
            albums.push(self.scan_album(&id, &dir)?.info);
        }
        Ok(albums)
    }

    async fn count_assets(&self) -> Result<u64, AppError> {
        let albums = self.list_albums().await?;
        Ok(albums.iter().map(|a| a.asset_count as u64).sum())
    }

    async fn enumerate_album(&self, album_id: &str) -> Result<Album, AppError> {
        let dir = self
            .album_dir(album_id)
            .ok_or_else(|| AppError::AlbumNotFound(album_id.to_string()))?;
        log::info!("Enumerating album {} in {:?}", album_id, dir);
        self.scan_album(album_id, &dir)
    }

    async fn fetch_primary(&self, handle: &AssetHandle) -> Result<PrimaryAsset, AppError> {
        let path = self.asset_path(handle)?;
        log::trace!("Reading primary data for {} from {:?}", handle.id, path);
        let data = tokio::fs::read(&path).await.map_err(|e| AppError::Fetch {
            id: handle.id.clone(),
            reason: e.to_string(),
        })?;
        let original_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_size = data.len() as i64;
        Ok(PrimaryAsset {
            data,
            resources: vec![AssetResource {
                original_filename,
                file_size,
            }],
        })
    }

    async fn fetch_container_metadata(&self, handle: &AssetHandle) -> Result<ContainerMetadata, AppError> {
        let path = self.asset_path(handle)?;
        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)?;
            let container = match quicktime::read_metadata(&mut file)? {
                Some(movie) => ContainerMetadata {
                    items: movie.items,
                    composable: movie.track_count > 0,
                    adjusted: has_adjustment_sidecar(&path),
                },
                None => ContainerMetadata::default(),
            };
            Ok::<ContainerMetadata, AppError>(container)
        })
        .await?
    }

    async fn set_favorite(&self, handle: &AssetHandle, value: bool) -> Result<(), AppError> {
        let path = self.asset_path(handle)?;
        let (dir, file_name) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string_lossy().into_owned()),
            _ => {
                return Err(AppError::FavoriteToggle {
                    id: handle.id.clone(),
                    reason: "asset has no parent album".to_string(),
                })
            }
        };

        let _guard = self.favorites_lock.lock().await;
        let mut favorites = load_favorites(&dir);
        let changed = if value {
            favorites.insert(file_name)
        } else {
            favorites.remove(&file_name)
        };
        if changed {
            let json = serde_json::to_vec_pretty(&favorites)?;
            tokio::fs::write(dir.join(FAVORITES_FILE), json).await?;
        }
        Ok(())
    }
}
