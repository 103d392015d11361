use crate::error::AppError;
use crate::extractor;
use crate::hasher;
use crate::metadata::{AssetHandle, AssetMetadata, ContainerMetadata, PrimaryAsset};
use crate::store::AssetStore;
use rayon::prelude::*;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Both fetches of one asset, joined. Holds a worker permit until processed.
pub struct FetchedAsset {
    pub position: usize,
    pub handle: AssetHandle,
    pub fetched: Result<(PrimaryAsset, ContainerMetadata), AppError>,
    permit: Option<OwnedSemaphorePermit>,
}

impl FetchedAsset {
    pub fn new(
        position: usize,
        handle: AssetHandle,
        fetched: Result<(PrimaryAsset, ContainerMetadata), AppError>,
    ) -> Self {
        Self {
            position,
            handle,
            fetched,
            permit: None,
        }
    }
}

#[derive(Debug)]
pub struct ProcessedAsset {
    pub position: usize,
    pub handle: AssetHandle,
    pub outcome: Result<AssetMetadata, AppError>,
}

pub async fn start_fetching(
    store: Arc<dyn AssetStore>,
    assets: Vec<AssetHandle>,
    num_workers: usize,
    fetched_tx: crossbeam_channel::Sender<FetchedAsset>,
) -> Result<(), AppError> {
    log::info!("Starting asset fetching for {} assets with {} workers", assets.len(), num_workers);

    let semaphore = Arc::new(Semaphore::new(num_workers.max(1)));
    let mut spawned = Vec::with_capacity(assets.len());
    let mut tasks = Vec::with_capacity(assets.len());

    for (position, handle) in assets.into_iter().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Generic(e.to_string()))?;
        let store = store.clone();
        let tx = fetched_tx.clone();
        let task_handle = handle.clone();

        log::trace!("Fetching asset {} ({})", position, handle.id);
        tasks.push(tokio::spawn(async move {
            let fetched = fetch_asset(store.as_ref(), &task_handle).await;
            tx.send(FetchedAsset {
                position,
                handle: task_handle,
                fetched,
                permit: Some(permit),
            })?;
            Ok::<(), AppError>(())
        }));
        spawned.push((position, handle));
    }

    let results = futures::future::join_all(tasks).await;
    for ((position, handle), result) in spawned.into_iter().zip(results) {
        match result {
            Ok(sent) => sent?,
            Err(e) => {
                log::error!("Fetch task for {} failed: {}", handle.id, e);
                fetched_tx.send(FetchedAsset::new(position, handle, Err(AppError::Join(e))))?;
            }
        }
    }

    log::info!("All assets fetched.");
    Ok(())
}

/// Joins the primary and container fetches. A failing primary fetch ends the
/// join early; a failing container fetch only loses the container tags.
async fn fetch_asset(
    store: &dyn AssetStore,
    handle: &AssetHandle,
) -> Result<(PrimaryAsset, ContainerMetadata), AppError> {
    let container = async {
        match store.fetch_container_metadata(handle).await {
            Ok(container) => Ok::<ContainerMetadata, AppError>(container),
            Err(e) => {
                log::warn!("No container metadata for {}: {}", handle.id, e);
                Ok(ContainerMetadata::default())
            }
        }
    };
    tokio::try_join!(store.fetch_primary(handle), container)
}

pub fn start_processing(
    album_name: String,
    num_workers: usize,
    fetched_rx: crossbeam_channel::Receiver<FetchedAsset>,
    processed_tx: crossbeam_channel::Sender<ProcessedAsset>,
) -> Result<(), AppError> {
    log::info!("Starting asset processing with {} workers", num_workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.max(1))
        .build()?;

    pool.install(|| {
        fetched_rx.into_iter().par_bridge().try_for_each(|fetched| {
            let processed = process_asset(&album_name, fetched);
            processed_tx.send(processed)?;
            Ok::<(), AppError>(())
        })
    })?;

    log::info!("All assets processed.");
    Ok(())
}

fn process_asset(album_name: &str, fetched: FetchedAsset) -> ProcessedAsset {
    let FetchedAsset {
        position,
        handle,
        fetched,
        permit,
    } = fetched;
    log::debug!("Processing asset started for: {} ({})", position, handle.id);

    let outcome = fetched.and_then(|(primary, container)| {
        let metadata = extractor::extract(&handle, album_name, &primary, &container)?;
        let hash = hasher::hash(&primary.data);
        log::debug!("Calculated hash for {}: {}", handle.id, hash);
        Ok(metadata.with_content_hash(hash))
    });
    drop(permit);

    if let Err(e) = &outcome {
        log::warn!("Failed to process asset {}: {}", handle.id, e);
    }
    ProcessedAsset {
        position,
        handle,
        outcome,
    }
}
