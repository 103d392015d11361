use crate::actions::AssetActions;
use crate::committer::{self, Committer};
use crate::error::AppError;
use crate::metadata::ScanSummary;
use crate::processor;
use crate::sink::ResultSink;
use crate::store::AssetStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub find_duplicates: bool,
    pub find_non_native: bool,
    pub show_metadata: bool,
    pub silent: bool,
}

pub struct Scanner {
    store: Arc<dyn AssetStore>,
    actions: Arc<dyn AssetActions>,
    num_workers: usize,
}

impl Scanner {
    pub fn new(store: Arc<dyn AssetStore>, actions: Arc<dyn AssetActions>, num_workers: usize) -> Self {
        Self {
            store,
            actions,
            num_workers: num_workers.max(1),
        }
    }

    /// Scans one album. Fails only when the album cannot be enumerated;
    /// per-asset failures are reported through `sink` and the summary.
    pub async fn scan(
        &self,
        album_id: &str,
        options: ScanOptions,
        mut sink: Box<dyn ResultSink>,
    ) -> Result<ScanSummary, AppError> {
        let album = self.store.enumerate_album(album_id).await?;
        let total = album.assets.len();
        log::info!("Scanning album {} ({} assets)", album.info.name, total);
        sink.begin(&album.info, total);

        let (fetched_tx, fetched_rx) = crossbeam_channel::unbounded();
        let (processed_tx, processed_rx) = crossbeam_channel::unbounded();

        let committer = Committer::new(options, total, sink, self.actions.clone());
        let album_name = album.info.name.clone();
        let num_workers = self.num_workers;

        let fetch_handle = tokio::spawn(processor::start_fetching(
            self.store.clone(),
            album.assets,
            num_workers,
            fetched_tx,
        ));

        let processor_handle = tokio::task::spawn_blocking(move || {
            processor::start_processing(album_name, num_workers, fetched_rx, processed_tx)
        });

        let committer_handle = tokio::task::spawn_blocking(move || {
            committer::start_committing(committer, processed_rx)
        });

        let (fetched, processed, summary) =
            tokio::try_join!(fetch_handle, processor_handle, committer_handle)?;
        if let Err(e) = &fetched {
            log::error!("Fetch stage error: {}", e);
        }
        if let Err(e) = &processed {
            log::error!("Processor error: {}", e);
        }
        fetched?;
        processed?;

        log::info!(
            "Scan of album {} complete: {} processed, {} duplicates, {} non-native, {} errors",
            album_id,
            summary.processed,
            summary.duplicates,
            summary.non_native,
            summary.errors
        );
        Ok(summary)
    }
}
