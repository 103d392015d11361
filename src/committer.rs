use crate::actions::AssetActions;
use crate::classifier::{self, Origin};
use crate::duplicates::{DuplicateIndex, Resolution};
use crate::metadata::ScanSummary;
use crate::processor::ProcessedAsset;
use crate::scanner::ScanOptions;
use crate::sink::ResultSink;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Single writer of the duplicate index and the summary.
///
/// Results may arrive in any order; they are held back until every earlier
/// position has been committed, so the first asset in enumeration order is
/// always the canonical one for its hash.
pub struct Committer {
    options: ScanOptions,
    sink: Box<dyn ResultSink>,
    actions: Arc<dyn AssetActions>,
    index: DuplicateIndex,
    summary: ScanSummary,
    pending: BTreeMap<usize, ProcessedAsset>,
    next: usize,
}

impl Committer {
    pub fn new(
        options: ScanOptions,
        total: usize,
        sink: Box<dyn ResultSink>,
        actions: Arc<dyn AssetActions>,
    ) -> Self {
        Self {
            options,
            sink,
            actions,
            index: DuplicateIndex::new(),
            summary: ScanSummary {
                total,
                ..ScanSummary::default()
            },
            pending: BTreeMap::new(),
            next: 0,
        }
    }

    pub fn accept(&mut self, asset: ProcessedAsset) {
        if asset.position < self.next || self.pending.contains_key(&asset.position) {
            log::warn!("Ignoring repeated result for position {}", asset.position);
            return;
        }
        if asset.position > self.next {
            log::trace!(
                "Holding back position {} until {} is committed",
                asset.position,
                self.next
            );
        }
        self.pending.insert(asset.position, asset);
        while let Some(asset) = self.pending.remove(&self.next) {
            self.commit(asset);
            self.next += 1;
        }
    }

    fn commit(&mut self, asset: ProcessedAsset) {
        let ProcessedAsset {
            position,
            handle,
            outcome,
        } = asset;

        let metadata = match outcome {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Skipping asset {} ({}): {}", position, handle.id, e);
                self.summary.errors += 1;
                self.sink.asset_error(position, &handle, &e);
                return;
            }
        };

        self.summary.processed += 1;
        if self.options.show_metadata {
            self.sink.record(&metadata);
        }

        let mut mark_favorite = false;
        if let Resolution::DuplicateOf(original) = self.index.resolve(&metadata.content_hash, &metadata) {
            log::debug!("{} is a duplicate of {}", metadata.id, original.id);
            self.summary.duplicates += 1;
            if self.options.find_duplicates {
                mark_favorite = true;
                if !self.options.silent {
                    self.sink.duplicate(&metadata, original);
                }
            }
        }

        if classifier::classify(&metadata) == Origin::NonNative {
            log::debug!("{} has no resolvable maker", metadata.id);
            self.summary.non_native += 1;
            if self.options.find_non_native {
                mark_favorite = true;
                if !self.options.silent {
                    self.sink.non_native(&metadata);
                }
            }
        }

        if mark_favorite {
            self.actions.mark_favorite(&handle);
        }
    }

    /// Counts positions that never arrived as errors and emits the summary.
    pub fn finish(mut self) -> ScanSummary {
        while self.next < self.summary.total {
            match self.pending.remove(&self.next) {
                Some(asset) => self.commit(asset),
                None => {
                    log::error!("Asset at position {} never completed", self.next);
                    self.summary.errors += 1;
                }
            }
            self.next += 1;
        }
        if !self.index.is_empty() {
            log::info!("{} distinct contents among committed assets", self.index.len());
        }
        self.sink.summary(&self.summary);
        self.summary
    }
}

pub fn start_committing(
    mut committer: Committer,
    processed_rx: crossbeam_channel::Receiver<ProcessedAsset>,
) -> ScanSummary {
    log::info!("Starting ordered commit of scan results");

    for asset in processed_rx {
        committer.accept(asset);
    }

    let summary = committer.finish();
    log::info!("All scan results committed.");
    summary
}
