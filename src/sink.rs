use crate::error::AppError;
use crate::metadata::{AssetHandle, AssetMetadata, ScanSummary};
use crate::store::AlbumInfo;
use chrono::Local;
use std::io::Write;

/// Receives everything a scan reports, in commit order.
pub trait ResultSink: Send {
    fn begin(&mut self, album: &AlbumInfo, total: usize);
    fn record(&mut self, metadata: &AssetMetadata);
    fn duplicate(&mut self, duplicate: &AssetMetadata, original: &AssetMetadata);
    fn non_native(&mut self, metadata: &AssetMetadata);
    fn asset_error(&mut self, position: usize, handle: &AssetHandle, error: &AppError);
    fn summary(&mut self, summary: &ScanSummary);
}

/// Writes one line per event to any writer, stdout in the binary.
pub struct LineSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            log::warn!("Failed to write scan output: {}", e);
        }
    }
}

impl<W: Write + Send> ResultSink for LineSink<W> {
    fn begin(&mut self, album: &AlbumInfo, total: usize) {
        self.line(&format!("Total number of assets in album {}: {}", album.name, total));
    }

    fn record(&mut self, metadata: &AssetMetadata) {
        match serde_json::to_string(metadata) {
            Ok(json) => self.line(&json),
            Err(e) => log::warn!("Failed to serialize metadata for {}: {}", metadata.id, e),
        }
    }

    fn duplicate(&mut self, duplicate: &AssetMetadata, original: &AssetMetadata) {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.line(&format!(
            "{} Duplicate found! Name: {}, id: {} is duplicate with file name: {}, id: {}",
            now, duplicate.filename, duplicate.id, original.filename, original.id
        ));
    }

    fn non_native(&mut self, metadata: &AssetMetadata) {
        self.line(&format!(
            "Non-apple asset found: {}, id: {}",
            metadata.filename, metadata.id
        ));
    }

    fn asset_error(&mut self, position: usize, handle: &AssetHandle, error: &AppError) {
        self.line(&format!(
            "Error: cannot get asset data {} ({}): {}",
            position, handle.id, error
        ));
    }

    fn summary(&mut self, summary: &ScanSummary) {
        self.line(&format!(
            "Summary: total={} processed={} duplicates={} non_native={} errors={}",
            summary.total, summary.processed, summary.duplicates, summary.non_native, summary.errors
        ));
        if let Err(e) = self.out.flush() {
            log::warn!("Failed to flush scan output: {}", e);
        }
    }
}
