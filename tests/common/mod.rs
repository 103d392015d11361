#![allow(dead_code)]

use album_scanner::error::AppError;
use album_scanner::metadata::{AssetHandle, AssetMetadata, ScanSummary};
use album_scanner::sink::ResultSink;
use album_scanner::store::AlbumInfo;
use chrono::{DateTime, TimeZone, Utc};
use image::ImageEncoder;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Begin { album: String, total: usize },
    Record(AssetMetadata),
    Duplicate { duplicate: String, original: String },
    NonNative(String),
    Error { position: usize, id: String },
    Summary(ScanSummary),
}

/// Sink that keeps every event for inspection after the scan.
#[derive(Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn duplicates(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Duplicate { duplicate, original } => Some((duplicate, original)),
                _ => None,
            })
            .collect()
    }

    pub fn records(&self) -> Vec<AssetMetadata> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Record(metadata) => Some(metadata),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ResultSink for CollectingSink {
    fn begin(&mut self, album: &AlbumInfo, total: usize) {
        self.push(Event::Begin {
            album: album.name.clone(),
            total,
        });
    }

    fn record(&mut self, metadata: &AssetMetadata) {
        self.push(Event::Record(metadata.clone()));
    }

    fn duplicate(&mut self, duplicate: &AssetMetadata, original: &AssetMetadata) {
        self.push(Event::Duplicate {
            duplicate: duplicate.filename.clone(),
            original: original.filename.clone(),
        });
    }

    fn non_native(&mut self, metadata: &AssetMetadata) {
        self.push(Event::NonNative(metadata.filename.clone()));
    }

    fn asset_error(&mut self, position: usize, handle: &AssetHandle, _error: &AppError) {
        self.push(Event::Error {
            position,
            id: handle.id.clone(),
        });
    }

    fn summary(&mut self, summary: &ScanSummary) {
        self.push(Event::Summary(*summary));
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let pixels = vec![shade; (width * height * 3) as usize];
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(&pixels, width, height, image::ColorType::Rgb8)
        .unwrap();
    buffer
}

/// Smallest QuickTime file the extractor recognises as a video.
pub fn quicktime() -> Vec<u8> {
    let mut data = vec![0, 0, 0, 20];
    data.extend_from_slice(b"ftypqt  \0\0\0\0qt  ");
    data
}
