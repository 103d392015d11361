mod common;

use album_scanner::actions::StoreActions;
use album_scanner::error::AppError;
use album_scanner::metadata::{AssetKind, ContainerMetadata, MetadataItem, ScanSummary};
use album_scanner::scanner::{ScanOptions, Scanner};
use album_scanner::store_clients::memory::{MemoryAsset, MemoryStore};
use common::{at, png, quicktime, CollectingSink, Event};
use std::sync::Arc;
use std::time::Duration;

fn all_modes() -> ScanOptions {
    ScanOptions {
        find_duplicates: true,
        find_non_native: true,
        show_metadata: true,
        silent: false,
    }
}

async fn scan(
    store: Arc<MemoryStore>,
    album_id: &str,
    options: ScanOptions,
) -> (Result<ScanSummary, AppError>, CollectingSink) {
    let actions = Arc::new(StoreActions::new(store.clone()));
    let scanner = Scanner::new(store, actions.clone(), 4);
    let sink = CollectingSink::default();
    let result = scanner.scan(album_id, options, Box::new(sink.clone())).await;
    actions.flush().await;
    (result, sink)
}

#[tokio::test]
async fn newer_copy_is_canonical_and_older_is_duplicate() {
    let content = png(4, 4, 10);
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Holiday",
        vec![
            MemoryAsset::new("id-a", "a.jpg", at(1_000), content.clone()),
            MemoryAsset::new("id-b", "b.jpg", at(2_000), content),
        ],
    ));

    let (result, sink) = scan(store.clone(), "album-1", all_modes()).await;
    let summary = result.unwrap();

    assert_eq!(sink.duplicates(), vec![("a.jpg".to_string(), "b.jpg".to_string())]);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.processed, 2);
    let records = sink.records();
    assert_eq!(records[0].filename, "b.jpg");
    assert_eq!(records[0].content_hash, records[1].content_hash);
    assert!(store.favorite_calls().contains(&("id-a".to_string(), true)));
}

#[tokio::test]
async fn video_with_apple_make_is_native() {
    let container = ContainerMetadata {
        items: vec![MetadataItem::new("com.apple.quicktime.make", "Apple")],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Clips",
        vec![MemoryAsset::new("id-v", "IMG_0001.MOV", at(1), quicktime()).with_container(container)],
    ));

    let (result, sink) = scan(store.clone(), "album-1", all_modes()).await;
    let summary = result.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, AssetKind::Video);
    assert_eq!(records[0].lens_maker, "Apple");
    assert_eq!(summary.non_native, 0);
    assert!(!sink.events().iter().any(|e| matches!(e, Event::NonNative(_))));
    assert!(store.favorite_calls().is_empty());
}

#[tokio::test]
async fn unknown_album_aborts_without_output() {
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Holiday",
        vec![MemoryAsset::new("id-a", "a.jpg", at(1), png(1, 1, 0))],
    ));

    let (result, sink) = scan(store, "does-not-exist", all_modes()).await;

    assert!(matches!(result, Err(AppError::AlbumNotFound(ref id)) if id == "does-not-exist"));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn undecodable_asset_is_counted_once_and_scan_continues() {
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Mixed",
        vec![
            MemoryAsset::new("id-1", "one.png", at(3), png(2, 2, 1)),
            MemoryAsset::new("id-2", "broken.jpg", at(2), b"not an image at all".to_vec()),
            MemoryAsset::new("id-3", "three.png", at(1), png(2, 2, 3)),
        ],
    ));

    let (result, sink) = scan(store, "album-1", all_modes()).await;
    let summary = result.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.total, 3);
    let errors: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Error { .. }))
        .collect();
    assert_eq!(
        errors,
        vec![Event::Error {
            position: 1,
            id: "id-2".to_string()
        }]
    );
    assert!(matches!(sink.events().last(), Some(Event::Summary(_))));
}

#[tokio::test]
async fn failed_primary_fetch_is_an_asset_error() {
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Mixed",
        vec![
            MemoryAsset::new("id-1", "one.png", at(2), png(2, 2, 1)).failing_fetch(),
            MemoryAsset::new("id-2", "two.png", at(1), png(2, 2, 2)),
        ],
    ));

    let (result, _sink) = scan(store, "album-1", ScanOptions::default()).await;
    let summary = result.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.processed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_first_asset_still_wins_canonical() {
    let content = png(8, 8, 77);
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Burst",
        vec![
            MemoryAsset::new("id-1", "first.png", at(40), content.clone())
                .with_fetch_delay(Duration::from_millis(80)),
            MemoryAsset::new("id-2", "second.png", at(30), content.clone()),
            MemoryAsset::new("id-3", "third.png", at(20), content.clone()),
            MemoryAsset::new("id-4", "fourth.png", at(10), content),
        ],
    ));

    let (result, sink) = scan(store, "album-1", all_modes()).await;
    let summary = result.unwrap();

    assert_eq!(
        sink.duplicates(),
        vec![
            ("second.png".to_string(), "first.png".to_string()),
            ("third.png".to_string(), "first.png".to_string()),
            ("fourth.png".to_string(), "first.png".to_string()),
        ]
    );
    assert_eq!(summary.duplicates, 3);
}

#[tokio::test]
async fn repeated_scans_are_identical() {
    let shared = png(3, 3, 5);
    let container = ContainerMetadata {
        composable: true,
        adjusted: true,
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Mixed",
        vec![
            MemoryAsset::new("id-1", "a.png", at(5), shared.clone()),
            MemoryAsset::new("id-2", "b.png", at(4), png(3, 3, 9)),
            MemoryAsset::new("id-3", "c.png", at(3), shared),
            MemoryAsset::new("id-4", "d.mov", at(2), quicktime()).with_container(container),
            MemoryAsset::new("id-5", "e.bin", at(1), vec![1, 2, 3]),
        ],
    ));
    let options = ScanOptions {
        show_metadata: false,
        ..all_modes()
    };

    let (first, first_sink) = scan(store.clone(), "album-1", options).await;
    let (second, second_sink) = scan(store, "album-1", options).await;

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(first_sink.events(), second_sink.events());
    assert_eq!(first_sink.duplicates(), vec![("c.png".to_string(), "a.png".to_string())]);
}

#[tokio::test]
async fn silent_scan_reports_only_summary_but_marks_favorites() {
    let content = png(2, 2, 200);
    let store = Arc::new(
        MemoryStore::new()
            .with_album(
                "album-1",
                "Holiday",
                vec![
                    MemoryAsset::new("id-1", "new.png", at(2), content.clone()),
                    MemoryAsset::new("id-2", "old.png", at(1), content),
                ],
            )
            .with_failing_favorite("id-2"),
    );
    let options = ScanOptions {
        find_duplicates: true,
        silent: true,
        ..ScanOptions::default()
    };

    let (result, sink) = scan(store.clone(), "album-1", options).await;
    let summary = result.unwrap();

    let kinds: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| !matches!(e, Event::Begin { .. }))
        .collect();
    assert_eq!(kinds, vec![Event::Summary(summary)]);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(store.favorite_calls(), vec![("id-2".to_string(), true)]);
}

#[tokio::test]
async fn empty_resource_list_reports_na_filename() {
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Holiday",
        vec![MemoryAsset::new("id-1", "ignored.png", at(1), png(1, 1, 1)).without_resources()],
    ));

    let (result, sink) = scan(store, "album-1", all_modes()).await;
    result.unwrap();

    assert_eq!(sink.records()[0].filename, "NA");
    let non_native = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::NonNative(name) if name == "NA"))
        .count();
    assert_eq!(non_native, 1);
}

#[tokio::test]
async fn non_native_mode_marks_only_assets_without_maker() {
    let apple = || ContainerMetadata {
        items: vec![MetadataItem::new("com.apple.quicktime.make", "Apple")],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new().with_album(
        "album-1",
        "Mixed",
        vec![
            MemoryAsset::new("id-png", "scan.png", at(3), png(2, 2, 60)),
            MemoryAsset::new("id-v1", "IMG_0001.MOV", at(2), quicktime()).with_container(apple()),
            MemoryAsset::new("id-v2", "IMG_0002.MOV", at(1), quicktime()).with_container(apple()),
        ],
    ));
    let options = ScanOptions {
        find_non_native: true,
        ..ScanOptions::default()
    };

    let (result, sink) = scan(store.clone(), "album-1", options).await;
    let summary = result.unwrap();

    assert_eq!(store.favorite_calls(), vec![("id-png".to_string(), true)]);
    assert_eq!(summary.non_native, 1);
    assert_eq!(summary.duplicates, 1);
    assert!(sink.duplicates().is_empty());
    let non_native: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::NonNative(_)))
        .collect();
    assert_eq!(non_native, vec![Event::NonNative("scan.png".to_string())]);
}
