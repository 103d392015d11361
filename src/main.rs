use album_scanner::actions::StoreActions;
use album_scanner::config::AppConfig;
use album_scanner::error::AppError;
use album_scanner::scanner::{ScanOptions, Scanner};
use album_scanner::sink::LineSink;
use album_scanner::store::AssetStore;
use album_scanner::store_clients::filesystem::FilesystemStore;
use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::info;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "album-scanner",
    about = "Find duplicate and non-native photos and videos in an album"
)]
struct Cli {
    /// List all albums with some metadata.
    #[arg(short = 'l', long)]
    list: bool,

    /// Count all assets in the library.
    #[arg(short = 'c', long)]
    count: bool,

    /// List assets in an album with their metadata. Requires <ALBUM_ID>.
    #[arg(short = 'L', long)]
    list_photos: bool,

    /// Find assets that were not captured by an Apple device. Requires <ALBUM_ID>.
    #[arg(short = 'f', long)]
    find_non_apple_photos: bool,

    /// Find duplicate assets. Requires <ALBUM_ID>.
    #[arg(short = 'd', long)]
    find_duplicates: bool,

    /// Only show the summary at the end of a scan.
    #[arg(short = 's', long)]
    silent: bool,

    /// Library root, overriding the configured `library_path`.
    #[arg(long)]
    library: Option<String>,

    /// Number of concurrent workers, overriding the configured `num_workers`.
    #[arg(long)]
    workers: Option<usize>,

    /// Id of the album (as returned by -l).
    album_id: Option<String>,
}

impl Cli {
    fn scan_requested(&self) -> bool {
        self.list_photos || self.find_non_apple_photos || self.find_duplicates
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.list || self.count || self.scan_requested()) {
            return Err(
                "Please use '-l' to list albums or '-c' to count assets or '-f', '-d' or '-L' with an album id"
                    .to_string(),
            );
        }
        if self.scan_requested() && self.album_id.as_deref().map_or(true, str::is_empty) {
            return Err("Please provide an album id".to_string());
        }
        Ok(())
    }

    fn options(&self) -> ScanOptions {
        ScanOptions {
            find_duplicates: self.find_duplicates,
            find_non_native: self.find_non_apple_photos,
            show_metadata: self.list_photos,
            silent: self.silent,
        }
    }
}

async fn list_albums(store: &dyn AssetStore) -> Result<(), AppError> {
    println!("Listing all albums");
    for album in store.list_albums().await? {
        let start = album.start_date.map_or_else(|| "NA".to_string(), |d| d.to_string());
        let end = album.end_date.map_or_else(|| "NA".to_string(), |d| d.to_string());
        println!(
            "id: {}\tcount: {}\tstart date: {}\tend date: {}\tname: {}",
            album.id, album.asset_count, start, end, album.name
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(message) = cli.validate() {
        Cli::command().error(ErrorKind::MissingRequiredArgument, message).exit();
    }

    let mut config = AppConfig::new()?;
    if let Some(library) = &cli.library {
        config.library_path = library.clone();
    }
    if let Some(workers) = cli.workers {
        config.num_workers = workers;
    }
    config.normalize();

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting album-scanner on {}", config.library_path);

    let store: Arc<dyn AssetStore> = Arc::new(FilesystemStore::new(&config)?);

    if cli.list {
        list_albums(store.as_ref()).await?;
    }
    if cli.count {
        let count = store.count_assets().await?;
        println!("Total number of assets in library: {}", count);
    }
    if cli.scan_requested() {
        let album_id = cli.album_id.clone().unwrap_or_default();
        let actions = Arc::new(StoreActions::new(store.clone()));
        let scanner = Scanner::new(store.clone(), actions.clone(), config.num_workers);
        let sink = Box::new(LineSink::new(std::io::stdout()));

        let result = scanner.scan(&album_id, cli.options(), sink).await;
        actions.flush().await;
        match result {
            Ok(summary) => info!("Scan finished: {:?}", summary),
            Err(AppError::AlbumNotFound(id)) => {
                bail!("There is a problem with opening album '{}'. Please check if the album id is correct.", id)
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("album-scanner finished");
    Ok(())
}
