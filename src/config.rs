use serde::Deserialize;
use std::collections::HashSet;
use config::{Config, ConfigError, Environment, File};

const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "tif", "tiff", "gif", "webp", "bmp", "mov", "mp4",
    "m4v", "3gp", "avi", "mkv", "webm",
];

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub library_path: String,
    pub allowed_extensions: HashSet<String>,
    pub num_workers: usize,
    pub log_level: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("library_path", ".")?
            .set_default("allowed_extensions", DEFAULT_EXTENSIONS.to_vec())?
            .set_default("num_workers", 4_i64)?
            .set_default("log_level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("ALBUM_SCANNER"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.normalize();
        Ok(config)
    }

    /// Lower-cases extensions and clamps the worker count to at least one.
    pub fn normalize(&mut self) {
        self.allowed_extensions = self
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self.num_workers = self.num_workers.max(1);
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_path: ".".to_string(),
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            num_workers: 4,
            log_level: "info".to_string(),
        }
    }
}
