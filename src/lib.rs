pub mod actions;
pub mod classifier;
pub mod committer;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod extractor;
pub mod hasher;
pub mod metadata;
pub mod processor;
pub mod scanner;
pub mod sink;
pub mod store;
pub mod store_clients;

pub use crate::error::{AppError, Result};
pub use crate::scanner::{ScanOptions, Scanner};
