//! # treeinfo - ROOT TTree variable extraction
//!
//! Scans C++ sources that build ROOT `TTree`s and records, for every branch,
//! where it is declared, where its value variable is assigned and which
//! comments mention it.
//!
//! treeinfo provides:
//! - A pluggable scanner producing typed events with file/line provenance
//! - A loader that resolves those events into a five-table SQLite store
//! - CSV and HTML exporters over the joined store

pub mod model;
pub mod storage;
pub mod scanner;
pub mod loader;
pub mod report;
pub mod sources;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use model::{BranchId, FileId, TreeId};
pub use storage::TreeStore;
pub use scanner::{ScanEvent, Scanner, ScannerRegistry};
pub use loader::{Loader, LoadStats};
pub use report::{ReportRow, UrlTemplate};

use std::path::PathBuf;

/// Result type alias for treeinfo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for treeinfo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{file}:{line}: branch refers to unknown tree '{tree}'")]
    UnknownTree {
        tree: String,
        file: String,
        line: u32,
    },

    #[error("{file}:{line}: unknown branch '{branch}' of tree '{tree}'")]
    UnknownBranch {
        tree: String,
        branch: String,
        file: String,
        line: u32,
    },

    #[error("{entity} event at line {line} has no source filename")]
    MissingFilename { entity: &'static str, line: u32 },

    #[error("{file}:{line}: unrecognized Branch syntax: {text}")]
    UnrecognizedBranch {
        file: String,
        line: u32,
        text: String,
    },

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
