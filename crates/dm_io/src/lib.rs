//! crates/dm_io/src/lib.rs
//! Boundary I/O for the districting engine. Nothing here runs inside a sampling loop.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - Canonical JSON + atomic writes, SHA-256 digests, run-config loading,
//!   CSV artifacts (ensembles, voter samples, seat points, edge lists), and the run record.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for dm_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (create_dir_all, rename, fsync, read).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors.
    #[error("json error: {0}")]
    Json(String),

    /// Malformed CSV artifact; `line` is 1-based.
    #[error("csv error at line {line}: {msg}")]
    Csv { line: usize, msg: String },

    /// Input parsed but failed validation.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json(e.to_string())
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            return IoError::Path(e.to_string());
        }
        let line = e.position().map_or(0, |p| p.line() as usize);
        IoError::Csv { line, msg: e.to_string() }
    }
}

impl From<dm_core::CoreError> for IoError {
    fn from(e: dm_core::CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod config;
pub mod artifacts;
pub mod record;

pub mod prelude {
    pub use crate::{IoError, IoResult};

    pub use crate::artifacts::{
        read_edge_list_csv, read_ensemble_csv, write_ensemble_csv, write_samples_csv,
        write_seat_points_csv, SampleRow,
    };
    pub use crate::canonical_json::{to_canonical_json_bytes, write_atomic, write_canonical_file};
    pub use crate::config::{load_run_config, parse_run_config};
    pub use crate::hasher::{sha256_file, sha256_hex};
    pub use crate::record::{ArtifactDigest, ChainSummary, RunRecord};
}
