//! crates/dm_io/src/record.rs
//! Run record: what was run, with which seed, and digests of every artifact written.
//! Serialized as canonical JSON so identical runs produce byte-identical records.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dm_core::RunConfig;

use crate::canonical_json::write_canonical_file;
use crate::hasher::sha256_file;
use crate::IoResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Chain counters copied out of the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub samples: u64,
    pub proposals: u64,
    pub accepted: u64,
    pub rejected_balance: u64,
    pub rejected_contiguity: u64,
    pub stall_scans: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub tool: String,
    pub version: String,
    pub command: String,
    /// Effective seed, after CLI override or OS draw.
    pub seed: u64,
    pub config: RunConfig,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chain: Option<ChainSummary>,
    /// Keyed by artifact role (e.g. "ensemble", "samples").
    pub artifacts: BTreeMap<String, ArtifactDigest>,
}

impl RunRecord {
    pub fn new(command: &str, seed: u64, config: RunConfig) -> Self {
        Self {
            tool: "dm".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            command: command.to_string(),
            seed,
            config,
            chain: None,
            artifacts: BTreeMap::new(),
        }
    }

    /// Hash an artifact already on disk and file it under `role`.
    pub fn add_artifact(&mut self, role: &str, path: &Path) -> IoResult<()> {
        let sha256 = sha256_file(path)?;
        let bytes = fs::metadata(path)?.len();
        self.artifacts.insert(
            role.to_string(),
            ArtifactDigest { path: path.display().to_string(), sha256, bytes },
        );
        Ok(())
    }

    pub fn write(&self, path: &Path) -> IoResult<()> {
        write_canonical_file(path, self)
    }

    pub fn read(path: &Path) -> IoResult<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
