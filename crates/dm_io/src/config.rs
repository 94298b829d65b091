//! crates/dm_io/src/config.rs
//! JSON run configuration. Missing fields take their defaults; the parsed config is
//! validated before it is returned.

use std::fs;
use std::path::Path;

use dm_core::RunConfig;

use crate::{IoError, IoResult};

pub fn parse_run_config(text: &str) -> IoResult<RunConfig> {
    let cfg: RunConfig = serde_json::from_str(text)?;
    cfg.validate().map_err(|e| IoError::Invalid(e.to_string()))?;
    Ok(cfg)
}

pub fn load_run_config(path: &Path) -> IoResult<RunConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_run_config(&text)
}
