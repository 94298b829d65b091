//! crates/dm_io/src/canonical_json.rs
//! Canonical JSON and atomic file writes.
//! - Object keys sorted by UTF-8 byte order; array order kept as given
//! - Compact output, no trailing newline
//! - Atomic write: temp file in the same dir + fsync(temp) + rename; fsync(dir) on Unix.
//!   If rename fails (e.g. cross-device) the target is written directly instead.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::IoResult;

/// Canonical bytes of an already-built JSON value.
pub fn to_canonical_json_bytes(v: &Value) -> IoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(1024);
    write_canonical_value(v, &mut out)?;
    Ok(out)
}

/// Canonical bytes of any serializable value.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    to_canonical_json_bytes(&serde_json::to_value(value)?)
}

/// Serialize `value` canonically and write it to `path` atomically.
pub fn write_canonical_file<T: Serialize>(path: &Path, value: &T) -> IoResult<()> {
    write_atomic(path, &to_canonical_bytes(value)?)
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> IoResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp = make_unique_tmp_path(&parent, path);
    let mut tf = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    tf.write_all(bytes)?;
    tf.sync_all()?;
    drop(tf);

    if fs::rename(&tmp, path).is_ok() {
        let _ = fsync_dir(&parent);
        return Ok(());
    }

    let direct = (|| -> std::io::Result<()> {
        let mut f = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        f.write_all(bytes)?;
        f.sync_all()
    })();
    let _ = fs::remove_file(&tmp);
    direct?;
    let _ = fsync_dir(&parent);
    Ok(())
}

fn write_canonical_value(v: &Value, out: &mut Vec<u8>) -> IoResult<()> {
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => out.extend_from_slice(serde_json::to_string(s)?.as_bytes()),
        Value::Array(arr) => {
            out.push(b'[');
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_value(elem, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(serde_json::to_string(k)?.as_bytes());
                out.push(b':');
                write_canonical_value(&map[k], out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// "<filename>.<pid>.<counter>.tmp" inside `dir`.
fn make_unique_tmp_path(dir: &Path, target: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let fname = target.file_name().and_then(|s| s.to_str()).unwrap_or("artifact");
    dir.join(format!("{fname}.{pid}.{n}.tmp"))
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> std::io::Result<()> {
    OpenOptions::new().read(true).open(dir)?.sync_all()
}

#[cfg(not(unix))]
#[inline]
fn fsync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_shaped_value_is_sorted_and_compact() {
        let v = json!({
            "tool": "dm",
            "config": { "seed": 7, "grid_size": 4 },
            "targets": [ {"to":1,"from":0}, 0.5, "rook" ]
        });
        let s = String::from_utf8(to_canonical_json_bytes(&v).unwrap()).unwrap();
        assert_eq!(
            s,
            r#"{"config":{"grid_size":4,"seed":7},"targets":[{"from":0,"to":1},0.5,"rook"],"tool":"dm"}"#
        );
        assert!(!s.ends_with('\n'));
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("record.json");
        write_canonical_file(&path, &json!({"z": 0, "a": [1, 2]})).unwrap();
        write_canonical_file(&path, &json!({"a": true})).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"a":true}"#);
        let leftovers = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().map_or(false, |x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
