//! Local JSON cache files: write-through after a successful sync, fallback
//! reads when a live fetch fails. Writes go through a temp file + rename so a
//! reader never observes partially written content.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}

/// Read and parse a JSON file; None on absence or an unparseable payload.
pub fn read_json_if_exists(path: &Path) -> Option<Value> {
    let raw = fs::read(path).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// First parseable file among candidates, in order.
pub fn read_first_json(paths: &[PathBuf]) -> Option<Value> {
    paths.iter().find_map(|p| read_json_if_exists(p))
}

/// Serialize to `<path>.tmp` and rename over the target.
pub fn write_json_atomic(path: &Path, value: &Value) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let body = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)
}
