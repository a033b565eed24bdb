//! Metadata stub writer.
//!
//! The record is a fixed template: nothing in it is derived from the deck's
//! contents. It lands next to the input with a `.json` extension and is
//! rewritten from scratch on every run.

use crate::error::RefGenError;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Value of the `method` field.
pub const METADATA_METHOD: &str = "manual";

/// Value of the `dpi` field.
pub const METADATA_DPI: u32 = 300;

/// The on-disk metadata stub. Field order is the serialised key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    /// The input path as given.
    pub source: String,
    /// Local time of generation, ISO-8601. Microseconds are appended only
    /// when non-zero.
    pub generated: String,
    pub method: String,
    pub dpi: u32,
    /// Always empty.
    pub slides: Vec<serde_json::Value>,
}

impl ReferenceMetadata {
    /// Build the stub for `source`, stamped with the current local time.
    pub fn new(source: &Path) -> Self {
        Self::at(source, Local::now().naive_local())
    }

    /// Build the stub with an explicit timestamp.
    pub fn at(source: &Path, generated: NaiveDateTime) -> Self {
        Self {
            source: source.display().to_string(),
            generated: iso_timestamp(generated),
            method: METADATA_METHOD.to_string(),
            dpi: METADATA_DPI,
            slides: Vec::new(),
        }
    }

    /// Pretty JSON, two-space indent, no trailing newline.
    pub fn to_json(&self) -> Result<String, RefGenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn iso_timestamp(ts: NaiveDateTime) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// `deck.pptx` → `deck.json`; `deck` → `deck.json`.
pub fn metadata_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

/// Write the stub for `input` and return where it went.
///
/// The file is written to a temp file in the same directory and renamed
/// into place, so readers never observe a half-written stub. A symlinked
/// stub is written through: the link's target is replaced, not the link.
pub async fn write_metadata(input: &Path) -> Result<PathBuf, RefGenError> {
    let metadata = ReferenceMetadata::new(input);
    let path = metadata_path(input);
    let json = metadata.to_json()?;

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&target, json.as_bytes()))
        .await
        .map_err(|e| RefGenError::Internal(format!("Metadata task panicked: {}", e)))??;

    info!("Generated metadata: {}", path.display());
    Ok(path)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), RefGenError> {
    let write_err = |source: std::io::Error| RefGenError::MetadataWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".refgen-");
    // Same mode a plain create would get: 0666 minus the umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let mut tmp = builder.tempfile_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;

    tmp.persist(&path).map_err(|e| write_err(e.error))?;
    Ok(())
}
