//! Input resolution: validate a user-supplied path before anything is
//! written to disk.
//!
//! Nothing may be created for a missing input, so this check runs before
//! the reference directory or the metadata stub are touched.

use crate::error::RefGenError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What kind of document the input is, judged by extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Already a PDF; the office conversion step is skipped.
    Pdf,
    /// Anything else (`.pptx`, `.key`, `.odp`, …), handed to LibreOffice as-is.
    Deck,
}

/// A validated input path.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    path: PathBuf,
    stem: String,
    kind: InputKind,
}

impl ResolvedInput {
    /// The path exactly as supplied.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its final extension; names the reference directory.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }
}

/// Classify a path by its extension.
pub fn input_kind(path: &Path) -> InputKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => InputKind::Pdf,
        _ => InputKind::Deck,
    }
}

/// Validate that `path` exists and has a usable file stem.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<ResolvedInput, RefGenError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(RefGenError::FileNotFound { path });
    }

    let stem = match path.file_stem() {
        Some(s) if !s.is_empty() => s.to_string_lossy().into_owned(),
        _ => {
            return Err(RefGenError::InvalidInput {
                path,
                reason: "path has no file name to derive a reference directory from".into(),
            })
        }
    };

    let kind = input_kind(&path);
    debug!("Resolved input {} ({:?}, stem '{}')", path.display(), kind, stem);

    Ok(ResolvedInput { path, stem, kind })
}
