//! Error types for the pptx-refgen library.
//!
//! Every fallible operation returns [`RefGenError`]. The orchestrator in
//! [`crate::generate`] decides which of these are fatal: a missing input
//! aborts the run, while a failed conversion step is recorded in the
//! [`crate::output::GenerationReport`] and the run carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pptx-refgen library.
#[derive(Debug, Error)]
pub enum RefGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// The input exists but cannot be used (no file stem, not a file, …).
    #[error("Invalid input '{}': {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    // ── External tool errors ──────────────────────────────────────────────
    /// The program could not be spawned because it is not on PATH.
    #[error("{tool} is not installed (could not run '{program}')\nInstall it or point the matching --*-program option at it.")]
    ToolNotFound { tool: String, program: String },

    /// The program ran but exited unsuccessfully.
    #[error("{tool} failed ({program}, exit {}): {stderr}", exit_label(.exit_code))]
    ToolFailed {
        tool: String,
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The program did not finish within the configured timeout.
    #[error("{tool} timed out after {secs}s\nIncrease --tool-timeout or drop it to wait indefinitely.")]
    ToolTimeout { tool: String, secs: u64 },

    /// The program reported success but the expected output never appeared.
    #[error("Expected output was not produced: '{}'", .path.display())]
    OutputMissing { path: PathBuf },

    /// The requested operation only works on another operating system.
    #[error("{feature} is only available on {required}")]
    UnsupportedPlatform {
        feature: &'static str,
        required: &'static str,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory.
    #[error("Failed to create directory '{}': {source}", .path.display())]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the metadata stub.
    #[error("Failed to write metadata file '{}': {source}", .path.display())]
    MetadataWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be serialised.
    #[error("Failed to serialise metadata: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}
