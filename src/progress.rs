//! Progress-callback trait for per-step generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::ReferenceConfigBuilder::progress_callback`] to be told
//! when each step starts and ends. The binary uses this to drive a spinner
//! while a slow external program (LibreOffice, ImageMagick) runs.
//!
//! # Example
//!
//! ```rust
//! use pptx_refgen::{GenerationProgressCallback, ReferenceConfig, Step};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl GenerationProgressCallback for Printer {
//!     fn on_step_complete(&self, step: Step, detail: &str) {
//!         eprintln!("{step} done: {detail}");
//!     }
//! }
//!
//! let config = ReferenceConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One stage of a reference-generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Writing the JSON metadata stub.
    Metadata,
    /// Converting the slide deck to PDF (LibreOffice or Preview).
    OfficeConversion,
    /// Rendering the PDF into PNG files.
    Rasterize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Metadata => "metadata",
            Step::OfficeConversion => "PDF conversion",
            Step::Rasterize => "rasterization",
        })
    }
}

/// Called by the orchestrator around each step.
///
/// Steps run one at a time, so events never overlap. All methods default
/// to no-ops.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called just before a step begins.
    fn on_step_start(&self, step: Step) {
        let _ = step;
    }

    /// Called when a step succeeds.
    ///
    /// # Arguments
    /// * `step`   — the finished step
    /// * `detail` — short human-readable result (a path, an image count)
    fn on_step_complete(&self, step: Step, detail: &str) {
        let _ = (step, detail);
    }

    /// Called when a step fails. The run may continue afterwards.
    fn on_step_error(&self, step: Step, error: &str) {
        let _ = (step, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReferenceConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
