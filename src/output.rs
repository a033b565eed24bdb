//! Result types returned by a reference-generation run.

use crate::pipeline::process::ToolCommand;
use crate::progress::Step;
use serde::Serialize;
use std::path::PathBuf;

/// The external commands that would turn the input into reference images.
///
/// In a dry run these are only printed; with `execute` the same values are
/// spawned.
#[derive(Debug, Clone, Serialize)]
pub struct CommandPlan {
    /// LibreOffice headless PDF export into the reference directory.
    pub office: ToolCommand,
    /// Rasterizer hint with a `<pdf_file>` placeholder. `None` when
    /// ImageMagick was not found by the probe.
    pub rasterize: Option<ToolCommand>,
}

/// Files produced by one rasterizer run.
#[derive(Debug, Clone, Serialize)]
pub struct RasterOutput {
    pub output_dir: PathBuf,
    /// `slide-N.png` files found afterwards, ordered by `N`.
    pub images: Vec<PathBuf>,
}

/// A step that failed without aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub message: String,
}

/// What execute mode actually did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOutcome {
    /// The PDF that was rasterised (the input itself when it was a PDF).
    pub pdf: Option<PathBuf>,
    pub images: Vec<PathBuf>,
    pub failures: Vec<StepFailure>,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a single run produced or planned.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub input: PathBuf,
    pub reference_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub plan: CommandPlan,
    /// `None` for a dry run.
    pub execution: Option<ExecutionOutcome>,
}
