//! Run orchestration: validate the input, write the metadata stub, plan the
//! conversion commands and, in execute mode, run them.
//!
//! Only input and filesystem errors are fatal. External-tool failures in
//! execute mode are caught, logged, handed to the progress callback and
//! recorded in [`ExecutionOutcome::failures`]; the run still returns `Ok`.

use crate::config::ReferenceConfig;
use crate::error::RefGenError;
use crate::output::{CommandPlan, ExecutionOutcome, GenerationReport, StepFailure};
use crate::pipeline::input::{self, InputKind, ResolvedInput};
use crate::pipeline::{metadata, office, preview, rasterize};
use crate::progress::Step;
use crate::tools::{self, DependencyReport, Tool};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `<references_root>/<input-stem>`.
pub fn reference_dir(input: &ResolvedInput, config: &ReferenceConfig) -> PathBuf {
    config.references_root.join(input.stem())
}

/// The commands a dry run prints.
pub fn plan_commands(
    input: &Path,
    reference_dir: &Path,
    deps: &DependencyReport,
    config: &ReferenceConfig,
) -> CommandPlan {
    let office = office::office_command(Tool::LibreOffice.program(config), input, reference_dir);
    let rasterize = deps.is_available(Tool::ImageMagick).then(|| {
        rasterize::rasterize_command(
            Tool::ImageMagick.program(config),
            None,
            reference_dir,
            config.dpi,
            None,
        )
    });
    CommandPlan { office, rasterize }
}

/// Generate references for one input.
///
/// Nothing is created when `input` does not exist. Otherwise the reference
/// directory is created, the metadata stub is (re)written, and the command
/// plan is returned; with `config.execute` the plan is also run.
///
/// # Errors
/// - [`RefGenError::FileNotFound`] / [`RefGenError::InvalidInput`] for a bad input
/// - [`RefGenError::OutputDirFailed`] when the reference directory cannot be created
/// - [`RefGenError::MetadataWriteFailed`] when the stub cannot be written
pub async fn generate_references(
    input: impl AsRef<Path>,
    deps: &DependencyReport,
    config: &ReferenceConfig,
) -> Result<GenerationReport, RefGenError> {
    let resolved = input::resolve_input(input)?;
    let reference_dir = reference_dir(&resolved, config);
    info!("Processing: {}", resolved.path().display());

    tokio::fs::create_dir_all(&reference_dir)
        .await
        .map_err(|e| RefGenError::OutputDirFailed {
            path: reference_dir.clone(),
            source: e,
        })?;
    info!("Output directory: {}", reference_dir.display());

    // ── Metadata ─────────────────────────────────────────────────────────
    notify_start(config, Step::Metadata);
    let metadata_path = match metadata::write_metadata(resolved.path()).await {
        Ok(path) => {
            notify_complete(config, Step::Metadata, &path.display().to_string());
            path
        }
        Err(e) => {
            notify_error(config, Step::Metadata, &e.to_string());
            return Err(e);
        }
    };

    let plan = plan_commands(resolved.path(), &reference_dir, deps, config);

    let execution = if config.execute {
        Some(execute_plan(&resolved, &reference_dir, config).await)
    } else {
        None
    };

    Ok(GenerationReport {
        input: resolved.path().to_path_buf(),
        reference_dir,
        metadata_path,
        plan,
        execution,
    })
}

/// Synchronous wrapper around [`generate_references`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_references_sync(
    input: impl AsRef<Path>,
    deps: &DependencyReport,
    config: &ReferenceConfig,
) -> Result<GenerationReport, RefGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RefGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_references(input, deps, config))
}

// ── Execute mode ─────────────────────────────────────────────────────────

async fn execute_plan(
    input: &ResolvedInput,
    reference_dir: &Path,
    config: &ReferenceConfig,
) -> ExecutionOutcome {
    let mut outcome = ExecutionOutcome::default();

    let pdf = if input.kind() == InputKind::Pdf {
        input.path().to_path_buf()
    } else {
        notify_start(config, Step::OfficeConversion);
        match obtain_pdf(input.path(), reference_dir, config).await {
            Ok(pdf) => {
                notify_complete(config, Step::OfficeConversion, &pdf.display().to_string());
                pdf
            }
            Err(e) => {
                record_failure(&mut outcome, config, Step::OfficeConversion, &e);
                return outcome;
            }
        }
    };
    outcome.pdf = Some(pdf.clone());

    notify_start(config, Step::Rasterize);
    match rasterize::rasterize_pdf(&pdf, reference_dir, config).await {
        Ok(raster) => {
            notify_complete(
                config,
                Step::Rasterize,
                &format!("{} image(s) in {}", raster.images.len(), raster.output_dir.display()),
            );
            outcome.images = raster.images;
        }
        Err(e) => record_failure(&mut outcome, config, Step::Rasterize, &e),
    }

    outcome
}

/// LibreOffice when present, Preview when allowed, otherwise an error.
async fn obtain_pdf(
    input: &Path,
    reference_dir: &Path,
    config: &ReferenceConfig,
) -> Result<PathBuf, RefGenError> {
    let soffice = tools::probe_tool(Tool::LibreOffice, Tool::LibreOffice.program(config)).await;
    if soffice.available {
        return office::convert_to_pdf(input, reference_dir, config).await;
    }

    if config.preview_fallback {
        info!("LibreOffice not found, falling back to Preview automation");
        let target = office::expected_pdf_path(input, reference_dir);
        return preview::convert_with_preview(input, &target, config).await;
    }

    Err(RefGenError::ToolNotFound {
        tool: Tool::LibreOffice.to_string(),
        program: soffice.program,
    })
}

fn record_failure(
    outcome: &mut ExecutionOutcome,
    config: &ReferenceConfig,
    step: Step,
    error: &RefGenError,
) {
    let message = error.to_string();
    warn!("{} failed: {}", step, message);
    notify_error(config, step, &message);
    outcome.failures.push(StepFailure { step, message });
}

fn notify_start(config: &ReferenceConfig, step: Step) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_start(step);
    }
}

fn notify_complete(config: &ReferenceConfig, step: Step, detail: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_complete(step, detail);
    }
}

fn notify_error(config: &ReferenceConfig, step: Step, error: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_error(step, error);
    }
}
