//! Slide deck → PDF via LibreOffice in headless mode.

use crate::config::ReferenceConfig;
use crate::error::RefGenError;
use crate::pipeline::process::{self, ToolCommand};
use crate::tools::Tool;
use std::path::{Path, PathBuf};
use tracing::info;

/// `soffice --headless --convert-to pdf --outdir <dir> <input>`
pub fn office_command(program: &str, input: &Path, output_dir: &Path) -> ToolCommand {
    ToolCommand::new(Tool::LibreOffice, program)
        .args(["--headless", "--convert-to", "pdf", "--outdir"])
        .arg(output_dir)
        .arg(input)
}

/// Where LibreOffice puts the PDF for `input`: `<dir>/<stem>.pdf`.
pub fn expected_pdf_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .unwrap_or(input.as_os_str())
        .to_os_string();
    name.push(".pdf");
    output_dir.join(name)
}

/// Convert `input` to PDF inside `output_dir` and return the PDF's path.
///
/// LibreOffice exits 0 even for some documents it could not load, so the
/// output file is checked explicitly.
pub async fn convert_to_pdf(
    input: &Path,
    output_dir: &Path,
    config: &ReferenceConfig,
) -> Result<PathBuf, RefGenError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| RefGenError::OutputDirFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    let command = office_command(Tool::LibreOffice.program(config), input, output_dir);
    process::run(&command, config.tool_timeout_secs).await?;

    let pdf = expected_pdf_path(input, output_dir);
    if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
        return Err(RefGenError::OutputMissing { path: pdf });
    }

    info!("Converted {} to {}", input.display(), pdf.display());
    Ok(pdf)
}
