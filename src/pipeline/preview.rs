//! Slide deck → PDF by driving macOS Preview through `osascript`.
//!
//! This is a fallback for machines without LibreOffice and needs the
//! terminal to hold Accessibility permission. The script waits on UI
//! elements (`repeat until exists …`) rather than fixed delays, and once
//! `osascript` returns the PDF itself is the completion signal: the run
//! succeeds only after the file shows up with a non-zero size.

use crate::config::ReferenceConfig;
use crate::error::RefGenError;
use crate::pipeline::process::{self, ToolCommand};
use crate::tools::Tool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// How often the output file is checked for.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound for each in-script UI wait, in tenths of a second.
const UI_WAIT_TICKS: u32 = 300;

/// Escape a string for use inside an AppleScript string literal.
fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// AppleScript that opens `input` in Preview and saves it as `output` via
/// the print dialog's "Save as PDF" action.
pub fn preview_script(input: &Path, output: &Path) -> String {
    let input = applescript_string(&input.display().to_string());
    let output = applescript_string(&output.display().to_string());
    let wait = |what: &str| {
        format!(
            "        set _ticks to 0\n        \
             repeat until ({what}) or _ticks > {UI_WAIT_TICKS}\n            \
             delay 0.1\n            set _ticks to _ticks + 1\n        \
             end repeat\n"
        )
    };

    let mut script = String::new();
    script.push_str("tell application \"Preview\"\n");
    script.push_str(&format!("    open POSIX file {input}\n"));
    script.push_str("    activate\n");
    script.push_str("    tell application \"System Events\" to tell process \"Preview\"\n");
    script.push_str(&wait("exists window 1"));
    script.push_str("        keystroke \"p\" using command down\n");
    script.push_str(&wait("exists sheet 1 of window 1"));
    script.push_str("        click menu button \"PDF\" of sheet 1 of window 1\n");
    script.push_str(&wait("exists menu 1 of menu button \"PDF\" of sheet 1 of window 1"));
    script.push_str(
        "        click menu item \"Save as PDF\" of menu 1 of menu button \"PDF\" of sheet 1 of window 1\n",
    );
    script.push_str(&wait("exists sheet 1 of sheet 1 of window 1"));
    script.push_str("        keystroke \"g\" using {command down, shift down}\n");
    script.push_str(&wait("exists sheet 1 of sheet 1 of sheet 1 of window 1"));
    script.push_str(&format!("        keystroke {output}\n"));
    script.push_str("        keystroke return\n");
    script.push_str(&wait("not (exists sheet 1 of sheet 1 of sheet 1 of window 1)"));
    script.push_str("        click button \"Save\" of sheet 1 of sheet 1 of window 1\n");
    script.push_str(&wait("not (exists sheet 1 of window 1)"));
    script.push_str("    end tell\n");
    script.push_str("    quit\n");
    script.push_str("end tell\n");
    script
}

/// Convert `input` to `output` through Preview.
///
/// # Errors
/// - [`RefGenError::UnsupportedPlatform`] anywhere but macOS
/// - [`RefGenError::ToolFailed`] when `osascript` exits non-zero
/// - [`RefGenError::OutputMissing`] when no PDF appears before the deadline
pub async fn convert_with_preview(
    input: &Path,
    output: &Path,
    config: &ReferenceConfig,
) -> Result<PathBuf, RefGenError> {
    if !cfg!(target_os = "macos") {
        return Err(RefGenError::UnsupportedPlatform {
            feature: "Preview automation",
            required: "macOS",
        });
    }

    // Preview resolves relative paths against its own cwd, not ours.
    let input = std::path::absolute(input).map_err(|e| RefGenError::InvalidInput {
        path: input.to_path_buf(),
        reason: e.to_string(),
    })?;
    let output = std::path::absolute(output).map_err(|e| RefGenError::InvalidInput {
        path: output.to_path_buf(),
        reason: e.to_string(),
    })?;

    let command = ToolCommand::new(Tool::AppleScript, Tool::AppleScript.program(config))
        .arg("-e")
        .arg(preview_script(&input, &output));
    process::run(&command, config.tool_timeout_secs).await?;

    wait_for_file(&output, Duration::from_secs(config.preview_timeout_secs)).await?;
    info!("Preview saved {}", output.display());
    Ok(output)
}

/// Poll until `path` exists with a non-zero size, or `timeout` passes.
pub async fn wait_for_file(path: &Path, timeout: Duration) -> Result<(), RefGenError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.is_file() && meta.len() > 0 {
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(RefGenError::OutputMissing {
                path: path.to_path_buf(),
            });
        }
        debug!("Waiting for {}", path.display());
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
