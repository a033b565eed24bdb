//! PDF rasterisation via ImageMagick.
//!
//! ImageMagick hands PDF decoding to Ghostscript, which is why both are
//! probed at startup. One PNG is written per page, named `slide-%d.png`
//! with ImageMagick's zero-based numbering. How many files appear is up to
//! the external tool; this module only lists what it finds.

use crate::config::ReferenceConfig;
use crate::error::RefGenError;
use crate::output::RasterOutput;
use crate::pipeline::process::{self, ToolCommand};
use crate::tools::Tool;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output file template handed to ImageMagick.
pub const SLIDE_PATTERN: &str = "slide-%d.png";

/// Printed in the rasterizer hint where the PDF path goes.
pub const PDF_PLACEHOLDER: &str = "<pdf_file>";

static SLIDE_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^slide-(\d+)\.png$").unwrap());

/// Describe the ImageMagick call.
///
/// Without a `pdf_path` the command carries [`PDF_PLACEHOLDER`] instead.
/// `quality` is omitted from the printed dry-run hint and always present
/// when the command is executed.
pub fn rasterize_command(
    program: &str,
    pdf_path: Option<&Path>,
    output_dir: &Path,
    dpi: u32,
    quality: Option<u8>,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(Tool::ImageMagick, program)
        .arg("-density")
        .arg(dpi.to_string());
    if let Some(q) = quality {
        cmd = cmd.arg("-quality").arg(q.to_string());
    }
    cmd = match pdf_path {
        Some(pdf) => cmd.arg(pdf),
        None => cmd.placeholder(PDF_PLACEHOLDER),
    };
    cmd.arg(output_dir.join(SLIDE_PATTERN))
}

/// Render every page of `pdf_path` into `output_dir`.
///
/// `output_dir` and its parents are created first. `slide-N.png` files left
/// by an earlier run are removed, so the returned images are exactly the
/// ones this run produced.
pub async fn rasterize_pdf(
    pdf_path: &Path,
    output_dir: &Path,
    config: &ReferenceConfig,
) -> Result<RasterOutput, RefGenError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| RefGenError::OutputDirFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
    clear_slides(output_dir).await?;

    let command = rasterize_command(
        Tool::ImageMagick.program(config),
        Some(pdf_path),
        output_dir,
        config.dpi,
        Some(config.quality),
    );
    process::run(&command, config.tool_timeout_secs).await?;

    let images = collect_slides(output_dir).await?;
    info!(
        "Converted PDF to {} image(s) in {}",
        images.len(),
        output_dir.display()
    );

    Ok(RasterOutput {
        output_dir: output_dir.to_path_buf(),
        images,
    })
}

/// Delete every `slide-N.png` in `dir`. Other files are left alone.
pub async fn clear_slides(dir: &Path) -> Result<(), RefGenError> {
    let stale = collect_slides(dir).await?;
    for path in &stale {
        tokio::fs::remove_file(path).await.map_err(|e| {
            RefGenError::Internal(format!("failed to remove '{}': {e}", path.display()))
        })?;
    }
    if !stale.is_empty() {
        debug!("Removed {} stale slide image(s) from {}", stale.len(), dir.display());
    }
    Ok(())
}

/// List `slide-N.png` files in `dir`, ordered by `N`.
pub async fn collect_slides(dir: &Path) -> Result<Vec<PathBuf>, RefGenError> {
    let read_err = |e: std::io::Error| RefGenError::Internal(format!(
        "failed to list '{}': {e}",
        dir.display()
    ));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut numbered: Vec<(u64, PathBuf)> = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = SLIDE_FILE_RE.captures(name) {
            if let Ok(n) = caps[1].parse::<u64>() {
                numbered.push((n, entry.path()));
            }
        }
    }

    numbered.sort_by_key(|(n, _)| *n);
    debug!("Found {} slide image(s) in {}", numbered.len(), dir.display());
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dry_run_command_matches_documented_hint() {
        let cmd = rasterize_command(
            "convert",
            None,
            Path::new("tests/references/intro"),
            300,
            None,
        );
        assert_eq!(
            cmd.to_string(),
            "convert -density 300 <pdf_file> tests/references/intro/slide-%d.png"
        );
    }

    #[test]
    fn executed_command_carries_quality() {
        let cmd = rasterize_command("convert", Some(Path::new("a.pdf")), Path::new("out"), 150, Some(100));
        assert_eq!(
            cmd.to_string(),
            "convert -density 150 -quality 100 a.pdf out/slide-%d.png"
        );
    }

    #[tokio::test]
    async fn slides_are_listed_in_page_order() {
        let dir = TempDir::new().unwrap();
        for name in ["slide-10.png", "slide-2.png", "slide-0.png", "notes.png", "slide-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let slides = collect_slides(dir.path()).await.unwrap();
        let names: Vec<_> = slides
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["slide-0.png", "slide-2.png", "slide-10.png"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn creates_nested_output_dir_before_running() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("refs").join("deep").join("intro");
        let config = ReferenceConfig::builder()
            .imagemagick_program("true")
            .build()
            .unwrap();

        let result = rasterize_pdf(Path::new("missing.pdf"), &out, &config)
            .await
            .unwrap();
        assert!(out.is_dir());
        assert_eq!(result.output_dir, out);
        assert!(result.images.is_empty());
    }

    #[test]
    fn real_pdf_path_with_metacharacters_is_quoted() {
        let cmd = rasterize_command("convert", Some(Path::new("<a>.pdf")), Path::new("out"), 300, None);
        assert_eq!(
            cmd.to_string(),
            "convert -density 300 '<a>.pdf' out/slide-%d.png"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_slides_from_an_earlier_run_are_not_reported() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("deck");
        std::fs::create_dir_all(&out).unwrap();
        for n in 0..10 {
            std::fs::write(out.join(format!("slide-{n}.png")), b"old").unwrap();
        }
        std::fs::write(out.join("notes.txt"), b"keep").unwrap();

        let config = ReferenceConfig::builder()
            .imagemagick_program("true")
            .build()
            .unwrap();
        let result = rasterize_pdf(Path::new("deck.pdf"), &out, &config)
            .await
            .unwrap();

        assert!(result.images.is_empty(), "got: {:?}", result.images);
        assert!(!out.join("slide-0.png").exists());
        assert!(out.join("notes.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_rasterizer_still_leaves_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a").join("b");
        let config = ReferenceConfig::builder()
            .imagemagick_program("false")
            .build()
            .unwrap();

        let err = rasterize_pdf(Path::new("x.pdf"), &out, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, RefGenError::ToolFailed { .. }), "got: {err:?}");
        assert!(out.is_dir());
    }
}
