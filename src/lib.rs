//! # pptx-refgen
//!
//! Prepare reference artefacts for slide-deck rendering tests.
//!
//! For each input deck this crate writes a fixed-shape JSON metadata stub
//! next to the deck, creates `tests/references/<stem>/`, and describes (or,
//! in execute mode, runs) the external commands that turn the deck into
//! per-slide PNGs. All real work is done by external tools: LibreOffice for
//! deck → PDF, ImageMagick (backed by Ghostscript) for PDF → PNG, and
//! optionally macOS Preview when LibreOffice is missing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! deck.pptx
//!  │
//!  ├─ 1. Probe     convert --version, gs --version
//!  ├─ 2. Metadata  deck.json  {source, generated, method, dpi, slides}
//!  ├─ 3. Office    soffice --headless --convert-to pdf   (execute only)
//!  └─ 4. Raster    convert -density 300 -quality 100 … slide-%d.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pptx_refgen::{generate_references, probe_dependencies, ReferenceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReferenceConfig::default();
//!     let deps = probe_dependencies(&config).await;
//!     let report = generate_references("decks/intro.pptx", &deps, &config).await?;
//!     println!("{}", report.plan.office);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `generate-test-references` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReferenceConfig, ReferenceConfigBuilder, DEFAULT_DPI};
pub use error::RefGenError;
pub use generate::{generate_references, generate_references_sync, plan_commands};
pub use output::{CommandPlan, ExecutionOutcome, GenerationReport, RasterOutput, StepFailure};
pub use pipeline::metadata::{metadata_path, write_metadata, ReferenceMetadata};
pub use pipeline::office::convert_to_pdf;
pub use pipeline::preview::convert_with_preview;
pub use pipeline::process::ToolCommand;
pub use pipeline::rasterize::rasterize_pdf;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Step};
pub use tools::{probe_dependencies, probe_tool, DependencyReport, Tool, ToolStatus};
