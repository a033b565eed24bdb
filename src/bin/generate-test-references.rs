//! CLI binary for pptx-refgen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReferenceConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pptx_refgen::{
    generate_references, probe_dependencies, DependencyReport, ExecutionOutcome,
    GenerationProgressCallback, GenerationReport, ProgressCallback, RefGenError, ReferenceConfig,
    Step,
};
use serde::Serialize;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (only when stdout is a terminal) ─────────────────────

fn colour_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| io::stdout().is_terminal())
}

fn paint(code: &str, s: &str) -> String {
    if colour_enabled() {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn green(s: &str) -> String {
    paint("32", s)
}
fn red(s: &str) -> String {
    paint("31", s)
}
fn bold(s: &str) -> String {
    paint("1", s)
}

// ── Spinner for the slow external steps ──────────────────────────────────────

/// Shows a spinner on stderr while LibreOffice or ImageMagick runs.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_step_start(&self, step: Step) {
        if step == Step::Metadata {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Running");
        bar.set_message(step.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_step_complete(&self, _step: Step, _detail: &str) {
        self.finish();
    }

    fn on_step_error(&self, _step: Step, _error: &str) {
        self.finish();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Write the metadata stub and print the conversion commands (dry run)
  generate-test-references decks/intro.pptx

  # Actually run LibreOffice and ImageMagick
  generate-test-references --execute decks/intro.pptx

  # Rasterise an existing PDF at 150 DPI into a custom root
  generate-test-references --execute --dpi 150 --references-root out/refs slides.pdf

  # Machine-readable report
  generate-test-references --json decks/intro.pptx > report.json

OUTPUT LAYOUT:
  <input>.json                      metadata stub next to the input
  <references-root>/<stem>/         reference directory
  <references-root>/<stem>/<stem>.pdf       (execute, non-PDF input)
  <references-root>/<stem>/slide-N.png      (execute)

ENVIRONMENT VARIABLES:
  REFGEN_EXECUTE          Same as --execute
  REFGEN_DPI              Rasterizer density
  REFGEN_REFERENCES_ROOT  Reference root directory
  REFGEN_CONVERT          ImageMagick program (e.g. magick)
  REFGEN_GS               Ghostscript program (e.g. gswin64c)
  REFGEN_SOFFICE          LibreOffice program
  RUST_LOG                Override log filter
"#;

/// Generate reference images and metadata stubs for slide-deck tests.
#[derive(Parser, Debug)]
#[command(
    name = "generate-test-references",
    version,
    about = "Generate reference images and metadata stubs for slide-deck tests",
    long_about = "Writes a JSON metadata stub next to the input deck, creates \
tests/references/<stem>/, and prints the LibreOffice and ImageMagick commands that \
produce per-slide reference PNGs. Pass --execute to run them.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Slide deck (or PDF) to generate references for.
    input: Option<PathBuf>,

    /// Run the conversion commands instead of only printing them.
    #[arg(long, env = "REFGEN_EXECUTE")]
    execute: bool,

    /// Rasterizer density in DPI (72–1200).
    #[arg(long, env = "REFGEN_DPI", default_value_t = pptx_refgen::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// Directory under which <input-stem>/ is created.
    #[arg(long, env = "REFGEN_REFERENCES_ROOT", default_value = "tests/references")]
    references_root: PathBuf,

    /// With --execute on macOS: drive Preview when LibreOffice is missing.
    #[arg(long, env = "REFGEN_PREVIEW_FALLBACK")]
    preview_fallback: bool,

    /// Kill an external tool after this many seconds (default: wait forever).
    #[arg(long, env = "REFGEN_TOOL_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    tool_timeout: Option<u64>,

    /// ImageMagick executable.
    #[arg(long, env = "REFGEN_CONVERT", default_value = "convert")]
    imagemagick_program: String,

    /// Ghostscript executable.
    #[arg(long, env = "REFGEN_GS", default_value = "gs")]
    ghostscript_program: String,

    /// LibreOffice executable.
    #[arg(long, env = "REFGEN_SOFFICE", default_value = "soffice")]
    soffice_program: String,

    /// Print the dependency report and run report as JSON.
    #[arg(long, env = "REFGEN_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "REFGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "REFGEN_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    dependencies: &'a DependencyReport,
    report: Option<&'a GenerationReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Progress text goes to stdout; library logs stay quiet unless asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_text = !cli.quiet && !cli.json;
    let show_spinner = show_text && cli.execute && io::stderr().is_terminal();

    let progress_cb: Option<ProgressCallback> = if show_spinner {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    if show_text {
        println!("{}", bold("PPTX Test Reference Generator"));
        println!("{}", "=".repeat(40));
    }

    // ── Dependency probe ─────────────────────────────────────────────────
    let deps = probe_dependencies(&config).await;
    if show_text {
        for status in deps.iter() {
            let line = status.to_string();
            println!("{}", if status.available { green(&line) } else { red(&line) });
        }
    }

    let Some(input) = cli.input.as_ref() else {
        if cli.json {
            print_json(&deps, None)?;
        } else if show_text {
            print_usage();
        } else {
            eprintln!("Usage: generate-test-references <pptx_file>");
        }
        return Ok(());
    };

    // ── Generate ─────────────────────────────────────────────────────────
    let report = match generate_references(input, &deps, &config).await {
        Ok(report) => report,
        Err(RefGenError::FileNotFound { path }) => {
            if show_text {
                println!("Error: File not found: {}", path.display());
            } else {
                eprintln!("Error: File not found: {}", path.display());
            }
            return Ok(());
        }
        Err(e) => return Err(e).context("Reference generation failed"),
    };

    if cli.json {
        print_json(&deps, Some(&report))?;
    } else if show_text {
        print_report(&report);
    } else if let Some(ref execution) = report.execution {
        // Quiet mode still surfaces step failures.
        for failure in &execution.failures {
            eprintln!("{} {} failed: {}", red("✗"), failure.step, failure.message);
        }
    }

    Ok(())
}

/// Map CLI args to `ReferenceConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReferenceConfig> {
    let mut builder = ReferenceConfig::builder()
        .dpi(cli.dpi)
        .references_root(&cli.references_root)
        .execute(cli.execute)
        .preview_fallback(cli.preview_fallback)
        .tool_timeout_secs(cli.tool_timeout)
        .imagemagick_program(&cli.imagemagick_program)
        .ghostscript_program(&cli.ghostscript_program)
        .soffice_program(&cli.soffice_program);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_json(deps: &DependencyReport, report: Option<&GenerationReport>) -> Result<()> {
    let out = JsonOutput {
        dependencies: deps,
        report,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("Failed to serialise report")?
    );
    Ok(())
}

fn print_usage() {
    println!();
    println!("Usage: generate-test-references <pptx_file>");
    println!();
    println!("This tool demonstrates how to generate reference images");
    println!("when LibreOffice is not available.");
    println!("Run with --help for all options.");
}

fn print_report(report: &GenerationReport) {
    println!();
    println!("Processing: {}", report.input.display());
    println!("Output directory: {}", report.reference_dir.display());
    println!(
        "{} Generated metadata: {}",
        green("✓"),
        report.metadata_path.display()
    );

    println!();
    println!("LibreOffice command (if available):");
    println!("{}", report.plan.office);

    if let Some(ref rasterize) = report.plan.rasterize {
        println!();
        println!("To convert existing PDFs to images:");
        println!("{rasterize}");
    }

    if let Some(ref execution) = report.execution {
        print_execution(report, execution);
    }

    println!();
    println!("{} Reference generation setup complete", green("✓"));
}

fn print_execution(report: &GenerationReport, execution: &ExecutionOutcome) {
    println!();
    println!("{}", bold("Executing conversion:"));

    if let Some(ref pdf) = execution.pdf {
        if pdf != &report.input {
            println!("{} Converted to PDF: {}", green("✓"), pdf.display());
        }
        let raster_failed = execution
            .failures
            .iter()
            .any(|f| f.step == Step::Rasterize);
        if !raster_failed {
            println!(
                "{} Converted PDF to images in {} ({} image(s))",
                green("✓"),
                report.reference_dir.display(),
                execution.images.len()
            );
        }
    }

    for failure in &execution.failures {
        let label = match failure.step {
            Step::Rasterize => "Failed to convert PDF",
            Step::OfficeConversion => "Failed to create PDF",
            Step::Metadata => "Failed to write metadata",
        };
        println!("{} {}: {}", red("✗"), label, failure.message);
    }
}
