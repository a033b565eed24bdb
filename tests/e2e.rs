//! End-to-end tests for the pptx-refgen library.
//!
//! Every test works inside its own `TempDir` with an explicit references
//! root, so nothing leaks into the working tree. External tools are
//! replaced by POSIX `true` / `false` where a test needs a process to
//! succeed or fail; those tests are unix-only.

use pptx_refgen::{
    generate_references, probe_dependencies, DependencyReport, GenerationProgressCallback,
    ReferenceConfig, ReferenceMetadata, Step, Tool, ToolStatus,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("tests").join("references")
    }

    fn file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let p = self.dir.path().join(name);
        std::fs::write(&p, contents).expect("write fixture");
        p
    }

    fn config(&self) -> pptx_refgen::ReferenceConfigBuilder {
        ReferenceConfig::builder().references_root(self.root())
    }
}

fn deps_with_imagemagick() -> DependencyReport {
    DependencyReport::new(vec![
        ToolStatus {
            tool: Tool::ImageMagick,
            program: "convert".into(),
            available: true,
            version: Some("Version: ImageMagick 7.1.1".into()),
        },
        ToolStatus {
            tool: Tool::Ghostscript,
            program: "gs".into(),
            available: false,
            version: None,
        },
    ])
}

fn read_metadata(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("metadata readable");
    serde_json::from_str(&text).expect("metadata is valid JSON")
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for RecordingCallback {
    fn on_step_start(&self, step: Step) {
        self.events.lock().unwrap().push(format!("start:{step:?}"));
    }

    fn on_step_complete(&self, step: Step, _detail: &str) {
        self.events.lock().unwrap().push(format!("done:{step:?}"));
    }

    fn on_step_error(&self, step: Step, _error: &str) {
        self.events.lock().unwrap().push(format!("error:{step:?}"));
    }
}

// ── Dry run ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_writes_metadata_and_reference_dir() {
    let fx = Fixture::new();
    let deck = fx.file("intro.pptx", b"PK\x03\x04");
    let config = fx.config().build().unwrap();

    let report = generate_references(&deck, &deps_with_imagemagick(), &config)
        .await
        .expect("dry run succeeds");

    assert_eq!(report.reference_dir, fx.root().join("intro"));
    assert!(report.reference_dir.is_dir());
    assert_eq!(report.metadata_path, fx.dir.path().join("intro.json"));
    assert!(report.execution.is_none());

    let json = read_metadata(&report.metadata_path);
    let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec!["dpi", "generated", "method", "slides", "source"]);
    assert_eq!(json["method"], "manual");
    assert_eq!(json["dpi"], 300);
    assert_eq!(json["slides"], serde_json::json!([]));
    assert_eq!(json["source"], deck.display().to_string());

    // Only the reference dir was created; no images in a dry run.
    assert_eq!(std::fs::read_dir(&report.reference_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn metadata_dpi_stays_fixed_when_rasterizer_dpi_changes() {
    let fx = Fixture::new();
    let deck = fx.file("wide.pptx", b"PK");
    let config = fx.config().dpi(150).build().unwrap();

    let report = generate_references(&deck, &deps_with_imagemagick(), &config)
        .await
        .unwrap();

    let parsed: ReferenceMetadata =
        serde_json::from_str(&std::fs::read_to_string(&report.metadata_path).unwrap()).unwrap();
    assert_eq!(parsed.dpi, 300);
    assert!(report
        .plan
        .rasterize
        .unwrap()
        .to_string()
        .starts_with("convert -density 150 <pdf_file> "));
}

#[tokio::test]
async fn rerun_overwrites_metadata() {
    let fx = Fixture::new();
    let deck = fx.file("intro.pptx", b"PK");
    let config = fx.config().build().unwrap();
    let deps = deps_with_imagemagick();

    let first = generate_references(&deck, &deps, &config).await.unwrap();
    std::fs::write(&first.metadata_path, "{\"tampered\": true}").unwrap();
    let second = generate_references(&deck, &deps, &config).await.unwrap();

    assert_eq!(first.metadata_path, second.metadata_path);
    let json = read_metadata(&second.metadata_path);
    assert!(json.get("tampered").is_none());
    assert_eq!(json["method"], "manual");
}

#[tokio::test]
async fn missing_input_creates_nothing() {
    let fx = Fixture::new();
    let config = fx.config().build().unwrap();

    let err = generate_references(fx.dir.path().join("nope.pptx"), &deps_with_imagemagick(), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, pptx_refgen::RefGenError::FileNotFound { .. }));
    assert!(!fx.root().exists());
    assert!(!fx.dir.path().join("nope.json").exists());
}

#[tokio::test]
async fn probe_never_fails_with_missing_tools() {
    let config = ReferenceConfig::builder()
        .imagemagick_program("refgen-missing-convert")
        .ghostscript_program("refgen-missing-gs")
        .build()
        .unwrap();

    let deps = probe_dependencies(&config).await;
    assert_eq!(deps.iter().count(), 2);
    assert!(!deps.is_available(Tool::ImageMagick));
    assert!(!deps.is_available(Tool::Ghostscript));
}

// ── Execute mode ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_without_libreoffice_records_failure_and_keeps_metadata() {
    let fx = Fixture::new();
    let deck = fx.file("intro.pptx", b"PK");
    let config = fx
        .config()
        .execute(true)
        .soffice_program("refgen-missing-soffice")
        .build()
        .unwrap();

    let report = generate_references(&deck, &deps_with_imagemagick(), &config)
        .await
        .expect("tool failures are not fatal");

    let execution = report.execution.expect("execute mode reports an outcome");
    assert!(execution.pdf.is_none());
    assert_eq!(execution.failures.len(), 1);
    assert_eq!(execution.failures[0].step, Step::OfficeConversion);
    assert!(execution.failures[0].message.contains("LibreOffice"));
    assert!(report.metadata_path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn execute_on_pdf_skips_office_and_rasterizes() {
    let fx = Fixture::new();
    let pdf = fx.file("handout.pdf", b"%PDF-1.7\n");
    let recorder = Arc::new(RecordingCallback::default());
    let config = fx
        .config()
        .execute(true)
        .imagemagick_program("true")
        .soffice_program("refgen-missing-soffice")
        .progress_callback(recorder.clone() as Arc<dyn GenerationProgressCallback>)
        .build()
        .unwrap();

    let report = generate_references(&pdf, &deps_with_imagemagick(), &config)
        .await
        .unwrap();

    let execution = report.execution.unwrap();
    assert!(execution.succeeded(), "failures: {:?}", execution.failures);
    assert_eq!(execution.pdf.as_deref(), Some(pdf.as_path()));
    assert!(execution.images.is_empty());

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start:Metadata",
            "done:Metadata",
            "start:Rasterize",
            "done:Rasterize"
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn execute_reports_only_images_from_this_run() {
    let fx = Fixture::new();
    let pdf = fx.file("deck.pdf", b"%PDF-1.7\n");
    let old_dir = fx.root().join("deck");
    std::fs::create_dir_all(&old_dir).unwrap();
    for n in 0..10 {
        std::fs::write(old_dir.join(format!("slide-{n}.png")), b"old").unwrap();
    }
    let config = fx
        .config()
        .execute(true)
        .imagemagick_program("true")
        .build()
        .unwrap();

    let report = generate_references(&pdf, &deps_with_imagemagick(), &config)
        .await
        .unwrap();

    let execution = report.execution.unwrap();
    assert!(execution.succeeded(), "failures: {:?}", execution.failures);
    assert_eq!(execution.images.len(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn execute_with_failing_rasterizer_continues() {
    let fx = Fixture::new();
    let pdf = fx.file("broken.pdf", b"not really a pdf");
    let config = fx
        .config()
        .execute(true)
        .imagemagick_program("false")
        .build()
        .unwrap();

    let report = generate_references(&pdf, &deps_with_imagemagick(), &config)
        .await
        .unwrap();

    let execution = report.execution.unwrap();
    assert_eq!(execution.failures.len(), 1);
    assert_eq!(execution.failures[0].step, Step::Rasterize);
    assert!(report.reference_dir.is_dir());
    assert!(report.metadata_path.exists());
}

#[tokio::test]
async fn report_serialises_commands_as_strings() {
    let fx = Fixture::new();
    let deck = fx.file("intro.pptx", b"PK");
    let config = fx.config().build().unwrap();

    let report = generate_references(&deck, &deps_with_imagemagick(), &config)
        .await
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    let office = json["plan"]["office"].as_str().unwrap();
    assert!(office.starts_with("soffice --headless --convert-to pdf --outdir "));
    assert!(json["plan"]["rasterize"]
        .as_str()
        .unwrap()
        .ends_with("intro/slide-%d.png"));
    assert!(json["execution"].is_null());
}

#[tokio::test]
async fn dry_run_quotes_deck_names_with_shell_metacharacters() {
    let fx = Fixture::new();
    let deck = fx.file("a&b;rm.pptx", b"PK");
    let config = fx.config().build().unwrap();

    let report = generate_references(&deck, &deps_with_imagemagick(), &config)
        .await
        .unwrap();

    let office = report.plan.office.to_string();
    assert_eq!(
        office,
        format!(
            "soffice --headless --convert-to pdf --outdir '{}' '{}'",
            report.reference_dir.display(),
            deck.display()
        )
    );
    let raster = report.plan.rasterize.unwrap().to_string();
    assert!(raster.starts_with("convert -density 300 <pdf_file> '"), "got: {raster}");
}
