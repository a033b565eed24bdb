//! Configuration types for reference generation.
//!
//! All behaviour is controlled through [`ReferenceConfig`], built via its
//! [`ReferenceConfigBuilder`]. The defaults reproduce a plain dry run:
//! nothing is executed, commands are only described.

use crate::error::RefGenError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Rasterisation density used when nothing else is configured.
pub const DEFAULT_DPI: u32 = 300;

/// ImageMagick `-quality` setting for the PNG output.
pub const DEFAULT_QUALITY: u8 = 100;

/// Root under which one reference directory per input is created.
pub const DEFAULT_REFERENCES_ROOT: &str = "tests/references";

/// Configuration for a reference-generation run.
///
/// # Example
/// ```rust
/// use pptx_refgen::ReferenceConfig;
///
/// let config = ReferenceConfig::builder()
///     .dpi(150)
///     .execute(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ReferenceConfig {
    /// Density passed to the rasterizer. Range: 72–1200. Default: 300.
    pub dpi: u32,

    /// ImageMagick `-quality`. Range: 1–100. Default: 100.
    pub quality: u8,

    /// Directory under which `<input-stem>/` is created. Default: `tests/references`.
    pub references_root: PathBuf,

    /// Run the office and rasterizer commands instead of only printing them. Default: false.
    pub execute: bool,

    /// In execute mode, fall back to driving macOS Preview when LibreOffice
    /// is missing. Default: false.
    pub preview_fallback: bool,

    /// Program used for ImageMagick. Default: `convert`.
    pub imagemagick_program: String,

    /// Program used for Ghostscript. Default: `gs`.
    pub ghostscript_program: String,

    /// Program used for LibreOffice. Default: `soffice`.
    pub soffice_program: String,

    /// Per-process timeout in seconds. `None` waits indefinitely. Default: None.
    pub tool_timeout_secs: Option<u64>,

    /// How long the Preview automation may take to produce its PDF. Default: 60.
    pub preview_timeout_secs: u64,

    /// Optional step-event receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            quality: DEFAULT_QUALITY,
            references_root: PathBuf::from(DEFAULT_REFERENCES_ROOT),
            execute: false,
            preview_fallback: false,
            imagemagick_program: "convert".to_string(),
            ghostscript_program: "gs".to_string(),
            soffice_program: "soffice".to_string(),
            tool_timeout_secs: None,
            preview_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceConfig")
            .field("dpi", &self.dpi)
            .field("quality", &self.quality)
            .field("references_root", &self.references_root)
            .field("execute", &self.execute)
            .field("preview_fallback", &self.preview_fallback)
            .field("imagemagick_program", &self.imagemagick_program)
            .field("ghostscript_program", &self.ghostscript_program)
            .field("soffice_program", &self.soffice_program)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("preview_timeout_secs", &self.preview_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl ReferenceConfig {
    /// Create a new builder for `ReferenceConfig`.
    pub fn builder() -> ReferenceConfigBuilder {
        ReferenceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReferenceConfig`].
#[derive(Debug)]
pub struct ReferenceConfigBuilder {
    config: ReferenceConfig,
}

impl ReferenceConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 1200);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = quality.clamp(1, 100);
        self
    }

    pub fn references_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.references_root = root.into();
        self
    }

    pub fn execute(mut self, v: bool) -> Self {
        self.config.execute = v;
        self
    }

    pub fn preview_fallback(mut self, v: bool) -> Self {
        self.config.preview_fallback = v;
        self
    }

    pub fn imagemagick_program(mut self, program: impl Into<String>) -> Self {
        self.config.imagemagick_program = program.into();
        self
    }

    pub fn ghostscript_program(mut self, program: impl Into<String>) -> Self {
        self.config.ghostscript_program = program.into();
        self
    }

    pub fn soffice_program(mut self, program: impl Into<String>) -> Self {
        self.config.soffice_program = program.into();
        self
    }

    pub fn tool_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn preview_timeout_secs(mut self, secs: u64) -> Self {
        self.config.preview_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReferenceConfig, RefGenError> {
        let c = &self.config;
        if c.references_root.as_os_str().is_empty() {
            return Err(RefGenError::InvalidConfig(
                "references root must not be empty".into(),
            ));
        }
        for (name, program) in [
            ("imagemagick", &c.imagemagick_program),
            ("ghostscript", &c.ghostscript_program),
            ("soffice", &c.soffice_program),
        ] {
            if program.trim().is_empty() {
                return Err(RefGenError::InvalidConfig(format!(
                    "{name} program must not be empty"
                )));
            }
        }
        if c.tool_timeout_secs == Some(0) {
            return Err(RefGenError::InvalidConfig(
                "tool timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
