//! External tool catalogue and dependency probing.
//!
//! Probing never fails: a tool that cannot be spawned, exits non-zero, or
//! times out is simply reported as unavailable. The result is a plain value
//! ([`DependencyReport`]) owned by the caller for the length of one run.

use crate::config::ReferenceConfig;
use crate::pipeline::process::{self, ToolCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Probes are cheap; a wedged `--version` should not stall the whole run.
const PROBE_TIMEOUT_SECS: u64 = 15;

/// External programs this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    ImageMagick,
    Ghostscript,
    LibreOffice,
    /// `osascript`, used for the Preview automation on macOS.
    AppleScript,
}

/// The tools checked at startup.
pub const PROBED_TOOLS: [Tool; 2] = [Tool::ImageMagick, Tool::Ghostscript];

impl Tool {
    /// Human-readable name used in status lines.
    pub fn name(self) -> &'static str {
        match self {
            Tool::ImageMagick => "ImageMagick",
            Tool::Ghostscript => "Ghostscript",
            Tool::LibreOffice => "LibreOffice",
            Tool::AppleScript => "osascript",
        }
    }

    /// Executable to run for this tool under `config`.
    pub fn program(self, config: &ReferenceConfig) -> &str {
        match self {
            Tool::ImageMagick => &config.imagemagick_program,
            Tool::Ghostscript => &config.ghostscript_program,
            Tool::LibreOffice => &config.soffice_program,
            Tool::AppleScript => "osascript",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability of one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub program: String,
    pub available: bool,
    /// First non-empty line of the `--version` output, when available.
    pub version: Option<String>,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.available {
            write!(f, "✓ {} is installed", self.tool)
        } else {
            write!(f, "✗ {} is not installed", self.tool)
        }
    }
}

/// Per-tool availability for one run, in probe order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    tools: Vec<ToolStatus>,
}

impl DependencyReport {
    pub fn new(tools: Vec<ToolStatus>) -> Self {
        Self { tools }
    }

    /// Whether `tool` was probed and found callable. Unprobed tools count as missing.
    pub fn is_available(&self, tool: Tool) -> bool {
        self.get(tool).is_some_and(|s| s.available)
    }

    pub fn get(&self, tool: Tool) -> Option<&ToolStatus> {
        self.tools.iter().find(|s| s.tool == tool)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolStatus> {
        self.tools.iter()
    }

    pub fn missing(&self) -> impl Iterator<Item = Tool> + '_ {
        self.tools.iter().filter(|s| !s.available).map(|s| s.tool)
    }
}

/// Run `<program> --version` and report whether it worked.
pub async fn probe_tool(tool: Tool, program: &str) -> ToolStatus {
    let command = ToolCommand::new(tool, program).arg("--version");
    match process::run(&command, Some(PROBE_TIMEOUT_SECS)).await {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string);
            debug!("{} available via '{}': {:?}", tool, program, version);
            ToolStatus {
                tool,
                program: program.to_string(),
                available: true,
                version,
            }
        }
        Err(e) => {
            debug!("{} unavailable: {}", tool, e);
            ToolStatus {
                tool,
                program: program.to_string(),
                available: false,
                version: None,
            }
        }
    }
}

/// Probe every tool in [`PROBED_TOOLS`], one after the other.
pub async fn probe_dependencies(config: &ReferenceConfig) -> DependencyReport {
    let mut tools = Vec::with_capacity(PROBED_TOOLS.len());
    for tool in PROBED_TOOLS {
        tools.push(probe_tool(tool, tool.program(config)).await);
    }
    DependencyReport::new(tools)
}
