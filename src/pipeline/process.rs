//! Subprocess plumbing shared by every stage.
//!
//! A [`ToolCommand`] is the single description of an external invocation:
//! the dry run prints it, execute mode spawns it. Keeping both on one value
//! means the printed instructions can never drift from what actually runs.

use crate::error::RefGenError;
use crate::tools::Tool;
use serde::{Serialize, Serializer};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried inside [`RefGenError::ToolFailed`].
const STDERR_EXCERPT_CHARS: usize = 800;

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<OsString>,
    /// Indices into `args` that are printed verbatim, never quoted.
    pub placeholders: Vec<usize>,
}

impl ToolCommand {
    pub fn new(tool: Tool, program: impl Into<String>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            placeholders: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append a stand-in the reader replaces by hand, such as `<pdf_file>`.
    /// It is printed as-is so the hint stays readable.
    pub fn placeholder(mut self, text: &str) -> Self {
        self.placeholders.push(self.args.len());
        self.args.push(OsString::from(text));
        self
    }

    /// Build the tokio command. stdin is closed and the child is killed if
    /// the future is dropped (timeout).
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_word(&self.program))?;
        for (i, arg) in self.args.iter().enumerate() {
            let arg = arg.to_string_lossy();
            if self.placeholders.contains(&i) {
                write!(f, " {arg}")?;
            } else {
                write!(f, " {}", shell_word(&arg))?;
            }
        }
        Ok(())
    }
}

impl Serialize for ToolCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Single-quote a word unless every character is shell-inert.
fn shell_word(word: &str) -> String {
    let needs_quotes = word.is_empty()
        || !word.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '_' | '.' | '/' | '%' | ':' | '=' | '+' | ',' | '@' | '-')
        });
    if needs_quotes {
        format!("'{}'", word.replace('\'', r"'\''"))
    } else {
        word.to_string()
    }
}

/// Run `command` to completion and return its captured output.
///
/// # Errors
/// - [`RefGenError::ToolNotFound`] when the program cannot be spawned
/// - [`RefGenError::ToolTimeout`] when `timeout_secs` elapses first
/// - [`RefGenError::ToolFailed`] on a non-zero exit
pub async fn run(command: &ToolCommand, timeout_secs: Option<u64>) -> Result<Output, RefGenError> {
    debug!("Running: {}", command);

    let mut cmd = command.to_command();
    let child = cmd.output();
    let result = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child)
            .await
            .map_err(|_| RefGenError::ToolTimeout {
                tool: command.tool.to_string(),
                secs,
            })?,
        None => child.await,
    };

    let output = result.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RefGenError::ToolNotFound {
                tool: command.tool.to_string(),
                program: command.program.clone(),
            }
        } else {
            RefGenError::Internal(format!("failed to spawn '{}': {e}", command.program))
        }
    })?;

    if !output.status.success() {
        return Err(RefGenError::ToolFailed {
            tool: command.tool.to_string(),
            program: command.program.clone(),
            exit_code: output.status.code(),
            stderr: stderr_excerpt(&output.stderr),
        });
    }

    debug!("{} exited successfully", command.program);
    Ok(output)
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count > STDERR_EXCERPT_CHARS {
        let tail: String = text.chars().skip(count - STDERR_EXCERPT_CHARS).collect();
        format!("\u{2026}{tail}")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_leaves_plain_words_unquoted() {
        let cmd = ToolCommand::new(Tool::ImageMagick, "convert")
            .args(["-density", "300"])
            .placeholder("<pdf_file>")
            .arg("out/slide-%d.png");
        assert_eq!(
            cmd.to_string(),
            "convert -density 300 <pdf_file> out/slide-%d.png"
        );
    }

    #[test]
    fn display_quotes_words_with_spaces() {
        let cmd = ToolCommand::new(Tool::LibreOffice, "soffice").arg("My Deck.pptx");
        assert_eq!(cmd.to_string(), "soffice 'My Deck.pptx'");

        let cmd = ToolCommand::new(Tool::LibreOffice, "soffice").arg("it's.pptx");
        assert_eq!(cmd.to_string(), r"soffice 'it'\''s.pptx'");
    }

    #[test]
    fn display_quotes_shell_metacharacters() {
        let cmd = ToolCommand::new(Tool::LibreOffice, "soffice").arg("a&b;rm.pptx");
        assert_eq!(cmd.to_string(), "soffice 'a&b;rm.pptx'");

        for word in ["x|y", "(a)", "<in>", "*.pptx", "deck?", "[1]", "#x", "~/d", "hi!"] {
            let shown = ToolCommand::new(Tool::LibreOffice, "soffice").arg(word).to_string();
            assert_eq!(shown, format!("soffice '{word}'"));
        }
    }

    #[test]
    fn serialises_as_command_line() {
        let cmd = ToolCommand::new(Tool::Ghostscript, "gs").arg("--version");
        assert_eq!(serde_json::to_string(&cmd).unwrap(), "\"gs --version\"");
    }

    #[test]
    fn stderr_excerpt_keeps_the_tail() {
        let long = "x".repeat(STDERR_EXCERPT_CHARS + 10) + "END";
        let excerpt = stderr_excerpt(long.as_bytes());
        assert!(excerpt.starts_with('\u{2026}'));
        assert!(excerpt.ends_with("END"));
    }

    #[tokio::test]
    async fn missing_program_is_tool_not_found() {
        let cmd = ToolCommand::new(Tool::ImageMagick, "refgen-no-such-program-42");
        let err = run(&cmd, None).await.unwrap_err();
        assert!(
            matches!(err, RefGenError::ToolNotFound { ref program, .. } if program == "refgen-no-such-program-42"),
            "got: {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_tool_failed() {
        let cmd = ToolCommand::new(Tool::ImageMagick, "false");
        let err = run(&cmd, None).await.unwrap_err();
        assert!(
            matches!(err, RefGenError::ToolFailed { exit_code: Some(1), .. }),
            "got: {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let cmd = ToolCommand::new(Tool::LibreOffice, "sleep").arg("5");
        let err = run(&cmd, Some(1)).await.unwrap_err();
        assert!(
            matches!(err, RefGenError::ToolTimeout { secs: 1, .. }),
            "got: {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_program_returns_stdout() {
        let cmd = ToolCommand::new(Tool::Ghostscript, "echo").arg("10.02.1");
        let out = run(&cmd, Some(5)).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "10.02.1");
    }
}
