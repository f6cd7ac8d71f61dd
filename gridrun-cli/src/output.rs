//! Output formatting abstraction for text vs JSON rendering
//!
//! Final results flow through [`OutputWriter`]; progress events flow through
//! [`ConsoleReporter`]. In JSON mode progress moves to stderr so that stdout
//! carries only the JSON document.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use gridrun_core::reporter::{ReportEvent, Reporter};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to an arbitrary writer.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Prints progress events as colored console lines.
pub struct ConsoleReporter {
    to_stderr: bool,
}

impl ConsoleReporter {
    /// Progress goes to stdout for text output and to stderr for JSON.
    pub fn for_format(format: OutputFormat) -> Self {
        Self {
            to_stderr: format == OutputFormat::Json,
        }
    }
}

/// Text of one progress event, colored.
pub fn format_event(event: &ReportEvent) -> String {
    match event {
        ReportEvent::Step(name) => format!("\n{}", format!("==> {name}").magenta().bold()),
        ReportEvent::Info(msg) => format!("  {}", msg.blue()),
        ReportEvent::Success(msg) => format!("{} {}", "✓".green().bold(), msg.green()),
        ReportEvent::Warning(msg) => format!("{} {}", "⚠".yellow().bold(), msg.yellow()),
        ReportEvent::Failure(msg) => format!("{} {}", "✗".red().bold(), msg.red()),
        ReportEvent::Banner(text) => text.bold().to_string(),
        ReportEvent::Output(text) => text.trim_end().to_owned(),
    }
}

impl Reporter for ConsoleReporter {
    fn emit(&self, event: ReportEvent) {
        let line = format_event(&event);
        // best-effort
        let _ = if self.to_stderr {
            writeln!(std::io::stderr().lock(), "{line}")
        } else {
            writeln!(std::io::stdout().lock(), "{line}")
        };
    }
}
