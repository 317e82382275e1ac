use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::StatusKind;

/// Rendering surface driven by the controller.
pub trait PresentationSink: Send + Sync {
    fn status(&self, text: &str, kind: StatusKind);
    /// `None` hides the latency indicator.
    fn latency(&self, latency: Option<Duration>);
    /// An empty `sources` slice means "no sources".
    fn answer(&self, text: &str, sources: &[String]);
    fn submit_enabled(&self, enabled: bool);
    fn generating(&self, active: bool, text: Option<&str>);
    /// The displayed answer no longer corresponds to the query text.
    fn answer_stale(&self) {}
    fn scroll_to_result(&self) {}
}

pub const STALE_ANSWER_NOTE: &str = "(query edited; the answer above is for the previous query)";

pub fn format_latency(latency: Duration) -> String {
    format!("{}ms", (latency.as_secs_f64() * 1000.0).round() as u64)
}

/// Line-oriented terminal renderer.
pub struct TerminalSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl PresentationSink for TerminalSink {
    fn status(&self, text: &str, kind: StatusKind) {
        let line = match kind {
            StatusKind::Info => format!("{} {}", "•".blue(), text),
            StatusKind::Ok => format!("{} {}", "✓".green().bold(), text.green()),
            StatusKind::Error => format!("{} {}", "✗".red().bold(), text.red()),
        };
        self.emit(&line);
    }

    fn latency(&self, latency: Option<Duration>) {
        if let Some(latency) = latency {
            self.emit(&format!("  [{}]", format_latency(latency)).dimmed().to_string());
        }
    }

    fn answer(&self, text: &str, sources: &[String]) {
        let mut block = String::new();
        if !text.is_empty() {
            block.push_str(text);
            block.push('\n');
        }
        if !sources.is_empty() {
            block.push_str(&format!("\n{}\n", "Sources".bold().underline()));
            for (i, source) in sources.iter().enumerate() {
                block.push_str(&format!("  {}. {}\n", i + 1, source));
            }
        }
        if !block.is_empty() {
            self.emit(block.trim_end_matches('\n'));
        }
    }

    fn submit_enabled(&self, enabled: bool) {
        tracing::trace!(enabled, "submit control toggled");
    }

    fn generating(&self, active: bool, text: Option<&str>) {
        if active {
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                self.emit(&text.italic().dimmed().to_string());
            }
        }
    }

    fn answer_stale(&self) {
        self.emit(&STALE_ANSWER_NOTE.dimmed().to_string());
    }
}
