//! Output formatting: JSON, YAML, plain.
//!
//! Structured formats use serde; plain renders objects as aligned
//! `key  value` lines and arrays one element per line.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Printer ─────────────────────────────────────────────────────────

/// Resolved output settings shared by every command handler.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Printer {
    pub fn new(format: OutputFormat, color: ColorMode, quiet: bool) -> Self {
        Self {
            format,
            color: should_color(color),
            quiet,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.format == OutputFormat::Plain
    }

    /// Render and print a JSON value in the selected format.
    pub fn value(&self, value: &Value) -> Result<(), CliError> {
        let rendered = render(self.format, value, self.color)?;
        print_output(&rendered, self.quiet);
        Ok(())
    }

    /// Print a status line. Structured formats get nothing, so their
    /// stdout stays machine-readable.
    pub fn message(&self, text: &str) {
        if self.is_plain() {
            let text = if self.color {
                text.green().to_string()
            } else {
                text.to_owned()
            };
            print_output(&text, self.quiet);
        }
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render(format: OutputFormat, value: &Value, color: bool) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::JsonCompact => serde_json::to_string(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Plain => render_plain(value, color),
    })
}

fn render_plain(value: &Value, color: bool) -> String {
    match value {
        Value::Object(map) => {
            let width = map.keys().map(String::len).max().unwrap_or(0);
            let mut out = String::new();
            for (key, field) in map {
                let padded = format!("{key:<width$}");
                let key = if color {
                    padded.cyan().to_string()
                } else {
                    padded
                };
                let line = format!("{key}  {}", scalar(field));
                let _ = writeln!(out, "{}", line.trim_end());
            }
            out.trim_end().to_owned()
        }
        Value::Array(items) => items
            .iter()
            .map(scalar)
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar(other),
    }
}

/// Scalars print bare; nested structures fall back to compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
