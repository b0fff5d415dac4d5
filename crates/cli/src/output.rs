//! Terminal output of the fab commands.
//!
//! Status lines go to stdout and problems to stderr, colored when the stream
//! supports it. With `--format json` a command prints one JSON document instead.

use std::fmt::Display;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use fab_lib::assembly::Diagnostic;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Outcome shown at the start of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Warning,
  Note,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Warning => "⚠",
      Status::Note => "•",
    }
  }

  /// Problems are written to stderr.
  fn is_problem(self) -> bool {
    matches!(self, Status::Failed | Status::Warning)
  }

  fn paint(self, text: &str, stream: Stream) -> String {
    match self {
      Status::Done => text.if_supports_color(stream, |s| s.green()).to_string(),
      Status::Failed => text.if_supports_color(stream, |s| s.red()).to_string(),
      Status::Warning => text.if_supports_color(stream, |s| s.yellow()).to_string(),
      Status::Note => text.if_supports_color(stream, |s| s.blue()).to_string(),
    }
  }
}

pub fn print_status(status: Status, message: &str) {
  if status.is_problem() {
    eprintln!(
      "{} {}",
      status.paint(status.symbol(), Stream::Stderr),
      status.paint(message, Stream::Stderr)
    );
  } else {
    println!("{} {}", status.paint(status.symbol(), Stream::Stdout), message);
  }
}

/// Cycles are warnings, everything else accompanied a failure.
pub fn print_diagnostic(diagnostic: &Diagnostic) {
  let status = if diagnostic.kind.is_error() {
    Status::Failed
  } else {
    Status::Warning
  };
  print_status(status, &diagnostic.to_string());
}

pub fn print_module_heading(module: &str) {
  println!();
  println!("{}", module.if_supports_color(Stream::Stdout, |s| s.bold()));
}

/// One assembled feature below a module heading.
pub fn print_feature(scope: impl Display, id: &str, digest: &str) {
  println!(
    "  {} {} {} {}",
    Status::Note.symbol(),
    scope,
    id,
    digest.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// A dependency added to a module by augmentation.
pub fn print_added_dependency(id: &str) {
  println!("  {} {}", "+".if_supports_color(Stream::Stdout, |s| s.green()), id);
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Human-readable duration, rounded to milliseconds.
pub fn format_duration(duration: Duration) -> String {
  let millis = Duration::from_millis(duration.as_millis() as u64);
  if millis.is_zero() {
    return "0ms".to_string();
  }
  humantime::format_duration(millis).to_string()
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
