//! Console rendering of a release run.
//!
//! Status lines go to stdout, warnings and errors to stderr, so a JSON summary
//! on stdout stays machine readable.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use drvrelease_lib::pipeline::ReleaseReport;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
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

/// One line of the release summary.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
  Done(String),
  Stat(&'static str, String),
  Note(String),
  Warn(String),
}

/// Human-readable size, binary units.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}

/// Wall-clock time of a build: minutes once it passes one.
pub fn format_elapsed(elapsed: Duration) -> String {
  let secs = elapsed.as_secs();
  match secs {
    0 => format!("{}ms", elapsed.subsec_millis()),
    1..60 => format!("{}.{:02}s", secs, elapsed.subsec_millis() / 10),
    _ => format!("{}m {}s", secs / 60, secs % 60),
  }
}

fn summary_lines(report: &ReleaseReport, elapsed: Duration) -> Vec<Line> {
  let mut lines = vec![
    Line::Done(format!("Released {} {}", report.driver, report.mode)),
    Line::Stat("Version", report.identity.version.to_string()),
    Line::Stat("Configuration", report.configuration.clone()),
    Line::Stat("Symbols pruned", report.pruned.deleted.len().to_string()),
  ];

  if report.verified.is_empty() {
    lines.push(Line::Note("Static verification skipped".into()));
  } else {
    lines.push(Line::Stat("Verified", report.verified.join(", ")));
  }

  for archive in &report.archives {
    lines.push(Line::Stat(
      "Archive",
      format!("{} ({})", archive.path.display(), format_size(archive.bytes)),
    ));
    lines.extend(
      archive
        .skipped
        .iter()
        .map(|entry| Line::Warn(format!("{} omitted from {}", entry.display(), archive.path.display()))),
    );
  }

  lines.extend(
    report
      .pruned
      .failed
      .iter()
      .map(|failure| Line::Warn(format!("Could not delete symbols {}: {}", failure.id, failure.error))),
  );

  lines.push(Line::Stat("Duration", format_elapsed(elapsed)));
  lines
}

/// Print the text summary of a finished release.
pub fn print_release_summary(report: &ReleaseReport, elapsed: Duration) {
  println!();
  for line in summary_lines(report, elapsed) {
    match line {
      Line::Done(msg) => println!("{} {}", "✓".if_supports_color(Stream::Stdout, |s| s.green()), msg),
      Line::Stat(label, value) => {
        println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value)
      }
      Line::Note(msg) => println!("{} {}", "•".if_supports_color(Stream::Stdout, |s| s.blue()), msg),
      Line::Warn(msg) => eprintln!(
        "{} {}",
        "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
        msg.if_supports_color(Stream::Stderr, |s| s.yellow())
      ),
    }
  }
}

/// Report a failed run on stderr.
pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    "✗".if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize release report")?;
  println!("{json}");
  Ok(())
}
