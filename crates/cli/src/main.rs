mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use drvrelease_lib::consts::{DEFAULT_DRIVER, DEFAULT_RETENTION_DAYS};
use drvrelease_lib::pipeline::BuildMode;

use crate::output::{OutputFormat, print_error};

/// Build flavour.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
  /// Debug build
  Checked,
  /// Release build
  Free,
}

impl From<Mode> for BuildMode {
  fn from(mode: Mode) -> Self {
    match mode {
      Mode::Checked => BuildMode::Checked,
      Mode::Free => BuildMode::Free,
    }
  }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verification {
  /// Skip static driver verification
  Nosdv,
}

/// drvrelease - release builds for the PV drivers
#[derive(Parser)]
#[command(name = "drvrelease")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Build flavour
  #[arg(value_enum)]
  mode: Mode,

  /// Pass `nosdv` to skip static driver verification
  #[arg(value_enum)]
  verification: Option<Verification>,

  /// Driver to build, tag symbols with, and package
  #[arg(long, default_value = DEFAULT_DRIVER)]
  driver: String,

  /// Days to keep published symbols before pruning them
  #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
  retention_days: u32,

  /// Source checkout to build in (defaults to the current directory)
  #[arg(short = 'C', long)]
  directory: Option<PathBuf>,

  /// Output format for the summary
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let args = cmd::ReleaseArgs {
    mode: cli.mode.into(),
    verify: cli.verification.is_none(),
    driver: cli.driver,
    retention_days: cli.retention_days,
    directory: cli.directory,
  };

  if let Err(err) = cmd::cmd_release(args, cli.output) {
    print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
