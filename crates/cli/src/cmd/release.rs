//! Implementation of the release build.
//!
//! Reads the configuration from the environment, runs the release pipeline
//! and prints a summary of what was built, pruned and packaged.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use drvrelease_lib::config::ReleaseConfig;
use drvrelease_lib::pipeline::{BuildMode, ReleaseOptions, release};

use crate::output::{OutputFormat, print_json, print_release_summary};

pub struct ReleaseArgs {
  pub mode: BuildMode,
  pub verify: bool,
  pub driver: String,
  pub retention_days: u32,
  pub directory: Option<PathBuf>,
}

/// Execute a release build.
///
/// Fails on the first fatal step; symbol pruning problems are reported as
/// warnings only.
pub fn cmd_release(args: ReleaseArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let config = ReleaseConfig::from_env().context("Invalid build environment")?;

  let work_dir = match args.directory {
    Some(dir) => dir,
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let work_dir = dunce::canonicalize(&work_dir)
    .with_context(|| format!("Build directory {} is not accessible", work_dir.display()))?;
  debug!(work_dir = %work_dir.display(), "resolved build directory");

  let options = ReleaseOptions {
    driver: args.driver,
    mode: args.mode,
    verify: args.verify,
    retention_days: args.retention_days,
    work_dir,
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(release(&config, &options)).context("Release failed")?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_release_summary(&report, start.elapsed());
  }

  Ok(())
}
