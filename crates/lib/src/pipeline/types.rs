//! Types for a release run.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveSummary};
use crate::config::Version;
use crate::counter::CounterError;
use crate::manifest::ManifestError;
use crate::sdv::VerificationError;
use crate::symstore::{PruneReport, SymbolStoreError};
use crate::toolchain::ToolchainError;

/// Build flavour selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  /// Debug build.
  Checked,
  /// Release build.
  Free,
}

impl BuildMode {
  pub fn is_debug(&self) -> bool {
    matches!(self, BuildMode::Checked)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      BuildMode::Checked => "checked",
      BuildMode::Free => "free",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Options for one release run.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
  /// Driver to build; also the symbol tag and output directory name.
  pub driver: String,
  pub mode: BuildMode,
  /// Run the static verification pass.
  pub verify: bool,
  pub retention_days: u32,
  /// Root of the source checkout; all outputs land here.
  pub work_dir: PathBuf,
}

/// Build number and version assigned to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildIdentity {
  pub build_number: u64,
  pub version: Version,
}

/// Summary of a completed release run.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
  pub driver: String,
  pub mode: BuildMode,
  pub configuration: String,
  pub identity: BuildIdentity,
  pub pruned: PruneReport,
  pub verified: Vec<String>,
  pub archives: Vec<ArchiveSummary>,
}

/// Fatal errors; any of these stops the run where it is.
#[derive(Debug, Error)]
pub enum ReleaseError {
  #[error(transparent)]
  Counter(#[from] CounterError),

  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error(transparent)]
  SymbolStore(#[from] SymbolStoreError),

  #[error("verification failed: {0}")]
  Verification(#[from] VerificationError),

  #[error("source manifest failed: {0}")]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_mode_names_and_debug_flag() {
    assert_eq!(BuildMode::Checked.to_string(), "checked");
    assert_eq!(BuildMode::Free.as_str(), "free");
    assert!(BuildMode::Checked.is_debug());
    assert!(!BuildMode::Free.is_debug());
  }
}
