//! Types for driving the native toolchain.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::execute::ExecuteError;
use crate::platform::Arch;

/// Errors raised by toolchain discovery and invocation.
#[derive(Debug, Error)]
pub enum ToolchainError {
  /// MSBuild exited unsuccessfully. Always aborts the release.
  #[error("build failed for configuration '{configuration}' ({target} {file}, exit code {code:?})")]
  BuildFailed {
    configuration: String,
    target: String,
    file: String,
    code: Option<i32>,
  },

  #[error("vcvarsall.bat not found under {0}")]
  VcvarsallNotFound(PathBuf),

  #[error("toolchain environment does not report VisualStudioVersion")]
  MissingVersion,

  #[error("unsupported Visual Studio version {0}")]
  UnsupportedVersion(String),

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

/// Supported Visual Studio releases.
///
/// The name doubles as the directory holding that toolchain's solution files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualStudio {
  Vs2015,
  Vs2017,
}

impl VisualStudio {
  /// Map a `VisualStudioVersion` value.
  pub fn from_version(version: &str) -> Option<Self> {
    match version.trim() {
      "14.0" => Some(Self::Vs2015),
      "15.0" => Some(Self::Vs2017),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Vs2015 => "vs2015",
      Self::Vs2017 => "vs2017",
    }
  }

  /// Target OS release the driver solution is built against.
  pub fn driver_release(&self) -> &'static str {
    match self {
      Self::Vs2015 | Self::Vs2017 => "Windows 8",
    }
  }

  /// Target OS release used for static driver verification.
  pub fn verification_release(&self) -> &'static str {
    match self {
      Self::Vs2015 | Self::Vs2017 => "Windows 10",
    }
  }
}

impl fmt::Display for VisualStudio {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// An MSBuild configuration such as `Windows 8 Debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
  pub release: String,
  pub debug: bool,
}

impl Configuration {
  pub fn new(release: impl Into<String>, debug: bool) -> Self {
    Self {
      release: release.into(),
      debug,
    }
  }

  /// The configuration with spaces removed, as used for output directories.
  pub fn dir_name(&self) -> String {
    self.to_string().split_whitespace().collect()
  }

  /// Where MSBuild leaves the output for `arch`, relative to the solution directory.
  pub fn target_path(&self, solution_dir: &Path, arch: Arch) -> PathBuf {
    solution_dir.join(self.dir_name()).join(arch.msbuild_platform())
  }
}

impl fmt::Display for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let flavour = if self.debug { "Debug" } else { "Release" };
    write!(f, "{} {}", self.release, flavour)
  }
}
