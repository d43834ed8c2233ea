//! Native toolchain invocation.
//!
//! MSBuild is never called directly. The project ships an `msbuild.bat` wrapper
//! that sources `vcvarsall.bat` and reads its arguments from `MSBUILD_*`
//! environment variables; this module fills those in and treats any non-zero
//! exit as a failed build.

pub mod discover;
pub mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::execute::{self, Invocation};
use crate::platform::Arch;

pub use discover::{detect_visual_studio, find_vcvarsall};
pub use types::{Configuration, ToolchainError, VisualStudio};

/// Builds a driver solution for one architecture and configuration.
#[allow(async_fn_in_trait)]
pub trait BuildRunner {
  async fn build(&self, solution: &str, arch: Arch, configuration: &Configuration) -> Result<(), ToolchainError>;
}

/// One MSBuild run: a target of a solution or project file.
#[derive(Debug, Clone)]
pub struct MsBuildRequest<'a> {
  pub arch: Arch,
  pub configuration: &'a Configuration,
  /// MSBuild target, e.g. `Build`, `sdv` or `dvl`.
  pub target: &'a str,
  /// Solution or project file, relative to `dir`.
  pub file: &'a str,
  /// Extra MSBuild arguments, passed through verbatim.
  pub extra: &'a str,
  /// Directory MSBuild runs in.
  pub dir: &'a Path,
}

/// Runs MSBuild through the project's `msbuild.bat` wrapper.
#[derive(Debug, Clone)]
pub struct MsBuild {
  script: PathBuf,
  vcvarsall: PathBuf,
  solution_dir: PathBuf,
  env: BTreeMap<String, String>,
}

impl MsBuild {
  /// * `script` - the `msbuild.bat` wrapper
  /// * `vcvarsall` - toolchain environment script handed to the wrapper
  /// * `solution_dir` - directory holding the `.sln` files (e.g. `vs2017`)
  /// * `env` - extra variables for every toolchain process
  pub fn new(script: PathBuf, vcvarsall: PathBuf, solution_dir: PathBuf, env: BTreeMap<String, String>) -> Self {
    Self {
      script,
      vcvarsall,
      solution_dir,
      env,
    }
  }

  pub fn solution_dir(&self) -> &Path {
    &self.solution_dir
  }

  fn invocation(&self, req: &MsBuildRequest<'_>) -> Invocation {
    Invocation::new(&self.script)
      .current_dir(req.dir)
      .envs(&self.env)
      .env("MSBUILD_PLATFORM", req.arch.msbuild_platform())
      .env("MSBUILD_CONFIGURATION", req.configuration.to_string())
      .env("MSBUILD_TARGET", req.target)
      .env("MSBUILD_FILE", req.file)
      .env("MSBUILD_EXTRA", req.extra)
      .env("MSBUILD_VCVARSALL", self.vcvarsall.display().to_string())
  }

  /// Run one MSBuild request.
  ///
  /// A non-zero exit becomes [`ToolchainError::BuildFailed`] naming the configuration.
  pub async fn invoke(&self, req: &MsBuildRequest<'_>) -> Result<(), ToolchainError> {
    info!(
      platform = req.arch.msbuild_platform(),
      configuration = %req.configuration,
      target = req.target,
      file = req.file,
      "msbuild"
    );

    let status = execute::run(&self.invocation(req)).await?;

    if !status.success() {
      return Err(ToolchainError::BuildFailed {
        configuration: req.configuration.to_string(),
        target: req.target.to_string(),
        file: req.file.to_string(),
        code: status.code(),
      });
    }

    Ok(())
  }
}

impl BuildRunner for MsBuild {
  async fn build(&self, solution: &str, arch: Arch, configuration: &Configuration) -> Result<(), ToolchainError> {
    let file = format!("{}.sln", solution);
    self
      .invoke(&MsBuildRequest {
        arch,
        configuration,
        target: "Build",
        file: &file,
        extra: "",
        dir: &self.solution_dir,
      })
      .await
  }
}
