//! Static Driver Verifier pass.
//!
//! For each driver project: build it, clean and run SDV, scrub the timestamps
//! out of the results log so it diffs cleanly between runs, produce the Driver
//! Verification Log and copy it next to the build output. A project that has a
//! `refine.sdv` file gets an extra refinement run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::platform::Arch;
use crate::toolchain::{Configuration, MsBuild, MsBuildRequest, ToolchainError, VisualStudio};

#[derive(Debug, Error)]
pub enum VerificationError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error("{action} {path}: {source}")]
  Io {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl VerificationError {
  fn io<'p>(action: &'static str, path: &'p Path) -> impl FnOnce(io::Error) -> Self + 'p {
    move |source| VerificationError::Io {
      action,
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Runs static verification over one driver project.
#[allow(async_fn_in_trait)]
pub trait VerificationPass {
  /// Verify `project` and leave its verification log in `out_dir`.
  async fn verify(&self, project: &str, out_dir: &Path) -> Result<(), VerificationError>;
}

/// Drop every line mentioning `TimeStamp`.
pub fn strip_timestamp_lines(content: &str) -> String {
  content
    .split_inclusive('\n')
    .filter(|line| !line.contains("TimeStamp"))
    .collect()
}

/// Rewrite `path` without its `TimeStamp` lines, keeping the original as `<path>.orig`.
pub fn remove_timestamps(path: &Path) -> Result<(), VerificationError> {
  let mut orig = path.as_os_str().to_owned();
  orig.push(".orig");
  let orig = PathBuf::from(orig);

  match fs::remove_file(&orig) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(VerificationError::io("remove", &orig)(e)),
  }

  fs::rename(path, &orig).map_err(VerificationError::io("rename", path))?;
  let content = fs::read_to_string(&orig).map_err(VerificationError::io("read", &orig))?;
  fs::write(path, strip_timestamp_lines(&content)).map_err(VerificationError::io("write", path))?;

  debug!(path = %path.display(), "removed timestamps");
  Ok(())
}

/// Static Driver Verifier driven through MSBuild.
#[derive(Debug, Clone)]
pub struct StaticDriverVerifier<'a> {
  msbuild: &'a MsBuild,
  configuration: Configuration,
}

impl<'a> StaticDriverVerifier<'a> {
  pub fn new(msbuild: &'a MsBuild, vs: VisualStudio) -> Self {
    Self {
      msbuild,
      configuration: Configuration::new(vs.verification_release(), false),
    }
  }

  async fn msbuild(&self, target: &str, file: &str, extra: &str, dir: &Path) -> Result<(), ToolchainError> {
    self
      .msbuild
      .invoke(&MsBuildRequest {
        arch: Arch::X64,
        configuration: &self.configuration,
        target,
        file,
        extra,
        dir,
      })
      .await
  }
}

impl VerificationPass for StaticDriverVerifier<'_> {
  async fn verify(&self, project: &str, out_dir: &Path) -> Result<(), VerificationError> {
    info!(project = %project, "running static driver verification");

    let dir = self.msbuild.solution_dir().join(project);
    let file = format!("{}.vcxproj", project);

    self.msbuild("Build", &file, "", &dir).await?;
    self.msbuild("sdv", &file, "/p:Inputs=\"/clean\"", &dir).await?;
    self
      .msbuild("sdv", &file, "/p:Inputs=\"/check:default.sdv /debug\"", &dir)
      .await?;

    remove_timestamps(&dir.join("sdv").join("SDV.DVL.xml"))?;

    self.msbuild("dvl", &file, "", &dir).await?;

    let dvl_name = format!("{}.DVL.XML", project);
    let dvl = dir.join(&dvl_name);
    let dest = out_dir.join(&dvl_name);
    fs::create_dir_all(out_dir).map_err(VerificationError::io("create", out_dir))?;
    fs::copy(&dvl, &dest).map_err(VerificationError::io("copy", &dvl))?;

    if dir.join("refine.sdv").is_file() {
      self.msbuild("sdv", &file, "/p:Inputs=/refine", &dir).await?;
    }

    Ok(())
  }
}
