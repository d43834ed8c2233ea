//! Source manifest: the list of files tracked by source control.
//!
//! The manifest drives the source tarball, so only tracked files are shipped
//! regardless of what else is lying around in the working tree.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::execute::{self, ExecuteError, Invocation};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("error {code:?} in: {cmd}")]
  GitFailed { code: Option<i32>, cmd: String },

  #[error(transparent)]
  Execute(ExecuteError),
}

impl From<ExecuteError> for ManifestError {
  fn from(err: ExecuteError) -> Self {
    match err {
      ExecuteError::CmdFailed { cmd, code } => ManifestError::GitFailed { code, cmd },
      other => ManifestError::Execute(other),
    }
  }
}

/// Lists the files that make up the source release.
#[allow(async_fn_in_trait)]
pub trait SourceManifest {
  async fn list_files(&self) -> Result<Vec<PathBuf>, ManifestError>;
}

/// Files tracked at `HEAD` of a git checkout.
#[derive(Debug, Clone)]
pub struct GitManifest {
  repo: PathBuf,
  git: PathBuf,
}

impl GitManifest {
  pub fn new(repo: impl Into<PathBuf>) -> Self {
    Self {
      repo: repo.into(),
      git: PathBuf::from("git"),
    }
  }

  /// Use a specific `git` executable.
  pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
    self.git = git.into();
    self
  }

  fn invocation(&self) -> Invocation {
    Invocation::new(&self.git)
      .args(["ls-tree", "-r", "--name-only", "HEAD"])
      .current_dir(&self.repo)
  }
}

impl SourceManifest for GitManifest {
  async fn list_files(&self) -> Result<Vec<PathBuf>, ManifestError> {
    let output = execute::capture(&self.invocation()).await?;
    let files = parse_listing(&output);
    debug!(repo = %self.repo.display(), count = files.len(), "listed tracked files");
    Ok(files)
  }
}

/// One path per non-empty line.
fn parse_listing(output: &str) -> Vec<PathBuf> {
  output
    .lines()
    .map(str::trim_end)
    .filter(|line| !line.is_empty())
    .map(PathBuf::from)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_listing_skips_blank_lines() {
    let files = parse_listing("build.py\r\nsrc/xen/driver.c\n\ninclude/xen.h\n");
    assert_eq!(
      files,
      vec![
        PathBuf::from("build.py"),
        PathBuf::from("src/xen/driver.c"),
        PathBuf::from("include/xen.h"),
      ]
    );
  }

  #[test]
  fn invocation_lists_head() {
    let manifest = GitManifest::new("/src/pv");
    assert_eq!(manifest.invocation().to_string(), "git ls-tree -r --name-only HEAD");
    assert_eq!(manifest.invocation().cwd.as_deref(), Some(Path::new("/src/pv")));
  }

  #[test]
  fn command_failure_maps_to_git_failed() {
    let err: ManifestError = ExecuteError::CmdFailed {
      cmd: "git ls-tree -r --name-only HEAD".to_string(),
      code: Some(128),
    }
    .into();

    assert!(matches!(err, ManifestError::GitFailed { code: Some(128), .. }));
    assert_eq!(err.to_string(), "error Some(128) in: git ls-tree -r --name-only HEAD");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn list_files_uses_git_output() {
    use crate::util::testutil::write_script;
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let git = write_script(temp.path(), "git", "printf 'a.c\\nsub/b.h\\n'");

    let files = GitManifest::new(temp.path()).with_git(git).list_files().await.unwrap();

    assert_eq!(files, vec![PathBuf::from("a.c"), PathBuf::from("sub/b.h")]);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn list_files_outside_repository_fails() {
    use crate::util::testutil::write_script;
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let git = write_script(temp.path(), "git", "echo 'fatal: not a git repository' >&2; exit 128");

    let err = GitManifest::new(temp.path()).with_git(git).list_files().await.unwrap_err();

    assert!(matches!(err, ManifestError::GitFailed { code: Some(128), .. }));
  }
}
