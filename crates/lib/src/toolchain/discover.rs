//! Locating the Visual Studio toolchain.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::execute::{self, Invocation};

use super::types::{ToolchainError, VisualStudio};

/// Find the first file called `name` below `root`.
pub fn find_file(name: &str, root: &Path) -> Option<PathBuf> {
  WalkDir::new(root)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .find(|e| e.file_name() == name)
    .map(|e| e.into_path())
}

/// Locate `vcvarsall.bat` in a Visual Studio installation.
pub fn find_vcvarsall(toolchain_root: &Path) -> Result<PathBuf, ToolchainError> {
  let path =
    find_file("vcvarsall.bat", toolchain_root).ok_or_else(|| ToolchainError::VcvarsallNotFound(toolchain_root.into()))?;
  debug!(path = %path.display(), "found vcvarsall");
  Ok(path)
}

/// Parse the output of `set` into a variable map.
///
/// Keys beginning with `?` are skipped; keys and values are trimmed.
pub fn parse_env_dump(output: &str) -> BTreeMap<String, String> {
  output
    .lines()
    .filter_map(|line| {
      let (key, value) = line.trim().split_once('=').unwrap_or((line.trim(), ""));
      let key = key.trim();
      if key.is_empty() || key.starts_with('?') {
        return None;
      }
      Some((key.to_string(), value.trim().to_string()))
    })
    .collect()
}

/// Pick the Visual Studio release from a toolchain environment.
pub fn visual_studio_from_env(env: &BTreeMap<String, String>) -> Result<VisualStudio, ToolchainError> {
  let version = env.get("VisualStudioVersion").ok_or(ToolchainError::MissingVersion)?;
  VisualStudio::from_version(version).ok_or_else(|| ToolchainError::UnsupportedVersion(version.clone()))
}

/// Ask `vcvarsall.bat` which Visual Studio release it sets up.
pub async fn detect_visual_studio(vcvarsall: &Path) -> Result<VisualStudio, ToolchainError> {
  let inv = Invocation::new("cmd.exe").args([
    "/C".to_string(),
    vcvarsall.display().to_string(),
    "x86_amd64".to_string(),
    "&&".to_string(),
    "set".to_string(),
  ]);

  let output = execute::capture(&inv).await?;
  let vs = visual_studio_from_env(&parse_env_dump(&output))?;

  info!(toolchain = %vs, "detected Visual Studio");
  Ok(vs)
}
