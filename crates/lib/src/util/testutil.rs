//! Test utilities for drvrelease-lib.
//!
//! Stand-ins for the Windows tools (`msbuild.bat`, `symstore.exe`, `git`) are
//! written as small shell scripts so the process plumbing can be exercised on Unix.

use std::path::{Path, PathBuf};

/// Writes an executable `/bin/sh` script and returns its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).unwrap();
  path
}

/// Writes a file relative to `dir`, creating parent directories.
pub fn write_file(dir: &Path, relative_path: &str, content: &str) -> PathBuf {
  let path = dir.join(relative_path);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Returns the command and args to print `msg` through a shell.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), format!("echo {}", msg)])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Returns the command and args for a shell script that exits with `code`.
#[cfg(unix)]
pub fn exit_with(code: i32) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), format!("exit {}", code)])
}

#[cfg(windows)]
pub fn exit_with(code: i32) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("exit {}", code)])
}
