//! Tarball creation.
//!
//! Archiving is best effort per entry: an entry that is missing or cannot be
//! read is logged and left out, and the rest of the archive is still written.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("failed to create archive {path}: {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to finish archive {path}: {source}")]
  Finish {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// What ended up in an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
  pub path: PathBuf,
  pub added: usize,
  pub skipped: Vec<PathBuf>,
  pub bytes: u64,
}

/// Writes archives of files and directories.
pub trait Archiver {
  /// Archive `entries`, resolved against `base` and stored under their
  /// relative names, into `output`. Gzip-compressed when `compressed` is set.
  fn create_archive(
    &self,
    output: &Path,
    base: &Path,
    entries: &[PathBuf],
    compressed: bool,
  ) -> Result<ArchiveSummary, ArchiveError>;
}

/// Archiver producing `.tar` and `.tgz` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiver;

impl Archiver for TarArchiver {
  fn create_archive(
    &self,
    output: &Path,
    base: &Path,
    entries: &[PathBuf],
    compressed: bool,
  ) -> Result<ArchiveSummary, ArchiveError> {
    info!(path = %output.display(), entries = entries.len(), compressed, "creating archive");

    let create_err = |source: io::Error| ArchiveError::Create {
      path: output.to_path_buf(),
      source,
    };
    let finish_err = |source: io::Error| ArchiveError::Finish {
      path: output.to_path_buf(),
      source,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(create_err)?;
    }
    let file = File::create(output).map_err(create_err)?;

    let mut summary = if compressed {
      let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
      let summary = append_entries(&mut builder, base, entries);
      let mut encoder = builder.into_inner().map_err(finish_err)?;
      encoder.flush().map_err(finish_err)?;
      encoder.finish().map_err(finish_err)?;
      summary
    } else {
      let mut builder = tar::Builder::new(file);
      let summary = append_entries(&mut builder, base, entries);
      builder.into_inner().map_err(finish_err)?;
      summary
    };

    summary.path = output.to_path_buf();
    summary.bytes = fs::metadata(output).map(|m| m.len()).unwrap_or(0);

    if !summary.skipped.is_empty() {
      warn!(path = %output.display(), skipped = summary.skipped.len(), "archive is missing entries");
    }
    Ok(summary)
  }
}

fn append_entries<W: Write>(builder: &mut tar::Builder<W>, base: &Path, entries: &[PathBuf]) -> ArchiveSummary {
  let mut summary = ArchiveSummary::default();

  for entry in entries {
    match append_entry(builder, base, entry) {
      Ok(()) => summary.added += 1,
      Err(e) => {
        warn!(entry = %entry.display(), error = %e, "skipping archive entry");
        summary.skipped.push(entry.clone());
      }
    }
  }

  summary
}

fn append_entry<W: Write>(builder: &mut tar::Builder<W>, base: &Path, entry: &Path) -> io::Result<()> {
  let source = base.join(entry);
  let name = archive_name(entry);

  if name.as_os_str().is_empty() {
    return Err(io::Error::new(io::ErrorKind::InvalidInput, "entry has no relative name"));
  }

  if fs::metadata(&source)?.is_dir() {
    builder.append_dir_all(&name, &source)
  } else {
    builder.append_path_with_name(&source, &name)
  }
}

/// The name an entry is stored under: its normal components only, so absolute
/// and `./`-prefixed paths become relative.
fn archive_name(entry: &Path) -> PathBuf {
  entry
    .components()
    .filter(|c| matches!(c, Component::Normal(_)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_file;
  use flate2::read::GzDecoder;
  use std::io::Read;
  use tempfile::TempDir;

  fn names<R: Read>(archive: tar::Archive<R>) -> Vec<String> {
    let mut archive = archive;
    let mut names: Vec<String> = archive
      .entries()
      .unwrap()
      .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
      .collect();
    names.sort();
    names
  }

  #[test]
  fn archive_name_strips_prefixes() {
    assert_eq!(archive_name(Path::new("./src/lib.rs")), PathBuf::from("src/lib.rs"));
    assert_eq!(archive_name(Path::new("/abs/file")), PathBuf::from("abs/file"));
  }

  #[test]
  fn uncompressed_archive_includes_directories_recursively() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "xenbus/x64/xenbus.sys", "sys");
    write_file(temp.path(), "xenbus/xen.DVL.XML", "dvl");
    write_file(temp.path(), "revision", "abc\n");

    let output = temp.path().join("xenbus.tar");
    let summary = TarArchiver
      .create_archive(
        &output,
        temp.path(),
        &[PathBuf::from("xenbus"), PathBuf::from("revision")],
        false,
      )
      .unwrap();

    assert_eq!(summary.added, 2);
    assert!(summary.skipped.is_empty());
    assert!(summary.bytes > 0);

    let names = names(tar::Archive::new(File::open(&output).unwrap()));
    assert!(names.contains(&"revision".to_string()));
    assert!(names.contains(&"xenbus/x64/xenbus.sys".to_string()));
    assert!(names.contains(&"xenbus/xen.DVL.XML".to_string()));
  }

  #[test]
  fn compressed_archive_skips_missing_entries() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/xen/driver.c", "int x;");
    write_file(temp.path(), "build.py", "");

    let output = temp.path().join("out").join("source.tgz");
    let summary = TarArchiver
      .create_archive(
        &output,
        temp.path(),
        &[
          PathBuf::from("src/xen/driver.c"),
          PathBuf::from("deleted.c"),
          PathBuf::from("build.py"),
        ],
        true,
      )
      .unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, vec![PathBuf::from("deleted.c")]);

    let names = names(tar::Archive::new(GzDecoder::new(File::open(&output).unwrap())));
    assert_eq!(names, vec!["build.py", "src/xen/driver.c"]);
  }

  #[test]
  fn empty_entry_list_still_writes_archive() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("empty.tar");

    let summary = TarArchiver.create_archive(&output, temp.path(), &[], false).unwrap();

    assert_eq!(summary.added, 0);
    assert!(output.exists());
  }
}
