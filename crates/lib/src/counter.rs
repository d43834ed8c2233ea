//! On-disk build counter.
//!
//! The counter file holds a single decimal integer. Each call hands out the
//! stored value and writes back its successor. There is no locking: only one
//! build may run per working directory at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CounterError {
  #[error("build counter {path} does not hold a number: {value:?}")]
  Parse { path: PathBuf, value: String },

  #[error("build counter {path} is exhausted at {value}")]
  Exhausted { path: PathBuf, value: u64 },

  #[error("failed to write build counter {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Take the next build number from the counter at `path`.
///
/// A counter that cannot be read starts at zero.
pub fn next_build_number(path: &Path) -> Result<u64, CounterError> {
  let current = match fs::read_to_string(path) {
    Ok(content) => {
      let value = content.trim();
      value.parse::<u64>().map_err(|_| CounterError::Parse {
        path: path.to_path_buf(),
        value: value.to_string(),
      })?
    }
    Err(e) => {
      debug!(path = %path.display(), error = %e, "build counter unreadable, starting at 0");
      0
    }
  };

  let next = current.checked_add(1).ok_or_else(|| CounterError::Exhausted {
    path: path.to_path_buf(),
    value: current,
  })?;

  fs::write(path, next.to_string()).map_err(|source| CounterError::Write {
    path: path.to_path_buf(),
    source,
  })?;

  info!(build_number = current, "allocated build number");
  Ok(current)
}
