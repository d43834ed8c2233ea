//! Symbol store publishing and pruning.
//!
//! Debug symbols are pushed to the store with `symstore add` and tagged with
//! the driver name. Old symbols are removed with `symstore del`, one
//! transaction id at a time, using the ids the retention policy hands back.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Version;
use crate::execute::{self, ExecuteError, Invocation};
use crate::platform::Arch;
use crate::retention;

#[derive(Debug, Error)]
pub enum SymbolStoreError {
  #[error("failed to publish symbols for {tag} {version} (exit code {code:?})")]
  PublishFailed {
    tag: String,
    version: String,
    code: Option<i32>,
  },

  #[error("failed to delete symbol transaction {id} (exit code {code:?})")]
  DeleteFailed { id: String, code: Option<i32> },

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}

/// Publishes debug symbols and removes them again.
#[allow(async_fn_in_trait)]
pub trait SymbolPublisher {
  /// Publish every `*.pdb` below `dir` under `tag` and `version`.
  async fn publish(&self, dir: &Path, tag: &str, version: &Version) -> Result<(), SymbolStoreError>;

  /// Delete a single transaction from the store.
  async fn delete_by_id(&self, id: &str) -> Result<(), SymbolStoreError>;
}

/// Location of `symstore.exe` inside a Windows Kit for the given host.
pub fn symstore_path(kit: &Path, host: Arch) -> PathBuf {
  kit.join("Debuggers").join(host.as_str()).join("symstore.exe")
}

/// `symstore.exe` bound to one store.
#[derive(Debug, Clone)]
pub struct SymStore {
  exe: PathBuf,
  store: PathBuf,
}

impl SymStore {
  pub fn new(exe: PathBuf, store: PathBuf) -> Self {
    Self { exe, store }
  }

  fn add_invocation(&self, dir: &Path, tag: &str, version: &Version) -> Invocation {
    Invocation::new(&self.exe)
      .arg("add")
      .arg("/s")
      .arg(self.store.display().to_string())
      .args(["/r", "/f", "*.pdb", "/t"])
      .arg(tag)
      .arg("/v")
      .arg(version.to_string())
      .current_dir(dir)
  }

  fn del_invocation(&self, id: &str) -> Invocation {
    Invocation::new(&self.exe)
      .args(["del", "/i", id, "/s"])
      .arg(self.store.display().to_string())
  }
}

impl SymbolPublisher for SymStore {
  async fn publish(&self, dir: &Path, tag: &str, version: &Version) -> Result<(), SymbolStoreError> {
    info!(dir = %dir.display(), tag = %tag, version = %version, "publishing symbols");

    let status = execute::run(&self.add_invocation(dir, tag, version)).await?;
    if !status.success() {
      return Err(SymbolStoreError::PublishFailed {
        tag: tag.to_string(),
        version: version.to_string(),
        code: status.code(),
      });
    }

    Ok(())
  }

  async fn delete_by_id(&self, id: &str) -> Result<(), SymbolStoreError> {
    let status = execute::run(&self.del_invocation(id)).await?;
    if !status.success() {
      return Err(SymbolStoreError::DeleteFailed {
        id: id.to_string(),
        code: status.code(),
      });
    }

    Ok(())
  }
}

/// A deletion that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
  pub id: String,
  pub error: String,
}

/// Outcome of pruning expired symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
  pub deleted: Vec<String>,
  pub failed: Vec<PruneFailure>,
}

/// Delete every id in `ids`, continuing past failures.
pub async fn delete_all<P: SymbolPublisher>(publisher: &P, ids: Vec<String>) -> PruneReport {
  let mut report = PruneReport::default();

  for id in ids {
    match publisher.delete_by_id(&id).await {
      Ok(()) => report.deleted.push(id),
      Err(e) => {
        warn!(id = %id, error = %e, "failed to delete expired symbols");
        report.failed.push(PruneFailure {
          id,
          error: e.to_string(),
        });
      }
    }
  }

  report
}

/// Remove symbols tagged `tag` that have outlived the retention window.
///
/// Best effort: a missing history means nothing is deleted, and a failed
/// deletion does not stop the others.
pub async fn prune<P: SymbolPublisher>(publisher: &P, store: &Path, tag: &str, retention_days: u32) -> PruneReport {
  let expired = retention::expired_symbols(store, tag, retention_days);
  let report = delete_all(publisher, expired).await;

  info!(
    tag = %tag,
    deleted = report.deleted.len(),
    failed = report.failed.len(),
    "pruned expired symbols"
  );
  report
}
