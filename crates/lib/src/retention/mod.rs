//! Symbol retention policy.
//!
//! Reads the symbol store's transaction history and works out which published
//! symbols are old enough to delete. The evaluation is a single pass in log order:
//! an `add` for the requested tag older than the retention window enters the
//! expiry set, and any later `del` naming that id takes it out again.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

pub use types::{ExpirySet, RecordError, TransactionRecord};

/// Location of the transaction history inside a symbol store.
pub fn history_path(symbol_store: &Path) -> PathBuf {
  symbol_store.join("000Admin").join("history.txt")
}

/// Read the transaction history.
///
/// Returns `None` if the file is missing or unreadable; a store without history
/// has nothing to expire.
pub fn load_history(path: &Path) -> Option<String> {
  match fs::read_to_string(path) {
    Ok(content) => Some(content),
    Err(e) => {
      debug!(path = %path.display(), error = %e, "no symbol history available");
      None
    }
  }
}

/// Symbols published strictly before this instant are expired.
///
/// A window reaching past the earliest representable time clamps to it, so
/// nothing is old enough to expire.
pub fn retention_threshold(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
  TimeDelta::try_days(i64::from(retention_days))
    .and_then(|window| now.checked_sub_signed(window))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Compute the ids eligible for deletion, evaluated against a fixed `now`.
///
/// Deletions always win: a `del` removes its target whether or not the target
/// was already judged expired, and a `del` for an unknown id is ignored.
pub fn compute_expired_at<'a, I>(tag: &str, retention_days: u32, log: I, now: DateTime<Utc>) -> Vec<String>
where
  I: IntoIterator<Item = &'a str>,
{
  let threshold = retention_threshold(now, retention_days);
  let mut expired = ExpirySet::new();

  for (lineno, line) in log.into_iter().enumerate() {
    match TransactionRecord::parse(line) {
      Ok(Some(TransactionRecord::Add { id, published, tag: record_tag })) => {
        if record_tag == tag && published < threshold {
          expired.insert(&id);
        }
      }
      Ok(Some(TransactionRecord::Delete { target, .. })) => {
        expired.remove(&target);
      }
      Ok(None) => {}
      Err(e) => {
        warn!(line = lineno + 1, error = %e, "skipping malformed history record");
      }
    }
  }

  expired.into_vec()
}

/// Compute the ids eligible for deletion as of the current UTC time.
///
/// The clock is sampled once, so every record in the pass is compared against
/// the same threshold.
pub fn compute_expired<'a, I>(tag: &str, retention_days: u32, log: I) -> Vec<String>
where
  I: IntoIterator<Item = &'a str>,
{
  compute_expired_at(tag, retention_days, log, Utc::now())
}

/// Expired symbol ids for `tag` in the store rooted at `symbol_store`.
pub fn expired_symbols(symbol_store: &Path, tag: &str, retention_days: u32) -> Vec<String> {
  let path = history_path(symbol_store);

  let Some(history) = load_history(&path) else {
    return Vec::new();
  };

  let expired = compute_expired(tag, retention_days, history.lines());
  info!(tag = %tag, retention_days, count = expired.len(), "evaluated symbol retention");
  expired
}
