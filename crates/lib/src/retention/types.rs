//! Types for the symbol store transaction history.
//!
//! The store appends one comma-separated record per operation to
//! `000Admin/history.txt`:
//!
//! ```text
//! 0000000001,add,file,01/01/2024,00:00:00,"xenbus","9.0.0.12","",
//! 0000000002,del,0000000001
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Errors produced while reading an `add` record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
  #[error("missing field {index}")]
  MissingField { index: usize },

  #[error("invalid date {value:?}")]
  InvalidDate { value: String },

  #[error("invalid time {value:?}")]
  InvalidTime { value: String },
}

/// One line of the transaction history that the retention policy acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRecord {
  /// A symbol file was published.
  Add {
    id: String,
    published: DateTime<Utc>,
    tag: String,
  },
  /// An earlier transaction was deleted.
  Delete { id: String, target: String },
}

impl TransactionRecord {
  /// Classify and parse a history line.
  ///
  /// Returns `Ok(None)` for lines that are neither `add` nor `del` records.
  /// The kind is matched as a prefix of the second field.
  pub fn parse(line: &str) -> Result<Option<Self>, RecordError> {
    let fields: Vec<&str> = line.split(',').collect();

    let Some(kind) = fields.get(1) else {
      return Ok(None);
    };

    if kind.starts_with("add") {
      let id = field(&fields, 0)?.to_string();
      let date = field(&fields, 3)?;
      let time = field(&fields, 4)?;
      let tag = field(&fields, 5)?.trim().trim_matches('"').to_string();

      let published = parse_timestamp(date, time)?;

      Ok(Some(TransactionRecord::Add { id, published, tag }))
    } else if kind.starts_with("del") {
      let id = field(&fields, 0)?.to_string();
      // The store writes the deleted id in the third field; tolerate an empty
      // third field followed by the id.
      let target = fields[2..]
        .iter()
        .map(|f| f.trim_end())
        .find(|f| !f.is_empty())
        .ok_or(RecordError::MissingField { index: 2 })?
        .to_string();

      Ok(Some(TransactionRecord::Delete { id, target }))
    } else {
      Ok(None)
    }
  }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, RecordError> {
  fields.get(index).copied().ok_or(RecordError::MissingField { index })
}

/// Parse `MM/DD/YYYY` and `HH:MM:SS` as a UTC timestamp.
fn parse_timestamp(date: &str, time: &str) -> Result<DateTime<Utc>, RecordError> {
  let invalid_date = || RecordError::InvalidDate {
    value: date.to_string(),
  };
  let invalid_time = || RecordError::InvalidTime {
    value: time.to_string(),
  };

  let [month, day, year] = numbers::<3>(date, '/').ok_or_else(invalid_date)?;
  let [hour, minute, second] = numbers::<3>(time, ':').ok_or_else(invalid_time)?;

  let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(invalid_date)?;
  let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid_time)?;

  Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Split `value` on `sep` into exactly `N` decimal numbers.
fn numbers<const N: usize>(value: &str, sep: char) -> Option<[u32; N]> {
  let mut out = [0u32; N];
  let mut parts = value.trim().split(sep);

  for slot in out.iter_mut() {
    *slot = parts.next()?.trim().parse().ok()?;
  }

  if parts.next().is_some() {
    return None;
  }

  Some(out)
}

/// Insertion-ordered set of symbol ids.
///
/// Removal leaves a hole in the order vector so both membership checks and
/// removals stay O(1); iteration skips the holes.
#[derive(Debug, Clone, Default)]
pub struct ExpirySet {
  order: Vec<Option<String>>,
  index: HashMap<String, usize>,
}

impl ExpirySet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an id. Returns `false` if it was already present.
  pub fn insert(&mut self, id: &str) -> bool {
    if self.index.contains_key(id) {
      return false;
    }
    self.index.insert(id.to_string(), self.order.len());
    self.order.push(Some(id.to_string()));
    true
  }

  /// Remove an id. Returns `false` if it was not present.
  pub fn remove(&mut self, id: &str) -> bool {
    match self.index.remove(id) {
      Some(pos) => {
        self.order[pos] = None;
        true
      }
      None => false,
    }
  }

  pub fn contains(&self, id: &str) -> bool {
    self.index.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.order.iter().filter_map(|id| id.as_deref())
  }

  pub fn into_vec(self) -> Vec<String> {
    self.order.into_iter().flatten().collect()
  }
}
