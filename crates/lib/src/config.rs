//! Release configuration.
//!
//! Everything the build needs from the environment is read once into a
//! [`ReleaseConfig`] and passed down explicitly. The toolchain still receives
//! the vendor and version settings as environment variables, because the
//! project files read them, but only on the child processes it spawns.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::platform::Arch;

pub const DEFAULT_VENDOR_NAME: &str = "Xen Project";
pub const DEFAULT_VENDOR_PREFIX: &str = "XP";
pub const DEFAULT_PRODUCT_NAME: &str = "Xen";
pub const DEFAULT_MAJOR_VERSION: u32 = 9;
pub const DEFAULT_MINOR_VERSION: u32 = 0;
pub const DEFAULT_MICRO_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("environment variable {0} is not set")]
  MissingVar(&'static str),

  #[error("environment variable {name} must be a number, got {value:?}")]
  InvalidNumber { name: &'static str, value: String },
}

/// Four-part driver version, `MAJOR.MINOR.MICRO.BUILD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
  pub major: u32,
  pub minor: u32,
  pub micro: u32,
  pub build: u64,
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}.{}", self.major, self.minor, self.micro, self.build)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
  pub vendor_name: String,
  pub vendor_prefix: String,
  pub product_name: String,
  pub major_version: u32,
  pub minor_version: u32,
  pub micro_version: u32,
  /// Externally supplied build number; bypasses the build counter when set.
  pub build_number: Option<u64>,
  /// Source control revision, written to the `revision` file when set.
  pub revision: Option<String>,
  /// Root of the symbol store (`SYMBOL_SERVER`).
  pub symbol_store: PathBuf,
  /// Windows Kit root, which holds the debugger tools (`KIT`).
  pub kit: PathBuf,
  /// Visual Studio installation searched for `vcvarsall.bat` (`VS`).
  pub toolchain_root: PathBuf,
  /// Architecture of the machine running the build.
  pub host_arch: Arch,
}

impl ReleaseConfig {
  /// Read the configuration from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Read the configuration through `lookup`, applying defaults for unset values.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let string_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
    let required = |name: &'static str| lookup(name).map(PathBuf::from).ok_or(ConfigError::MissingVar(name));

    Ok(Self {
      vendor_name: string_or("VENDOR_NAME", DEFAULT_VENDOR_NAME),
      vendor_prefix: string_or("VENDOR_PREFIX", DEFAULT_VENDOR_PREFIX),
      product_name: string_or("PRODUCT_NAME", DEFAULT_PRODUCT_NAME),
      major_version: number(&lookup, "MAJOR_VERSION")?.unwrap_or(DEFAULT_MAJOR_VERSION),
      minor_version: number(&lookup, "MINOR_VERSION")?.unwrap_or(DEFAULT_MINOR_VERSION),
      micro_version: number(&lookup, "MICRO_VERSION")?.unwrap_or(DEFAULT_MICRO_VERSION),
      build_number: number(&lookup, "BUILD_NUMBER")?,
      revision: lookup("GIT_REVISION"),
      symbol_store: required("SYMBOL_SERVER")?,
      kit: required("KIT")?,
      toolchain_root: required("VS")?,
      host_arch: Arch::from_processor_architecture(lookup("PROCESSOR_ARCHITECTURE").as_deref()),
    })
  }

  /// The full version for a given build number.
  pub fn version(&self, build_number: u64) -> Version {
    Version {
      major: self.major_version,
      minor: self.minor_version,
      micro: self.micro_version,
      build: build_number,
    }
  }

  /// Variables exported to toolchain processes.
  pub fn toolchain_env(&self, build_number: u64) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("VENDOR_NAME".to_string(), self.vendor_name.clone());
    env.insert("VENDOR_PREFIX".to_string(), self.vendor_prefix.clone());
    env.insert("PRODUCT_NAME".to_string(), self.product_name.clone());
    env.insert("MAJOR_VERSION".to_string(), self.major_version.to_string());
    env.insert("MINOR_VERSION".to_string(), self.minor_version.to_string());
    env.insert("MICRO_VERSION".to_string(), self.micro_version.to_string());
    env.insert("BUILD_NUMBER".to_string(), build_number.to_string());
    env
  }
}

fn number<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
  F: Fn(&str) -> Option<String>,
  T: std::str::FromStr,
{
  match lookup(name) {
    None => Ok(None),
    Some(value) => match value.trim().parse() {
      Ok(n) => Ok(Some(n)),
      Err(_) => Err(ConfigError::InvalidNumber { name, value }),
    },
  }
}
