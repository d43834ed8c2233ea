use std::fmt;

/// Target architectures the driver is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X86,
  X64,
}

impl Arch {
  /// Every architecture, in build order
  pub const ALL: [Arch; 2] = [Arch::X86, Arch::X64];

  /// Returns the lowercase identifier used in tool paths (e.g. `Debuggers\x86`)
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X64 => "x64",
    }
  }

  /// Returns the MSBuild platform name, which is also the output subdirectory
  pub fn msbuild_platform(&self) -> &'static str {
    match self {
      Self::X86 => "Win32",
      Self::X64 => "x64",
    }
  }

  /// Interpret a `PROCESSOR_ARCHITECTURE` value
  ///
  /// Only an explicit `x86` selects 32-bit; anything else (AMD64, ARM64, unset)
  /// is treated as a 64-bit host.
  pub fn from_processor_architecture(value: Option<&str>) -> Self {
    match value {
      Some(v) if v.eq_ignore_ascii_case("x86") => Self::X86,
      _ => Self::X64,
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn msbuild_platform_names() {
    assert_eq!(Arch::X86.msbuild_platform(), "Win32");
    assert_eq!(Arch::X64.msbuild_platform(), "x64");
  }

  #[test]
  fn host_arch_from_environment() {
    assert_eq!(Arch::from_processor_architecture(Some("x86")), Arch::X86);
    assert_eq!(Arch::from_processor_architecture(Some("AMD64")), Arch::X64);
    assert_eq!(Arch::from_processor_architecture(None), Arch::X64);
  }
}
