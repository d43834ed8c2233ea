pub mod arch;

pub use arch::Arch;
