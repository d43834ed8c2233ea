//! drvrelease-lib: release-build orchestration for the PV driver tree
//!
//! This crate provides the pieces a release build is assembled from:
//! - `retention`: decides which published symbols have outlived the retention window
//! - `toolchain`: drives MSBuild through the project's `msbuild.bat` wrapper
//! - `symstore`: publishes and deletes debug symbols in the symbol store
//! - `archive`: writes the source and output tarballs
//! - `pipeline`: runs the whole sequence, stopping at the first fatal error

pub mod archive;
pub mod config;
pub mod consts;
pub mod counter;
pub mod execute;
pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod retention;
pub mod sdv;
pub mod symstore;
pub mod toolchain;
pub mod util;
