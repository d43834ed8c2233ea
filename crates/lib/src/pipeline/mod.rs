//! The release sequence.
//!
//! Steps run strictly in order and the first fatal error ends the run, leaving
//! whatever earlier steps produced on disk:
//!
//! 1. prune expired symbols (best effort)
//! 2. clear the output directory
//! 3. build the solution for x86 then x64
//! 4. publish symbols for both builds
//! 5. static verification, unless disabled
//! 6. archive the source manifest and the build output

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{Archiver, TarArchiver};
use crate::config::ReleaseConfig;
use crate::consts::{BUILD_NUMBER_FILE, REVISION_FILE, VERIFIED_PROJECTS};
use crate::counter::next_build_number;
use crate::manifest::{GitManifest, SourceManifest};
use crate::platform::Arch;
use crate::sdv::{StaticDriverVerifier, VerificationPass};
use crate::symstore::{self, SymStore, SymbolPublisher, symstore_path};
use crate::toolchain::{BuildRunner, Configuration, MsBuild, detect_visual_studio, find_vcvarsall};

pub use types::{BuildIdentity, BuildMode, ReleaseError, ReleaseOptions, ReleaseReport};

/// Assign the build number and record the source revision.
///
/// An externally supplied build number is used as is; otherwise one is taken
/// from the counter file in `work_dir`.
pub fn prepare(config: &ReleaseConfig, work_dir: &Path) -> Result<BuildIdentity, ReleaseError> {
  let build_number = match config.build_number {
    Some(n) => n,
    None => next_build_number(&work_dir.join(BUILD_NUMBER_FILE))?,
  };

  if let Some(revision) = &config.revision {
    let path = work_dir.join(REVISION_FILE);
    fs::write(&path, format!("{}\n", revision)).map_err(|source| ReleaseError::Write { path, source })?;
  }

  Ok(BuildIdentity {
    build_number,
    version: config.version(build_number),
  })
}

/// One release run over a set of collaborators.
pub struct Pipeline<'a, B, S, V, M, A> {
  pub options: &'a ReleaseOptions,
  pub identity: BuildIdentity,
  /// Target OS release of the driver build, e.g. `Windows 8`.
  pub release: &'a str,
  /// Directory holding the solution; build outputs sit below it.
  pub solution_dir: PathBuf,
  pub symbol_store: PathBuf,
  pub builder: &'a B,
  pub symbols: &'a S,
  pub verifier: &'a V,
  pub manifest: &'a M,
  pub archiver: &'a A,
}

impl<B, S, V, M, A> Pipeline<'_, B, S, V, M, A>
where
  B: BuildRunner,
  S: SymbolPublisher,
  V: VerificationPass,
  M: SourceManifest,
  A: Archiver,
{
  pub async fn run(&self) -> Result<ReleaseReport, ReleaseError> {
    let options = self.options;
    let driver = options.driver.as_str();
    let out_dir = options.work_dir.join(driver);

    info!(
      driver = %driver,
      mode = %options.mode,
      version = %self.identity.version,
      verify = options.verify,
      "starting release"
    );

    let pruned = symstore::prune(self.symbols, &self.symbol_store, driver, options.retention_days).await;

    clear_dir(&out_dir);

    let configuration = Configuration::new(self.release, options.mode.is_debug());

    for arch in Arch::ALL {
      self.builder.build(driver, arch, &configuration).await?;
    }

    for arch in Arch::ALL {
      let target = configuration.target_path(&self.solution_dir, arch);
      self
        .symbols
        .publish(&target, driver, &self.identity.version)
        .await?;
    }

    let mut verified = Vec::new();
    if options.verify {
      for project in VERIFIED_PROJECTS {
        self.verifier.verify(project, &out_dir).await?;
        verified.push(project.to_string());
      }
    } else {
      info!("static verification disabled");
    }

    let files = self.manifest.list_files().await?;
    let source = self
      .archiver
      .create_archive(&out_dir.join("source.tgz"), &options.work_dir, &files, true)?;

    let output = self.archiver.create_archive(
      &options.work_dir.join(format!("{}.tar", driver)),
      &options.work_dir,
      &[PathBuf::from(driver), PathBuf::from(REVISION_FILE)],
      false,
    )?;

    info!(driver = %driver, version = %self.identity.version, "release complete");

    Ok(ReleaseReport {
      driver: driver.to_string(),
      mode: options.mode,
      configuration: configuration.to_string(),
      identity: self.identity,
      pruned,
      verified,
      archives: vec![source, output],
    })
  }
}

/// Remove a directory tree, ignoring any failure.
fn clear_dir(dir: &Path) {
  if let Err(e) = fs::remove_dir_all(dir) {
    debug!(path = %dir.display(), error = %e, "output directory not removed");
  }
}

/// Run a release with the real toolchain, symbol store and git.
pub async fn release(config: &ReleaseConfig, options: &ReleaseOptions) -> Result<ReleaseReport, ReleaseError> {
  let vcvarsall = find_vcvarsall(&config.toolchain_root)?;
  let vs = detect_visual_studio(&vcvarsall).await?;

  let identity = prepare(config, &options.work_dir)?;

  let solution_dir = options.work_dir.join(vs.as_str());
  let msbuild = MsBuild::new(
    options.work_dir.join("msbuild.bat"),
    vcvarsall,
    solution_dir.clone(),
    config.toolchain_env(identity.build_number),
  );
  let symbols = SymStore::new(
    symstore_path(&config.kit, config.host_arch),
    config.symbol_store.clone(),
  );
  let verifier = StaticDriverVerifier::new(&msbuild, vs);
  let manifest = GitManifest::new(&options.work_dir);

  Pipeline {
    options,
    identity,
    release: vs.driver_release(),
    solution_dir,
    symbol_store: config.symbol_store.clone(),
    builder: &msbuild,
    symbols: &symbols,
    verifier: &verifier,
    manifest: &manifest,
    archiver: &TarArchiver,
  }
  .run()
  .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::collections::HashSet;

  use crate::config::Version;
  use crate::manifest::ManifestError;
  use crate::sdv::VerificationError;
  use crate::symstore::SymbolStoreError;
  use crate::toolchain::ToolchainError;
  use crate::util::testutil::write_file;
  use tempfile::TempDir;

  /// Stands in for every external tool and records what was asked of it.
  #[derive(Default)]
  struct Recorder {
    events: RefCell<Vec<String>>,
    fail_build: Option<Arch>,
    failing_deletes: HashSet<String>,
    files: Vec<PathBuf>,
  }

  impl Recorder {
    fn record(&self, event: String) {
      self.events.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<String> {
      self.events.borrow().clone()
    }
  }

  impl BuildRunner for Recorder {
    async fn build(&self, solution: &str, arch: Arch, configuration: &Configuration) -> Result<(), ToolchainError> {
      self.record(format!("build {} {} {}", solution, arch, configuration));
      if self.fail_build == Some(arch) {
        return Err(ToolchainError::BuildFailed {
          configuration: configuration.to_string(),
          target: "Build".to_string(),
          file: format!("{}.sln", solution),
          code: Some(1),
        });
      }
      Ok(())
    }
  }

  impl SymbolPublisher for Recorder {
    async fn publish(&self, dir: &Path, tag: &str, version: &Version) -> Result<(), SymbolStoreError> {
      let platform = dir.file_name().unwrap().to_string_lossy().to_string();
      self.record(format!("publish {} {} {}", platform, tag, version));
      Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), SymbolStoreError> {
      self.record(format!("delete {}", id));
      if self.failing_deletes.contains(id) {
        return Err(SymbolStoreError::DeleteFailed {
          id: id.to_string(),
          code: Some(1),
        });
      }
      Ok(())
    }
  }

  impl VerificationPass for Recorder {
    async fn verify(&self, project: &str, out_dir: &Path) -> Result<(), VerificationError> {
      self.record(format!("verify {}", project));
      write_file(out_dir, &format!("{}.DVL.XML", project), "<dvl/>");
      Ok(())
    }
  }

  impl SourceManifest for Recorder {
    async fn list_files(&self) -> Result<Vec<PathBuf>, ManifestError> {
      self.record("manifest".to_string());
      Ok(self.files.clone())
    }
  }

  fn config(build_number: Option<u64>, revision: Option<&str>) -> ReleaseConfig {
    ReleaseConfig {
      vendor_name: "Xen Project".to_string(),
      vendor_prefix: "XP".to_string(),
      product_name: "Xen".to_string(),
      major_version: 9,
      minor_version: 0,
      micro_version: 0,
      build_number,
      revision: revision.map(String::from),
      symbol_store: PathBuf::from("symbols"),
      kit: PathBuf::from("kit"),
      toolchain_root: PathBuf::from("vs"),
      host_arch: Arch::X64,
    }
  }

  fn options(work_dir: &Path, mode: BuildMode, verify: bool) -> ReleaseOptions {
    ReleaseOptions {
      driver: "xenbus".to_string(),
      mode,
      verify,
      retention_days: 30,
      work_dir: work_dir.to_path_buf(),
    }
  }

  fn identity(build_number: u64) -> BuildIdentity {
    BuildIdentity {
      build_number,
      version: config(None, None).version(build_number),
    }
  }

  async fn run(recorder: &Recorder, options: &ReleaseOptions, symbol_store: &Path) -> Result<ReleaseReport, ReleaseError> {
    Pipeline {
      options,
      identity: identity(4),
      release: "Windows 8",
      solution_dir: options.work_dir.join("vs2017"),
      symbol_store: symbol_store.to_path_buf(),
      builder: recorder,
      symbols: recorder,
      verifier: recorder,
      manifest: recorder,
      archiver: &TarArchiver,
    }
    .run()
    .await
  }

  fn with_history(temp: &TempDir, history: &str) -> PathBuf {
    let store = temp.path().join("symbols");
    write_file(&store, "000Admin/history.txt", history);
    store
  }

  #[tokio::test]
  async fn full_release_runs_steps_in_order() {
    let temp = TempDir::new().unwrap();
    let store = with_history(&temp, "1,add,file,01/01/2001,00:00:00,\"xenbus\",\"9.0.0.1\",\"\",\n");
    write_file(temp.path(), "build.py", "print()");
    write_file(temp.path(), "revision", "abc\n");

    let recorder = Recorder {
      files: vec![PathBuf::from("build.py")],
      ..Default::default()
    };
    let options = options(temp.path(), BuildMode::Checked, true);

    let report = run(&recorder, &options, &store).await.unwrap();

    assert_eq!(
      recorder.events(),
      vec![
        "delete 1",
        "build xenbus x86 Windows 8 Debug",
        "build xenbus x64 Windows 8 Debug",
        "publish Win32 xenbus 9.0.0.4",
        "publish x64 xenbus 9.0.0.4",
        "verify xen",
        "verify xenfilt",
        "verify xenbus",
        "manifest",
      ]
    );

    assert_eq!(report.configuration, "Windows 8 Debug");
    assert_eq!(report.pruned.deleted, vec!["1"]);
    assert_eq!(report.verified, vec!["xen", "xenfilt", "xenbus"]);
    assert!(temp.path().join("xenbus").join("source.tgz").exists());
    assert!(temp.path().join("xenbus.tar").exists());
    assert_eq!(report.archives[1].added, 2);
  }

  #[tokio::test]
  async fn verification_can_be_disabled() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let options = options(temp.path(), BuildMode::Free, false);

    let report = run(&recorder, &options, &temp.path().join("symbols")).await.unwrap();

    assert!(!recorder.events().iter().any(|e| e.starts_with("verify")));
    assert!(report.verified.is_empty());
    assert_eq!(report.configuration, "Windows 8 Release");
    // Without GIT_REVISION there is no revision file to bundle.
    assert_eq!(report.archives[1].skipped, vec![PathBuf::from(REVISION_FILE)]);
  }

  #[tokio::test]
  async fn build_failure_stops_the_run() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder {
      fail_build: Some(Arch::X64),
      ..Default::default()
    };
    let options = options(temp.path(), BuildMode::Free, true);

    let err = run(&recorder, &options, &temp.path().join("symbols")).await.unwrap_err();

    assert!(matches!(
      err,
      ReleaseError::Toolchain(ToolchainError::BuildFailed { ref configuration, .. })
        if configuration == "Windows 8 Release"
    ));
    assert_eq!(
      recorder.events(),
      vec!["build xenbus x86 Windows 8 Release", "build xenbus x64 Windows 8 Release"]
    );
    assert!(!temp.path().join("xenbus.tar").exists());
  }

  #[tokio::test]
  async fn failed_symbol_deletion_does_not_stop_the_run() {
    let temp = TempDir::new().unwrap();
    let store = with_history(
      &temp,
      "1,add,,01/01/2001,00:00:00,\"xenbus\"\n2,add,,01/01/2001,00:00:00,\"xenbus\"\n",
    );
    let recorder = Recorder {
      failing_deletes: HashSet::from(["1".to_string()]),
      ..Default::default()
    };
    let options = options(temp.path(), BuildMode::Free, false);

    let report = run(&recorder, &options, &store).await.unwrap();

    assert_eq!(report.pruned.deleted, vec!["2"]);
    assert_eq!(report.pruned.failed[0].id, "1");
    assert!(recorder.events().contains(&"build xenbus x86 Windows 8 Release".to_string()));
  }

  #[tokio::test]
  async fn stale_output_is_cleared_before_building() {
    let temp = TempDir::new().unwrap();
    let stale = write_file(temp.path(), "xenbus/stale.sys", "old");
    let recorder = Recorder::default();
    let options = options(temp.path(), BuildMode::Free, false);

    run(&recorder, &options, &temp.path().join("symbols")).await.unwrap();

    assert!(!stale.exists());
  }

  #[test]
  fn prepare_uses_counter_and_writes_revision() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(BUILD_NUMBER_FILE), "17").unwrap();

    let identity = prepare(&config(None, Some("deadbeef")), temp.path()).unwrap();

    assert_eq!(identity.build_number, 17);
    assert_eq!(identity.version.to_string(), "9.0.0.17");
    assert_eq!(std::fs::read_to_string(temp.path().join(BUILD_NUMBER_FILE)).unwrap(), "18");
    assert_eq!(
      std::fs::read_to_string(temp.path().join(REVISION_FILE)).unwrap(),
      "deadbeef\n"
    );
  }

  #[test]
  fn prepare_prefers_supplied_build_number() {
    let temp = TempDir::new().unwrap();

    let identity = prepare(&config(Some(250), None), temp.path()).unwrap();

    assert_eq!(identity.build_number, 250);
    assert!(!temp.path().join(BUILD_NUMBER_FILE).exists());
    assert!(!temp.path().join(REVISION_FILE).exists());
  }
}
