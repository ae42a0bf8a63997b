//! Bundle compression orchestrator.
//!
//! Every bundle of a [`BundleSpec`] is compressed on the rayon pool. The parallel iterator is
//! joined before anything else happens, so the revisioning step always observes the complete
//! set of compressed outputs. A failing bundle aborts the run before revisioning and leaves
//! whatever was already written on disk.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::bundle::compress::BundleCompression;
use crate::bundle::minify::Minifier;
use crate::error::{BundleError, PipelineError};
use crate::models::{BundleSpec, CompressedOutput, CompressionReport, PendingBundles};
use crate::revision::Revisioner;

/// Compresses bundles and runs the revisioning step once all of them exist.
pub struct BundleOrchestrator {
  source_root: PathBuf,
  separator: Vec<u8>,
  minifier: Box<dyn Minifier>,
  revisioner: Revisioner,
}

impl BundleOrchestrator {
  /// Create an orchestrator resolving relative bundle sources against `source_root`.
  pub fn new(
    source_root: impl Into<PathBuf>,
    minifier: Box<dyn Minifier>,
    revisioner: Revisioner,
  ) -> Self {
    Self {
      source_root: source_root.into(),
      separator: Vec::new(),
      minifier,
      revisioner,
    }
  }

  /// Bytes inserted between the files of a bundle. Empty by default.
  pub fn with_separator(mut self, separator: impl Into<Vec<u8>>) -> Self {
    self.separator = separator.into();
    self
  }

  /// Compress every bundle into `destination`, then revision the outputs and merge the manifest.
  pub fn compress_bundles(
    &self,
    spec: &BundleSpec,
    destination: &Path,
    extension: &str,
  ) -> Result<CompressionReport, PipelineError> {
    fs::create_dir_all(destination).map_err(|source| PipelineError::CreateDestination {
      path: destination.to_path_buf(),
      source,
    })?;

    let pending = PendingBundles::from_spec(spec);
    let compression = BundleCompression {
      source_root: &self.source_root,
      destination,
      extension,
      separator: &self.separator,
      minifier: self.minifier.as_ref(),
    };

    log::info!(
      "compressing {} bundle(s) into {}",
      spec.len(),
      destination.display()
    );
    let compressed = spec
      .as_map()
      .par_iter()
      .map(|(name, files)| -> Result<CompressedOutput, (String, BundleError)> {
        let output = compression
          .compress(name, files)
          .map_err(|err| (name.clone(), err))?;
        pending.complete(name);
        Ok(output)
      })
      .collect::<Result<Vec<_>, _>>();

    let compressed = match compressed {
      Ok(compressed) => compressed,
      Err((bundle, source)) => {
        let pending = pending.remaining();
        log::error!("bundle `{bundle}` failed, skipping revisioning");
        return Err(PipelineError::Aborted {
          bundle,
          pending,
          source,
        });
      }
    };

    if !pending.is_empty() {
      return Err(PipelineError::Incomplete {
        pending: pending.remaining(),
      });
    }

    let revisioned = self.revisioner.revision(destination, extension)?;

    Ok(CompressionReport {
      compressed,
      revisioned,
      manifest_path: self.revisioner.manifest_path().to_path_buf(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bundle::minify::PassthroughMinifier;
  use crate::error::MinifyError;
  use crate::revision::RevManifest;
  use std::sync::{Arc, Mutex};
  use std::thread;
  use std::time::Duration;
  use tempfile::{TempDir, tempdir};

  struct Fixture {
    dir: TempDir,
  }

  impl Fixture {
    fn new() -> Self {
      let fixture = Self { dir: tempdir().unwrap() };
      fs::create_dir_all(fixture.root().join("src")).unwrap();
      fixture
    }

    fn root(&self) -> &Path {
      self.dir.path()
    }

    fn media(&self) -> PathBuf {
      self.root().join("media")
    }

    fn destination(&self) -> PathBuf {
      self.media().join("build/js")
    }

    fn manifest(&self) -> PathBuf {
      self.media().join("rev-manifest.json")
    }

    fn write_source(&self, name: &str, contents: &str) {
      fs::write(self.root().join("src").join(name), contents).unwrap();
    }

    fn orchestrator(&self, minifier: Box<dyn Minifier>) -> BundleOrchestrator {
      BundleOrchestrator::new(
        self.root(),
        minifier,
        Revisioner::new(self.media(), self.manifest()),
      )
    }

    fn files_in_destination(&self) -> Vec<String> {
      let mut names: Vec<String> = fs::read_dir(self.destination())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
      names.sort();
      names
    }
  }

  fn sample_spec() -> BundleSpec {
    BundleSpec::new()
      .with_bundle("main", ["src/a.js", "src/b.js", "src/c.js"])
      .with_bundle("home", ["src/home.js"])
  }

  fn write_sample_sources(fixture: &Fixture) {
    fixture.write_source("a.js", "A;");
    fixture.write_source("b.js", "B;");
    fixture.write_source("c.js", "C;");
    fixture.write_source("home.js", "home();");
  }

  #[test]
  fn produces_one_revisioned_output_per_bundle() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    let report = orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();

    assert_eq!(report.compressed.len(), 2);
    assert_eq!(report.revisioned.len(), 2);
    assert_eq!(report.manifest_path, fixture.manifest());

    let manifest = RevManifest::load(&fixture.manifest()).unwrap();
    assert_eq!(manifest.len(), 2);
    let main = manifest.get("build/js/main-min.js").unwrap();
    let revisioned = fixture.media().join(main);
    assert_eq!(fs::read_to_string(revisioned).unwrap(), "A;B;C;");

    let files = fixture.files_in_destination();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|name| name.contains("-min-")));
  }

  #[test]
  fn missing_source_aborts_before_revisioning() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    let spec = sample_spec().with_bundle("broken", ["src/a.js", "src/missing.js"]);
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    let err = orchestrator
      .compress_bundles(&spec, &fixture.destination(), ".js")
      .unwrap_err();

    match err {
      PipelineError::Aborted {
        bundle,
        pending,
        source,
      } => {
        assert_eq!(bundle, "broken");
        assert!(pending.contains(&"broken".to_string()));
        assert!(matches!(source, BundleError::Read { .. }));
      }
      other => panic!("unexpected error: {other:?}"),
    }

    assert!(!fixture.manifest().exists());
    assert!(
      fixture
        .files_in_destination()
        .iter()
        .all(|name| !name.contains("-min-"))
    );
  }

  struct SlowBundleProbe {
    manifest: PathBuf,
    manifest_seen: Mutex<Vec<bool>>,
  }

  impl Minifier for SlowBundleProbe {
    fn minify(&self, source: &[u8]) -> Result<Vec<u8>, MinifyError> {
      if source.starts_with(b"SLOW") {
        thread::sleep(Duration::from_millis(200));
      }
      self
        .manifest_seen
        .lock()
        .unwrap()
        .push(self.manifest.exists());
      Ok(source.to_vec())
    }
  }

  impl Minifier for Arc<SlowBundleProbe> {
    fn minify(&self, source: &[u8]) -> Result<Vec<u8>, MinifyError> {
      (**self).minify(source)
    }
  }

  #[test]
  fn manifest_untouched_until_slow_bundle_finishes() {
    let fixture = Fixture::new();
    fixture.write_source("slow.js", "SLOW;");
    fixture.write_source("fast.js", "fast;");
    let spec = BundleSpec::new()
      .with_bundle("slow", ["src/slow.js"])
      .with_bundle("fast", ["src/fast.js"]);

    let probe = Arc::new(SlowBundleProbe {
      manifest: fixture.manifest(),
      manifest_seen: Mutex::new(Vec::new()),
    });
    let orchestrator = fixture.orchestrator(Box::new(probe.clone()));

    orchestrator
      .compress_bundles(&spec, &fixture.destination(), ".js")
      .unwrap();

    let seen = probe.manifest_seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|existed| !existed));
    assert!(fixture.manifest().exists());
  }

  #[test]
  fn merges_with_existing_manifest() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    fs::create_dir_all(fixture.media()).unwrap();
    fs::write(fixture.manifest(), r#"{"a": "a.1.js"}"#).unwrap();
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();

    let manifest = RevManifest::load(&fixture.manifest()).unwrap();
    assert_eq!(manifest.get("a"), Some("a.1.js"));
    assert!(manifest.get("build/js/main-min.js").is_some());
    assert!(manifest.get("build/js/home-min.js").is_some());
  }

  #[test]
  fn rerun_with_unchanged_sources_is_stable() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();
    let first = RevManifest::load(&fixture.manifest()).unwrap();

    orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();
    let second = RevManifest::load(&fixture.manifest()).unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.files_in_destination().len(), 2);
  }

  #[test]
  fn changed_source_changes_revision() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();
    let first = RevManifest::load(&fixture.manifest()).unwrap();

    fixture.write_source("home.js", "home(2);");
    orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap();
    let second = RevManifest::load(&fixture.manifest()).unwrap();

    assert_eq!(
      first.get("build/js/main-min.js"),
      second.get("build/js/main-min.js")
    );
    assert_ne!(
      first.get("build/js/home-min.js"),
      second.get("build/js/home-min.js")
    );
  }

  #[test]
  fn keeps_intermediates_when_revisioning_fails() {
    let fixture = Fixture::new();
    write_sample_sources(&fixture);
    fs::create_dir_all(fixture.manifest()).unwrap();
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    let err = orchestrator
      .compress_bundles(&sample_spec(), &fixture.destination(), ".js")
      .unwrap_err();

    assert!(matches!(err, PipelineError::Manifest { .. }));
    let files = fixture.files_in_destination();
    assert!(files.contains(&"main-min.js".to_string()));
    assert!(files.contains(&"home-min.js".to_string()));
  }

  #[test]
  fn empty_spec_goes_straight_to_revisioning() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.destination()).unwrap();
    fs::write(fixture.destination().join("left-min.js"), "left();").unwrap();
    let orchestrator = fixture.orchestrator(Box::new(PassthroughMinifier));

    let report = orchestrator
      .compress_bundles(&BundleSpec::new(), &fixture.destination(), ".js")
      .unwrap();

    assert!(report.compressed.is_empty());
    assert_eq!(report.revisioned.len(), 1);
    assert!(!fixture.destination().join("left-min.js").exists());
  }
}
