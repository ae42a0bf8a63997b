//! Data structures describing bundles and the artifacts produced while building them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Marker inserted between a bundle name and its extension for compressed outputs.
pub const COMPRESSED_MARKER: &str = "-min";

/// Mapping from bundle name to the ordered list of files concatenated into it.
///
/// Bundles are iterated in name order. The order of files inside a bundle is the
/// concatenation order and is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BundleSpec {
  bundles: BTreeMap<String, Vec<PathBuf>>,
}

impl BundleSpec {
  /// Create an empty specification.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace a bundle.
  pub fn insert<I, P>(&mut self, name: impl Into<String>, files: I)
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self
      .bundles
      .insert(name.into(), files.into_iter().map(Into::into).collect());
  }

  /// Builder-style variant of [`BundleSpec::insert`].
  pub fn with_bundle<I, P>(mut self, name: impl Into<String>, files: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.insert(name, files);
    self
  }

  /// Files of the named bundle, in concatenation order.
  pub fn get(&self, name: &str) -> Option<&[PathBuf]> {
    self.bundles.get(name).map(Vec::as_slice)
  }

  /// A specification holding only the named bundle.
  pub fn single(&self, name: &str) -> Option<Self> {
    self
      .bundles
      .get_key_value(name)
      .map(|(name, files)| Self::new().with_bundle(name.clone(), files.iter().cloned()))
  }

  /// Iterate over bundle names and their files.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
    self
      .bundles
      .iter()
      .map(|(name, files)| (name.as_str(), files.as_slice()))
  }

  /// Bundle names in iteration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.bundles.keys().map(String::as_str)
  }

  /// Borrow the underlying map.
  pub fn as_map(&self) -> &BTreeMap<String, Vec<PathBuf>> {
    &self.bundles
  }

  /// Number of bundles.
  pub fn len(&self) -> usize {
    self.bundles.len()
  }

  /// Returns `true` when no bundles are declared.
  pub fn is_empty(&self) -> bool {
    self.bundles.is_empty()
  }
}

/// Bundles of one orchestration run that have not been compressed yet.
///
/// Workers mark their bundle complete once its compressed output is on disk; revisioning may
/// only begin once the set is empty.
#[derive(Debug)]
pub struct PendingBundles {
  names: Mutex<BTreeSet<String>>,
}

impl PendingBundles {
  /// Start tracking every bundle in the specification.
  pub fn from_spec(spec: &BundleSpec) -> Self {
    Self {
      names: Mutex::new(spec.names().map(str::to_string).collect()),
    }
  }

  /// Remove a bundle from the pending set, returning whether it was pending.
  pub fn complete(&self, name: &str) -> bool {
    self.lock().remove(name)
  }

  /// Returns `true` once every bundle has been compressed.
  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Names still pending, sorted.
  pub fn remaining(&self) -> Vec<String> {
    self.lock().iter().cloned().collect()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
    // Every mutation is a single insert or remove, so a poisoned set is still consistent.
    self
      .names
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

/// A compressed bundle written to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedOutput {
  /// Bundle name.
  pub bundle: String,
  /// Path of the `<name>-min<ext>` file.
  pub path: PathBuf,
}

/// A content-hashed copy of a compressed bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionedAsset {
  /// Logical manifest key, relative to the manifest base directory.
  pub logical: String,
  /// Revisioned manifest value, relative to the manifest base directory.
  pub revisioned: String,
  /// Location of the revisioned file on disk.
  pub path: PathBuf,
}

/// Summary of a successful orchestration run.
#[derive(Debug, Clone)]
pub struct CompressionReport {
  /// Bundles compressed during this run, sorted by name.
  pub compressed: Vec<CompressedOutput>,
  /// Revisioned files produced by the terminal step.
  pub revisioned: Vec<RevisionedAsset>,
  /// Manifest that received the new entries.
  pub manifest_path: PathBuf,
}

/// File name of the compressed output for a bundle.
pub fn compressed_file_name(bundle: &str, extension: &str) -> String {
  format!("{bundle}{COMPRESSED_MARKER}{extension}")
}
