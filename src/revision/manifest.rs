//! Loading and merging the revision manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// Mapping from logical asset name to its current revisioned name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RevManifest {
  entries: BTreeMap<String, String>,
}

impl RevManifest {
  /// Load a manifest from disk. A missing file yields an empty manifest.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_json::from_str(&content)?)
  }

  /// Record the revisioned name for a logical name, returning the previous value.
  pub fn insert(&mut self, logical: impl Into<String>, revisioned: impl Into<String>) -> Option<String> {
    self.entries.insert(logical.into(), revisioned.into())
  }

  /// Merge entries from another manifest. Entries from `other` win on conflict.
  pub fn merge(&mut self, other: RevManifest) {
    self.entries.extend(other.entries);
  }

  /// Revisioned name for a logical name.
  pub fn get(&self, logical: &str) -> Option<&str> {
    self.entries.get(logical).map(String::as_str)
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when the manifest has no entries.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Write the manifest as pretty-printed JSON with sorted keys.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
  }
}

/// Merge `update` into the manifest stored at `path` and write the result back.
pub fn merge_into_file(path: &Path, update: RevManifest) -> Result<RevManifest, ManifestError> {
  let mut manifest = RevManifest::load(path)?;
  manifest.merge(update);
  manifest.save(path)?;
  Ok(manifest)
}
