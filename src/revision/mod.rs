//! Content-hash revisioning of compressed bundles and manifest bookkeeping.
//!
//! Revisioning is the terminal step of an orchestration run: every compressed output in the
//! destination directory gets a hashed copy, the manifest is merged with the new names, and the
//! compressed intermediates are removed once both have been written.

mod hash;
mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

pub use hash::{HASH_LENGTH, content_hash, revisioned_file_name, unrevisioned_file_name};
pub use manifest::{RevManifest, merge_into_file};

use crate::error::PipelineError;
use crate::models::{COMPRESSED_MARKER, RevisionedAsset, compressed_file_name};

/// Writes revisioned copies of compressed outputs and records them in the manifest.
#[derive(Debug, Clone)]
pub struct Revisioner {
  base_dir: PathBuf,
  manifest_path: PathBuf,
}

impl Revisioner {
  /// Create a revisioner whose manifest keys are relative to `base_dir`.
  pub fn new(base_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
      manifest_path: manifest_path.into(),
    }
  }

  /// Manifest receiving the revisioned names.
  pub fn manifest_path(&self) -> &Path {
    &self.manifest_path
  }

  /// Revision every compressed output in `destination`, merge the manifest and delete the
  /// intermediates.
  ///
  /// Intermediates are only removed after the manifest has been written, so a failure at any
  /// earlier point leaves them in place.
  pub fn revision(
    &self,
    destination: &Path,
    extension: &str,
  ) -> Result<Vec<RevisionedAsset>, PipelineError> {
    let compressed = find_compressed_outputs(destination, extension)?;

    let mut update = RevManifest::default();
    let mut revisioned = Vec::with_capacity(compressed.len());
    for path in &compressed {
      let asset = self.revision_file(path)?;
      update.insert(asset.logical.clone(), asset.revisioned.clone());
      revisioned.push(asset);
    }

    merge_into_file(&self.manifest_path, update).map_err(|source| PipelineError::Manifest {
      path: self.manifest_path.clone(),
      source,
    })?;
    log::info!(
      "recorded {} revisioned file(s) in {}",
      revisioned.len(),
      self.manifest_path.display()
    );

    for path in &compressed {
      remove_file(path)?;
    }

    Ok(revisioned)
  }

  fn revision_file(&self, path: &Path) -> Result<RevisionedAsset, PipelineError> {
    let revision_error = |source: std::io::Error| PipelineError::Revision {
      path: path.to_path_buf(),
      source,
    };

    let bytes = fs::read(path).map_err(revision_error)?;
    let hash = content_hash(&bytes);
    let file_name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    let revisioned_path = path.with_file_name(revisioned_file_name(&file_name, &hash));
    fs::write(&revisioned_path, &bytes).map_err(revision_error)?;

    log::debug!("revisioned {} as {}", path.display(), revisioned_path.display());
    Ok(RevisionedAsset {
      logical: self.manifest_key(path),
      revisioned: self.manifest_key(&revisioned_path),
      path: revisioned_path,
    })
  }

  fn manifest_key(&self, path: &Path) -> String {
    let relative = match path.strip_prefix(&self.base_dir) {
      Ok(relative) => relative,
      Err(_) => path.file_name().map(Path::new).unwrap_or(path),
    };
    relative.to_string_lossy().replace('\\', "/")
  }
}

/// Compressed outputs (`*-min<ext>`) currently present in `dir`, sorted by path.
pub fn find_compressed_outputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
  let suffix = format!("{COMPRESSED_MARKER}{extension}");
  let mut matches = list_files(dir, |name| name.ends_with(&suffix) && name.len() > suffix.len())?;
  matches.sort();
  Ok(matches)
}

/// Remove every revisioned bundle from `dir`: any file that revisioning could have derived from
/// a `*-min<ext>` output.
pub fn remove_stale_revisions(dir: &Path, extension: &str) -> Result<usize, PipelineError> {
  let suffix = format!("{COMPRESSED_MARKER}{extension}");
  remove_matching(dir, |name| {
    unrevisioned_file_name(name)
      .is_some_and(|original| original.ends_with(&suffix) && original.len() > suffix.len())
  })
}

/// Remove the compressed output of one bundle and all of its revisioned copies from `dir`.
pub fn remove_bundle_outputs(dir: &Path, bundle: &str, extension: &str) -> Result<usize, PipelineError> {
  let compressed = compressed_file_name(bundle, extension);
  remove_matching(dir, |name| {
    name == compressed || unrevisioned_file_name(name).as_deref() == Some(compressed.as_str())
  })
}

fn remove_matching<F>(dir: &Path, matches: F) -> Result<usize, PipelineError>
where
  F: Fn(&str) -> bool,
{
  let stale = list_files(dir, matches)?;
  for path in &stale {
    remove_file(path)?;
  }
  Ok(stale.len())
}

fn list_files<F>(dir: &Path, matches: F) -> Result<Vec<PathBuf>, PipelineError>
where
  F: Fn(&str) -> bool,
{
  let scan_error = |source: std::io::Error| PipelineError::Scan {
    dir: dir.to_path_buf(),
    source,
  };

  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(err) => return Err(scan_error(err)),
  };

  let mut files = Vec::new();
  for entry in entries {
    let entry = entry.map_err(scan_error)?;
    if !entry.file_type().map_err(scan_error)?.is_file() {
      continue;
    }
    let file_name = entry.file_name();
    let Some(name) = file_name.to_str() else {
      continue;
    };
    if matches(name) {
      files.push(entry.path());
    }
  }
  Ok(files)
}

fn remove_file(path: &Path) -> Result<(), PipelineError> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(PipelineError::Cleanup {
      path: path.to_path_buf(),
      source,
    }),
  }
}
