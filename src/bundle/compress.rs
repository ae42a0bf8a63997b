//! Compression of a single bundle into its `<name>-min<ext>` output.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bundle::concat::concat_sources;
use crate::bundle::minify::Minifier;
use crate::error::BundleError;
use crate::models::{CompressedOutput, compressed_file_name};

/// Settings shared by every bundle compressed in one run.
pub struct BundleCompression<'a> {
  /// Directory relative bundle sources are resolved against.
  pub source_root: &'a Path,
  /// Directory receiving the compressed output.
  pub destination: &'a Path,
  /// Extension appended to every compressed file name, including the leading dot.
  pub extension: &'a str,
  /// Bytes inserted between concatenated files.
  pub separator: &'a [u8],
  /// Minifier applied to the concatenated buffer.
  pub minifier: &'a dyn Minifier,
}

impl BundleCompression<'_> {
  /// Concatenate, minify and write one bundle.
  pub fn compress(&self, name: &str, files: &[PathBuf]) -> Result<CompressedOutput, BundleError> {
    let buffer = concat_sources(self.source_root, files, self.separator)?;
    let minified = self.minifier.minify(&buffer)?;

    let path = self.output_path(name);
    fs::write(&path, minified).map_err(|source| BundleError::Write {
      path: path.clone(),
      source,
    })?;

    log::debug!("compressed bundle `{name}` into {}", path.display());
    Ok(CompressedOutput {
      bundle: name.to_string(),
      path,
    })
  }

  /// Location of the compressed output for a bundle.
  pub fn output_path(&self, name: &str) -> PathBuf {
    self
      .destination
      .join(compressed_file_name(name, self.extension))
  }
}
