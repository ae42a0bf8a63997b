//! Ordered concatenation of bundle sources.

use std::fs;
use std::path::Path;

use crate::error::BundleError;

/// Read every file in order and join the contents with `separator`.
///
/// Relative paths are resolved against `source_root`. The first missing or unreadable file
/// aborts the concatenation.
pub fn concat_sources<P: AsRef<Path>>(
  source_root: &Path,
  files: &[P],
  separator: &[u8],
) -> Result<Vec<u8>, BundleError> {
  let mut buffer = Vec::new();

  for (index, file) in files.iter().enumerate() {
    let path = source_root.join(file.as_ref());
    let contents = fs::read(&path).map_err(|source| BundleError::Read {
      path: path.clone(),
      source,
    })?;

    if index > 0 {
      buffer.extend_from_slice(separator);
    }
    buffer.extend_from_slice(&contents);
  }

  Ok(buffer)
}
