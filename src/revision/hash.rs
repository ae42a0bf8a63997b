//! Content hashing and revisioned file names.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Number of hex characters of the digest kept in revisioned names.
pub const HASH_LENGTH: usize = 10;

/// Hash of the file contents used for cache-busting names.
///
/// A pure function of the bytes: unchanged input always yields the same hash.
pub fn content_hash(bytes: &[u8]) -> String {
  let digest = format!("{:x}", md5::compute(bytes));
  digest[..HASH_LENGTH].to_string()
}

/// Insert the hash before the final extension: `main-min.js` becomes `main-min-<hash>.js`.
pub fn revisioned_file_name(file_name: &str, hash: &str) -> String {
  let path = Path::new(file_name);
  let stem = path
    .file_stem()
    .map(|stem| stem.to_string_lossy())
    .unwrap_or_default();
  match path.extension() {
    Some(extension) => format!("{stem}-{hash}.{}", extension.to_string_lossy()),
    None => format!("{stem}-{hash}"),
  }
}

/// Revisioned names with the hash before the final extension, then without an extension.
static REVISIONED_NAMES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
  [
    format!(r"^(?P<stem>.+)-(?P<hash>[0-9a-f]{{{HASH_LENGTH}}})(?P<extension>\.[^.]*)$"),
    format!(r"^(?P<stem>.+)-(?P<hash>[0-9a-f]{{{HASH_LENGTH}}})(?P<extension>)$"),
  ]
  .map(|pattern| Regex::new(&pattern).expect("revisioned name pattern is valid"))
});

/// Recover the name a revisioned file was derived from.
///
/// Returns `None` unless `revisioned_file_name` applied to the result yields `file_name` again,
/// so names that merely look hashed are rejected.
pub fn unrevisioned_file_name(file_name: &str) -> Option<String> {
  REVISIONED_NAMES.iter().find_map(|pattern| {
    let captures = pattern.captures(file_name)?;
    let original = format!("{}{}", &captures["stem"], &captures["extension"]);
    (revisioned_file_name(&original, &captures["hash"]) == file_name).then_some(original)
  })
}
