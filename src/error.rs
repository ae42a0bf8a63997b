//! Error types for bundle compression and revisioning.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure while piping a bundle through an external minifier.
#[derive(Debug, Error)]
pub enum MinifyError {
  /// The minifier command list was empty.
  #[error("no minifier command configured")]
  EmptyCommand,
  /// The minifier process could not be started.
  #[error("failed to start minifier `{program}`")]
  Spawn {
    /// Program that failed to start.
    program: String,
    /// Underlying spawn error.
    #[source]
    source: std::io::Error,
  },
  /// Writing the bundle to the minifier's stdin or collecting its output failed.
  #[error("failed to exchange data with minifier `{program}`")]
  Pipe {
    /// Program being driven.
    program: String,
    /// Underlying pipe error.
    #[source]
    source: std::io::Error,
  },
  /// The minifier exited unsuccessfully.
  #[error("minifier `{program}` exited with {status}: {stderr}")]
  Status {
    /// Program that failed.
    program: String,
    /// Exit status reported by the process.
    status: ExitStatus,
    /// Captured standard error, trimmed.
    stderr: String,
  },
}

/// Failure while compressing a single bundle.
#[derive(Debug, Error)]
pub enum BundleError {
  /// A listed source file is missing or unreadable.
  #[error("failed to read bundle source {}", path.display())]
  Read {
    /// Source file that could not be read.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// The minifier rejected the concatenated buffer.
  #[error(transparent)]
  Minify(#[from] MinifyError),
  /// The compressed output could not be written.
  #[error("failed to write compressed bundle {}", path.display())]
  Write {
    /// Output path.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
}

/// Failure of an orchestration run.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The destination directory could not be created.
  #[error("failed to create destination directory {}", path.display())]
  CreateDestination {
    /// Destination directory.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A bundle failed to compress; revisioning was not started.
  #[error("bundle `{bundle}` failed, run aborted with {} bundle(s) pending: {}", pending.len(), pending.join(", "))]
  Aborted {
    /// Name of the bundle that failed.
    bundle: String,
    /// Bundles that had not been compressed when the run stopped.
    pending: Vec<String>,
    /// Error reported by the failing bundle.
    #[source]
    source: BundleError,
  },
  /// The revisioning step was reached with bundles still pending.
  #[error("revisioning requested with {} bundle(s) pending: {}", pending.len(), pending.join(", "))]
  Incomplete {
    /// Bundles still pending.
    pending: Vec<String>,
  },
  /// Listing the destination directory failed.
  #[error("failed to scan {} for compressed bundles", dir.display())]
  Scan {
    /// Directory being scanned.
    dir: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Reading a compressed bundle or writing its revisioned copy failed.
  #[error("failed to revision {}", path.display())]
  Revision {
    /// File being revisioned.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// The manifest could not be read, parsed or written.
  #[error("failed to update manifest {}", path.display())]
  Manifest {
    /// Manifest path.
    path: PathBuf,
    /// Underlying manifest error.
    #[source]
    source: ManifestError,
  },
  /// Removing a compressed intermediate or a stale output failed.
  #[error("failed to remove {}", path.display())]
  Cleanup {
    /// File that could not be removed.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
}

/// Failure while loading or saving a revision manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// Filesystem error.
  #[error("i/o error")]
  Io(#[from] std::io::Error),
  /// The existing manifest is not valid JSON.
  #[error("invalid manifest JSON")]
  Json(#[from] serde_json::Error),
}
