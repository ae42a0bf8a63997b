//! Resolved project context shared by every task.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::bundle::minify::minifier_for_command;
use crate::config::ProjectConfig;
use crate::orchestrator::BundleOrchestrator;
use crate::revision::Revisioner;

/// Project root plus the configuration loaded for it.
#[derive(Debug, Clone)]
pub struct PipelineContext {
  root: PathBuf,
  config: ProjectConfig,
}

impl PipelineContext {
  /// Create a context for `root`. The root is made absolute so watcher events and manifest keys
  /// resolve against the same paths.
  pub fn new(root: &Path, config: ProjectConfig) -> Result<Self> {
    let root = std::path::absolute(root)
      .with_context(|| format!("failed to resolve project root {}", root.display()))?;
    Ok(Self { root, config })
  }

  /// Load the configuration from `config_path`, or discover it in `root` when not given.
  pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
    let config = match config_path {
      Some(path) => ProjectConfig::load_or_default(path)?,
      None => ProjectConfig::discover(root)?,
    };
    Self::new(root, config)
  }

  /// Absolute project root.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Loaded configuration.
  pub fn config(&self) -> &ProjectConfig {
    &self.config
  }

  /// Resolve a configured path against the project root.
  pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.root.join(relative)
  }

  /// Directory receiving JavaScript bundles.
  pub fn javascript_destination(&self) -> PathBuf {
    self.resolve(&self.config.javascript.destination)
  }

  /// Revisioner writing to the configured manifest.
  pub fn revisioner(&self) -> Revisioner {
    Revisioner::new(
      self.config.media_dir_path(&self.root),
      self.config.manifest_path(&self.root),
    )
  }

  /// Orchestrator configured with the JavaScript minifier and separator.
  pub fn javascript_orchestrator(&self) -> Result<BundleOrchestrator> {
    let javascript = &self.config.javascript;
    let minifier = minifier_for_command(&javascript.minifier)
      .context("invalid JavaScript minifier configuration")?;
    Ok(
      BundleOrchestrator::new(&self.root, minifier, self.revisioner())
        .with_separator(javascript.separator.as_bytes()),
    )
  }
}
