//! Named build tasks combining the orchestrator, installers and editor packaging.

use anyhow::{Context, Result, anyhow};

use crate::editor::build_editor;
use crate::install::{install_and_shrinkwrap_packages, install_frontend_dependencies};
use crate::models::CompressionReport;
use crate::project::PipelineContext;
use crate::revision::{remove_bundle_outputs, remove_stale_revisions};
use crate::watch::{TriggerHandler, WatchSession, WatchTrigger};

/// Task runner for a project.
pub struct Pipeline {
  context: PipelineContext,
}

impl Pipeline {
  /// Create a pipeline for the provided project context.
  pub fn new(context: PipelineContext) -> Self {
    Self { context }
  }

  /// Project context the tasks operate on.
  pub fn context(&self) -> &PipelineContext {
    &self.context
  }

  /// `default`: compress JavaScript, then package the editor.
  pub fn run_default(&self) -> Result<()> {
    self.compress_javascript()?;
    self.build_ckeditor()
  }

  /// `compress-javascript`: install front-end dependencies, drop stale revisioned bundles and
  /// rebuild every bundle.
  pub fn compress_javascript(&self) -> Result<CompressionReport> {
    self.install_javascript_dependencies()?;

    let javascript = &self.context.config().javascript;
    let destination = self.context.javascript_destination();
    let removed = remove_stale_revisions(&destination, &javascript.extension)?;
    if removed > 0 {
      log::info!("removed {removed} stale revisioned bundle(s)");
    }

    let report = self
      .context
      .javascript_orchestrator()?
      .compress_bundles(&javascript.bundles, &destination, &javascript.extension)
      .context("failed to compress JavaScript bundles")?;
    log::info!(
      "compressed {} bundle(s), manifest at {}",
      report.compressed.len(),
      report.manifest_path.display()
    );
    Ok(report)
  }

  /// Rebuild one bundle after its sources changed.
  ///
  /// The bundle's previous compressed and revisioned outputs are deleted first.
  pub fn rebuild_bundle(&self, name: &str) -> Result<CompressionReport> {
    let javascript = &self.context.config().javascript;
    let spec = javascript
      .bundles
      .single(name)
      .ok_or_else(|| anyhow!("unknown bundle `{name}`"))?;
    let destination = self.context.javascript_destination();

    remove_bundle_outputs(&destination, name, &javascript.extension)?;
    self
      .context
      .javascript_orchestrator()?
      .compress_bundles(&spec, &destination, &javascript.extension)
      .with_context(|| format!("failed to rebuild bundle `{name}`"))
  }

  /// `install-javascript-dependencies`.
  pub fn install_javascript_dependencies(&self) -> Result<()> {
    install_frontend_dependencies(self.context.root(), &self.context.config().dependencies)
  }

  /// `install-and-shrinkwrap-npm-dependencies`.
  pub fn install_and_shrinkwrap_npm_dependencies(&self) -> Result<()> {
    install_and_shrinkwrap_packages(self.context.root(), &self.context.config().dependencies)
  }

  /// `build-ckeditor`.
  pub fn build_ckeditor(&self) -> Result<()> {
    let config = self.context.config();
    let staging = config.editor_staging_path(self.context.root());
    build_editor(self.context.root(), &staging, &config.editor)
  }

  /// `watch`: rebuild bundles and reinstall dependencies as their inputs change.
  pub fn watch(&mut self) -> Result<()> {
    let config = self.context.config();
    let session = WatchSession::start(
      self.context.root(),
      &config.javascript.bundles,
      &config.dependencies,
    )?;
    session.run(self);
    Ok(())
  }
}

impl TriggerHandler for Pipeline {
  fn handle(&mut self, trigger: &WatchTrigger) -> Result<()> {
    match trigger {
      WatchTrigger::Bundle(name) => self.rebuild_bundle(name).map(|_| ()),
      WatchTrigger::FrontendDependencies => self.install_javascript_dependencies(),
      WatchTrigger::PackageDependencies => self.install_and_shrinkwrap_npm_dependencies(),
    }
  }
}
