//! Dependency installation through external package managers.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};

use crate::config::DependencyConfig;

/// Run an external command in `cwd`, failing when it cannot start or exits unsuccessfully.
pub(crate) fn run_tool(cwd: &Path, command: &[String]) -> Result<()> {
  let (program, args) = command
    .split_first()
    .ok_or_else(|| anyhow!("empty command"))?;
  let display = command.join(" ");

  log::info!("running `{display}`");
  let output = Command::new(program)
    .args(args)
    .current_dir(cwd)
    .output()
    .with_context(|| format!("failed to run `{display}`"))?;

  let stdout = String::from_utf8_lossy(&output.stdout);
  if !stdout.trim().is_empty() {
    log::debug!("`{display}` output:\n{}", stdout.trim_end());
  }

  if !output.status.success() {
    return Err(anyhow!(
      "`{display}` failed with status {}: {}",
      output.status,
      String::from_utf8_lossy(&output.stderr).trim()
    ));
  }

  Ok(())
}

/// Install the front-end libraries declared in the front-end dependency manifest.
pub fn install_frontend_dependencies(root: &Path, config: &DependencyConfig) -> Result<()> {
  let manifest = root.join(&config.frontend_manifest);
  if !manifest.exists() {
    return Err(anyhow!(
      "front-end dependency manifest {} does not exist",
      manifest.display()
    ));
  }

  run_tool(root, &config.frontend_install).context("failed to install front-end dependencies")
}

/// Bring installed server-side packages and the lock file in line with the package manifest.
///
/// The lock file is deleted first so the final step regenerates it from scratch. Steps run in
/// order and the first failing step stops the sequence.
pub fn install_and_shrinkwrap_packages(root: &Path, config: &DependencyConfig) -> Result<()> {
  let lockfile = root.join(&config.package_lockfile);
  match fs::remove_file(&lockfile) {
    Ok(()) => log::info!("removed {}", lockfile.display()),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
    Err(err) => {
      return Err(err).with_context(|| format!("failed to remove {}", lockfile.display()));
    }
  }

  for step in &config.package_steps {
    run_tool(root, step)?;
  }

  Ok(())
}
