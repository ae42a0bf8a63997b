//! Packaging the rich-text editor from vendored sources.
//!
//! The vendored editor tree and every discovered plugin are staged in a scratch directory, the
//! external builder turns the staging directory into a distribution, and the staging directory
//! is removed once the builder succeeds.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use same_file::is_same_file;
use walkdir::WalkDir;

use crate::config::{EditorConfig, PluginSource};
use crate::install::run_tool;

/// Name of the staged directory holding plugins.
pub const PLUGINS_DIR: &str = "plugins";

/// A plugin directory and the name it is staged under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorPlugin {
  /// Name of the plugin inside the staged `plugins` directory.
  pub name: String,
  /// Source directory of the plugin.
  pub path: PathBuf,
}

/// Stage the editor, run the external builder and remove the staging directory.
pub fn build_editor(root: &Path, staging: &Path, config: &EditorConfig) -> Result<()> {
  stage_editor(root, staging, config)?;

  let command = builder_command(root, staging, config);
  run_tool(root, &command).context("editor builder failed, staging directory kept for inspection")?;

  fs::remove_dir_all(staging)
    .with_context(|| format!("failed to remove {}", staging.display()))?;
  log::info!(
    "editor distribution written to {}",
    root.join(&config.output_dir).display()
  );
  Ok(())
}

/// Copy the vendored editor and its plugins into `staging`.
pub fn stage_editor(root: &Path, staging: &Path, config: &EditorConfig) -> Result<Vec<EditorPlugin>> {
  let source = root.join(&config.source_dir);
  if !source.is_dir() {
    return Err(anyhow!("editor sources not found at {}", source.display()));
  }

  match fs::remove_dir_all(staging) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => {
      return Err(err).with_context(|| format!("failed to clear {}", staging.display()));
    }
  }

  copy_tree(&source, staging)?;

  let plugins = discover_plugins(root, &config.plugin_sources)?;
  let plugins_dir = staging.join(PLUGINS_DIR);
  for plugin in &plugins {
    copy_tree(&plugin.path, &plugins_dir.join(&plugin.name))?;
  }
  log::info!(
    "staged editor with {} plugin(s) in {}",
    plugins.len(),
    staging.display()
  );

  Ok(plugins)
}

/// Find plugin directories in every configured source, stripping naming prefixes.
///
/// Sources that do not exist contribute no plugins. The result is sorted by plugin name; a
/// plugin from a later source replaces an earlier one with the same name when staged.
pub fn discover_plugins(root: &Path, sources: &[PluginSource]) -> Result<Vec<EditorPlugin>> {
  let mut plugins = Vec::new();

  for source in sources {
    let dir = root.join(&source.dir);
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        log::debug!("plugin source {} does not exist", dir.display());
        continue;
      }
      Err(err) => {
        return Err(err).with_context(|| format!("failed to read {}", dir.display()));
      }
    };

    let mut found = Vec::new();
    for entry in entries {
      let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
      if !entry.file_type()?.is_dir() {
        continue;
      }
      let file_name = entry.file_name();
      let Some(name) = file_name.to_str() else {
        continue;
      };
      if let Some(name) = plugin_name(name, source.prefix.as_deref()) {
        found.push(EditorPlugin {
          name: name.to_string(),
          path: entry.path(),
        });
      }
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    plugins.extend(found);
  }

  Ok(plugins)
}

fn plugin_name<'a>(dir_name: &'a str, prefix: Option<&str>) -> Option<&'a str> {
  match prefix {
    Some(prefix) => dir_name
      .strip_prefix(prefix)
      .filter(|name| !name.is_empty()),
    None => Some(dir_name),
  }
}

/// Command line of the external editor builder.
pub fn builder_command(root: &Path, staging: &Path, config: &EditorConfig) -> Vec<String> {
  let display = |path: &Path| path.to_string_lossy().into_owned();
  vec![
    config.java.clone(),
    format!("-Xmx{}", config.max_heap),
    "-jar".into(),
    display(&root.join(&config.builder_jar)),
    "--build".into(),
    display(staging),
    display(&root.join(&config.output_dir)),
    "-s".into(),
    format!("--version={}", config.version),
    "--revision".into(),
    config.revision.clone(),
    "--build-config".into(),
    display(&root.join(&config.build_config)),
    "--overwrite".into(),
    "--no-tar".into(),
    "--no-zip".into(),
  ]
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
  for entry in WalkDir::new(source).follow_links(true) {
    let entry = entry.with_context(|| format!("failed to walk {}", source.display()))?;
    let relative = entry
      .path()
      .strip_prefix(source)
      .with_context(|| format!("{} escaped {}", entry.path().display(), source.display()))?;
    let target = destination.join(relative);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)
        .with_context(|| format!("failed to create {}", target.display()))?;
    } else {
      install_file(entry.path(), &target).with_context(|| {
        format!(
          "failed to copy {} to {}",
          entry.path().display(),
          target.display()
        )
      })?;
    }
  }
  Ok(())
}

fn install_file(source: &Path, destination: &Path) -> std::io::Result<()> {
  if destination.exists() {
    if is_same_file(source, destination)? {
      return Ok(());
    }
    fs::remove_file(destination)?;
  }
  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::copy(source, destination).map(|_| ())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn layout(root: &Path) {
    write(&root.join("lib/front-end/ckeditor-dev/ckeditor.js"), "core");
    write(&root.join("lib/front-end/ckeditor-dev/lang/en.js"), "en");
    write(
      &root.join("lib/front-end/ckeditor-plugin-descriptionlist/plugin.js"),
      "dl",
    );
    write(&root.join("lib/front-end/jquery/dist/jquery.js"), "jq");
    write(&root.join("media/js/ckeditor/plugins/mdn-link/plugin.js"), "link");
  }

  #[test]
  fn discovers_plugins_and_strips_prefix() {
    let dir = tempdir().unwrap();
    layout(dir.path());

    let plugins = discover_plugins(dir.path(), &EditorConfig::default().plugin_sources).unwrap();
    let names: Vec<_> = plugins.iter().map(|plugin| plugin.name.as_str()).collect();
    assert_eq!(names, vec!["descriptionlist", "mdn-link"]);
  }

  #[test]
  fn plugin_name_requires_non_empty_suffix() {
    assert_eq!(plugin_name("ckeditor-plugin-foo", Some("ckeditor-plugin-")), Some("foo"));
    assert_eq!(plugin_name("ckeditor-plugin-", Some("ckeditor-plugin-")), None);
    assert_eq!(plugin_name("jquery", Some("ckeditor-plugin-")), None);
    assert_eq!(plugin_name("jquery", None), Some("jquery"));
  }

  #[test]
  fn stages_editor_tree_with_plugins() {
    let dir = tempdir().unwrap();
    layout(dir.path());
    let staging = dir.path().join("gulp-build/ckeditor");
    write(&staging.join("stale.txt"), "old");

    stage_editor(dir.path(), &staging, &EditorConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(staging.join("ckeditor.js")).unwrap(), "core");
    assert!(staging.join("lang/en.js").exists());
    assert!(staging.join("plugins/descriptionlist/plugin.js").exists());
    assert!(staging.join("plugins/mdn-link/plugin.js").exists());
    assert!(!staging.join("plugins/jquery").exists());
    assert!(!staging.join("stale.txt").exists());
  }

  #[test]
  fn missing_editor_sources_is_an_error() {
    let dir = tempdir().unwrap();
    let staging = dir.path().join("staging");
    assert!(stage_editor(dir.path(), &staging, &EditorConfig::default()).is_err());
  }

  #[test]
  fn builder_command_matches_expected_flags() {
    let root = Path::new("/srv/site");
    let staging = root.join("gulp-build/ckeditor");
    let command = builder_command(root, &staging, &EditorConfig::default());

    assert_eq!(command[0], "java");
    assert_eq!(command[1], "-Xmx1024m");
    assert_eq!(command[3], "/srv/site/lib/front-end/ckbuilder-1.7.2/index.jar");
    assert_eq!(command[5], "/srv/site/gulp-build/ckeditor");
    assert_eq!(command[6], "/srv/site/cke-build");
    assert!(command.contains(&"--version=4.4.7".to_string()));
    assert!(command.ends_with(&[
      "--overwrite".to_string(),
      "--no-tar".to_string(),
      "--no-zip".to_string()
    ]));
  }

  #[cfg(unix)]
  #[test]
  fn removes_staging_after_successful_build() {
    let dir = tempdir().unwrap();
    layout(dir.path());
    let staging = dir.path().join("gulp-build/ckeditor");
    let config = EditorConfig {
      java: "true".into(),
      ..EditorConfig::default()
    };

    build_editor(dir.path(), &staging, &config).unwrap();
    assert!(!staging.exists());
  }

  #[cfg(unix)]
  #[test]
  fn keeps_staging_when_builder_fails() {
    let dir = tempdir().unwrap();
    layout(dir.path());
    let staging = dir.path().join("gulp-build/ckeditor");
    let config = EditorConfig {
      java: "false".into(),
      ..EditorConfig::default()
    };

    assert!(build_editor(dir.path(), &staging, &config).is_err());
    assert!(staging.join("ckeditor.js").exists());
  }

  #[test]
  fn install_file_overwrites_existing_copy() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.txt");
    let destination = dir.path().join("out/destination.txt");
    fs::write(&source, "new").unwrap();
    write(&destination, "old");

    install_file(&source, &destination).unwrap();
    assert_eq!(fs::read_to_string(&destination).unwrap(), "new");

    install_file(&source, &source).unwrap();
    assert_eq!(fs::read_to_string(&source).unwrap(), "new");
  }
}
