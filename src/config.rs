//! Project configuration loader describing bundles, tools and output paths.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::BundleSpec;

/// Configuration file looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.config.json";

/// Discoverable project configuration describing filesystem layout, bundles and tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  /// Media directory; manifest keys are relative to it.
  pub media_dir: String,
  /// Scratch directory used while packaging the editor.
  pub build_dir: String,
  /// Manifest file name inside the media directory.
  pub manifest_file: String,
  /// JavaScript bundle settings.
  pub javascript: JavaScriptConfig,
  /// Dependency installation settings.
  pub dependencies: DependencyConfig,
  /// Editor packaging settings.
  pub editor: EditorConfig,
}

/// Bundles and minifier used by the `compress-javascript` task.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JavaScriptConfig {
  /// Destination directory for compressed and revisioned bundles.
  pub destination: String,
  /// Extension appended to compressed bundle names.
  pub extension: String,
  /// Text inserted between concatenated files.
  pub separator: String,
  /// Minifier command line. Empty disables minification.
  pub minifier: Vec<String>,
  /// Bundle name to ordered source files.
  pub bundles: BundleSpec,
}

/// External installers and the manifests that trigger them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
  /// Front-end dependency manifest.
  pub frontend_manifest: String,
  /// Command installing front-end dependencies.
  pub frontend_install: Vec<String>,
  /// Server-side package manifest.
  pub package_manifest: String,
  /// Lock file regenerated by the shrinkwrap steps.
  pub package_lockfile: String,
  /// Commands run in order to prune, install and lock server-side dependencies.
  pub package_steps: Vec<Vec<String>>,
}

/// Directory holding editor plugins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginSource {
  /// Directory whose child directories are plugins.
  pub dir: String,
  /// When set, only child directories starting with the prefix are plugins, and the prefix is
  /// stripped from their names.
  #[serde(default)]
  pub prefix: Option<String>,
}

/// Vendored editor sources and the external builder invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
  /// Vendored editor source tree.
  pub source_dir: String,
  /// Plugin directories copied into the staged `plugins` directory.
  pub plugin_sources: Vec<PluginSource>,
  /// Staging directory name inside the build directory.
  pub staging_dir_name: String,
  /// Java executable.
  pub java: String,
  /// Maximum heap passed as `-Xmx`.
  pub max_heap: String,
  /// Builder jar.
  pub builder_jar: String,
  /// Output directory of the built distribution.
  pub output_dir: String,
  /// Editor version string.
  pub version: String,
  /// Editor revision string.
  pub revision: String,
  /// Editor build configuration file.
  pub build_config: String,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      media_dir: "media".into(),
      build_dir: "gulp-build".into(),
      manifest_file: "rev-manifest.json".into(),
      javascript: JavaScriptConfig::default(),
      dependencies: DependencyConfig::default(),
      editor: EditorConfig::default(),
    }
  }
}

impl Default for JavaScriptConfig {
  fn default() -> Self {
    Self {
      destination: "media/build/js".into(),
      extension: ".js".into(),
      separator: String::new(),
      minifier: vec!["uglifyjs".into()],
      bundles: BundleSpec::default(),
    }
  }
}

impl Default for DependencyConfig {
  fn default() -> Self {
    Self {
      frontend_manifest: "bower.json".into(),
      frontend_install: vec!["bower".into(), "install".into()],
      package_manifest: "package.json".into(),
      package_lockfile: "npm-shrinkwrap.json".into(),
      package_steps: vec![
        vec!["npm".into(), "prune".into()],
        vec!["npm".into(), "install".into()],
        vec!["npm".into(), "shrinkwrap".into(), "--dev".into()],
      ],
    }
  }
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      source_dir: "lib/front-end/ckeditor-dev".into(),
      plugin_sources: vec![
        PluginSource {
          dir: "lib/front-end".into(),
          prefix: Some("ckeditor-plugin-".into()),
        },
        PluginSource {
          dir: "media/js/ckeditor/plugins".into(),
          prefix: None,
        },
      ],
      staging_dir_name: "ckeditor".into(),
      java: "java".into(),
      max_heap: "1024m".into(),
      builder_jar: "lib/front-end/ckbuilder-1.7.2/index.jar".into(),
      output_dir: "cke-build".into(),
      version: "4.4.7".into(),
      revision: "affa883".into(),
      build_config: "media/js/ckeditor/config.js".into(),
    }
  }
}

impl ProjectConfig {
  /// Load `pipeline.config.json` from the project root, falling back to defaults when absent.
  pub fn discover(root: &Path) -> Result<Self> {
    Self::load_or_default(&root.join(DEFAULT_CONFIG_FILE))
  }

  /// Load configuration from a file, falling back to defaults when it does not exist.
  ///
  /// A file that exists but cannot be read or parsed is an error.
  pub fn load_or_default(path: &Path) -> Result<Self> {
    match fs::read_to_string(path) {
      Ok(content) => Self::from_json(&content)
        .with_context(|| format!("failed to parse {}", path.display())),
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        log::debug!("{} not found, using default configuration", path.display());
        Ok(Self::default())
      }
      Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
  }

  /// Parse configuration from JSON text.
  pub fn from_json(content: &str) -> Result<Self> {
    Ok(serde_json::from_str(content)?)
  }
}

impl ProjectConfig {
  /// Media directory relative to the project root.
  pub fn media_dir_path(&self, root: &Path) -> PathBuf {
    root.join(&self.media_dir)
  }

  /// Manifest path relative to the project root.
  pub fn manifest_path(&self, root: &Path) -> PathBuf {
    self.media_dir_path(root).join(&self.manifest_file)
  }

  /// Editor staging directory relative to the project root.
  pub fn editor_staging_path(&self, root: &Path) -> PathBuf {
    root.join(&self.build_dir).join(&self.editor.staging_dir_name)
  }
}
