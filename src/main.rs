use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use asset_pipeline::{Pipeline, PipelineContext};

/// Bundle, minify and revision front-end assets, and package the vendored editor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project root all configured paths are relative to.
  #[arg(long, default_value = ".", global = true)]
  root: PathBuf,

  /// Configuration file (defaults to `<root>/pipeline.config.json`).
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  task: Option<Task>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
  /// Compress JavaScript bundles, then package the editor.
  Default,
  /// Install front-end dependencies and rebuild every JavaScript bundle.
  #[command(name = "compress", alias = "compress-javascript")]
  Compress,
  /// Install front-end dependencies.
  #[command(name = "install", alias = "install-javascript-dependencies")]
  Install,
  /// Prune, install and shrinkwrap npm dependencies.
  #[command(name = "shrinkwrap", alias = "install-and-shrinkwrap-npm-dependencies")]
  Shrinkwrap,
  /// Package the editor from vendored sources.
  #[command(name = "build-editor", alias = "build-ckeditor")]
  BuildEditor,
  /// Rebuild bundles and reinstall dependencies whenever their inputs change.
  Watch,
}

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let cli = Cli::parse();
  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      log::error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &Cli) -> Result<()> {
  let context = PipelineContext::load(&cli.root, cli.config.as_deref())?;
  let mut pipeline = Pipeline::new(context);

  match cli.task.unwrap_or(Task::Default) {
    Task::Default => pipeline.run_default(),
    Task::Compress => pipeline.compress_javascript().map(|_| ()),
    Task::Install => pipeline.install_javascript_dependencies(),
    Task::Shrinkwrap => pipeline.install_and_shrinkwrap_npm_dependencies(),
    Task::BuildEditor => pipeline.build_ckeditor(),
    Task::Watch => pipeline.watch(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn defaults_to_default_task() {
    let cli = Cli::parse_from(["asset-pipeline"]);
    assert_eq!(cli.task, None);
    assert_eq!(cli.root, PathBuf::from("."));
  }

  #[test]
  fn accepts_long_task_aliases() {
    let cli = Cli::parse_from(["asset-pipeline", "compress-javascript", "--root", "site"]);
    assert_eq!(cli.task, Some(Task::Compress));
    assert_eq!(cli.root, PathBuf::from("site"));

    let cli = Cli::parse_from(["asset-pipeline", "build-ckeditor"]);
    assert_eq!(cli.task, Some(Task::BuildEditor));
  }
}
