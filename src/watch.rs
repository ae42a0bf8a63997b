//! File watching that rebuilds bundles and reinstalls dependencies on change.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::DependencyConfig;
use crate::models::BundleSpec;

/// Pause after the first event of a burst so editors' multi-event saves collapse into one run.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Work requested by a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTrigger {
  /// A file of the named bundle changed.
  Bundle(String),
  /// The front-end dependency manifest changed.
  FrontendDependencies,
  /// The server-side package manifest changed.
  PackageDependencies,
}

impl fmt::Display for WatchTrigger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Bundle(name) => write!(f, "bundle `{name}`"),
      Self::FrontendDependencies => f.write_str("front-end dependencies"),
      Self::PackageDependencies => f.write_str("package dependencies"),
    }
  }
}

/// Reacts to watch triggers.
pub trait TriggerHandler {
  /// Handle one trigger. Errors are logged and watching continues.
  fn handle(&mut self, trigger: &WatchTrigger) -> Result<()>;
}

/// Active watchers and the channel they report to.
pub struct WatchSession {
  watchers: Vec<RecommendedWatcher>,
  receiver: Receiver<WatchTrigger>,
}

impl WatchSession {
  /// Watch every bundle independently plus both dependency manifests.
  ///
  /// Relative paths resolve against `root`.
  pub fn start(root: &Path, bundles: &BundleSpec, dependencies: &DependencyConfig) -> Result<Self> {
    let (sender, receiver) = mpsc::channel();
    let mut watchers = Vec::new();

    for (name, files) in bundles.iter() {
      let files = files.iter().map(|file| root.join(file)).collect();
      let watcher = watch_files(files, WatchTrigger::Bundle(name.to_string()), sender.clone())
        .with_context(|| format!("failed to watch bundle `{name}`"))?;
      watchers.push(watcher);
    }

    let manifests = [
      (&dependencies.frontend_manifest, WatchTrigger::FrontendDependencies),
      (&dependencies.package_manifest, WatchTrigger::PackageDependencies),
    ];
    for (manifest, trigger) in manifests {
      let path = root.join(manifest);
      let watcher = watch_files(vec![path.clone()], trigger, sender.clone())
        .with_context(|| format!("failed to watch {}", path.display()))?;
      watchers.push(watcher);
    }

    log::info!("watching {} target(s) for changes", watchers.len());
    Ok(Self { watchers, receiver })
  }

  /// Number of independent watchers.
  pub fn watcher_count(&self) -> usize {
    self.watchers.len()
  }

  /// Handle triggers until every watcher has been dropped.
  pub fn run<H: TriggerHandler>(self, handler: &mut H) -> usize {
    let WatchSession { watchers, receiver } = self;
    let handled = dispatch_triggers(&receiver, handler, DEFAULT_SETTLE);
    drop(watchers);
    handled
  }
}

/// Receive triggers and hand them to `handler` one batch at a time until the channel closes.
///
/// Identical triggers arriving within `settle` of each other are handled once. Returns the
/// number of triggers handled.
pub fn dispatch_triggers<H: TriggerHandler>(
  receiver: &Receiver<WatchTrigger>,
  handler: &mut H,
  settle: Duration,
) -> usize {
  let mut handled = 0;

  while let Ok(first) = receiver.recv() {
    if !settle.is_zero() {
      thread::sleep(settle);
    }

    let mut batch = vec![first];
    for trigger in receiver.try_iter() {
      if !batch.contains(&trigger) {
        batch.push(trigger);
      }
    }

    for trigger in &batch {
      log::info!("change detected: rebuilding {trigger}");
      if let Err(err) = handler.handle(trigger) {
        log::error!("{trigger} failed: {err:#}");
      }
      handled += 1;
    }
  }

  handled
}

fn watch_files(
  files: Vec<PathBuf>,
  trigger: WatchTrigger,
  sender: Sender<WatchTrigger>,
) -> Result<RecommendedWatcher> {
  let directories = parent_directories(&files);
  let watched: BTreeSet<PathBuf> = files.into_iter().collect();

  let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
    Ok(event) if touches_watched_file(&event, &watched) => {
      // The receiver is gone once the session has stopped; nothing left to notify.
      let _ = sender.send(trigger.clone());
    }
    Ok(_) => {}
    Err(err) => log::warn!("watch error: {err}"),
  })?;

  for directory in directories {
    if !directory.is_dir() {
      log::warn!("not watching {}: directory does not exist", directory.display());
      continue;
    }
    watcher
      .watch(&directory, RecursiveMode::NonRecursive)
      .with_context(|| format!("failed to watch {}", directory.display()))?;
  }

  Ok(watcher)
}

fn parent_directories(files: &[PathBuf]) -> BTreeSet<PathBuf> {
  files
    .iter()
    .filter_map(|file| file.parent())
    .map(Path::to_path_buf)
    .collect()
}

fn touches_watched_file(event: &Event, watched: &BTreeSet<PathBuf>) -> bool {
  let kind = &event.kind;
  (kind.is_modify() || kind.is_create() || kind.is_remove())
    && event.paths.iter().any(|path| watched.contains(path))
}
