//! Minification backends for concatenated bundles.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use crate::error::MinifyError;

/// Transforms a concatenated bundle into its minified form.
pub trait Minifier: Send + Sync {
  /// Minify the provided buffer.
  fn minify(&self, source: &[u8]) -> Result<Vec<u8>, MinifyError>;
}

/// Runs an external minifier, feeding the bundle on stdin and reading the result from stdout.
#[derive(Debug, Clone)]
pub struct CommandMinifier {
  program: String,
  args: Vec<String>,
}

impl CommandMinifier {
  /// Build a minifier from a command line such as `["uglifyjs", "--compress"]`.
  pub fn from_command(command: &[String]) -> Result<Self, MinifyError> {
    let (program, args) = command.split_first().ok_or(MinifyError::EmptyCommand)?;
    Ok(Self {
      program: program.clone(),
      args: args.to_vec(),
    })
  }

  /// Program invoked for each bundle.
  pub fn program(&self) -> &str {
    &self.program
  }
}

impl Minifier for CommandMinifier {
  fn minify(&self, source: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|source| MinifyError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    let pipe_error = |source: std::io::Error| MinifyError::Pipe {
      program: self.program.clone(),
      source,
    };

    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| pipe_error(std::io::Error::other("stdin was not captured")))?;

    // stdin is fed from a separate thread so a large output cannot block the child.
    let (output, written) = thread::scope(|scope| {
      let writer = scope.spawn(move || stdin.write_all(source));
      let output = child.wait_with_output();
      let written = writer
        .join()
        .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
      (output, written)
    });
    let output = output.map_err(&pipe_error)?;

    if !output.status.success() {
      return Err(MinifyError::Status {
        program: self.program.clone(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    written.map_err(&pipe_error)?;

    Ok(output.stdout)
  }
}

/// Leaves the bundle untouched. Used when no minifier command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMinifier;

impl Minifier for PassthroughMinifier {
  fn minify(&self, source: &[u8]) -> Result<Vec<u8>, MinifyError> {
    Ok(source.to_vec())
  }
}

/// Pick the minifier for a configured command line; an empty command disables minification.
pub fn minifier_for_command(command: &[String]) -> Result<Box<dyn Minifier>, MinifyError> {
  if command.is_empty() {
    log::warn!("no minifier configured, bundles will only be concatenated");
    return Ok(Box::new(PassthroughMinifier));
  }
  Ok(Box::new(CommandMinifier::from_command(command)?))
}
