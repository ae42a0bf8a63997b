#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bundle;
pub mod config;
pub mod editor;
pub mod error;
pub mod install;
pub mod models;
pub mod orchestrator;
pub mod project;
pub mod revision;
pub mod tasks;
pub mod watch;

pub use config::ProjectConfig;
pub use error::{BundleError, MinifyError, PipelineError};
pub use models::{BundleSpec, CompressionReport};
pub use orchestrator::BundleOrchestrator;
pub use project::PipelineContext;
pub use tasks::Pipeline;
