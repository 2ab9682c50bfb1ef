//! Error types for the bundling pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::module::ModuleId;

/// Errors that can occur while loading configuration or bundling.
#[derive(Debug, Error)]
pub enum BundleError {
  /// I/O error reading sources or writing assets.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Configuration failed validation. Names the offending field.
  #[error("invalid config: {field}: {message}")]
  Config { field: String, message: String },

  /// An import request could not be resolved to a file.
  #[error("resolve error: {0}")]
  Resolve(#[from] bindery_resolver::ResolveError),

  /// The module graph contains a cycle.
  #[error("circular dependency detected: {}", format_cycle(.modules))]
  CircularDependency { modules: Vec<ModuleId> },

  /// A source file could not be parsed by its loader.
  #[error("parse error in {}: {message}", file.display())]
  Parse { file: PathBuf, message: String },

  /// A loader name has no registered implementation.
  #[error("loader not found: {0}")]
  LoaderNotFound(String),

  /// A plugin name in the config has no built-in implementation.
  #[error("plugin not found: {0}")]
  PluginNotFound(String),

  /// A loader failed while transforming a file.
  #[error("loader {loader} failed on {}: {message}", file.display())]
  Loader {
    loader: String,
    file: PathBuf,
    message: String,
  },

  /// An asset name would be written outside the output directory.
  #[error("asset path escapes output directory: {0}")]
  AssetOutsideOutput(String),
}

impl BundleError {
  /// Build a `Config` error naming the offending field.
  pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
    BundleError::Config {
      field: field.into(),
      message: message.into(),
    }
  }
}

fn format_cycle(modules: &[ModuleId]) -> String {
  modules.iter().map(|m| m.0.as_str()).collect::<Vec<_>>().join(" -> ")
}

pub type Result<T> = std::result::Result<T, BundleError>;
