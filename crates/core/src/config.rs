//! Build configuration schema, loading, and validation.
//!
//! The configuration is a declarative record: entry point, output naming,
//! loader rules matched by regex, resolution settings, plugin list, and build
//! mode. It is loaded once at build start and read-only thereafter. All
//! validation happens synchronously at load time and reports the offending
//! field by name; nothing is retried or repaired.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BundleError, Result};
use crate::loader::BUILTIN_LOADERS;

/// Config file names probed, in order, when no `--config` flag is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["bindery.config.json", "bindery.json"];

/// The build configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
  /// Source module that starts the dependency graph.
  pub entry: String,
  pub output: OutputConfig,
  pub module: ModuleConfig,
  pub resolve: ResolveConfig,
  /// Names of built-in plugins to run, in order.
  pub plugins: Vec<String>,
  pub mode: Mode,
}

/// Output naming for emitted assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputConfig {
  /// Destination directory for build artifacts.
  pub path: String,
  /// Name template for the main bundle. `[name]` expands to the chunk name.
  pub filename: String,
  /// Name template for secondary chunks. `[name]` expands to the chunk name.
  pub chunk_filename: String,
}

/// Loader rules applied to matched source files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleConfig {
  /// Ordered rules; the first matching rule selects the loader.
  pub rules: Vec<Rule>,
}

/// A single transform rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Rule {
  /// Regex matched against the file path.
  pub test: String,
  /// Identifier of the loader to apply.
  pub use_loader: String,
  /// Regex for paths to skip even when `test` matches.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exclude: Option<String>,
}

/// Module resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolveConfig {
  /// Suffixes tried, in order, for extension-less imports. Order is
  /// resolution precedence.
  pub extensions: Vec<String>,
  /// Import-path rewrite table.
  pub alias: BTreeMap<String, String>,
}

/// Build profile. A closed enumeration: unknown mode strings are rejected at
/// parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
  Development,
  Production,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      entry: "./src/index.js".to_string(),
      output: OutputConfig {
        path: "./dist".to_string(),
        filename: "bundle.js".to_string(),
        chunk_filename: "[name].chunk.js".to_string(),
      },
      module: ModuleConfig {
        rules: vec![
          Rule {
            test: r"\.js$".to_string(),
            use_loader: "javascript".to_string(),
            exclude: Some("node_modules".to_string()),
          },
          Rule {
            test: r"\.ts$".to_string(),
            use_loader: "typescript".to_string(),
            exclude: Some("node_modules".to_string()),
          },
          Rule {
            test: r"\.json$".to_string(),
            use_loader: "json".to_string(),
            exclude: None,
          },
        ],
      },
      resolve: ResolveConfig {
        extensions: vec![".js".to_string(), ".ts".to_string(), ".json".to_string()],
        alias: BTreeMap::new(),
      },
      plugins: Vec::new(),
      mode: Mode::Development,
    }
  }
}

impl Config {
  /// Load and validate a configuration from a JSON file.
  pub async fn from_file(path: &Path) -> Result<Self> {
    match path.extension().and_then(|e| e.to_str()) {
      Some("json") => {}
      _ => {
        return Err(BundleError::config(
          "config",
          format!("unsupported config format: {} (expected a .json file)", path.display()),
        ));
      }
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config = Self::from_json(&content)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  /// Parse and validate a configuration from a JSON string.
  pub fn from_json(content: &str) -> Result<Self> {
    let config: Config =
      serde_json::from_str(content).map_err(|e| BundleError::config("config", e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Probe the working directory for a default config file.
  ///
  /// Returns `None` when no candidate exists.
  pub async fn discover(dir: &Path) -> Result<Option<Self>> {
    for name in DEFAULT_CONFIG_FILES {
      let candidate = dir.join(name);
      if tokio::fs::metadata(&candidate).await.is_ok() {
        debug!(path = %candidate.display(), "using discovered config");
        return Ok(Some(Self::from_file(&candidate).await?));
      }
    }
    Ok(None)
  }

  /// Validate the record, reporting the first violation with the offending
  /// field's name.
  pub fn validate(&self) -> Result<()> {
    if self.entry.is_empty() {
      return Err(BundleError::config("entry", "must not be empty"));
    }
    if self.output.path.is_empty() {
      return Err(BundleError::config("output.path", "must not be empty"));
    }
    if self.output.filename.is_empty() {
      return Err(BundleError::config("output.filename", "must not be empty"));
    }

    for (i, rule) in self.module.rules.iter().enumerate() {
      if rule.test.is_empty() {
        return Err(BundleError::config(format!("module.rules[{}].test", i), "must not be empty"));
      }
      if let Err(e) = regex::Regex::new(&rule.test) {
        return Err(BundleError::config(
          format!("module.rules[{}].test", i),
          format!("invalid pattern: {}", e),
        ));
      }
      if let Some(exclude) = &rule.exclude
        && let Err(e) = regex::Regex::new(exclude)
      {
        return Err(BundleError::config(
          format!("module.rules[{}].exclude", i),
          format!("invalid pattern: {}", e),
        ));
      }
      if !BUILTIN_LOADERS.contains(&rule.use_loader.as_str()) {
        return Err(BundleError::config(
          format!("module.rules[{}].useLoader", i),
          format!(
            "unknown loader '{}' (known: {})",
            rule.use_loader,
            BUILTIN_LOADERS.join(", ")
          ),
        ));
      }
    }

    let mut seen = std::collections::BTreeSet::new();
    for (i, ext) in self.resolve.extensions.iter().enumerate() {
      if ext.is_empty() {
        return Err(BundleError::config(
          format!("resolve.extensions[{}]", i),
          "must not be empty",
        ));
      }
      if !ext.starts_with('.') {
        return Err(BundleError::config(
          format!("resolve.extensions[{}]", i),
          format!("must start with '.', got '{}'", ext),
        ));
      }
      if !seen.insert(ext.as_str()) {
        return Err(BundleError::config(
          format!("resolve.extensions[{}]", i),
          format!("duplicate extension '{}'", ext),
        ));
      }
    }

    Ok(())
  }

  /// Override the entry point.
  pub fn with_entry(mut self, entry: &str) -> Self {
    self.entry = entry.to_string();
    self
  }

  /// Override the output directory.
  pub fn with_output_path(mut self, path: &str) -> Self {
    self.output.path = path.to_string();
    self
  }
}
