//! Plugin dispatch.
//!
//! Plugins are extension points invoked by the bundler after assets are
//! written. The config's `plugins` list names built-ins; unknown names are
//! rejected before any work happens.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{BundleError, Result};
use crate::module::ModuleId;

/// State handed to plugins after asset emission.
pub struct PluginContext {
  /// The output directory, already created.
  pub output_dir: PathBuf,
  /// Asset filenames of entry chunks, in chunk order.
  pub entry_assets: Vec<String>,
  /// All emitted asset filenames and their byte sizes.
  pub assets: BTreeMap<String, u64>,
  /// All modules in the compilation, in topological order.
  pub modules: Vec<ModuleId>,
}

#[async_trait]
pub trait Plugin: Send + Sync {
  /// Called after all chunk assets are written to the output directory.
  async fn after_emit(&self, cx: &mut PluginContext) -> Result<()>;
  fn name(&self) -> &str;
}

/// Holds the plugins named by the config, in order.
pub struct PluginManager {
  plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
  /// Map config plugin names to built-ins.
  pub fn from_names(names: &[String]) -> Result<Self> {
    let mut plugins: Vec<Box<dyn Plugin>> = Vec::with_capacity(names.len());

    for name in names {
      match name.as_str() {
        "html" => plugins.push(Box::new(HtmlPlugin)),
        other => return Err(BundleError::PluginNotFound(other.to_string())),
      }
    }

    Ok(Self { plugins })
  }

  pub fn is_empty(&self) -> bool {
    self.plugins.is_empty()
  }

  /// Run every plugin's `after_emit` hook in config order.
  pub async fn apply_after_emit(&self, cx: &mut PluginContext) -> Result<()> {
    for plugin in &self.plugins {
      debug!(plugin = plugin.name(), "running after_emit");
      plugin.after_emit(cx).await?;
    }
    Ok(())
  }
}

/// Emits an `index.html` that loads every entry-chunk asset.
pub struct HtmlPlugin;

#[async_trait]
impl Plugin for HtmlPlugin {
  async fn after_emit(&self, cx: &mut PluginContext) -> Result<()> {
    let scripts: String = cx
      .entry_assets
      .iter()
      .map(|asset| format!("    <script src=\"{}\"></script>\n", asset))
      .collect();

    let html = format!(
      "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\" />\n    <title>Bundled App</title>\n  </head>\n  <body>\n    <div id=\"root\"></div>\n{}  </body>\n</html>\n",
      scripts
    );

    let path = cx.output_dir.join("index.html");
    tokio::fs::write(&path, &html).await?;
    cx.assets.insert("index.html".to_string(), html.len() as u64);

    Ok(())
  }

  fn name(&self) -> &str {
    "html"
  }
}
