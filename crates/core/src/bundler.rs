//! Bundle orchestration: compile, write assets, run plugins, report.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chunk::{ChunkKind, chunk_filename};
use crate::compiler::Compiler;
use crate::config::Config;
use crate::error::{BundleError, Result};
use crate::plugin::{PluginContext, PluginManager};

/// One emitted asset, for reporting.
#[derive(Debug, Clone)]
pub struct AssetReport {
  pub name: String,
  pub size: u64,
}

/// Summary of a completed bundle run.
#[derive(Debug, Clone)]
pub struct BundleReport {
  pub assets: Vec<AssetReport>,
  pub module_count: usize,
  pub chunk_count: usize,
  pub elapsed: Duration,
}

/// Ties the pipeline together: validates config, compiles, writes the output
/// directory, and dispatches plugins.
pub struct Bundler {
  config: Config,
  compiler: Compiler,
  plugins: PluginManager,
}

impl Bundler {
  /// Create a bundler from a configuration.
  ///
  /// The config is validated here; plugin names are checked up front so a
  /// typo fails before any compilation work.
  pub fn new(config: Config) -> Result<Self> {
    config.validate()?;
    let plugins = PluginManager::from_names(&config.plugins)?;
    let compiler = Compiler::new(config.clone())?;

    Ok(Self {
      config,
      compiler,
      plugins,
    })
  }

  /// Run the full pipeline and return a report for the caller to present.
  pub async fn run(&self) -> Result<BundleReport> {
    let started = Instant::now();
    let output_dir = PathBuf::from(&self.config.output.path);

    tokio::fs::create_dir_all(&output_dir).await?;

    let result = self.compiler.compile().await?;

    let mut assets = Vec::with_capacity(result.assets.len());
    let mut sizes: BTreeMap<String, u64> = BTreeMap::new();

    for (name, content) in &result.assets {
      let path = safe_asset_path(&output_dir, name)?;
      tokio::fs::write(&path, content).await?;
      info!(asset = %name, bytes = content.len(), "wrote asset");
      assets.push(AssetReport {
        name: name.clone(),
        size: content.len() as u64,
      });
      sizes.insert(name.clone(), content.len() as u64);
    }

    if !self.plugins.is_empty() {
      let entry_assets: Vec<String> = result
        .chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Entry)
        .map(|c| chunk_filename(&self.config.output.filename, &c.name))
        .collect();

      let mut cx = PluginContext {
        output_dir: output_dir.clone(),
        entry_assets,
        assets: sizes,
        modules: result.modules.clone(),
      };
      self.plugins.apply_after_emit(&mut cx).await?;

      // Plugins may add assets; reflect them in the report.
      for (name, size) in cx.assets {
        if !assets.iter().any(|a| a.name == name) {
          assets.push(AssetReport { name, size });
        }
      }
    }

    let report = BundleReport {
      assets,
      module_count: result.modules.len(),
      chunk_count: result.chunks.len(),
      elapsed: started.elapsed(),
    };
    debug!(elapsed_ms = report.elapsed.as_millis() as u64, "bundle finished");

    Ok(report)
  }
}

/// Join an asset name onto the output directory, rejecting names that would
/// escape it.
fn safe_asset_path(output_dir: &Path, name: &str) -> Result<PathBuf> {
  let relative = Path::new(name);
  let escapes = relative.is_absolute()
    || relative
      .components()
      .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));

  if escapes {
    return Err(BundleError::AssetOutsideOutput(name.to_string()));
  }

  Ok(output_dir.join(relative))
}
