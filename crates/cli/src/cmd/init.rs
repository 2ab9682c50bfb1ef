//! Implementation of the `bindery init` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use bindery_core::Config;

use crate::output::print_success;

/// Write a starter `bindery.config.json` with the default configuration.
///
/// Refuses to overwrite an existing config file.
pub async fn cmd_init(dir: &Path) -> Result<()> {
  let path = dir.join("bindery.config.json");

  if tokio::fs::metadata(&path).await.is_ok() {
    bail!("config already exists: {}", path.display());
  }

  tokio::fs::create_dir_all(dir)
    .await
    .with_context(|| format!("failed to create directory: {}", dir.display()))?;

  let content = serde_json::to_string_pretty(&Config::default()).context("failed to serialize default config")?;
  tokio::fs::write(&path, content)
    .await
    .with_context(|| format!("failed to write config: {}", path.display()))?;

  print_success(&format!("wrote {}", path.display()));
  Ok(())
}
