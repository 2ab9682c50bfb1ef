//! Implementation of the `bindery build` command.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use bindery_core::Bundler;

use crate::output::{format_bytes, format_duration, print_info, print_success};

/// Execute the build command.
///
/// Config comes from `--config`, then discovery, then defaults; an ENTRY
/// argument or `--output` flag overrides the corresponding config fields.
pub async fn cmd_build(entry: Option<&str>, output: Option<&str>, config_flag: Option<&Path>) -> Result<()> {
  let mut config = super::load_config(config_flag).await?;

  if let Some(entry) = entry {
    config = config.with_entry(entry);
  }
  if let Some(output) = output {
    config = config.with_output_path(output);
  }

  print_info(&format!("bundling {}", config.entry));
  info!(entry = %config.entry, output = %config.output.path, "starting build");

  let bundler = Bundler::new(config).context("invalid configuration")?;
  let report = bundler.run().await.context("bundling failed")?;
  info!(assets = report.assets.len(), "build finished");

  let name_width = report.assets.iter().map(|a| a.name.len()).max().unwrap_or(0);
  for asset in &report.assets {
    println!("  {:<width$}  {:>9}", asset.name, format_bytes(asset.size), width = name_width);
  }

  print_success(&format!(
    "bundled {} module(s) into {} chunk(s) in {}",
    report.module_count,
    report.chunk_count,
    format_duration(report.elapsed)
  ));

  Ok(())
}
