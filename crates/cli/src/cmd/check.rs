//! Implementation of the `bindery check` command.

use std::path::Path;

use anyhow::{Result, bail};

use crate::output::{print_error, print_success};

/// Load and validate a config without building.
///
/// Exits non-zero with the validation message (naming the offending field)
/// when the config is malformed.
pub async fn cmd_check(config_flag: Option<&Path>) -> Result<()> {
  match super::load_config(config_flag).await {
    Ok(config) => {
      print_success(&format!(
        "config ok: entry {}, {} rule(s), {} plugin(s), mode {:?}",
        config.entry,
        config.module.rules.len(),
        config.plugins.len(),
        config.mode
      ));
      Ok(())
    }
    Err(e) => {
      print_error(&format!("{:#}", e));
      bail!("config validation failed");
    }
  }
}
