mod build;
mod check;
mod init;

pub use build::cmd_build;
pub use check::cmd_check;
pub use init::cmd_init;

use std::path::Path;

use anyhow::{Context, Result};
use bindery_core::Config;

/// Load the config the way every subcommand does: an explicit `--config`
/// path wins, then discovery in the working directory, then defaults.
pub(crate) async fn load_config(config_flag: Option<&Path>) -> Result<Config> {
  if let Some(path) = config_flag {
    return Config::from_file(path)
      .await
      .with_context(|| format!("failed to load config: {}", path.display()));
  }

  let cwd = std::env::current_dir().context("failed to determine working directory")?;
  match Config::discover(&cwd).await.context("failed to load discovered config")? {
    Some(config) => Ok(config),
    None => Ok(Config::default()),
  }
}
