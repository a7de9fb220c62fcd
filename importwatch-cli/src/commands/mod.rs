pub mod check_config;
pub mod classify;
pub mod records;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use importwatch_core::{config::DEFAULT_CONFIG_PATH, Config};

/// `--config`, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Configuration file (YAML or JSON).
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub path: PathBuf,
}

impl ConfigArg {
    pub fn load(&self) -> Result<Config> {
        Config::load_at(&self.path)
            .with_context(|| format!("failed to load configuration from {}", self.path.display()))
    }
}
