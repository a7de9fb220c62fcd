//! `importwatch run`: the foreground watcher service.

use anyhow::{Context, Result};
use clap::Args;

use importwatch_daemon::{start_blocking, LogFormat};

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Emit log lines as JSON objects.
    #[arg(long)]
    pub log_json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let format = if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Text
        };
        start_blocking(&self.config.path, format).context("watcher service exited with error")
    }
}
