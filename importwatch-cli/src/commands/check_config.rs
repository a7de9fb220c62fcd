//! `importwatch check-config`: load, validate, and summarize.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use importwatch_core::MailChannelKind;

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl CheckConfigArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let registry = config
            .resolved_registry_path()
            .context("could not determine registry location")?;

        println!("{} {}", "valid".green().bold(), self.config.path.display());
        println!("watch:        {}", folder(&config.active_folder));
        println!("summaries:    {}", folder(&config.summary_folder));
        println!("errors:       {}", folder(&config.error_folder));
        println!("registry:     {}", registry.display());
        println!(
            "pattern:      {}*.{}",
            config.file_prefix, config.file_extension
        );
        println!(
            "schedule:     every {}s, debounce {}s, first tick after {}ms",
            config.wait_in_seconds,
            config.debounce_seconds(),
            config.initial_delay_ms
        );
        let channel = match config.default_mail {
            MailChannelKind::DbMail => "db_mail",
            MailChannelKind::Smtp => "smtp",
        };
        println!(
            "mail:         {channel} to {} recipient(s)",
            config.recipients().len()
        );
        Ok(())
    }
}

fn folder(path: &Path) -> String {
    if path.is_dir() {
        path.display().to_string()
    } else {
        format!("{} {}", path.display(), "(missing)".yellow())
    }
}
