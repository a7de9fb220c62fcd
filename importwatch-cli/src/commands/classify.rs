//! `importwatch classify`: dry-run verdict for one file name.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use importwatch_artifacts::{ArtifactClassifier, ArtifactLayout, Classification};

use super::ConfigArg;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Batch file name as it appeared in the watched folder, e.g. WOH1001.txt.
    pub file_name: String,

    #[command(flatten)]
    pub config: ConfigArg,

    /// Also print the HTML report a failure notification would carry.
    #[arg(long)]
    pub report: bool,
}

impl ClassifyArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let layout = ArtifactLayout::from_config(&config);
        let paths = layout.paths_for(&self.file_name);
        let classifier =
            ArtifactClassifier::new(layout).context("failed to load report template")?;

        println!("summary:  {}", paths.summary.display());
        match &paths.error_suffix {
            Some(suffix) => println!(
                "errors:   {}/*{suffix}",
                classifier.layout().error_folder.display()
            ),
            None => println!("errors:   (no numeric token in file name)"),
        }
        for artifact in classifier.error_artifacts(&self.file_name) {
            println!("          {}", artifact.display());
        }

        match classifier.classify(&self.file_name) {
            Classification::Imported => {
                println!("{}: {}", self.file_name, "imported".green().bold());
            }
            Classification::Failed(reason) => {
                println!("{}: {} ({reason})", self.file_name, "failed".red().bold());
            }
        }

        if self.report {
            let body = classifier
                .report(&self.file_name)
                .context("failed to render report")?;
            println!("{body}");
        }
        Ok(())
    }
}
