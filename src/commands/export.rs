use std::path::{Path, PathBuf};

use clap::Args;

use super::Town;
use crate::beads;
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Output file (defaults to <beads dir>/issues.jsonl)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let issues = town.issues()?;
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| town.config.export_path(&town.root));

        let summary = beads::write_export(&issues, &path).map_err(ExitError::from)?;
        println!(
            "Exported {} issue(s) to {} ({} wisp(s) kept local)",
            summary.exported,
            summary.path.display(),
            summary.skipped_ephemeral
        );
        Ok(())
    }
}
