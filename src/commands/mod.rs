pub mod doctor;
pub mod export;
pub mod hook;
pub mod mail;
pub mod resume;
pub mod schema;
pub mod sling;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::beads::IssueStore;
use crate::config::Config;
use crate::wisp::HookStore;
use doctor::OutputFormat;

/// A town root and its config, resolved once per command.
#[derive(Debug)]
pub struct Town {
    pub root: PathBuf,
    pub config: Config,
}

impl Town {
    pub fn resolve(town_root: Option<&Path>) -> anyhow::Result<Self> {
        let root = match town_root {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let config = Config::load_for_town(&root)?;
        Ok(Self { root, config })
    }

    pub fn hooks(&self) -> HookStore {
        self.config.hook_store(&self.root)
    }

    pub fn issues(&self) -> anyhow::Result<IssueStore> {
        self.config.issue_store(&self.root)
    }

    /// The caller's identity: explicit, else the configured default.
    pub fn agent_or_default(&self, agent: Option<&str>) -> String {
        agent.map_or_else(|| self.config.default_agent(), str::to_string)
    }
}

/// Pretty on a terminal, plain text otherwise.
pub fn resolve_format(format: Option<OutputFormat>) -> OutputFormat {
    format.unwrap_or_else(|| {
        if std::io::stdout().is_terminal() {
            OutputFormat::Pretty
        } else {
            OutputFormat::Text
        }
    })
}
