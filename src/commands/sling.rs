use std::path::Path;

use clap::Args;

use super::Town;
use crate::dispatch::{self, SlingRequest};
use crate::error::ExitError;
use crate::wisp::ConflictPolicy;

#[derive(Debug, Args)]
pub struct SlingArgs {
    /// Bead to attach (e.g. gt-abc)
    pub bead: String,
    /// Agent whose hook receives the bead
    pub agent: String,
    /// Who is slinging (defaults to town.default_agent)
    #[arg(long, env = "GT_AGENT")]
    pub from: Option<String>,
    /// Extra context for the receiving agent
    #[arg(long)]
    pub context: Option<String>,
    /// Subject line
    #[arg(long, short)]
    pub subject: Option<String>,
    /// Also send the agent an ephemeral notification mail
    #[arg(long)]
    pub notify: bool,
    /// Replace pending work on the hook instead of failing
    #[arg(long)]
    pub force: bool,
}

impl SlingArgs {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let mut hooks = town.hooks();
        if self.force {
            hooks = hooks.with_policy(ConflictPolicy::Overwrite);
        }
        let mut issues = town.issues()?;

        let req = SlingRequest {
            bead_id: self.bead.clone(),
            target: self.agent.clone(),
            from: town.agent_or_default(self.from.as_deref()),
            context: self.context.clone(),
            subject: self.subject.clone(),
            notify: self.notify,
        };
        let slung = dispatch::sling(&hooks, &mut issues, &req).map_err(ExitError::from)?;

        println!("Slung {} to {}", self.bead, self.agent);
        match slung.notification {
            Some(Ok(note)) => println!("Notified {} ({}, ephemeral)", self.agent, note.id),
            Some(Err(e)) => eprintln!(
                "warning: {} is on the hook but notifying {} failed: {e}",
                self.bead, self.agent
            ),
            None => {}
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct HandoffArgs {
    /// Bead to carry into the next session
    pub bead: String,
    /// Agent handing off (its own hook)
    #[arg(long, env = "GT_AGENT")]
    pub agent: String,
    /// Subject line for the next session
    #[arg(long, short, default_value = "handoff")]
    pub subject: String,
    /// Notes for the next session
    #[arg(long)]
    pub context: Option<String>,
}

impl HandoffArgs {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let hooks = town.hooks();
        let mut issues = town.issues()?;

        let mut req = SlingRequest::handoff(&self.bead, &self.agent, &self.subject);
        req.context.clone_from(&self.context);
        dispatch::sling(&hooks, &mut issues, &req).map_err(ExitError::from)?;

        println!("Handed off {} on {}'s hook", self.bead, self.agent);
        Ok(())
    }
}
