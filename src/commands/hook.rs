use std::path::Path;
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;

use super::doctor::OutputFormat;
use super::{Town, resolve_format};
use crate::error::ExitError;
use crate::wisp::Hook;

#[derive(Debug, Subcommand)]
pub enum HookCommand {
    /// Show the work on an agent's hook without consuming it
    Show {
        /// Agent identity
        agent: String,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Burn an agent's hook (no-op if empty)
    Burn {
        /// Agent identity
        agent: String,
    },
    /// List every pending hook
    List {
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Remove temp files left by interrupted hook writes
    Sweep,
}

#[derive(Debug, Serialize)]
struct HookView<'a> {
    agent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hook: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HookCommand {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let hooks = town.hooks();

        match self {
            Self::Show { agent, format } => {
                let hook = hooks.read(agent).map_err(ExitError::from)?;
                match resolve_format(*format) {
                    OutputFormat::Json => {
                        let view = HookView {
                            agent,
                            hook: hook.as_ref().map(hook_json).transpose()?,
                            error: None,
                        };
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Pretty | OutputFormat::Text => match hook {
                        Some(hook) => print_hook(agent, &hook),
                        None => println!("Nothing on {agent}'s hook"),
                    },
                }
                Ok(())
            }
            Self::Burn { agent } => {
                hooks.burn(agent).map_err(ExitError::from)?;
                println!("Burned {agent}'s hook");
                Ok(())
            }
            Self::List { format } => {
                let pending = hooks.list_pending().map_err(ExitError::from)?;
                match resolve_format(*format) {
                    OutputFormat::Json => {
                        let views = pending
                            .iter()
                            .map(|p| -> anyhow::Result<HookView<'_>> {
                                Ok(HookView {
                                    agent: &p.agent,
                                    hook: p.hook.as_ref().ok().map(hook_json).transpose()?,
                                    error: p.hook.as_ref().err().map(ToString::to_string),
                                })
                            })
                            .collect::<anyhow::Result<Vec<_>>>()?;
                        println!("{}", serde_json::to_string_pretty(&views)?);
                    }
                    OutputFormat::Pretty | OutputFormat::Text => {
                        if pending.is_empty() {
                            println!("No pending hooks");
                        }
                        for p in &pending {
                            match &p.hook {
                                Ok(hook) => println!(
                                    "{}  {}  {}  by {}",
                                    p.agent,
                                    hook.kind(),
                                    hook.bead_id(),
                                    hook.header().created_by
                                ),
                                Err(e) => println!("{}  CORRUPT  {e}", p.agent),
                            }
                        }
                    }
                }
                Ok(())
            }
            Self::Sweep => {
                let min_age = Duration::from_secs(town.config.hooks.sweep_after_secs);
                let removed = hooks
                    .sweep_interrupted_writes(min_age)
                    .map_err(ExitError::from)?;
                println!("Removed {} interrupted write(s)", removed.len());
                Ok(())
            }
        }
    }
}

fn hook_json(hook: &Hook) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_str(&hook.to_json()?)?)
}

pub(crate) fn print_hook(agent: &str, hook: &Hook) {
    let header = hook.header();
    println!("Hook:    {agent}");
    println!("Type:    {}", header.kind);
    println!("Bead:    {}", hook.bead_id());
    println!("From:    {}", header.created_by);
    println!("Created: {}", header.created_at.to_rfc3339());
    if let Some(work) = hook.as_slung_work() {
        if let Some(subject) = &work.subject {
            println!("Subject: {subject}");
        }
        if let Some(context) = &work.context {
            println!("Context: {context}");
        }
    }
}
