//! Session-start resume: pick up whatever is on the agent's hook.
//!
//! Restores the hook, marks the bead in progress for the agent, then burns the
//! hook. Run it on every start; after a crash it simply finds the same hook (or
//! the already-accepted bead) again. A corrupted hook stops here with a
//! dedicated exit code so the agent does not guess at its task.

use std::path::Path;

use clap::Args;
use serde::Serialize;

use super::doctor::OutputFormat;
use super::{Town, resolve_format};
use crate::dispatch::{self, Acceptance};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct ResumeArgs {
    /// Agent identity (its own hook)
    #[arg(env = "GT_AGENT")]
    pub agent: String,
    /// Only show the hooked work; do not accept or burn
    #[arg(long)]
    pub peek: bool,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ResumeStatus {
    Fresh,
    Pending,
    Resumed,
    AlreadyAccepted,
    AlreadyClosed,
}

#[derive(Debug, Serialize)]
struct ResumeReport {
    agent: String,
    status: ResumeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    bead: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl ResumeArgs {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let hooks = town.hooks();

        let (hook, status) = if self.peek {
            match hooks.restore_on_start(&self.agent).map_err(ExitError::from)? {
                Some(hook) => (Some(hook), ResumeStatus::Pending),
                None => (None, ResumeStatus::Fresh),
            }
        } else {
            let mut issues = town.issues()?;
            match dispatch::pickup(&hooks, &mut issues, &self.agent).map_err(ExitError::from)? {
                Some(picked) => {
                    let status = match picked.acceptance {
                        Acceptance::Accepted => ResumeStatus::Resumed,
                        Acceptance::AlreadyAccepted => ResumeStatus::AlreadyAccepted,
                        Acceptance::AlreadyClosed => ResumeStatus::AlreadyClosed,
                    };
                    (Some(picked.hook), status)
                }
                None => (None, ResumeStatus::Fresh),
            }
        };

        let work = hook.as_ref().and_then(|h| h.as_slung_work());
        let report = ResumeReport {
            agent: self.agent.clone(),
            status,
            bead: hook.as_ref().map(|h| h.bead_id().to_string()),
            created_by: hook.as_ref().map(|h| h.header().created_by.clone()),
            subject: work.and_then(|w| w.subject.clone()),
            context: work.and_then(|w| w.context.clone()),
        };

        match resolve_format(self.format) {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report),
            OutputFormat::Pretty => print_pretty(&report),
        }
        Ok(())
    }
}

fn print_pretty(report: &ResumeReport) {
    let Some(bead) = &report.bead else {
        println!("No work on {}'s hook. Find ready work with `bd ready`.", report.agent);
        return;
    };
    match report.status {
        ResumeStatus::Pending => println!("{bead} is waiting on {}'s hook", report.agent),
        ResumeStatus::AlreadyAccepted => println!("Continuing {bead} (already in progress)"),
        ResumeStatus::AlreadyClosed => println!("{bead} is already closed; cleared the hook"),
        _ => println!("Resuming {bead}"),
    }
    if let Some(from) = &report.created_by {
        println!("  from:    {from}");
    }
    if let Some(subject) = &report.subject {
        println!("  subject: {subject}");
    }
    if let Some(context) = &report.context {
        println!("  context: {context}");
    }
}

fn print_text(report: &ResumeReport) {
    let status = match report.status {
        ResumeStatus::Fresh => "fresh",
        ResumeStatus::Pending => "pending",
        ResumeStatus::Resumed => "resumed",
        ResumeStatus::AlreadyAccepted => "already-accepted",
        ResumeStatus::AlreadyClosed => "already-closed",
    };
    println!(
        "resume  agent={}  status={status}  bead={}",
        report.agent,
        report.bead.as_deref().unwrap_or("-")
    );
}
