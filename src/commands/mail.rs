use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

use super::doctor::OutputFormat;
use super::{Town, resolve_format};
use crate::error::ExitError;
use crate::mail::{self, Mail};

#[derive(Debug, Subcommand)]
pub enum MailCommand {
    /// Send mail to an agent
    Send {
        /// Recipient agent
        to: String,
        /// Subject line
        #[arg(long, short)]
        subject: String,
        /// Message body
        #[arg(long, short = 'm', default_value = "")]
        body: String,
        /// Sender (defaults to town.default_agent)
        #[arg(long, env = "GT_AGENT")]
        from: Option<String>,
        /// Send as a wisp: kept locally, never exported
        #[arg(long)]
        wisp: bool,
    },
    /// List open mail for an agent
    Inbox {
        /// Agent identity
        #[arg(env = "GT_AGENT")]
        agent: String,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Mark a message as read
    Read {
        /// Message id
        id: String,
    },
}

#[derive(Debug, Serialize)]
struct InboxEntry<'a> {
    id: &'a str,
    from: Option<&'a str>,
    subject: &'a str,
    body: &'a str,
    wisp: bool,
}

impl MailCommand {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let mut issues = town.issues()?;

        match self {
            Self::Send {
                to,
                subject,
                body,
                from,
                wisp,
            } => {
                let from = town.agent_or_default(from.as_deref());
                let message = Mail::new(&from, to, subject).body(body.clone());
                let issue = mail::send_mail(&mut issues, message, *wisp).map_err(ExitError::from)?;
                let kind = if *wisp { "wisp" } else { "mail" };
                println!("Sent {kind} {} to {to}", issue.id);
                Ok(())
            }
            Self::Inbox { agent, format } => {
                let messages = mail::inbox(&issues, agent);
                match resolve_format(*format) {
                    OutputFormat::Json => {
                        let entries: Vec<InboxEntry<'_>> = messages
                            .iter()
                            .map(|m| InboxEntry {
                                id: &m.id,
                                from: mail::sender(m),
                                subject: &m.title,
                                body: &m.description,
                                wisp: m.ephemeral,
                            })
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Pretty | OutputFormat::Text => {
                        if messages.is_empty() {
                            println!("No mail for {agent}");
                        }
                        for m in &messages {
                            let marker = if m.ephemeral { " (wisp)" } else { "" };
                            println!(
                                "{}  from {}  {}{marker}",
                                m.id,
                                mail::sender(m).unwrap_or("?"),
                                m.title
                            );
                        }
                    }
                }
                Ok(())
            }
            Self::Read { id } => {
                mail::mark_read(&mut issues, id).map_err(ExitError::from)?;
                println!("Marked {id} read");
                Ok(())
            }
        }
    }
}
