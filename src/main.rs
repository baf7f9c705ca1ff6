mod beads;
mod commands;
mod config;
mod dispatch;
mod error;
mod gitignore;
mod mail;
mod telemetry;
mod wisp;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::doctor::DoctorArgs;
use commands::export::ExportArgs;
use commands::hook::HookCommand;
use commands::mail::MailCommand;
use commands::resume::ResumeArgs;
use commands::sling::{HandoffArgs, SlingArgs};

#[derive(Debug, Parser)]
#[command(
    name = "gt",
    version,
    about = "Gas Town work handoff: hooks, wisps, and agent mail"
)]
struct Cli {
    /// Town root directory (defaults to the current directory)
    #[arg(long, global = true, env = "GT_TOWN_ROOT")]
    town_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Attach a bead to an agent's hook
    Sling(SlingArgs),
    /// Put a bead on your own hook for your next session
    Handoff(HandoffArgs),
    /// Inspect and burn hooks
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },
    /// Pick up hooked work at session start
    Resume(ResumeArgs),
    /// Send and read agent mail
    Mail {
        #[command(subcommand)]
        command: MailCommand,
    },
    /// Write the durable issue log (wisps excluded)
    Export(ExportArgs),
    /// Check hooks, wisps, and the export for problems
    Doctor(DoctorArgs),
    /// Print the JSON Schema for .gastown.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Sling(_) => "sling",
            Self::Handoff(_) => "handoff",
            Self::Hook { .. } => "hook",
            Self::Resume(_) => "resume",
            Self::Mail { .. } => "mail",
            Self::Export(_) => "export",
            Self::Doctor(_) => "doctor",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let root = cli.town_root.as_deref();
    let result = match cli.command {
        Commands::Sling(args) => args.execute(root),
        Commands::Handoff(args) => args.execute(root),
        Commands::Hook { command } => command.execute(root),
        Commands::Resume(args) => args.execute(root),
        Commands::Mail { command } => command.execute(root),
        Commands::Export(args) => args.execute(root),
        Commands::Doctor(args) => args.execute(root),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
