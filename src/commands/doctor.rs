use std::path::Path;

use clap::Args;
use serde::{Deserialize, Serialize};

use super::{Town, resolve_format};
use crate::beads::{self, IssueStore, StoreError};

#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DoctorReport {
    pub town: String,
    pub beads_dir: String,
    pub hooks_dir: String,
    pub hooks: Vec<HookStatus>,
    pub wisps: usize,
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HookStatus {
    pub agent: String,
    pub bead: Option<String>,
    pub ok: bool,
}

impl DoctorArgs {
    pub fn execute(&self, town_root: Option<&Path>) -> anyhow::Result<()> {
        let town = Town::resolve(town_root)?;
        let format = resolve_format(self.format);
        let beads_dir = town.config.beads_dir(&town.root);
        let hooks = town.hooks();

        let mut report = DoctorReport {
            town: town
                .config
                .town
                .name
                .clone()
                .unwrap_or_else(|| town.root.display().to_string()),
            beads_dir: beads_dir.display().to_string(),
            hooks_dir: hooks.dir().display().to_string(),
            hooks: vec![],
            wisps: 0,
            issues: vec![],
        };

        // Leftover from the separate wisp store
        let legacy = town.root.join(beads::LEGACY_WISP_DIR);
        if legacy.exists() {
            report.issues.push(format!(
                "legacy {}/ directory found; wisps are now flagged issues and it can be removed",
                beads::LEGACY_WISP_DIR
            ));
        }

        // Hooks
        match hooks.list_pending() {
            Ok(pending) => {
                for p in pending {
                    match p.hook {
                        Ok(hook) => report.hooks.push(HookStatus {
                            agent: p.agent,
                            bead: Some(hook.bead_id().to_string()),
                            ok: true,
                        }),
                        Err(e) => {
                            report.issues.push(format!("hook for {} is unreadable: {e}", p.agent));
                            report.hooks.push(HookStatus {
                                agent: p.agent,
                                bead: None,
                                ok: false,
                            });
                        }
                    }
                }
            }
            Err(e) => report.issues.push(format!("cannot list hooks: {e}")),
        }

        match hooks.interrupted_writes() {
            Ok(tmp) if !tmp.is_empty() => report.issues.push(format!(
                "{} interrupted hook write(s) in {} (run `gt hook sweep`)",
                tmp.len(),
                hooks.dir().display()
            )),
            Ok(_) => {}
            Err(e) => report.issues.push(format!("cannot scan hook dir: {e}")),
        }

        if hooks.dir().exists() && !hooks.is_ignored() {
            report.issues.push(format!(
                "{}/.gitignore does not exclude hook files",
                hooks.dir().display()
            ));
        }

        // Issue store and export
        let local = beads_dir.join(beads::LOCAL_FILE);
        match IssueStore::open(&local, &town.config.beads.prefix) {
            Ok(store) => {
                report.wisps = store.list_ephemeral().count();
                let export_path = town.config.export_path(&town.root);
                match leaked_wisps(&store, &export_path) {
                    Ok(0) => {}
                    Ok(leaked) => report.issues.push(format!(
                        "{} wisp(s) present in {} (run `gt export`)",
                        leaked,
                        export_path.display()
                    )),
                    Err(e) => report
                        .issues
                        .push(format!("export unreadable: {e} (run `gt export`)")),
                }
            }
            Err(e) => report.issues.push(format!("issue store unreadable: {e}")),
        }

        let issue_count = report.issues.len();

        match format {
            OutputFormat::Pretty => print_pretty(&report),
            OutputFormat::Text => print_text(&report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        // Return error with issue count for proper exit code handling
        if issue_count > 0 {
            return Err(crate::error::ExitError::new(
                u8::try_from(issue_count.min(125)).unwrap_or(125),
                format!("{issue_count} issue(s) found"),
            )
            .into());
        }

        Ok(())
    }
}

/// Number of ephemeral issues that appear in the export file. A missing export
/// counts as empty; one that does not parse is an error.
fn leaked_wisps(store: &IssueStore, export_path: &Path) -> Result<usize, StoreError> {
    let exported = IssueStore::open(export_path, store.prefix())?;
    Ok(exported
        .list()
        .iter()
        .filter(|i| i.ephemeral || store.is_ephemeral(&i.id).unwrap_or(false))
        .count())
}

fn print_pretty(report: &DoctorReport) {
    println!("=== Gas Town Doctor ===\n");
    println!("Town:  {}", report.town);
    println!("Beads: {}", report.beads_dir);
    println!("Hooks: {}", report.hooks_dir);
    println!("Wisps: {} (local only)", report.wisps);
    println!();

    if report.hooks.is_empty() {
        println!("No pending hooks");
    } else {
        println!("Pending hooks:");
        for hook in &report.hooks {
            match (&hook.bead, hook.ok) {
                (Some(bead), true) => println!("  ✓ {}: {bead}", hook.agent),
                _ => println!("  ✗ {}: CORRUPT", hook.agent),
            }
        }
    }

    if report.issues.is_empty() {
        println!("\n✓ No issues found");
    } else {
        println!("\nIssues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  • {issue}");
        }
    }
}

fn print_text(report: &DoctorReport) {
    println!(
        "gt-doctor  town={}  beads={}  hooks={}  wisps={}",
        report.town, report.beads_dir, report.hooks_dir, report.wisps
    );
    for hook in &report.hooks {
        let status = if hook.ok { "ok" } else { "corrupt" };
        println!(
            "hook  {}  {}  {status}",
            hook.agent,
            hook.bead.as_deref().unwrap_or("-")
        );
    }
    if !report.issues.is_empty() {
        println!("issues  count={}", report.issues.len());
        for issue in &report.issues {
            println!("issue  {issue}");
        }
    }
}
