//! Export of the durable issue log.
//!
//! The export is the only thing that gets synced. It contains every issue in
//! store order except ephemeral ones; nothing is reordered.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{Issue, IssueStore, StoreError, jsonl};

/// True if the issue belongs in the synced log.
pub const fn is_exportable(issue: &Issue) -> bool {
    !issue.ephemeral
}

/// The durable subset of `issues`, order preserved.
pub fn export(issues: &[Issue]) -> Vec<&Issue> {
    issues.iter().filter(|i| is_exportable(i)).collect()
}

/// JSON Lines text of the export. Deterministic for an unchanged store.
pub fn render(issues: &[Issue]) -> Result<String, StoreError> {
    jsonl::render(export(issues))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub exported: usize,
    pub skipped_ephemeral: usize,
}

/// Write the export of `store` to `path`, replacing it atomically.
pub fn write_export(store: &IssueStore, path: &Path) -> Result<ExportSummary, StoreError> {
    let issues = store.list();
    let contents = render(issues)?;
    jsonl::write_atomic(path, &contents)?;

    let exported = issues.iter().filter(|i| is_exportable(i)).count();
    let summary = ExportSummary {
        path: path.to_path_buf(),
        exported,
        skipped_ephemeral: issues.len() - exported,
    };
    tracing::debug!(
        path = %path.display(),
        exported = summary.exported,
        skipped = summary.skipped_ephemeral,
        "exported issues"
    );
    Ok(summary)
}
