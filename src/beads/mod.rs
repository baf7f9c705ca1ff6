//! Beads: the issue store, the ephemeral (wisp) flag, and the export filter.
//!
//! Wisps are ordinary issues with `ephemeral = true`. They live in the local
//! store next to durable issues and are dropped by the export, which is the
//! only file that gets synced.

mod export;
mod issue;
mod jsonl;
mod store;

use std::io;
use std::path::{Path, PathBuf};

pub use export::{ExportSummary, export, is_exportable, write_export};
pub use issue::{Issue, MESSAGE_TYPE, NewIssue, Status};
pub use store::IssueStore;

/// Beads directory under the town root.
pub const DEFAULT_DIR: &str = ".beads";

/// Local state file holding every issue, ephemeral ones included.
pub const LOCAL_FILE: &str = "local.jsonl";

/// The synced export.
pub const EXPORT_FILE: &str = "issues.jsonl";

/// Old separate wisp store, replaced by the ephemeral flag.
pub const LEGACY_WISP_DIR: &str = ".beads-wisp";

/// Files in the beads directory that must never be synced.
pub const LOCAL_ONLY: &[&str] = &[LOCAL_FILE, "local.lock", ".beads-*.tmp"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("issue {0} not found")]
    NotFound(String),

    #[error("{}:{line}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding issue: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("no free issue id left for prefix {0}")]
    IdExhausted(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
