//! Per-agent hook slots on local disk.
//!
//! A slot is either empty (no file) or pending (a complete hook file). Create
//! writes a temp file in the same directory and links or renames it into place,
//! burn unlinks it, so readers never see a partial file. Reading never mutates.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::types::{self, Hook, HookType};
use crate::gitignore;

const TEMP_PREFIX: &str = ".hook-";
const TEMP_SUFFIX: &str = ".tmp";

/// Lines that keep hook slots and interrupted writes out of the synced snapshot.
const IGNORE_LINES: &[&str] = &["hook-*.json", ".hook-*.tmp"];

/// What `create` does when the slot already holds a pending hook.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail with [`HookError::Conflict`] and leave the pending hook untouched.
    #[default]
    Reject,
    /// Replace the pending hook, logging the superseded bead.
    Overwrite,
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("invalid agent identity {0:?}")]
    InvalidAgent(String),

    #[error("invalid hook payload: {0}")]
    InvalidPayload(String),

    #[error("{agent} already has pending work on its hook{}", .existing.as_ref().map(|b| format!(" ({b})")).unwrap_or_default())]
    Conflict {
        agent: String,
        existing: Option<String>,
        path: PathBuf,
    },

    #[error("corrupted hook file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("hook file {} has unknown type {tag:?}", .path.display())]
    UnknownType { path: PathBuf, tag: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding hook: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HookError {
    /// True for errors that mean the slot content cannot be trusted.
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::UnknownType { .. })
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A pending slot found by [`HookStore::list_pending`].
#[derive(Debug)]
pub struct PendingHook {
    pub agent: String,
    pub path: PathBuf,
    pub hook: Result<Hook, HookError>,
}

/// Hook slots for every agent, rooted at one local-only directory.
#[derive(Debug, Clone)]
pub struct HookStore {
    dir: PathBuf,
    policy: ConflictPolicy,
}

impl HookStore {
    pub fn new(dir: impl Into<PathBuf>, policy: ConflictPolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Same directory, different conflict policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Path of an agent's slot.
    pub fn slot_path(&self, agent: &str) -> Result<PathBuf, HookError> {
        if agent.trim().is_empty() {
            return Err(HookError::InvalidAgent(agent.to_string()));
        }
        Ok(self.dir.join(types::hook_filename(agent)))
    }

    /// Create the hook directory and make sure its `.gitignore` excludes hook files.
    pub fn ensure_dir(&self) -> Result<(), HookError> {
        fs::create_dir_all(&self.dir).map_err(HookError::io(&self.dir))?;
        gitignore::ensure_lines(&self.dir, IGNORE_LINES)
            .map_err(HookError::io(&self.dir.join(".gitignore")))
    }

    /// True if `.gitignore` in the hook directory excludes hook files.
    pub fn is_ignored(&self) -> bool {
        gitignore::has_lines(&self.dir, IGNORE_LINES)
    }

    /// Write a hook to an agent's slot, honoring the conflict policy.
    pub fn create(&self, agent: &str, hook: &Hook) -> Result<(), HookError> {
        hook.validate().map_err(HookError::InvalidPayload)?;
        let path = self.slot_path(agent)?;
        self.ensure_dir()?;

        let json = hook.to_json().map_err(HookError::Encode)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(HookError::io(&self.dir))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(HookError::io(tmp.path()))?;

        match self.policy {
            ConflictPolicy::Reject => {
                if let Err(e) = tmp.persist_noclobber(&path) {
                    if e.error.kind() == io::ErrorKind::AlreadyExists {
                        let existing = self
                            .read(agent)
                            .ok()
                            .flatten()
                            .map(|h| h.bead_id().to_string());
                        return Err(HookError::Conflict {
                            agent: agent.to_string(),
                            existing,
                            path,
                        });
                    }
                    return Err(HookError::io(&path)(e.error));
                }
            }
            ConflictPolicy::Overwrite => {
                match self.read(agent) {
                    Ok(Some(previous)) => tracing::warn!(
                        agent,
                        superseded = previous.bead_id(),
                        bead = hook.bead_id(),
                        "overwriting pending hook; prior work superseded"
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(agent, error = %e, "overwriting unreadable hook"),
                }
                tmp.persist(&path)
                    .map_err(|e| HookError::io(&path)(e.error))?;
            }
        }

        tracing::debug!(
            agent,
            kind = %hook.kind(),
            bead = hook.bead_id(),
            path = %path.display(),
            "hook created"
        );
        Ok(())
    }

    /// Read an agent's pending hook. A missing slot is `Ok(None)`; a slot that
    /// cannot be decoded is an error, never `None`.
    pub fn read(&self, agent: &str) -> Result<Option<Hook>, HookError> {
        let path = self.slot_path(agent)?;
        match fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HookError::io(&path)(e)),
        }
    }

    /// Remove an agent's slot. Burning an empty slot is a no-op.
    pub fn burn(&self, agent: &str) -> Result<(), HookError> {
        let path = self.slot_path(agent)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(agent, path = %path.display(), "hook burned");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HookError::io(&path)(e)),
        }
    }

    /// Session-start lookup. Never burns: the caller burns only after the work
    /// is accepted into its own state.
    pub fn restore_on_start(&self, agent: &str) -> Result<Option<Hook>, HookError> {
        match self.read(agent) {
            Ok(Some(hook)) => {
                tracing::info!(
                    agent,
                    bead = hook.bead_id(),
                    created_by = %hook.header().created_by,
                    "restoring hooked work"
                );
                Ok(Some(hook))
            }
            Ok(None) => {
                tracing::debug!(agent, "no hooked work");
                Ok(None)
            }
            Err(e) => {
                if e.is_corruption() {
                    tracing::error!(agent, error = %e, "hook is corrupted; resume halted");
                }
                Err(e)
            }
        }
    }

    /// Every slot currently on disk, sorted by agent. Unreadable slots are
    /// reported with their error rather than skipped.
    pub fn list_pending(&self) -> Result<Vec<PendingHook>, HookError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HookError::io(&self.dir)(e)),
        };

        let mut pending = Vec::new();
        for entry in entries {
            let entry = entry.map_err(HookError::io(&self.dir))?;
            let name = entry.file_name();
            let Some(agent) = name.to_str().and_then(types::agent_from_filename) else {
                continue;
            };
            let path = entry.path();
            let hook = match fs::read(&path) {
                Ok(bytes) => decode(&path, &bytes),
                // Burned between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(HookError::io(&path)(e)),
            };
            pending.push(PendingHook { agent, path, hook });
        }
        pending.sort_by(|a, b| a.agent.cmp(&b.agent));
        Ok(pending)
    }

    /// Temp files left behind by a create that never completed.
    pub fn interrupted_writes(&self) -> Result<Vec<PathBuf>, HookError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HookError::io(&self.dir)(e)),
        };
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(HookError::io(&self.dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }

    /// Remove interrupted temp files older than `min_age`. Younger ones may
    /// belong to a create still in flight. Returns the removed paths.
    pub fn sweep_interrupted_writes(&self, min_age: Duration) -> Result<Vec<PathBuf>, HookError> {
        let now = SystemTime::now();
        let mut removed = Vec::new();
        for path in self.interrupted_writes()? {
            let age = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < min_age {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::warn!(path = %path.display(), "removed interrupted hook write");
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(HookError::io(&path)(e)),
            }
        }
        Ok(removed)
    }
}

/// Decode a hook file: header tag first, then the typed payload.
fn decode(path: &Path, bytes: &[u8]) -> Result<Hook, HookError> {
    #[derive(Deserialize)]
    struct Tag {
        #[serde(rename = "type")]
        kind: String,
    }

    let corrupt = |reason: String| HookError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let tag: Tag =
        serde_json::from_slice(bytes).map_err(|e| corrupt(format!("invalid header: {e}")))?;
    let kind = HookType::parse(&tag.kind).ok_or_else(|| HookError::UnknownType {
        path: path.to_path_buf(),
        tag: tag.kind.clone(),
    })?;

    let hook = match kind {
        HookType::SlungWork => Hook::SlungWork(
            serde_json::from_slice(bytes)
                .map_err(|e| corrupt(format!("invalid {kind} payload: {e}")))?,
        ),
    };
    hook.validate().map_err(corrupt)?;
    Ok(hook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wisp::SlungWork;

    fn store(dir: &Path) -> HookStore {
        HookStore::new(dir.join(".beads"), ConflictPolicy::Reject)
    }

    fn work(bead: &str) -> Hook {
        SlungWork::new(bead, "deacon").with_context("ctx").into()
    }

    #[test]
    fn read_before_create_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        assert!(hooks.read("nux").unwrap().is_none());
        assert!(hooks.restore_on_start("nux").unwrap().is_none());
    }

    #[test]
    fn create_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        let hook = work("gt-abc");
        hooks.create("nux", &hook).unwrap();
        assert_eq!(hooks.read("nux").unwrap(), Some(hook));
        assert!(hooks.slot_path("nux").unwrap().ends_with(".beads/hook-nux.json"));
    }

    #[test]
    fn burn_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.create("nux", &work("gt-abc")).unwrap();
        hooks.burn("nux").unwrap();
        hooks.burn("nux").unwrap();
        assert!(hooks.read("nux").unwrap().is_none());
    }

    #[test]
    fn burn_without_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.burn("nux").unwrap();
    }

    #[test]
    fn reading_does_not_consume() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        let hook = work("gt-abc");
        hooks.create("nux", &hook).unwrap();
        for _ in 0..5 {
            assert_eq!(hooks.restore_on_start("nux").unwrap().as_ref(), Some(&hook));
        }
        hooks.burn("nux").unwrap();
        assert!(hooks.restore_on_start("nux").unwrap().is_none());
    }

    #[test]
    fn reject_policy_keeps_first_hook() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        let first = work("gt-one");
        hooks.create("nux", &first).unwrap();

        let err = hooks.create("nux", &work("gt-two")).unwrap_err();
        match &err {
            HookError::Conflict { agent, existing, .. } => {
                assert_eq!(agent, "nux");
                assert_eq!(existing.as_deref(), Some("gt-one"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(err.to_string().contains("already has pending work"));
        assert_eq!(hooks.read("nux").unwrap(), Some(first));
        assert!(hooks.interrupted_writes().unwrap().is_empty());
    }

    #[test]
    fn overwrite_policy_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path()).with_policy(ConflictPolicy::Overwrite);
        hooks.create("nux", &work("gt-one")).unwrap();
        let second = work("gt-two");
        hooks.create("nux", &second).unwrap();
        assert_eq!(hooks.read("nux").unwrap(), Some(second));
    }

    #[test]
    fn malformed_bytes_are_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.ensure_dir().unwrap();
        fs::write(hooks.slot_path("nux").unwrap(), b"{\"type\": \"slung-wo").unwrap();

        let err = hooks.read("nux").unwrap_err();
        assert!(err.is_corruption(), "{err:?}");
        assert!(hooks.restore_on_start("nux").is_err());
    }

    #[test]
    fn empty_file_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.ensure_dir().unwrap();
        fs::write(hooks.slot_path("nux").unwrap(), b"").unwrap();
        assert!(matches!(hooks.read("nux"), Err(HookError::Corrupt { .. })));
    }

    #[test]
    fn unknown_type_tag_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.ensure_dir().unwrap();
        fs::write(
            hooks.slot_path("nux").unwrap(),
            r#"{"type":"patrol-trace","created_at":"2025-12-21T10:00:00Z","created_by":"deacon"}"#,
        )
        .unwrap();
        match hooks.read("nux") {
            Err(HookError::UnknownType { tag, .. }) => assert_eq!(tag, "patrol-trace"),
            other => panic!("expected unknown type, got {other:?}"),
        }
    }

    #[test]
    fn missing_bead_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.ensure_dir().unwrap();
        fs::write(
            hooks.slot_path("nux").unwrap(),
            r#"{"type":"slung-work","created_at":"2025-12-21T10:00:00Z","created_by":"deacon","bead_id":""}"#,
        )
        .unwrap();
        assert!(matches!(hooks.read("nux"), Err(HookError::Corrupt { .. })));
    }

    #[test]
    fn create_rejects_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        assert!(matches!(
            hooks.create("", &work("gt-abc")),
            Err(HookError::InvalidAgent(_))
        ));
        assert!(matches!(
            hooks.create("nux", &work("")),
            Err(HookError::InvalidPayload(_))
        ));
        assert!(hooks.list_pending().unwrap().is_empty());
    }

    #[test]
    fn slots_are_partitioned_by_agent() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.create("crew/joe", &work("gt-joe")).unwrap();
        hooks.create("crew", &work("gt-crew")).unwrap();
        hooks.burn("crew").unwrap();
        assert_eq!(hooks.read("crew/joe").unwrap().unwrap().bead_id(), "gt-joe");
        assert!(hooks.read("crew").unwrap().is_none());
    }

    #[test]
    fn list_pending_reports_corrupt_slots() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.create("polecat/nux", &work("gt-abc")).unwrap();
        fs::write(hooks.slot_path("deacon").unwrap(), "not json").unwrap();
        fs::write(hooks.dir().join("issues.jsonl"), "").unwrap();

        let pending = hooks.list_pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].agent, "deacon");
        assert!(pending[0].hook.is_err());
        assert_eq!(pending[1].agent, "polecat/nux");
        assert_eq!(pending[1].hook.as_ref().unwrap().bead_id(), "gt-abc");
    }

    #[test]
    fn ensure_dir_writes_gitignore_once() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        fs::create_dir_all(hooks.dir()).unwrap();
        fs::write(hooks.dir().join(".gitignore"), "local.jsonl").unwrap();
        assert!(!hooks.is_ignored());

        hooks.ensure_dir().unwrap();
        hooks.ensure_dir().unwrap();
        let ignore = fs::read_to_string(hooks.dir().join(".gitignore")).unwrap();
        assert_eq!(ignore, "local.jsonl\nhook-*.json\n.hook-*.tmp\n");
        assert!(hooks.is_ignored());
    }

    #[test]
    fn sweep_removes_only_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.create("nux", &work("gt-abc")).unwrap();
        let stale = hooks.dir().join(".hook-abc123.tmp");
        fs::write(&stale, "{\"type\":").unwrap();

        assert_eq!(hooks.interrupted_writes().unwrap(), vec![stale.clone()]);
        assert!(hooks.sweep_interrupted_writes(Duration::from_secs(3600)).unwrap().is_empty());
        assert_eq!(hooks.sweep_interrupted_writes(Duration::ZERO).unwrap(), vec![stale.clone()]);
        assert!(!stale.exists());
        assert!(hooks.read("nux").unwrap().is_some());
    }

    #[test]
    fn racing_creates_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path());
        hooks.ensure_dir().unwrap();
        let threads = 8;
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|n| {
                let hooks = hooks.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    hooks.create("nux", &work(&format!("gt-{n}")))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, HookError::Conflict { .. }))
        );
        assert!(hooks.interrupted_writes().unwrap().is_empty());
        assert!(hooks.read("nux").unwrap().is_some());
    }

    #[test]
    fn readers_never_see_partial_writes() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = store(dir.path()).with_policy(ConflictPolicy::Overwrite);
        hooks.create("nux", &work("gt-0")).unwrap();

        let writer = {
            let hooks = hooks.clone();
            std::thread::spawn(move || {
                for n in 1..100 {
                    let long_context = "x".repeat(n * 64);
                    let hook: Hook = SlungWork::new(&format!("gt-{n}"), "deacon")
                        .with_context(long_context)
                        .into();
                    hooks.create("nux", &hook).unwrap();
                }
            })
        };
        for _ in 0..500 {
            let hook = hooks.read("nux").unwrap();
            assert!(hook.is_some());
        }
        writer.join().unwrap();
        assert_eq!(hooks.read("nux").unwrap().unwrap().bead_id(), "gt-99");
        assert!(hooks.interrupted_writes().unwrap().is_empty());
    }
}
