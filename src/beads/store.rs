//! Local issue store.
//!
//! Holds every issue, durable and ephemeral, in insertion order. A file-backed
//! store keeps that full state in a local-only JSON Lines file. Several `gt`
//! processes share the file, so every mutation takes an exclusive lock on a
//! sibling `.lock` file, re-reads the current contents, applies the change, and
//! rewrites the file atomically before releasing the lock. The synced log is
//! produced separately by [`super::write_export`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use rand::Rng;

use super::{Issue, NewIssue, Status, StoreError, jsonl};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_ATTEMPTS: usize = 16;

#[derive(Debug)]
pub struct IssueStore {
    path: Option<PathBuf>,
    prefix: String,
    issues: Vec<Issue>,
}

impl IssueStore {
    /// A store that lives only in memory.
    pub fn in_memory(prefix: &str) -> Self {
        Self {
            path: None,
            prefix: prefix.to_string(),
            issues: Vec::new(),
        }
    }

    /// Open (or start) a file-backed store.
    pub fn open(path: impl Into<PathBuf>, prefix: &str) -> Result<Self, StoreError> {
        let path = path.into();
        let issues = jsonl::read(&path)?;
        tracing::debug!(path = %path.display(), count = issues.len(), "opened issue store");
        Ok(Self {
            path: Some(path),
            prefix: prefix.to_string(),
            issues,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// All issues in insertion order, as of the last open or mutation.
    pub fn list(&self) -> &[Issue] {
        &self.issues
    }

    pub fn list_ephemeral(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.ephemeral)
    }

    pub fn get(&self, id: &str) -> Result<&Issue, StoreError> {
        self.issues
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.issues.iter().any(|i| i.id == id)
    }

    /// Create an issue with a fresh id. The ephemeral flag is set before the
    /// issue is first persisted.
    pub fn create(&mut self, new: NewIssue) -> Result<Issue, StoreError> {
        let _lock = self.lock()?;
        self.reload()?;

        let id = allocate_id(&self.prefix, &self.issues)?;
        let now = Utc::now();
        let issue = Issue {
            id,
            title: new.title,
            description: new.description,
            status: Status::Open,
            issue_type: new.issue_type,
            assignee: new.assignee,
            labels: new.labels,
            created_at: now,
            updated_at: now,
            ephemeral: new.ephemeral,
        };
        self.issues.push(issue.clone());
        self.save()?;
        tracing::debug!(id = %issue.id, ephemeral = issue.ephemeral, "issue created");
        Ok(issue)
    }

    /// Apply `f` to the current state of an issue under the store lock.
    ///
    /// If `f` fails nothing is written. If it leaves the issue unchanged nothing
    /// is written either; otherwise `updated_at` is bumped and the store saved.
    pub fn try_update<T, E, F>(&mut self, id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Issue) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _lock = self.lock()?;
        self.reload()?;

        let idx = self
            .issues
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let before = self.issues[idx].clone();
        let out = match f(&mut self.issues[idx]) {
            Ok(out) => out,
            Err(e) => {
                self.issues[idx] = before;
                return Err(e);
            }
        };
        if self.issues[idx] != before {
            self.issues[idx].updated_at = Utc::now();
            self.save()?;
        }
        Ok(out)
    }

    /// Apply `f` to an issue and persist the result.
    pub fn update<F>(&mut self, id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Issue),
    {
        self.try_update(id, |issue| {
            f(issue);
            Ok(())
        })
    }

    pub fn set_ephemeral(&mut self, id: &str, ephemeral: bool) -> Result<(), StoreError> {
        self.update(id, |i| i.ephemeral = ephemeral)
    }

    pub fn is_ephemeral(&self, id: &str) -> Result<bool, StoreError> {
        self.get(id).map(Issue::is_ephemeral)
    }

    pub fn update_status(&mut self, id: &str, status: Status) -> Result<(), StoreError> {
        self.update(id, |i| i.status = status)
    }

    pub fn assign(&mut self, id: &str, assignee: Option<&str>) -> Result<(), StoreError> {
        self.update(id, |i| i.assignee = assignee.map(str::to_string))
    }

    /// Exclusive lock over the backing file, released when the handle drops.
    /// In-memory stores need none.
    fn lock(&self) -> Result<Option<File>, StoreError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let lock_file = lock_path(path);
        if let Some(dir) = lock_file.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file)
            .map_err(|e| StoreError::io(&lock_file, e))?;
        file.lock_exclusive()
            .map_err(|e| StoreError::io(&lock_file, e))?;
        Ok(Some(file))
    }

    /// Replace the in-memory snapshot with what is on disk now. Callers hold the lock.
    fn reload(&mut self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            self.issues = jsonl::read(path)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = jsonl::render(&self.issues)?;
        jsonl::write_atomic(path, &contents)
    }
}

fn allocate_id(prefix: &str, issues: &[Issue]) -> Result<String, StoreError> {
    let mut rng = rand::rng();
    for len in [4, 8] {
        for _ in 0..ID_ATTEMPTS {
            let suffix: String = (0..len)
                .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
                .collect();
            let id = format!("{prefix}-{suffix}");
            if !issues.iter().any(|i| i.id == id) {
                return Ok(id);
            }
        }
    }
    Err(StoreError::IdExhausted(prefix.to_string()))
}

/// Path of the lock file guarding a store file.
pub(crate) fn lock_path(store_path: &Path) -> PathBuf {
    store_path.with_extension("lock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_use_prefix_and_are_unique() {
        let mut store = IssueStore::in_memory("gt");
        let a = store.create(NewIssue::task("a")).unwrap();
        let b = store.create(NewIssue::task("b")).unwrap();
        assert!(a.id.starts_with("gt-"));
        assert_eq!(a.id.len(), "gt-".len() + 4);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn flag_round_trip() {
        let mut store = IssueStore::in_memory("gt");
        let issue = store.create(NewIssue::task("patrol cycle")).unwrap();
        assert!(!store.is_ephemeral(&issue.id).unwrap());

        store.set_ephemeral(&issue.id, true).unwrap();
        assert!(store.is_ephemeral(&issue.id).unwrap());
        assert_eq!(store.list_ephemeral().count(), 1);

        store.set_ephemeral(&issue.id, false).unwrap();
        assert!(!store.is_ephemeral(&issue.id).unwrap());
    }

    #[test]
    fn missing_issue_is_not_found() {
        let mut store = IssueStore::in_memory("gt");
        assert!(matches!(store.is_ephemeral("gt-nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.set_ephemeral("gt-nope", true),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut store = IssueStore::in_memory("gt");
        let ids: Vec<String> = ["one", "two", "three"]
            .into_iter()
            .map(|t| store.create(NewIssue::task(t)).unwrap().id)
            .collect();
        let listed: Vec<&str> = store.list().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn file_store_persists_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".beads/local.jsonl");

        let id = {
            let mut store = IssueStore::open(&path, "gt").unwrap();
            let issue = store
                .create(NewIssue::task("LIFECYCLE: spawn").ephemeral(true))
                .unwrap();
            store.create(NewIssue::task("real work")).unwrap();
            issue.id
        };

        let store = IssueStore::open(&path, "gt").unwrap();
        assert_eq!(store.list().len(), 2);
        assert!(store.is_ephemeral(&id).unwrap());
        assert_eq!(store.list()[1].title, "real work");
    }

    #[test]
    fn corrupt_line_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"gt-1\",\"title\":\"ok\",\"created_at\":\"2025-12-20T00:00:00Z\",\"updated_at\":\"2025-12-20T00:00:00Z\"}\n{oops\n",
        )
        .unwrap();
        match IssueStore::open(&path, "gt") {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt store, got {other:?}"),
        }
    }

    #[test]
    fn assign_and_status() {
        let mut store = IssueStore::in_memory("gt");
        let issue = store.create(NewIssue::task("work")).unwrap();
        store.assign(&issue.id, Some("nux")).unwrap();
        store.update_status(&issue.id, Status::InProgress).unwrap();
        let stored = store.get(&issue.id).unwrap();
        assert_eq!(stored.assignee.as_deref(), Some("nux"));
        assert_eq!(stored.status, Status::InProgress);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[test]
    fn failed_edit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.jsonl");
        let mut store = IssueStore::open(&path, "gt").unwrap();
        let issue = store.create(NewIssue::task("work")).unwrap();
        let before = std::fs::read(&path).unwrap();

        let res: Result<(), StoreError> = store.try_update(&issue.id, |i| {
            i.title = "changed".into();
            Err(StoreError::NotFound("refused".into()))
        });
        assert!(res.is_err());
        assert_eq!(store.get(&issue.id).unwrap().title, "work");
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn stale_handles_do_not_lose_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.jsonl");
        let mut first = IssueStore::open(&path, "gt").unwrap();
        let bead = first.create(NewIssue::task("work")).unwrap();

        // Both handles hold the same snapshot before either writes.
        let mut a = IssueStore::open(&path, "gt").unwrap();
        let mut b = IssueStore::open(&path, "gt").unwrap();
        a.update_status(&bead.id, Status::InProgress).unwrap();
        b.create(NewIssue::task("mail").ephemeral(true)).unwrap();

        let reopened = IssueStore::open(&path, "gt").unwrap();
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.get(&bead.id).unwrap().status, Status::InProgress);
        assert!(lock_path(&path).exists());
    }

    #[test]
    fn concurrent_creates_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.jsonl");
        let threads = 8;
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|n| {
                let path = path.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let mut store = IssueStore::open(&path, "gt").unwrap();
                    barrier.wait();
                    store.create(NewIssue::task(format!("issue {n}"))).unwrap().id
                })
            })
            .collect();
        let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), threads);

        let store = IssueStore::open(&path, "gt").unwrap();
        assert_eq!(store.list().len(), threads);
    }
}
