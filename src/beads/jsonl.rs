use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::{Issue, StoreError};

/// Read issues from a JSON Lines file. A missing file is an empty store.
pub(crate) fn read(path: &Path) -> Result<Vec<Issue>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut issues = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let issue = serde_json::from_str(line).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        issues.push(issue);
    }
    Ok(issues)
}

/// Render issues as JSON Lines, one record per line.
pub(crate) fn render<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Result<String, StoreError> {
    let mut out = String::new();
    for issue in issues {
        out.push_str(&serde_json::to_string(issue).map_err(StoreError::Encode)?);
        out.push('\n');
    }
    Ok(out)
}

/// Replace `path` with `contents` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".beads-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
