use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Append any of `lines` missing from `dir/.gitignore`. Creates the file if needed.
pub fn ensure_lines(dir: &Path, lines: &[&str]) -> io::Result<()> {
    let path = dir.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let missing: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !contains_line(&existing, line))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut addition = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        addition.push('\n');
    }
    for line in missing {
        addition.push_str(line);
        addition.push('\n');
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| f.write_all(addition.as_bytes()))
}

/// True if `dir/.gitignore` lists every one of `lines`.
pub fn has_lines(dir: &Path, lines: &[&str]) -> bool {
    fs::read_to_string(dir.join(".gitignore"))
        .is_ok_and(|s| lines.iter().all(|line| contains_line(&s, line)))
}

fn contains_line(contents: &str, line: &str) -> bool {
    contents.lines().any(|l| l.trim() == line)
}
