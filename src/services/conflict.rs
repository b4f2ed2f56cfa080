//! Conflict rendering
//!
//! When a merge leaves conflicts in the index, each conflicted file is
//! rewritten in the working tree as a single marker block:
//!
//! ```text
//! <<<<<<< HEAD
//! ours
//! =======
//! theirs
//! >>>>>>> <their commit id>
//! ```
//!
//! The index keeps its conflict entries so status still reports the path.

use std::path::Path;

use crate::error::Result;

pub const OURS_LABEL: &str = "HEAD";

const OURS_MARKER: &str = "<<<<<<<";
const SEPARATOR: &str = "=======";
const THEIRS_MARKER: &str = ">>>>>>>";

/// Render one conflict block from both sides' content
pub fn render_conflict(ours: &[u8], theirs: &[u8], theirs_label: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(ours.len() + theirs.len() + 64);

    out.extend_from_slice(format!("{} {}\n", OURS_MARKER, OURS_LABEL).as_bytes());
    push_section(&mut out, ours);
    out.extend_from_slice(SEPARATOR.as_bytes());
    out.push(b'\n');
    push_section(&mut out, theirs);
    out.extend_from_slice(format!("{} {}\n", THEIRS_MARKER, theirs_label).as_bytes());

    out
}

fn push_section(out: &mut Vec<u8>, content: &[u8]) {
    out.extend_from_slice(content);
    if !content.is_empty() && !content.ends_with(b"\n") {
        out.push(b'\n');
    }
}

/// Rewrite every conflicted file under the working tree.
///
/// Returns the conflicted paths in index order.
pub fn write_conflicts(repo: &git2::Repository, theirs_label: &str) -> Result<Vec<String>> {
    let index = repo.index()?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| git2::Error::from_str("bare repository has no working tree"))?;

    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;

        let path = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref())
            .map(|entry| String::from_utf8_lossy(&entry.path).to_string());
        let Some(path) = path else { continue };

        let ours = blob_content(repo, conflict.our.as_ref())?;
        let theirs = blob_content(repo, conflict.their.as_ref())?;
        let body = render_conflict(&ours, &theirs, theirs_label);

        let file_path = workdir.join(Path::new(&path));
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, body)?;

        tracing::debug!("Rendered conflict markers for {}", path);
        paths.push(path);
    }

    Ok(paths)
}

fn blob_content(repo: &git2::Repository, entry: Option<&git2::IndexEntry>) -> Result<Vec<u8>> {
    match entry {
        Some(entry) => Ok(repo.find_blob(entry.id)?.content().to_vec()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_conflict_is_five_lines() {
        let body = render_conflict(b"change in master", b"change in a", "c5ddb0e");
        let text = String::from_utf8(body).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "<<<<<<< HEAD");
        assert_eq!(lines[1], "change in master");
        assert_eq!(lines[2], "=======");
        assert_eq!(lines[3], "change in a");
        assert!(lines[4].starts_with(">>>>>>> "));
    }

    #[test]
    fn test_render_conflict_keeps_existing_newlines() {
        let body = render_conflict(b"ours\n", b"theirs\n", "abc");
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> abc\n"
        );
    }

    #[test]
    fn test_render_conflict_with_deleted_side() {
        let body = render_conflict(b"kept", b"", "abc");
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "<<<<<<< HEAD\nkept\n=======\n>>>>>>> abc\n"
        );
    }
}
