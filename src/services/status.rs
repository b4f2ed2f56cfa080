//! Status reporter
//!
//! Classifies every path the engine reports into the six status categories.
//! Nothing is cached: each call walks the index and working tree afresh.

use git2::Status;

use crate::error::Result;
use crate::models::{PathEntry, StatusReport};

/// Compute the status report for a repository
pub fn compute_status(repo: &git2::Repository) -> Result<StatusReport> {
    let mut opts = git2::StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .include_unmodified(false)
        .renames_head_to_index(false)
        .renames_index_to_workdir(false);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut report = StatusReport::default();

    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            tracing::warn!("Skipping status entry with non UTF-8 path");
            continue;
        };
        let status = entry.status();

        // A conflicted path is staged against HEAD, absent from stage 0 and
        // different on disk all at once.
        if status.is_conflicted() {
            let conflicted = PathEntry::new(path, None);
            report.added.push(conflicted.clone());
            report.changed.push(conflicted.clone());
            report.missing.push(conflicted.clone());
            report.modified.push(conflicted);
            continue;
        }

        let staged = entry.head_to_index();
        let unstaged = entry.index_to_workdir();
        let staged_id = staged.as_ref().map(|d| d.new_file().id());
        let index_id = unstaged.as_ref().map(|d| d.old_file().id());

        if status.intersects(Status::INDEX_NEW) {
            report.added.push(PathEntry::new(path, staged_id));
        } else if status.intersects(
            Status::INDEX_MODIFIED | Status::INDEX_TYPECHANGE | Status::INDEX_RENAMED,
        ) {
            report.changed.push(PathEntry::new(path, staged_id));
        } else if status.intersects(Status::INDEX_DELETED) {
            report
                .removed
                .push(PathEntry::new(path, staged.as_ref().map(|d| d.old_file().id())));
        }

        if status.intersects(Status::WT_NEW) {
            report.untracked.push(PathEntry::new(path, None));
        } else if status.intersects(Status::WT_DELETED) {
            report.missing.push(PathEntry::new(path, index_id));
        } else if status
            .intersects(Status::WT_MODIFIED | Status::WT_TYPECHANGE | Status::WT_RENAMED)
        {
            report.modified.push(PathEntry::new(path, index_id));
        }
    }

    report.sort();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestRepo;

    fn paths(entries: &[PathEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_clean_repository_has_empty_categories() {
        let repo = TestRepo::with_initial_commit();
        let report = compute_status(&repo.repo()).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_untracked_and_modified() {
        let repo = TestRepo::with_initial_commit();
        repo.create_file("new.txt", "new");
        repo.create_file("README.md", "changed");

        let report = compute_status(&repo.repo()).unwrap();
        assert_eq!(paths(&report.untracked), vec!["new.txt"]);
        assert_eq!(paths(&report.modified), vec!["README.md"]);
        assert!(report.added.is_empty());
        assert!(report.changed.is_empty());
    }

    #[test]
    fn test_staged_new_file_is_added() {
        let repo = TestRepo::with_initial_commit();
        repo.create_file("new.txt", "new");
        repo.stage_file("new.txt");

        let report = compute_status(&repo.repo()).unwrap();
        assert_eq!(paths(&report.added), vec!["new.txt"]);
        assert!(report.added[0].object_id.is_some());
        assert!(report.untracked.is_empty());
    }

    #[test]
    fn test_changed_and_modified_are_independent() {
        let repo = TestRepo::with_initial_commit();
        repo.create_file("README.md", "staged");
        repo.stage_file("README.md");
        repo.create_file("README.md", "staged then edited");

        let report = compute_status(&repo.repo()).unwrap();
        assert_eq!(paths(&report.changed), vec!["README.md"]);
        assert_eq!(paths(&report.modified), vec!["README.md"]);
    }

    #[test]
    fn test_missing_and_removed() {
        let repo = TestRepo::with_initial_commit();
        repo.create_commit("more", &[("gone.txt", "x"), ("dropped.txt", "y")]);

        std::fs::remove_file(repo.path.join("gone.txt")).unwrap();

        let git_repo = repo.repo();
        let mut index = git_repo.index().unwrap();
        index.remove_path(std::path::Path::new("dropped.txt")).unwrap();
        index.write().unwrap();
        std::fs::remove_file(repo.path.join("dropped.txt")).unwrap();

        let report = compute_status(&git_repo).unwrap();
        assert_eq!(paths(&report.missing), vec!["gone.txt"]);
        assert_eq!(paths(&report.removed), vec!["dropped.txt"]);
        assert!(report.untracked.is_empty());
    }

    #[test]
    fn test_status_is_sorted_and_repeatable() {
        let repo = TestRepo::with_initial_commit();
        repo.create_file("b.txt", "b");
        repo.create_file("a.txt", "a");
        repo.create_file("dir/c.txt", "c");

        let first = compute_status(&repo.repo()).unwrap();
        let second = compute_status(&repo.repo()).unwrap();

        assert_eq!(paths(&first.untracked), vec!["a.txt", "b.txt", "dir/c.txt"]);
        assert_eq!(first, second);
    }
}
