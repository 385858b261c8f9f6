//! Porcelain status parsing, staging, and commit primitives.

use std::path::Path;

use crate::error::GitError;
use crate::support::{is_git_repository, run_git, run_git_lenient};

/// Parse `git status --porcelain` into `(modified, untracked)`. A leading
/// `??` marks untracked; any other non-blank two-char status code counts as
/// a modification (covers staged/unstaged add/modify/delete/rename).
pub fn get_git_status(dir: &Path) -> (Vec<String>, Vec<String>) {
    if !is_git_repository(dir) {
        return (Vec::new(), Vec::new());
    }
    let Ok(output) = run_git(dir, &["status", "--porcelain"]) else {
        return (Vec::new(), Vec::new());
    };
    parse_git_status(&output)
}

fn parse_git_status(output: &str) -> (Vec<String>, Vec<String>) {
    let mut modified = Vec::new();
    let mut untracked = Vec::new();

    for line in output.trim_end().lines() {
        if line.is_empty() || line.len() < 2 {
            continue;
        }
        let status = &line[..2];
        let path = line[2..].trim_start().to_string();
        if status == "??" {
            untracked.push(path);
        } else if status.trim().is_empty() {
            // spaces only: no change reported, skip
        } else {
            modified.push(path);
        }
    }

    (modified, untracked)
}

/// Stage all changes (`git add -A`).
pub fn stage_files(dir: &Path) -> bool {
    if !is_git_repository(dir) {
        return false;
    }
    matches!(run_git_lenient(dir, &["add", "-A"]), Ok((true, _, _)))
}

/// Names of currently staged files.
pub fn get_staged_files(dir: &Path) -> Vec<String> {
    if !is_git_repository(dir) {
        return Vec::new();
    }
    let Ok(output) = run_git(dir, &["diff", "--cached", "--name-only"]) else {
        return Vec::new();
    };
    output
        .trim()
        .lines()
        .filter(|l| !l.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Create a commit with `message`. Returns the 8-hex short hash on success,
/// or a descriptive error otherwise.
pub fn create_commit(dir: &Path, message: &str) -> Result<(bool, String), GitError> {
    if !is_git_repository(dir) {
        return Ok((false, "not a git repository".to_string()));
    }

    let (ok, _out, err) = run_git_lenient(dir, &["commit", "-m", message])?;
    if !ok {
        return Ok((false, err.trim().to_string()));
    }

    let hash = run_git(dir, &["rev-parse", "HEAD"])?;
    let short = hash.trim().chars().take(8).collect();
    Ok((true, short))
}

const GIT_IN_PROGRESS_MARKERS: &[&str] = &[
    "rebase-merge",
    "rebase-apply",
    "MERGE_HEAD",
    "BISECT_LOG",
    "CHERRY_PICK_HEAD",
    "REVERT_HEAD",
    "PATCH_APPLY",
];

/// True if a rebase, merge, bisect, cherry-pick, revert, or `git apply` is
/// currently in progress in `dir`.
pub fn is_git_operation_in_progress(dir: &Path) -> bool {
    if !is_git_repository(dir) {
        return false;
    }
    let git_dir = dir.join(".git");
    GIT_IN_PROGRESS_MARKERS
        .iter()
        .any(|marker| git_dir.join(marker).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_untracked_and_modified() {
        let output = " M src/lib.rs\n?? new_file.txt\nA  staged_new.rs\n";
        let (modified, untracked) = parse_git_status(output);
        assert_eq!(untracked, vec!["new_file.txt".to_string()]);
        assert_eq!(
            modified,
            vec!["src/lib.rs".to_string(), "staged_new.rs".to_string()]
        );
    }

    #[test]
    fn empty_status_is_clean() {
        let (modified, untracked) = parse_git_status("");
        assert!(modified.is_empty());
        assert!(untracked.is_empty());
    }
}
