//! Worktree introspection: current worktree info and the full worktree list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::support::{is_git_repository, is_git_worktree, run_git};

/// Information about the worktree rooted at a given directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
    pub is_detached: bool,
    pub is_main_worktree: bool,
}

/// An entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: String,
    pub is_bare: bool,
    pub is_detached: bool,
    pub is_main_worktree: bool,
    pub locked: bool,
    pub prunable: bool,
}

/// Resolve branch/detached-HEAD/main-vs-linked status for `dir`.
pub fn get_worktree_info(dir: &Path) -> Option<WorktreeInfo> {
    if !is_git_repository(dir) {
        return None;
    }

    let branch_out = run_git(dir, &["branch", "--show-current"]).ok()?;
    let mut branch = branch_out.trim().to_string();
    let mut is_detached = false;

    if branch.is_empty() {
        let short_sha = run_git(dir, &["rev-parse", "--short", "HEAD"]).ok()?;
        branch = format!("HEAD ({})", short_sha.trim());
        is_detached = true;
    }

    let toplevel = run_git(dir, &["rev-parse", "--show-toplevel"]).ok()?;
    let path = PathBuf::from(toplevel.trim());

    Some(WorktreeInfo {
        path,
        branch,
        is_detached,
        is_main_worktree: !is_git_worktree(dir),
    })
}

/// Parse `git worktree list --porcelain` into structured entries.
pub fn list_worktrees(dir: &Path) -> Result<Vec<WorktreeEntry>, GitError> {
    if !is_git_repository(dir) {
        return Ok(Vec::new());
    }
    let output = run_git(dir, &["worktree", "list", "--porcelain"])?;
    Ok(parse_worktree_list(&output))
}

fn parse_worktree_list(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: HashMap<String, String> = HashMap::new();
    let mut flags: HashMap<String, bool> = HashMap::new();

    let flush = |current: &mut HashMap<String, String>,
                 flags: &mut HashMap<String, bool>,
                 entries: &mut Vec<WorktreeEntry>| {
        if current.is_empty() && flags.is_empty() {
            return;
        }
        let path = PathBuf::from(current.get("path").cloned().unwrap_or_default());
        let branch = current
            .get("branch")
            .or_else(|| current.get("head"))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let is_main_worktree = if path.as_os_str().is_empty() {
            false
        } else {
            !path.join(".git").is_file()
        };
        entries.push(WorktreeEntry {
            path,
            branch,
            is_bare: flags.get("bare").copied().unwrap_or(false),
            is_detached: flags.get("detached").copied().unwrap_or(false),
            is_main_worktree,
            locked: flags.get("locked").copied().unwrap_or(false),
            prunable: flags.get("prunable").copied().unwrap_or(false),
        });
        current.clear();
        flags.clear();
    };

    for line in output.trim().lines() {
        if line.is_empty() {
            flush(&mut current, &mut flags, &mut entries);
            continue;
        }
        if let Some(rest) = line.strip_prefix("worktree ") {
            current.insert("path".to_string(), rest.to_string());
        } else if let Some(rest) = line.strip_prefix("HEAD ") {
            current.insert("head".to_string(), rest.to_string());
        } else if let Some(rest) = line.strip_prefix("branch ") {
            current.insert("branch".to_string(), rest.to_string());
        } else if line == "bare" {
            flags.insert("bare".to_string(), true);
        } else if line == "detached" {
            flags.insert("detached".to_string(), true);
        } else if line.starts_with("locked") {
            flags.insert("locked".to_string(), true);
        } else if line == "prunable" {
            flags.insert("prunable".to_string(), true);
        }
    }
    flush(&mut current, &mut flags, &mut entries);

    entries
}
