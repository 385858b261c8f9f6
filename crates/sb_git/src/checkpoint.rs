//! Checkpoint commits: the structured "save point" the session coordinator
//! creates at the end of a working session.

use std::path::Path;

use chrono::Local;

use crate::error::GitError;
use crate::status::{create_commit, get_git_status, stage_files};
use crate::support::is_git_repository;
use crate::worktree::get_worktree_info;

/// Result of attempting a checkpoint commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Working directory had no changes at all; nothing was committed.
    Clean,
    /// A commit was created; carries its 8-hex short hash.
    Committed(String),
    /// Only untracked files were present; the spec forbids committing them
    /// implicitly, so nothing happened.
    UntrackedOnly,
    /// Staging or committing failed; carries git's error text.
    Failed(String),
}

/// Create a checkpoint commit in `dir` tagged with `project` and
/// `quality_score` (0-100). Returns the outcome plus a list of human-readable
/// progress lines suitable for echoing back to a caller.
pub fn create_checkpoint_commit(
    dir: &Path,
    project: &str,
    quality_score: u8,
) -> Result<(CheckpointOutcome, Vec<String>), GitError> {
    let mut lines = Vec::new();

    if !is_git_repository(dir) {
        return Ok((
            CheckpointOutcome::Failed("not a git repository".to_string()),
            vec!["not a git repository - skipping commit".to_string()],
        ));
    }

    let worktree_info = get_worktree_info(dir);
    let (modified, untracked) = get_git_status(dir);

    if modified.is_empty() && untracked.is_empty() {
        lines.push("working directory is clean - no changes to commit".to_string());
        return Ok((CheckpointOutcome::Clean, lines));
    }

    if let Some(info) = &worktree_info {
        if info.is_main_worktree {
            lines.push(format!("main repository on branch '{}'", info.branch));
        } else {
            lines.push(format!(
                "worktree on branch '{}' at {}",
                info.branch,
                info.path.display()
            ));
        }
    }
    lines.push(format!(
        "found {} modified files and {} untracked files",
        modified.len(),
        untracked.len()
    ));

    if modified.is_empty() {
        lines.push("no staged changes to commit".to_string());
        return Ok((CheckpointOutcome::UntrackedOnly, lines));
    }

    if !stage_files(dir) {
        lines.push("failed to stage changes".to_string());
        return Ok((
            CheckpointOutcome::Failed("staging failed".to_string()),
            lines,
        ));
    }

    let message = checkpoint_message(project, quality_score, worktree_info.as_ref());
    let (ok, result) = create_commit(dir, &message)?;

    if ok {
        lines.push(format!("checkpoint commit created successfully ({result})"));
        Ok((CheckpointOutcome::Committed(result), lines))
    } else {
        lines.push(format!("commit failed: {result}"));
        Ok((CheckpointOutcome::Failed(result), lines))
    }
}

/// Build the checkpoint commit message:
/// `checkpoint: <project> (quality: <score>/100) - <YYYY-MM-DD HH:MM:SS>[ [worktree: <branch>]]`
fn checkpoint_message(
    project: &str,
    quality_score: u8,
    worktree_info: Option<&crate::worktree::WorktreeInfo>,
) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut message = format!("checkpoint: {project} (quality: {quality_score}/100) - {timestamp}");
    if let Some(info) = worktree_info {
        if !info.is_main_worktree {
            message.push_str(&format!(" [worktree: {}]", info.branch));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_without_worktree_suffix() {
        let msg = checkpoint_message("session-buddy", 75, None);
        assert!(msg.starts_with("checkpoint: session-buddy (quality: 75/100) - "));
        assert!(!msg.contains("worktree"));
    }

    #[test]
    fn message_includes_worktree_suffix_on_linked_worktree() {
        let info = crate::worktree::WorktreeInfo {
            path: "/tmp/wt".into(),
            branch: "feature/x".to_string(),
            is_detached: false,
            is_main_worktree: false,
        };
        let msg = checkpoint_message("session-buddy", 90, Some(&info));
        assert!(msg.contains("[worktree: feature/x]"));
    }

    #[test]
    fn message_omits_suffix_on_main_worktree() {
        let info = crate::worktree::WorktreeInfo {
            path: "/tmp/main".into(),
            branch: "main".to_string(),
            is_detached: false,
            is_main_worktree: true,
        };
        let msg = checkpoint_message("session-buddy", 90, Some(&info));
        assert!(!msg.contains("worktree:"));
    }
}
