//! Shared helpers: running `git` through the sandboxed subprocess layer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sb_security::{run_safe, SpawnOptions};

use crate::error::GitError;

pub(crate) fn allowed_git() -> HashSet<String> {
    HashSet::from(["git".to_string()])
}

/// Run `git <args>` in `dir`, returning decoded stdout on success.
pub(crate) fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let argv: Vec<String> = std::iter::once("git".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect();
    let opts = SpawnOptions {
        current_dir: Some(dir.to_path_buf()),
    };
    let output = run_safe(&argv, &allowed_git(), &opts)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::GitFailed(stderr));
    }
    String::from_utf8(output.stdout).map_err(|_| GitError::InvalidUtf8)
}

/// Run `git <args>`, returning success/stdout/stderr without failing on a
/// non-zero exit code. Used where the caller inspects the exit status.
pub(crate) fn run_git_lenient(dir: &Path, args: &[&str]) -> Result<(bool, String, String), GitError> {
    let argv: Vec<String> = std::iter::once("git".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect();
    let opts = SpawnOptions {
        current_dir: Some(dir.to_path_buf()),
    };
    let output = run_safe(&argv, &allowed_git(), &opts)?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    Ok((output.status.success(), stdout, stderr))
}

pub fn is_git_repository(dir: &Path) -> bool {
    let git_path = dir.join(".git");
    git_path.exists() && (git_path.is_dir() || git_path.is_file())
}

pub fn is_git_worktree(dir: &Path) -> bool {
    let git_path = dir.join(".git");
    git_path.is_file()
}

pub fn get_git_root(dir: &Path) -> Option<PathBuf> {
    if !is_git_repository(dir) {
        return None;
    }
    run_git(dir, &["rev-parse", "--show-toplevel"])
        .ok()
        .map(|s| PathBuf::from(s.trim()))
}
