//! User-supplied path validation.
//!
//! `validate_user_path` is the single choke point through which every
//! filesystem path supplied by a tool caller must pass before it is used for
//! a git operation, a checkpoint, or any other disk access.

use std::path::{Path, PathBuf};

use crate::error::PathError;

/// POSIX `PATH_MAX` on Linux; used as a conservative upper bound across
/// platforms since we never want to hand a longer path to a subprocess.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Validate a user-supplied path.
///
/// - Rejects paths containing a null byte.
/// - Rejects paths longer than [`MAX_PATH_LENGTH`].
/// - Resolves the path through symlinks (`canonicalize`).
/// - Unless `allow_traversal` is set, requires the resolved path to live
///   inside the resolved `base_dir` (current directory if `None`).
/// - Requires the resolved path to exist and be a directory.
pub fn validate_user_path(
    path: impl AsRef<Path>,
    allow_traversal: bool,
    base_dir: Option<&Path>,
) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    let raw = path.to_string_lossy();

    if raw.as_bytes().contains(&0) {
        return Err(PathError::NullByte);
    }
    if raw.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong(raw.len(), MAX_PATH_LENGTH));
    }

    let resolved = path
        .canonicalize()
        .map_err(|e| PathError::Unresolvable(path.to_path_buf(), e))?;

    if !allow_traversal {
        let base = match base_dir {
            Some(b) => b
                .canonicalize()
                .map_err(|e| PathError::Unresolvable(b.to_path_buf(), e))?,
            None => std::env::current_dir().map_err(|e| PathError::Unresolvable(PathBuf::from("."), e))?,
        };
        if !resolved.starts_with(&base) {
            return Err(PathError::Traversal(resolved, base));
        }
    }

    if !resolved.exists() {
        return Err(PathError::NotFound(resolved));
    }
    if !resolved.is_dir() {
        return Err(PathError::NotADirectory(resolved));
    }

    Ok(resolved)
}

/// Like [`validate_user_path`], but additionally forbids a `.git` path
/// segment anywhere except as the final component, preventing a caller from
/// reaching into another repository's internals via a crafted parent path
/// (e.g. `repo/.git/../../other-repo/.git/hooks`).
pub fn validate_git_path(
    path: impl AsRef<Path>,
    allow_traversal: bool,
    base_dir: Option<&Path>,
) -> Result<PathBuf, PathError> {
    let resolved = validate_user_path(path, allow_traversal, base_dir)?;

    let components: Vec<_> = resolved.components().collect();
    for (idx, component) in components.iter().enumerate() {
        if component.as_os_str() == ".git" && idx != components.len() - 1 {
            return Err(PathError::GitSegmentNotFinal(resolved));
        }
    }

    Ok(resolved)
}
