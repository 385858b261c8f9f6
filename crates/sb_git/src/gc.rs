//! Background garbage collection scheduling, gated by a strict prune-delay
//! grammar -- the sole defense against command injection through
//! `git gc --auto --prune=<delay>`.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sb_security::{popen_safe, SpawnOptions};

use crate::error::GitError;
use crate::support::{allowed_git, is_git_repository, run_git_lenient};

fn numeric_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\.(second|minute|hour|day|week|month|year)s?$").unwrap()
    })
}

/// Validate a prune-delay string against the grammar
/// `^(\d+)\.(second|minute|hour|day|week|month|year)s?$` (case-insensitive),
/// or the literals `now` / `never`. When the numeric form is used the value
/// must additionally fall in `[1, 1000]`.
pub fn validate_prune_delay(delay: &str) -> Result<(), GitError> {
    let lower = delay.to_ascii_lowercase();
    if lower == "now" || lower == "never" {
        return Ok(());
    }

    if let Some(caps) = numeric_pattern().captures(delay) {
        let value: i64 = caps[1]
            .parse()
            .map_err(|_| GitError::InvalidPruneDelay(delay.to_string(), "not a number".into()))?;
        if value < 1 {
            return Err(GitError::InvalidPruneDelay(
                delay.to_string(),
                format!("value too small: {value}. must be at least 1"),
            ));
        }
        if value > 1000 {
            return Err(GitError::InvalidPruneDelay(
                delay.to_string(),
                format!("value too large: {value}. maximum allowed is 1000"),
            ));
        }
        return Ok(());
    }

    Err(GitError::InvalidPruneDelay(
        delay.to_string(),
        "must be in the form '<number>.<unit>' (e.g. '2.weeks'), or 'now'/'never'".to_string(),
    ))
}

/// Configure `gc.auto` and spawn `git gc --auto --prune=<delay>` in the
/// background. `prune_delay` is validated before any subprocess is touched.
pub fn schedule_automatic_git_gc(
    dir: &Path,
    prune_delay: &str,
    auto_threshold: u32,
) -> Result<String, GitError> {
    if !is_git_repository(dir) {
        return Err(GitError::NotARepository(dir.to_path_buf()));
    }

    validate_prune_delay(prune_delay)?;

    let _ = run_git_lenient(dir, &["config", "gc.auto", &auto_threshold.to_string()]);

    let prune_arg = format!("--prune={prune_delay}");
    let argv = vec![
        "git".to_string(),
        "gc".to_string(),
        "--auto".to_string(),
        prune_arg,
    ];
    let opts = SpawnOptions {
        current_dir: Some(dir.to_path_buf()),
    };
    popen_safe(&argv, &allowed_git(), &opts)?;

    Ok(format!("scheduled git gc (prune delay: {prune_delay})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_forms() {
        for s in ["2.weeks", "1.day", "now", "never", "NEVER", "10.Hours"] {
            assert!(validate_prune_delay(s).is_ok(), "{s} should be valid");
        }
    }

    #[test]
    fn rejects_excessive_numeric_value() {
        let err = validate_prune_delay("10000.weeks").unwrap_err();
        assert!(matches!(err, GitError::InvalidPruneDelay(_, ref msg) if msg.contains("too large")));
    }

    #[test]
    fn rejects_injection_attempt() {
        let err = validate_prune_delay("$(reboot)").unwrap_err();
        assert!(matches!(err, GitError::InvalidPruneDelay(_, _)));
    }

    #[test]
    fn rejects_zero() {
        let err = validate_prune_delay("0.days").unwrap_err();
        assert!(matches!(err, GitError::InvalidPruneDelay(_, ref msg) if msg.contains("too small")));
    }
}
