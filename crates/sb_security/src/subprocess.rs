//! Allow-listed, metacharacter-free subprocess execution.

use std::collections::HashSet;
use std::process::{Child, Command, Output, Stdio};

use tracing::warn;

use crate::env::sanitized_environment;
use crate::error::CommandError;

/// Shell metacharacters that are rejected in any argument past `argv[0]`.
const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

/// Validate `argv` against an allow-list of base commands.
///
/// `argv[0]` must match an allowed command exactly -- an absolute path such
/// as `/bin/echo` is rejected even if `echo` is allowed, since allow-listing
/// is name-based, not path-based. Every subsequent argument is scanned for
/// shell metacharacters.
pub fn validate_command<'a>(
    argv: &'a [String],
    allowed: &HashSet<String>,
) -> Result<&'a [String], CommandError> {
    let Some(base) = argv.first() else {
        return Err(CommandError::EmptyArgv);
    };
    if base.is_empty() {
        return Err(CommandError::EmptyArgv);
    }
    if !allowed.contains(base) {
        return Err(CommandError::NotAllowed(base.clone()));
    }

    for arg in &argv[1..] {
        if let Some(ch) = arg.chars().find(|c| DANGEROUS_CHARS.contains(c)) {
            return Err(CommandError::ShellMetacharacter {
                arg: arg.clone(),
                ch,
            });
        }
    }

    Ok(argv)
}

/// Options shared by [`run_safe`] and [`popen_safe`].
#[derive(Debug, Default, Clone)]
pub struct SpawnOptions {
    pub current_dir: Option<std::path::PathBuf>,
}

/// Validate `argv`, inject a sanitized environment, and run the process to
/// completion, capturing stdout/stderr. Fails closed: a validation error
/// never reaches the OS process table.
pub fn run_safe(
    argv: &[String],
    allowed: &HashSet<String>,
    opts: &SpawnOptions,
) -> Result<Output, CommandError> {
    let validated = validate_command(argv, allowed)?;

    let mut cmd = Command::new(&validated[0]);
    cmd.args(&validated[1..]);
    cmd.env_clear();
    cmd.envs(sanitized_environment());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if let Some(dir) = &opts.current_dir {
        cmd.current_dir(dir);
    }

    cmd.output()
        .map_err(|e| CommandError::Spawn(validated[0].clone(), e))
}

/// Like [`run_safe`] but spawns asynchronously and discards stdout/stderr by
/// default, returning the live [`Child`] handle. Used for fire-and-forget
/// maintenance commands such as `git gc`.
pub fn popen_safe(
    argv: &[String],
    allowed: &HashSet<String>,
    opts: &SpawnOptions,
) -> Result<Child, CommandError> {
    let validated = validate_command(argv, allowed)?;

    let mut cmd = Command::new(&validated[0]);
    cmd.args(&validated[1..]);
    cmd.env_clear();
    cmd.envs(sanitized_environment());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    if let Some(dir) = &opts.current_dir {
        cmd.current_dir(dir);
    }

    let base = validated[0].clone();
    cmd.spawn().map_err(|e| {
        warn!(command = %base, error = %e, "failed to spawn background process");
        CommandError::Spawn(base.clone(), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_empty_argv() {
        let err = validate_command(&[], &allowed(&["git"])).unwrap_err();
        assert!(matches!(err, CommandError::EmptyArgv));
    }

    #[test]
    fn rejects_command_not_in_allowlist() {
        let err = validate_command(&argv(&["rm", "-rf", "/"]), &allowed(&["git"])).unwrap_err();
        assert!(matches!(err, CommandError::NotAllowed(_)));
    }

    #[test]
    fn rejects_absolute_path_even_if_basename_allowed() {
        let err =
            validate_command(&argv(&["/bin/echo", "hi"]), &allowed(&["echo"])).unwrap_err();
        assert!(matches!(err, CommandError::NotAllowed(_)));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        let err = validate_command(&argv(&["git", "status; rm -rf /"]), &allowed(&["git"]))
            .unwrap_err();
        assert!(matches!(err, CommandError::ShellMetacharacter { .. }));
    }

    #[test]
    fn accepts_clean_command() {
        let v = validate_command(&argv(&["git", "status"]), &allowed(&["git"])).unwrap();
        assert_eq!(v, &argv(&["git", "status"]));
    }

    #[test]
    fn run_safe_executes_allowed_command() {
        let out = run_safe(&argv(&["echo", "hello"]), &allowed(&["echo"]), &SpawnOptions::default())
            .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn run_safe_rejects_disallowed_command() {
        let err = run_safe(&argv(&["whoami"]), &allowed(&["echo"]), &SpawnOptions::default())
            .unwrap_err();
        assert!(matches!(err, CommandError::NotAllowed(_)));
    }
}
