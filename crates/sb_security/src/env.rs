//! Environment sanitization for spawned child processes.

use std::collections::HashMap;

/// Substrings that mark an environment variable name as sensitive. Matching is
/// case-insensitive and looks at the whole variable name, not just a prefix.
const SENSITIVE_PATTERNS: &[&str] = &[
    "PASSWORD",
    "TOKEN",
    "SECRET",
    "KEY",
    "CREDENTIAL",
    "API",
    "AUTH",
    "SESSION",
    "COOKIE",
];

/// Build a copy of the current process environment with every sensitive
/// variable removed. Never mutates the real environment, so concurrent
/// callers each get an independent snapshot.
pub fn sanitized_environment() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| !is_sensitive(name))
        .collect()
}

fn is_sensitive(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_PATTERNS.iter().any(|pat| upper.contains(pat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_common_secret_names() {
        assert!(is_sensitive("AWS_SECRET_ACCESS_KEY"));
        assert!(is_sensitive("DB_PASSWORD"));
        assert!(is_sensitive("GITHUB_TOKEN"));
        assert!(is_sensitive("session_cookie"));
    }

    #[test]
    fn preserves_safe_names() {
        for name in ["PATH", "HOME", "USER", "SHELL", "LANG", "TERM"] {
            assert!(!is_sensitive(name), "{name} should be preserved");
        }
    }

    #[test]
    fn sanitized_environment_drops_sensitive_vars() {
        std::env::set_var("SB_TEST_API_KEY", "shh");
        std::env::set_var("SB_TEST_PLAIN", "ok");
        let env = sanitized_environment();
        assert!(!env.contains_key("SB_TEST_API_KEY"));
        assert_eq!(env.get("SB_TEST_PLAIN").map(String::as_str), Some("ok"));
        std::env::remove_var("SB_TEST_API_KEY");
        std::env::remove_var("SB_TEST_PLAIN");
    }
}
