//! Allow-list validation for identifiers that get interpolated into SQL
//! (collection names, insight types). These never reach the database as
//! bound parameters -- they select *which table*, which bind parameters
//! cannot express -- so we validate them against a strict character
//! allow-list before they ever touch a query string.

use crate::error::StoreError;

/// Maximum length for a collection name or insight type.
const MAX_IDENTIFIER_LEN: usize = 64;

/// True if `name` is safe to interpolate into a SQL identifier: ASCII
/// letters, digits, and underscores only, non-empty, not over-long, and
/// not purely numeric (so it can't collide with a positional placeholder).
pub fn is_safe_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return false;
    }
    if name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return false;
    }
    true
}

/// Validate `name` as a collection or insight-type identifier, returning
/// an error message suitable for [`StoreError::InvalidIdentifier`].
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::invalid_identifier(format!(
            "'{name}' is not a valid identifier: expected 1-{MAX_IDENTIFIER_LEN} \
             ASCII letters/digits/underscores, not starting with a digit"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        for n in ["conversations", "my_collection", "notes2"] {
            assert!(is_safe_identifier(n), "{n} should be valid");
        }
    }

    #[test]
    fn rejects_sql_injection_attempts() {
        for n in ["a; DROP TABLE x--", "a b", "", "a-b", "'; --"] {
            assert!(!is_safe_identifier(n), "{n} should be rejected");
        }
    }

    #[test]
    fn rejects_leading_digit_and_overlong_names() {
        assert!(!is_safe_identifier("1abc"));
        assert!(!is_safe_identifier(&"a".repeat(65)));
    }
}
