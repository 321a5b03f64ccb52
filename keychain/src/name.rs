//! The one name-validation predicate, reused by every operation that
//! takes a key name (§2: "Name validation (5%). One predicate reused
//! everywhere.").

use crate::error::{KeychainError, KeychainResult};

/// Reserved name: never creatable, renameable-to, importable, or
/// removable.
pub const RESERVED_NAME: &str = "self";

/// A name is valid when it equals its own trimmed form and contains
/// none of a path-traversal element, a path separator, or a control
/// character. Empty and whitespace-only names are rejected by the trim
/// check.
pub fn validate(raw: &str) -> KeychainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(KeychainError::InvalidName(raw.to_string()));
    }
    if trimmed != raw {
        return Err(KeychainError::InvalidName(raw.to_string()));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        return Err(KeychainError::InvalidName(raw.to_string()));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(KeychainError::InvalidName(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Rejects the reserved `self` name. Called alongside [`validate`]
/// everywhere the spec forbids `self` specifically (create, rename,
/// import, importPeer, remove).
pub fn reject_reserved(name: &str) -> KeychainResult<()> {
    if name == RESERVED_NAME {
        return Err(KeychainError::InvalidName(format!(
            "\"{RESERVED_NAME}\" is a reserved name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_name() {
        assert_eq!(validate("rsa-key").unwrap(), "rsa-key");
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(validate("").is_err());
        assert!(validate("   ").is_err());
    }

    #[test]
    fn rejects_untrimmed_name() {
        assert!(validate("  rsa-key  ").is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate("../x").is_err());
        assert!(validate("a/b").is_err());
        assert!(validate("a\\b").is_err());
    }

    #[test]
    fn reserved_name_is_rejected_by_reject_reserved_only() {
        // `self` is itself a well-formed name; validate() accepts the
        // string, reject_reserved() is what enforces the reservation.
        assert_eq!(validate("self").unwrap(), "self");
        assert!(reject_reserved("self").is_err());
        assert!(reject_reserved("rsa-key").is_ok());
    }

    proptest::proptest! {
        #[test]
        fn accepted_names_equal_their_own_trim(name in "[a-zA-Z0-9_-]{1,32}") {
            if let Ok(validated) = validate(&name) {
                prop_assert_eq!(validated.trim(), validated);
            }
        }

        #[test]
        fn traversal_like_names_are_never_accepted(suffix in "[a-zA-Z0-9_-]{0,16}") {
            let candidate = format!("../{suffix}");
            prop_assert!(validate(&candidate).is_err());
        }
    }
}
