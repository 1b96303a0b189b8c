//! Identifier helpers.
//!
//! Alarms, things and groups are all addressed by UUIDs. Scoped queries
//! validate their identifiers here before touching storage.

use uuid::Uuid;

use crate::error::{ParseError, ParseResult};

/// Parse and validate a UUID identifier.
///
/// Accepts the hyphenated, simple, braced and URN forms.
///
/// # Errors
///
/// Returns [`ParseError::InvalidId`] if `id` is not a valid UUID.
///
/// # Example
///
/// ```
/// use alarms_types::ids::parse_id;
///
/// assert!(parse_id("6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11").is_ok());
/// assert!(parse_id("not-a-uuid").is_err());
/// ```
pub fn parse_id(id: &str) -> ParseResult<Uuid> {
    Uuid::try_parse(id).map_err(|e| ParseError::InvalidId(format!("{id:?}: {e}")))
}

/// Parse `id` and render it in canonical form: lowercase and hyphenated.
///
/// Every accepted input form of the same UUID yields the same string, so
/// canonical ids can be compared as text.
///
/// # Example
///
/// ```
/// use alarms_types::ids::canonical_id;
///
/// let id = canonical_id("{6F0B7A2E8C394C47B4D25D0D3B1F7C11}").unwrap();
/// assert_eq!(id, "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11");
/// ```
pub fn canonical_id(id: &str) -> ParseResult<String> {
    parse_id(id).map(|uuid| uuid.hyphenated().to_string())
}

/// Generate a new random (v4) identifier in hyphenated form.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_id_hyphenated() {
        let id = parse_id("6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11").unwrap();
        assert_eq!(id.to_string(), "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11");
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(err.to_string().starts_with("Invalid id:"));
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_parse_id_rejects_empty() {
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_parse_id_rejects_truncated() {
        assert!(parse_id("6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c1").is_err());
    }

    #[test]
    fn test_canonical_id_unifies_forms() {
        const CANONICAL: &str = "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11";
        for form in [
            CANONICAL,
            "6F0B7A2E-8C39-4C47-B4D2-5D0D3B1F7C11",
            "6f0b7a2e8c394c47b4d25d0d3b1f7c11",
            "{6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11}",
            "urn:uuid:6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11",
        ] {
            assert_eq!(canonical_id(form).unwrap(), CANONICAL, "form {form}");
        }
        assert!(canonical_id("6f0b7a2e").is_err());
    }

    #[test]
    fn test_new_id_is_hyphenated_v4() {
        let id = new_id();
        assert_eq!(id.len(), 36);
        let parsed = parse_id(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_new_id_unique() {
        assert_ne!(new_id(), new_id());
    }

    proptest! {
        /// Validating arbitrary strings should never panic.
        #[test]
        fn parse_id_never_panics(s in ".*") {
            let _ = parse_id(&s);
        }

        /// Any UUID rendered in hyphenated form validates back to itself.
        #[test]
        fn parse_id_accepts_rendered_uuids(bytes in any::<[u8; 16]>()) {
            let uuid = Uuid::from_bytes(bytes);
            prop_assert_eq!(parse_id(&uuid.to_string()).unwrap(), uuid);
        }

        /// Canonicalizing is idempotent and ignores case.
        #[test]
        fn canonical_id_is_stable(bytes in any::<[u8; 16]>()) {
            let upper = Uuid::from_bytes(bytes).simple().to_string().to_uppercase();
            let canonical = canonical_id(&upper).unwrap();
            prop_assert_eq!(canonical_id(&canonical).unwrap(), canonical.clone());
            prop_assert_eq!(canonical.len(), 36);
        }
    }
}
