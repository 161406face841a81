//! Short opaque block identifiers.
//!
//! Blocks carry an 8-character lowercase hex ID (32 bits of randomness,
//! the leading chunk of a v4 UUID). IDs carry no ordering and are never
//! reused; callers must treat them as opaque.

use uuid::Uuid;

/// Mints a fresh block ID.
pub fn mint() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_short_lowercase_hex() {
        let id = mint();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(mint()));
        }
    }
}
