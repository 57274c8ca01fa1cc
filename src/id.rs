//! Prefixed ID generation for Newsroom entities.
//!
//! All IDs use an `nr_` brand prefix so identifiers from other systems
//! (client-generated device ids, content CMS ids) can never be mistaken
//! for ours.
//!
//! Format: `nr_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &["nr_usr_", "nr_gst_", "nr_dev_", "nr_ce_"];

/// Validate that a string is a valid Newsroom prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `nr_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];

    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Newsroom's auth/sync core.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Principal,
    /// Ephemeral guest subject - never backed by a principals row.
    Guest,
    DeviceSession,
    CacheEntry,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Principal => "nr_usr",
            Self::Guest => "nr_gst",
            Self::DeviceSession => "nr_dev",
            Self::CacheEntry => "nr_ce",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = EntityType::Principal.gen_id();
        assert!(id.starts_with("nr_usr_"));
        // nr_usr_ (7 chars) + 32 hex chars = 39 chars total
        assert_eq!(id.len(), 39);
    }

    #[test]
    fn test_ids_are_unique() {
        let id1 = EntityType::Guest.gen_id();
        let id2 = EntityType::Guest.gen_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_is_valid_prefixed_id() {
        assert!(is_valid_prefixed_id("nr_usr_a1b2c3d4e5f6789012345678901234ab"));
        assert!(is_valid_prefixed_id("nr_gst_00000000000000000000000000000000"));
        assert!(is_valid_prefixed_id(&EntityType::Principal.gen_id()));
        assert!(is_valid_prefixed_id(&EntityType::CacheEntry.gen_id()));

        assert!(!is_valid_prefixed_id(""));
        assert!(!is_valid_prefixed_id("a1b2c3d4-e5f6-7890-1234-567890123456")); // plain UUID
        assert!(!is_valid_prefixed_id("nr_unknown_a1b2c3d4e5f6789012345678901234ab"));
        assert!(!is_valid_prefixed_id("nr_usr_a1b2c3d4")); // too short
        assert!(!is_valid_prefixed_id("nr_usr_a1b2c3d4e5f6789012345678901234gg")); // non-hex
        assert!(!is_valid_prefixed_id("usr_a1b2c3d4e5f6789012345678901234ab")); // missing nr_
    }
}
