//! User entity and username canonicalization.
//!
//! Usernames are compared case-insensitively everywhere; the casing of the
//! first registration is kept for display. `canonical_key` is the single
//! normalization rule used at every read and write boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// First-seen casing, retained for display.
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}

/// Canonical lookup key for a username: trim, then Unicode lowercase.
pub fn canonical_key(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Returns the trimmed input, or `None` when missing or blank.
pub fn non_empty(input: Option<&str>) -> Option<&str> {
    match input {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_trims_and_lowercases() {
        assert_eq!(canonical_key("  Bob "), "bob");
        assert_eq!(canonical_key("ALICE"), "alice");
        assert_eq!(canonical_key("carol"), "carol");
    }

    #[test]
    fn canonical_key_handles_unicode() {
        assert_eq!(canonical_key("JÜRGEN"), "jürgen");
    }

    #[test]
    fn non_empty_rejects_blank_input() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(Some("  bob  ")), Some("bob"));
    }

    #[test]
    fn user_keeps_first_seen_casing() {
        let user = User::new("Bob");
        assert_eq!(user.username, "Bob");
    }
}
