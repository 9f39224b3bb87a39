//! Session and group identifiers.
//!
//! Group identifiers are content-derived so repeated runs on identical
//! input produce identical ids, which keeps group ordering deterministic
//! across sessions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::GroupMember;

/// Session ID for tracking one in-flight analysis.
///
/// Format: `lsa-YYYYMMDD-HHMMSS-<8 hex chars>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new session ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        SessionId(format!(
            "lsa-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the deterministic identifier for a group from its members.
///
/// Members are sorted by `field:value` key before hashing, so member
/// insertion order does not affect the id.
pub fn group_id(members: &[GroupMember]) -> String {
    let mut keys: Vec<String> = members.iter().map(|m| m.key()).collect();
    keys.sort();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
