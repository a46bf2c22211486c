//! Server-side token revocation
//!
//! Logout must invalidate the token before its natural expiry. Revoked
//! token ids are kept in memory until they would have expired anyway.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory set of revoked token ids with their expiry timestamps
#[derive(Debug, Default)]
pub struct RevocationStore {
    revoked: RwLock<HashMap<String, i64>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a token id until `expires_at` (unix seconds).
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        let mut revoked = self.revoked.write().expect("revocation lock poisoned");
        let now = Utc::now().timestamp();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti.to_string(), expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        let revoked = self.revoked.read().expect("revocation lock poisoned");
        match revoked.get(jti) {
            Some(exp) => *exp > Utc::now().timestamp(),
            None => false,
        }
    }
}
