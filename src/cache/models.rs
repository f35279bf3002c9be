use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their real expiry so a
/// request never starts with a token that lapses in flight.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// A cached access token with its absolute expiry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry for a token that lives `expires_in_secs` from `now`.
    #[must_use]
    pub fn expiring_in(token: impl Into<String>, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: now + Duration::seconds(expires_in_secs - EXPIRY_MARGIN_SECS),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
