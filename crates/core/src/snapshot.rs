//! Persisted snapshot of the identity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identity, Role};

/// What the durable identity mirror holds.
///
/// A snapshot is a cache, never a source of truth: it may lag the in-memory
/// identity and is replaced by the next successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    #[serde(flatten)]
    pub identity: Identity,

    /// Mirrors the separately persisted "is logged in" flag.
    #[serde(skip)]
    pub logged_in: bool,

    pub written_at: DateTime<Utc>,
}

impl IdentitySnapshot {
    pub fn capture(identity: &Identity, written_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity.clone(),
            logged_in: identity.is_logged_in(),
            written_at,
        }
    }

    pub fn role(&self) -> &Role {
        &self.identity.role
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.written_at)
    }

    /// Whether the snapshot is older than `max_age` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    #[test]
    fn capture_derives_logged_in_from_identifier() {
        let now = Utc::now();
        let snapshot = IdentitySnapshot::capture(&Identity::empty(), now);
        assert!(!snapshot.logged_in);

        let mut identity = Identity::empty();
        identity.id = Some(UserId::new(9));
        assert!(IdentitySnapshot::capture(&identity, now).logged_in);
    }

    #[test]
    fn staleness_is_measured_from_write_time() {
        let written_at = Utc::now() - Duration::minutes(30);
        let snapshot = IdentitySnapshot::capture(&Identity::empty(), written_at);

        assert!(snapshot.is_stale(Utc::now(), Duration::minutes(15)));
        assert!(!snapshot.is_stale(Utc::now(), Duration::hours(1)));
    }
}
