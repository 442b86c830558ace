use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::SlotIdentity;

/// A time-boxed exclusive hold on one slot identity, protecting it between
/// "show price" and "payment confirmed". Never persisted: a crashed holder's
/// lock simply ages out.
#[derive(Debug, Clone)]
pub struct SlotHold {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The lock was free (or expired) and is now held by the caller.
    Acquired,
    /// The caller already held the lock; its TTL was extended.
    Refreshed,
    /// Another holder owns the lock. A business outcome, not a fault.
    Conflict,
}

/// Keyed TTL lock table. The only mutable shared state in the reservation
/// core; no other component touches the map directly.
///
/// Expired entries are treated as absent by every read path (lazy expiry);
/// the periodic sweeper purge is hygiene, not a correctness requirement.
#[derive(Debug, Default)]
pub struct SlotLockManager {
    locks: DashMap<SlotIdentity, SlotHold>,
}

impl SlotLockManager {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Atomic "set if absent, expired, or same holder". The entry API holds
    /// the shard write lock across the whole decision, so two racing
    /// acquires for one identity can never both succeed.
    pub fn acquire(
        &self,
        identity: &SlotIdentity,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AcquireOutcome {
        match self.locks.entry(identity.clone()) {
            Entry::Occupied(mut entry) => {
                let hold = entry.get();
                if hold.expires_at <= now {
                    entry.insert(SlotHold {
                        holder: holder.to_string(),
                        acquired_at: now,
                        expires_at: now + ttl,
                    });
                    AcquireOutcome::Acquired
                } else if hold.holder == holder {
                    entry.get_mut().expires_at = now + ttl;
                    AcquireOutcome::Refreshed
                } else {
                    AcquireOutcome::Conflict
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(SlotHold {
                    holder: holder.to_string(),
                    acquired_at: now,
                    expires_at: now + ttl,
                });
                AcquireOutcome::Acquired
            }
        }
    }

    /// Release by the current holder only. A mismatched token is reported
    /// as `false` and never evicts another holder's lock.
    pub fn release(&self, identity: &SlotIdentity, holder: &str) -> bool {
        self.locks
            .remove_if(identity, |_, hold| hold.holder == holder)
            .is_some()
    }

    /// Current holder token, if an unexpired hold exists.
    pub fn holder_of(&self, identity: &SlotIdentity, now: DateTime<Utc>) -> Option<String> {
        self.locks
            .get(identity)
            .filter(|hold| hold.expires_at > now)
            .map(|hold| hold.holder.clone())
    }

    /// Drop every expired entry. Returns how many were purged.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, hold| hold.expires_at > now);
        before - self.locks.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}
