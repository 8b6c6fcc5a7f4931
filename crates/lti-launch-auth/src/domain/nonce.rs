//! # Nonce Ledger
//!
//! Replay protection for signed launches.
//!
//! ## Rules
//!
//! - A timestamp is fresh when `|now - timestamp| <= window`. Requests outside
//!   that range are `Stale` and never touch storage.
//! - A fresh nonce is `Replayed` if the store holds a record for it with
//!   `seen_at >= now - window`; otherwise `(nonce, timestamp)` is recorded and
//!   the nonce is `Accepted`.
//! - Purge removes every record with `seen_at < now - window`.
//!
//! The check-then-insert is delegated to [`NonceStore::insert_if_absent`],
//! which must be atomic per nonce value.

use crate::domain::errors::BackendError;
use crate::ports::outbound::NonceStore;

/// Outcome of checking a nonce against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceVerdict {
    /// First sighting inside the window; the nonce is now recorded
    Accepted,
    /// Timestamp too old or too far in the future
    Stale,
    /// Nonce already recorded inside the window
    Replayed,
}

/// Whether `timestamp` lies within `window` seconds of `now`, in either direction.
pub fn is_fresh(timestamp: i64, now: i64, window: u64) -> bool {
    let skew = (i128::from(now) - i128::from(timestamp)).abs();
    skew <= i128::from(window)
}

/// Oldest `seen_at` still inside the window.
pub fn window_start(now: i64, window: u64) -> i64 {
    now.saturating_sub(i64::try_from(window).unwrap_or(i64::MAX))
}

/// Time-windowed nonce ledger over an injected store.
#[derive(Debug)]
pub struct NonceLedger<S> {
    store: S,
}

impl<S: NonceStore> NonceLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check freshness and record the nonce if it is new.
    ///
    /// # Errors
    /// Propagates store failures; a failed check never yields `Accepted`.
    pub async fn check_and_record(
        &self,
        nonce: &str,
        timestamp: i64,
        now: i64,
        window: u64,
    ) -> Result<NonceVerdict, BackendError> {
        if !is_fresh(timestamp, now, window) {
            return Ok(NonceVerdict::Stale);
        }

        let inserted = self
            .store
            .insert_if_absent(nonce, timestamp, window_start(now, window))
            .await?;

        Ok(if inserted {
            NonceVerdict::Accepted
        } else {
            NonceVerdict::Replayed
        })
    }

    /// Remove records that fell out of the window. Returns how many were removed.
    pub async fn purge(&self, now: i64, window: u64) -> Result<usize, BackendError> {
        self.store
            .remove_older_than(window_start(now, window))
            .await
    }
}
