//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the authenticator needs from its host: a credential store,
//! nonce storage and a clock.

use crate::domain::entities::ConsumerLookup;
use crate::domain::errors::BackendError;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only view of the consumer credential store.
///
/// Keys are opaque and matched exactly: no trimming, no case folding.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve a consumer key.
    ///
    /// # Errors
    /// * `BackendError` - the store could not be consulted
    async fn resolve(&self, consumer_key: &str) -> Result<ConsumerLookup, BackendError>;
}

/// Storage behind the nonce ledger.
///
/// A persistent implementation would keep `(id, nonce_time, nonce_value)` rows
/// indexed on `(nonce_time, nonce_value)` so the window lookup and the purge
/// are both range scans on time.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Record `(nonce, seen_at)` unless a record for `nonce` with
    /// `seen_at >= not_before` already exists.
    ///
    /// Must be atomic per nonce value: of several concurrent calls with the
    /// same nonce, at most one may return `Ok(true)`.
    ///
    /// # Returns
    /// * `Ok(true)` - the nonce was recorded
    /// * `Ok(false)` - a live record already exists (replay)
    async fn insert_if_absent(
        &self,
        nonce: &str,
        seen_at: i64,
        not_before: i64,
    ) -> Result<bool, BackendError>;

    /// Delete every record with `seen_at < cutoff`. Returns how many were deleted.
    async fn remove_older_than(&self, cutoff: i64) -> Result<usize, BackendError>;

    /// Number of records currently held.
    async fn record_count(&self) -> Result<usize, BackendError>;
}

/// Source of the current Unix time in seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn resolve(&self, consumer_key: &str) -> Result<ConsumerLookup, BackendError> {
        (**self).resolve(consumer_key).await
    }
}

#[async_trait]
impl<T: NonceStore + ?Sized> NonceStore for Arc<T> {
    async fn insert_if_absent(
        &self,
        nonce: &str,
        seen_at: i64,
        not_before: i64,
    ) -> Result<bool, BackendError> {
        (**self).insert_if_absent(nonce, seen_at, not_before).await
    }

    async fn remove_older_than(&self, cutoff: i64) -> Result<usize, BackendError> {
        (**self).remove_older_than(cutoff).await
    }

    async fn record_count(&self) -> Result<usize, BackendError> {
        (**self).record_count().await
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> i64 {
        (**self).now()
    }
}
