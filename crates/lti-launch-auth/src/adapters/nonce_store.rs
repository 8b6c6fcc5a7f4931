//! # In-Memory Nonce Store
//!
//! `DashMap` keyed by nonce value, holding the `seen_at` of the live record.
//! Each key lives in one shard, so the check-then-insert for a nonce runs
//! under that shard's write lock while other nonces proceed in parallel.

use crate::domain::errors::BackendError;
use crate::ports::outbound::NonceStore;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    records: DashMap<String, i64>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nonce: &str) -> bool {
        self.records.contains_key(nonce)
    }

    /// `seen_at` of the record for `nonce`, if any.
    pub fn seen_at(&self, nonce: &str) -> Option<i64> {
        self.records.get(nonce).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn insert_if_absent(
        &self,
        nonce: &str,
        seen_at: i64,
        not_before: i64,
    ) -> Result<bool, BackendError> {
        match self.records.entry(nonce.to_string()) {
            Entry::Occupied(mut existing) => {
                if *existing.get() >= not_before {
                    return Ok(false);
                }
                // Expired record: replace it with the new sighting.
                existing.insert(seen_at);
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(seen_at);
                Ok(true)
            }
        }
    }

    async fn remove_older_than(&self, cutoff: i64) -> Result<usize, BackendError> {
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|entry| *entry.value() < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        // Re-check under the shard lock; a concurrent sighting may have
        // refreshed the record since the scan.
        let removed = expired
            .iter()
            .filter(|nonce| {
                self.records
                    .remove_if(nonce.as_str(), |_, seen_at| *seen_at < cutoff)
                    .is_some()
            })
            .count();

        Ok(removed)
    }

    async fn record_count(&self) -> Result<usize, BackendError> {
        Ok(self.records.len())
    }
}
