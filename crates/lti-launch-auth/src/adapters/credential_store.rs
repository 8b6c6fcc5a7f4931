//! # In-Memory Credential Store
//!
//! Consumer records indexed by id and by key. Implements the read-only
//! [`CredentialStore`] port plus the administrative operations used by
//! operators: registration, credential generation, repair and revocation.

use crate::domain::credentials::{generate_unique_token, is_well_formed_token, CredentialError};
use crate::domain::entities::{ConsumerCredential, ConsumerIdentity, ConsumerLookup};
use crate::domain::errors::BackendError;
use crate::ports::outbound::CredentialStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// A stored consumer.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConsumerRecord {
    pub id: u64,
    pub name: String,
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub revoked: bool,
}

impl ConsumerRecord {
    pub fn identity(&self) -> ConsumerIdentity {
        ConsumerIdentity {
            id: self.id,
            name: self.name.clone(),
            key: self.key.clone(),
        }
    }
}

impl fmt::Debug for ConsumerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("revoked", &self.revoked)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Inner {
    consumers: HashMap<u64, ConsumerRecord>,
    by_key: HashMap<String, u64>,
    next_id: u64,
}

impl Inner {
    fn key_taken(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    fn secret_taken(&self, secret: &str) -> bool {
        self.consumers.values().any(|c| c.secret == secret)
    }

    fn fresh_pair(&self) -> Result<(String, String), CredentialError> {
        let key = generate_unique_token(|candidate| self.key_taken(candidate))?;
        let secret = generate_unique_token(|candidate| self.secret_taken(candidate))?;
        Ok((key, secret))
    }
}

/// Credential store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records.
    ///
    /// # Errors
    /// * `DuplicateId` - two records share an id
    /// * `DuplicateKey` - two records share a consumer key
    pub fn from_records(
        records: impl IntoIterator<Item = ConsumerRecord>,
    ) -> Result<Self, CredentialError> {
        let mut inner = Inner::default();
        for record in records {
            if inner.consumers.contains_key(&record.id) {
                return Err(CredentialError::DuplicateId(record.id));
            }
            if inner.key_taken(&record.key) {
                return Err(CredentialError::DuplicateKey(record.id));
            }
            inner.next_id = inner.next_id.max(record.id.saturating_add(1));
            inner.by_key.insert(record.key.clone(), record.id);
            inner.consumers.insert(record.id, record);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Generate a key/secret pair unused by any stored consumer.
    ///
    /// The key and secret are drawn independently; each is regenerated if it
    /// collides with an existing key (resp. secret). The pair is not reserved:
    /// a later `register` may draw the same values. Use `register` to create a
    /// consumer atomically.
    pub fn generate_credential(&self) -> Result<(String, String), CredentialError> {
        self.inner.read().fresh_pair()
    }

    /// Create a consumer with freshly generated credentials.
    pub fn register(&self, name: impl Into<String>) -> Result<ConsumerRecord, CredentialError> {
        let mut inner = self.inner.write();
        let (key, secret) = inner.fresh_pair()?;

        let id = inner.next_id.max(1);
        inner.next_id = id + 1;

        let record = ConsumerRecord {
            id,
            name: name.into(),
            key,
            secret,
            revoked: false,
        };
        inner.by_key.insert(record.key.clone(), id);
        inner.consumers.insert(id, record.clone());

        info!(consumer_id = id, "Registered LTI consumer");
        Ok(record)
    }

    /// Regenerate whichever of key and secret is not well formed.
    ///
    /// Values that already pass the shape check are left untouched.
    pub fn ensure_credentials(&self, id: u64) -> Result<ConsumerRecord, CredentialError> {
        let mut inner = self.inner.write();
        let current = inner
            .consumers
            .get(&id)
            .cloned()
            .ok_or(CredentialError::UnknownConsumer(id))?;

        let mut updated = current.clone();
        if !is_well_formed_token(&current.key) {
            updated.key = generate_unique_token(|candidate| inner.key_taken(candidate))?;
        }
        if !is_well_formed_token(&current.secret) {
            updated.secret = generate_unique_token(|candidate| inner.secret_taken(candidate))?;
        }

        if updated.key != current.key {
            inner.by_key.remove(&current.key);
            inner.by_key.insert(updated.key.clone(), id);
            info!(consumer_id = id, "Regenerated consumer key");
        }
        if updated.secret != current.secret {
            info!(consumer_id = id, "Regenerated consumer secret");
        }
        inner.consumers.insert(id, updated.clone());
        Ok(updated)
    }

    /// Mark a consumer as revoked. Its key then resolves to `Revoked`.
    pub fn revoke(&self, id: u64) -> Result<(), CredentialError> {
        let mut inner = self.inner.write();
        let record = inner
            .consumers
            .get_mut(&id)
            .ok_or(CredentialError::UnknownConsumer(id))?;
        record.revoked = true;

        info!(consumer_id = id, "Revoked LTI consumer");
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<ConsumerRecord> {
        self.inner.read().consumers.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().consumers.is_empty()
    }

    fn lookup(&self, consumer_key: &str) -> ConsumerLookup {
        let inner = self.inner.read();
        let Some(record) = inner
            .by_key
            .get(consumer_key)
            .and_then(|id| inner.consumers.get(id))
        else {
            return ConsumerLookup::NotFound;
        };

        if record.revoked {
            ConsumerLookup::Revoked(record.identity())
        } else {
            ConsumerLookup::Active(ConsumerCredential {
                identity: record.identity(),
                secret: record.secret.clone(),
            })
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn resolve(&self, consumer_key: &str) -> Result<ConsumerLookup, BackendError> {
        Ok(self.lookup(consumer_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: u64, key: &str, secret: &str) -> ConsumerRecord {
        ConsumerRecord {
            id,
            name: format!("Consumer {id}"),
            key: key.to_string(),
            secret: secret.to_string(),
            revoked: false,
        }
    }

    #[tokio::test]
    async fn test_resolve_active() {
        let store = InMemoryCredentialStore::new();
        let consumer = store.register("Canvas").unwrap();

        match store.resolve(&consumer.key).await.unwrap() {
            ConsumerLookup::Active(credential) => {
                assert_eq!(credential.identity, consumer.identity());
                assert_eq!(credential.secret, consumer.secret);
            }
            other => panic!("expected active consumer, got {other:?}"),
        }
    }

    /// Test: keys are matched exactly
    #[tokio::test]
    async fn test_resolve_is_exact() {
        let store = InMemoryCredentialStore::new();
        let consumer = store.register("Moodle").unwrap();

        let upper = consumer.key.to_ascii_uppercase();
        let padded = format!(" {}", consumer.key);
        assert_eq!(store.resolve(&upper).await, Ok(ConsumerLookup::NotFound));
        assert_eq!(store.resolve(&padded).await, Ok(ConsumerLookup::NotFound));
    }

    #[tokio::test]
    async fn test_revoked_consumer() {
        let store = InMemoryCredentialStore::new();
        let consumer = store.register("Blackboard").unwrap();
        store.revoke(consumer.id).unwrap();

        assert_eq!(
            store.resolve(&consumer.key).await,
            Ok(ConsumerLookup::Revoked(consumer.identity()))
        );
    }

    #[test]
    fn test_register_assigns_ids_and_valid_tokens() {
        let store = InMemoryCredentialStore::new();
        let a = store.register("A").unwrap();
        let b = store.register("B").unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.key, b.key);
        assert!(is_well_formed_token(&a.key));
        assert!(is_well_formed_token(&a.secret));
        assert_ne!(a.key, a.secret);
        assert_eq!(store.len(), 2);
    }

    /// Test: repair regenerates only malformed values
    #[tokio::test]
    async fn test_ensure_credentials_repairs_malformed() {
        let good_secret = "0123456789abcdef0123456789abcdef01234567";
        let store = InMemoryCredentialStore::from_records([record(
            7,
            "Key will be generated when post is saved",
            good_secret,
        )])
        .unwrap();

        let repaired = store.ensure_credentials(7).unwrap();
        assert!(is_well_formed_token(&repaired.key));
        assert_eq!(repaired.secret, good_secret);

        assert!(matches!(
            store.resolve(&repaired.key).await,
            Ok(ConsumerLookup::Active(_))
        ));
        assert_eq!(
            store
                .resolve("Key will be generated when post is saved")
                .await,
            Ok(ConsumerLookup::NotFound)
        );
    }

    #[test]
    fn test_ensure_credentials_keeps_good_values() {
        let key = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let secret = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        let store = InMemoryCredentialStore::from_records([record(1, key, secret)]).unwrap();

        let same = store.ensure_credentials(1).unwrap();
        assert_eq!(same.key, key);
        assert_eq!(same.secret, secret);
    }

    #[test]
    fn test_unknown_consumer() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.revoke(9), Err(CredentialError::UnknownConsumer(9)));
        assert_eq!(
            store.ensure_credentials(9).map(|_| ()),
            Err(CredentialError::UnknownConsumer(9))
        );
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let dup_key = InMemoryCredentialStore::from_records([
            record(1, "k", "s1"),
            record(2, "k", "s2"),
        ]);
        assert_eq!(dup_key.map(|_| ()), Err(CredentialError::DuplicateKey(2)));

        let dup_id = InMemoryCredentialStore::from_records([
            record(1, "k1", "s1"),
            record(1, "k2", "s2"),
        ]);
        assert_eq!(dup_id.map(|_| ()), Err(CredentialError::DuplicateId(1)));
    }

    /// Test: ids continue after the highest loaded id
    #[test]
    fn test_concurrent_register_unique() {
        let store = InMemoryCredentialStore::new();
        let records: Vec<ConsumerRecord> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    scope.spawn(move || {
                        (0..16)
                            .map(|j| store.register(format!("LMS {i}-{j}")).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let ids: HashSet<u64> = records.iter().map(|r| r.id).collect();
        let keys: HashSet<&str> = records.iter().map(|r| r.key.as_str()).collect();
        let secrets: HashSet<&str> = records.iter().map(|r| r.secret.as_str()).collect();
        assert_eq!(ids.len(), 128);
        assert_eq!(keys.len(), 128);
        assert_eq!(secrets.len(), 128);
        assert_eq!(store.len(), 128);
    }

    #[test]
    fn test_register_after_load() {
        let store = InMemoryCredentialStore::from_records([record(41, "k", "s")]).unwrap();
        assert_eq!(store.register("next").unwrap().id, 42);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", record(1, "key", "super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
