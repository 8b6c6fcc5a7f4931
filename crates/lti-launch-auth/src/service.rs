//! # Launch Authentication Service
//!
//! Application service that implements the `LaunchAuthenticationApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`LaunchAuthenticationApi`)
//! - Uses the outbound ports (`CredentialStore`, `NonceStore`, `TimeSource`)
//! - Delegates canonicalization, HMAC and window rules to the domain layer
//!
//! ## Pipeline
//!
//! | Stage reached | Check | Failure |
//! |---|---|---|
//! | `Start` | required fields present, protocol fields single-valued | `ParameterAbsent` |
//! | `ParametersChecked` | consumer key resolves to an active consumer | `ConsumerRejected` |
//! | `ConsumerResolved` | timestamp fresh, nonce unused | `TimestampInvalid` / `NonceInvalid` |
//! | `NonceChecked` | method accepted, signature matches | `SignatureMethodRejected` / `SignatureInvalid` |
//! | `SignatureVerified` | | |
//!
//! Any backend failure or timeout is `BackendUnavailable`.

use crate::config::LaunchAuthConfig;
use crate::domain::entities::{
    param, AuthenticatedLaunch, ConsumerCredential, ConsumerLookup, LaunchOutcome, LaunchRequest,
    LaunchStage,
};
use crate::domain::errors::{BackendError, Rejection};
use crate::domain::nonce::{NonceLedger, NonceVerdict};
use crate::domain::signature::SignatureVerifier;
use crate::ports::inbound::LaunchAuthenticationApi;
use crate::ports::outbound::{CredentialStore, NonceStore, TimeSource};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type StageResult<T> = Result<T, (LaunchStage, Rejection)>;

/// Launch Authenticator.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct LaunchAuthenticator<C, N, T> {
    credentials: C,
    ledger: NonceLedger<N>,
    clock: T,
    verifier: SignatureVerifier,
    window: u64,
    backend_timeout: Duration,
}

impl<C, N, T> LaunchAuthenticator<C, N, T>
where
    C: CredentialStore,
    N: NonceStore,
    T: TimeSource,
{
    /// Create an authenticator.
    ///
    /// `config` is expected to have passed [`LaunchAuthConfig::validate`].
    pub fn new(config: &LaunchAuthConfig, credentials: C, nonces: N, clock: T) -> Self {
        Self {
            credentials,
            ledger: NonceLedger::new(nonces),
            clock,
            verifier: config.verifier(),
            window: config.freshness_window_secs,
            backend_timeout: config.backend_timeout(),
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn ledger(&self) -> &NonceLedger<N> {
        &self.ledger
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    /// Freshness window in seconds.
    pub fn window(&self) -> u64 {
        self.window
    }

    async fn authenticate(&self, request: &LaunchRequest) -> StageResult<AuthenticatedLaunch> {
        check_parameters(request).map_err(|r| (LaunchStage::Start, r))?;

        let consumer = self
            .resolve_consumer(request)
            .await
            .map_err(|r| (LaunchStage::ParametersChecked, r))?;

        self.check_nonce(request, &consumer)
            .await
            .map_err(|r| (LaunchStage::ConsumerResolved, r))?;

        self.verifier
            .verify(request, &consumer.secret)
            .map_err(|r| (LaunchStage::NonceChecked, r))?;

        debug!(consumer_id = consumer.identity.id, "Launch signature verified");
        Ok(AuthenticatedLaunch::from_request(consumer.identity, request))
    }

    async fn resolve_consumer(
        &self,
        request: &LaunchRequest,
    ) -> Result<ConsumerCredential, Rejection> {
        let key = request.consumer_key().unwrap_or_default();

        let lookup = self
            .bounded("credential_store", self.credentials.resolve(key))
            .await?;

        match lookup {
            ConsumerLookup::Active(credential) if credential.secret.is_empty() => {
                warn!(
                    consumer_id = credential.identity.id,
                    lookup = "empty_secret",
                    "Consumer has no shared secret configured"
                );
                Err(Rejection::ConsumerRejected)
            }
            ConsumerLookup::Active(credential) => Ok(credential),
            ConsumerLookup::Revoked(identity) => {
                warn!(
                    consumer_id = identity.id,
                    lookup = "revoked",
                    "Launch from revoked consumer"
                );
                Err(Rejection::ConsumerRejected)
            }
            ConsumerLookup::NotFound => {
                warn!(lookup = "not_found", "Launch with unknown consumer key");
                Err(Rejection::ConsumerRejected)
            }
        }
    }

    async fn check_nonce(
        &self,
        request: &LaunchRequest,
        consumer: &ConsumerCredential,
    ) -> Result<(), Rejection> {
        let Some(timestamp) = request
            .param(param::OAUTH_TIMESTAMP)
            .and_then(|raw| raw.parse::<i64>().ok())
        else {
            return Err(Rejection::TimestampInvalid);
        };
        let nonce = request.nonce().unwrap_or_default();
        let now = self.clock.now();

        let verdict = self
            .bounded(
                "nonce_store",
                self.ledger.check_and_record(nonce, timestamp, now, self.window),
            )
            .await?;

        match verdict {
            NonceVerdict::Accepted => Ok(()),
            NonceVerdict::Stale => {
                debug!(
                    consumer_id = consumer.identity.id,
                    skew_secs = now.saturating_sub(timestamp),
                    "Launch timestamp outside freshness window"
                );
                Err(Rejection::TimestampInvalid)
            }
            NonceVerdict::Replayed => Err(Rejection::NonceInvalid),
        }
    }

    /// Run a backend call under the configured timeout.
    async fn bounded<F, R>(&self, backend: &'static str, call: F) -> Result<R, Rejection>
    where
        F: Future<Output = Result<R, BackendError>>,
    {
        let result = match tokio::time::timeout(self.backend_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(timeout_millis(self.backend_timeout))),
        };

        result.map_err(|e| {
            error!(backend, error = %e, "Backend call failed during launch");
            Rejection::BackendUnavailable
        })
    }
}

#[async_trait]
impl<C, N, T> LaunchAuthenticationApi for LaunchAuthenticator<C, N, T>
where
    C: CredentialStore,
    N: NonceStore,
    T: TimeSource,
{
    async fn verify(&self, request: &LaunchRequest) -> LaunchOutcome {
        match self.authenticate(request).await {
            Ok(launch) => {
                info!(
                    consumer_id = launch.consumer.id,
                    resource_link_id = %launch.resource_link_id,
                    "LTI launch accepted"
                );
                LaunchOutcome::Accepted(launch)
            }
            Err((stage, reason)) => {
                warn!(reason = reason.code(), stage = ?stage, "LTI launch rejected");
                LaunchOutcome::Rejected { reason }
            }
        }
    }

    async fn purge(&self) -> Result<usize, BackendError> {
        let now = self.clock.now();
        match tokio::time::timeout(self.backend_timeout, self.ledger.purge(now, self.window)).await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(timeout_millis(self.backend_timeout))),
        }
    }
}

/// Presence and multiplicity checks; no lookups, no HMAC work.
fn check_parameters(request: &LaunchRequest) -> Result<(), Rejection> {
    // Empty values count as absent, LTI fields included.
    for name in param::REQUIRED_OAUTH.iter().chain(param::REQUIRED_LTI.iter()) {
        if request.param(name).map_or(true, str::is_empty) {
            debug!(parameter = name, "Required launch parameter missing");
            return Err(Rejection::ParameterAbsent);
        }
    }
    for name in param::SINGLE_VALUED_OAUTH {
        if request.param_count(name) > 1 {
            debug!(parameter = name, "Protocol parameter repeated");
            return Err(Rejection::ParameterAbsent);
        }
    }
    Ok(())
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::credential_store::InMemoryCredentialStore;
    use crate::adapters::nonce_store::InMemoryNonceStore;
    use crate::domain::signature::{sign_request, SignatureMethod};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000;

    type TestAuthenticator =
        LaunchAuthenticator<Arc<InMemoryCredentialStore>, Arc<InMemoryNonceStore>, Arc<FixedClock>>;

    struct Fixture {
        auth: TestAuthenticator,
        nonces: Arc<InMemoryNonceStore>,
        key: String,
        secret: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCredentialStore::new());
        let consumer = store.register("Test LMS").unwrap();
        let nonces = Arc::new(InMemoryNonceStore::new());
        let auth = LaunchAuthenticator::new(
            &LaunchAuthConfig::default(),
            store,
            Arc::clone(&nonces),
            Arc::new(FixedClock::new(NOW)),
        );
        Fixture {
            auth,
            nonces,
            key: consumer.key,
            secret: consumer.secret,
        }
    }

    fn signed(key: &str, secret: &str, nonce: &str, timestamp: i64) -> LaunchRequest {
        let mut request = LaunchRequest::new("POST", "https://example.org/api/lti/1", vec![])
            .with_param("oauth_consumer_key", key)
            .with_param("oauth_nonce", nonce)
            .with_param("oauth_timestamp", timestamp.to_string())
            .with_param("oauth_version", "1.0")
            .with_param("lti_message_type", "basic-lti-launch-request")
            .with_param("lti_version", "LTI-1p0")
            .with_param("resource_link_id", "rl-1")
            .with_param("user_id", "42");
        sign_request(&mut request, secret, SignatureMethod::HmacSha1).unwrap();
        request
    }

    #[tokio::test]
    async fn test_valid_launch_accepted() {
        let f = fixture();
        let outcome = f.auth.verify(&signed(&f.key, &f.secret, "n-1", NOW)).await;

        let launch = outcome.accepted().expect("launch should be accepted");
        assert_eq!(launch.consumer.key, f.key);
        assert_eq!(launch.message_type, "basic-lti-launch-request");
        assert_eq!(launch.resource_link_id, "rl-1");
        assert_eq!(launch.parameters.get("user_id").map(String::as_str), Some("42"));
        assert!(!launch.parameters.contains_key("oauth_signature"));
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        let store = Arc::new(CountingCredentialStore::default());
        let consumer = store.inner.register("Counted").unwrap();
        let nonces = Arc::new(InMemoryNonceStore::new());
        let auth = LaunchAuthenticator::new(
            &LaunchAuthConfig::default(),
            Arc::clone(&store),
            Arc::clone(&nonces),
            FixedClock::new(NOW),
        );

        for name in param::REQUIRED_OAUTH.iter().chain(param::REQUIRED_LTI.iter()) {
            let mut request = signed(&consumer.key, &consumer.secret, "n-1", NOW);
            request.remove_param(name);
            assert_eq!(
                auth.verify(&request).await.rejection(),
                Some(Rejection::ParameterAbsent),
                "missing {name}"
            );

            let mut request = signed(&consumer.key, &consumer.secret, "n-1", NOW);
            request.set_param(name, "");
            assert_eq!(
                auth.verify(&request).await.rejection(),
                Some(Rejection::ParameterAbsent),
                "empty {name}"
            );
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(nonces.is_empty());
    }

    /// Credential store that counts lookups.
    #[derive(Default)]
    struct CountingCredentialStore {
        inner: InMemoryCredentialStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for CountingCredentialStore {
        async fn resolve(&self, consumer_key: &str) -> Result<ConsumerLookup, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(consumer_key).await
        }
    }

    /// Test: an empty required value counts as absent
    #[tokio::test]
    async fn test_empty_parameter_is_absent() {
        let f = fixture();
        let mut request = signed(&f.key, &f.secret, "n-1", NOW);
        request.set_param("oauth_nonce", "");
        assert_eq!(f.auth.verify(&request).await.rejection(), Some(Rejection::ParameterAbsent));
    }

    #[tokio::test]
    async fn test_repeated_protocol_parameter() {
        let f = fixture();
        let request = signed(&f.key, &f.secret, "n-1", NOW).with_param("oauth_nonce", "n-2");
        assert_eq!(f.auth.verify(&request).await.rejection(), Some(Rejection::ParameterAbsent));
    }

    /// Test: unknown consumers never reach the nonce ledger
    #[tokio::test]
    async fn test_unknown_consumer_does_not_consume_nonce() {
        let f = fixture();
        let request = signed("0000000000000000000000000000000000000000", &f.secret, "n-1", NOW);
        assert_eq!(f.auth.verify(&request).await.rejection(), Some(Rejection::ConsumerRejected));
        assert!(f.nonces.is_empty());
    }

    #[tokio::test]
    async fn test_empty_secret_rejected() {
        use crate::adapters::credential_store::ConsumerRecord;

        let store = InMemoryCredentialStore::from_records([ConsumerRecord {
            id: 1,
            name: "Misconfigured".into(),
            key: "k".into(),
            secret: String::new(),
            revoked: false,
        }])
        .unwrap();
        let auth = LaunchAuthenticator::new(
            &LaunchAuthConfig::default(),
            store,
            InMemoryNonceStore::new(),
            FixedClock::new(NOW),
        );

        let request = signed("k", "", "n-1", NOW);
        assert_eq!(auth.verify(&request).await.rejection(), Some(Rejection::ConsumerRejected));
    }

    #[tokio::test]
    async fn test_unparseable_timestamp() {
        let f = fixture();
        let mut request = signed(&f.key, &f.secret, "n-1", NOW);
        request.set_param("oauth_timestamp", "yesterday");
        assert_eq!(f.auth.verify(&request).await.rejection(), Some(Rejection::TimestampInvalid));
        assert!(f.nonces.is_empty());
    }

    /// Test: the nonce is recorded before the signature is checked
    #[tokio::test]
    async fn test_bad_signature_after_nonce_recorded() {
        let f = fixture();
        let mut request = signed(&f.key, &f.secret, "n-1", NOW);
        request.set_param("resource_link_id", "rl-2");

        assert_eq!(f.auth.verify(&request).await.rejection(), Some(Rejection::SignatureInvalid));
        assert!(f.nonces.contains("n-1"));
    }

    #[tokio::test]
    async fn test_unaccepted_method() {
        let f = fixture();
        let mut request = signed(&f.key, &f.secret, "n-1", NOW);
        sign_request(&mut request, &f.secret, SignatureMethod::HmacSha256).unwrap();
        assert_eq!(
            f.auth.verify(&request).await.rejection(),
            Some(Rejection::SignatureMethodRejected)
        );
    }

    #[tokio::test]
    async fn test_sha256_when_enabled() {
        let store = InMemoryCredentialStore::new();
        let consumer = store.register("SHA-256 LMS").unwrap();
        let config = LaunchAuthConfig {
            accepted_signature_methods: vec![SignatureMethod::HmacSha1, SignatureMethod::HmacSha256],
            ..LaunchAuthConfig::default()
        };
        let auth =
            LaunchAuthenticator::new(&config, store, InMemoryNonceStore::new(), FixedClock::new(NOW));

        let mut request = signed(&consumer.key, &consumer.secret, "n-1", NOW);
        sign_request(&mut request, &consumer.secret, SignatureMethod::HmacSha256).unwrap();
        assert!(auth.verify(&request).await.is_accepted());
    }

    struct FailingCredentialStore;

    #[async_trait]
    impl CredentialStore for FailingCredentialStore {
        async fn resolve(&self, _key: &str) -> Result<ConsumerLookup, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_credential_backend_failure() {
        let auth = LaunchAuthenticator::new(
            &LaunchAuthConfig::default(),
            FailingCredentialStore,
            InMemoryNonceStore::new(),
            FixedClock::new(NOW),
        );
        let request = signed("k", "s", "n-1", NOW);
        assert_eq!(
            auth.verify(&request).await.rejection(),
            Some(Rejection::BackendUnavailable)
        );
    }

    /// Nonce store that never answers in time.
    #[derive(Default)]
    struct StalledNonceStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NonceStore for StalledNonceStore {
        async fn insert_if_absent(&self, _: &str, _: i64, _: i64) -> Result<bool, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(true)
        }

        async fn remove_older_than(&self, _: i64) -> Result<usize, BackendError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(0)
        }

        async fn record_count(&self) -> Result<usize, BackendError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_nonce_backend_timeout() {
        let store = InMemoryCredentialStore::new();
        let consumer = store.register("Slow").unwrap();
        let config = LaunchAuthConfig {
            backend_timeout_ms: 20,
            ..LaunchAuthConfig::default()
        };
        let nonces = Arc::new(StalledNonceStore::default());
        let auth = LaunchAuthenticator::new(&config, store, Arc::clone(&nonces), FixedClock::new(NOW));

        let request = signed(&consumer.key, &consumer.secret, "n-1", NOW);
        assert_eq!(
            auth.verify(&request).await.rejection(),
            Some(Rejection::BackendUnavailable)
        );
        assert_eq!(nonces.calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.purge().await, Err(BackendError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_purge_uses_clock() {
        let f = fixture();
        f.auth.verify(&signed(&f.key, &f.secret, "n-1", NOW)).await;
        assert_eq!(f.auth.purge().await, Ok(0));

        f.auth.clock().advance(5401);
        assert_eq!(f.auth.purge().await, Ok(1));
        assert!(f.nonces.is_empty());
    }
}
