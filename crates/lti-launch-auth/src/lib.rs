//! # LTI Launch Authentication
//!
//! Authenticates inbound LTI launch requests signed with OAuth 1.0 (RFC 5849)
//! and guards against replay with a time-windowed nonce ledger.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Pure canonicalization, signature and window logic, no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Adapters Layer** (`adapters/`): In-memory stores, clocks, dispatch helpers, purge scheduling
//! - **Service Layer** (`service.rs`): The launch authenticator state machine
//!
//! ## Verification Order
//!
//! ```text
//! Start ──► ParametersChecked ──► ConsumerResolved ──► NonceChecked ──► SignatureVerified ──► Accepted
//!   │              │                     │                  │                   │
//!   └──────────────┴─────────────────────┴──────────────────┴───────────────────┴──► Rejected(reason)
//! ```
//!
//! ## Security Notes
//!
//! - **No enumeration**: unknown and revoked consumer keys produce the same rejection
//! - **Replay**: a nonce is accepted at most once per freshness window, atomically per value
//! - **Clock skew**: timestamps too far in the past *or* the future are rejected
//! - **Timing**: signatures are compared in constant time

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::clock::{FixedClock, SystemClock};
pub use adapters::credential_store::{ConsumerRecord, InMemoryCredentialStore};
pub use adapters::dispatch::{is_lti_launch, parse_launch_path, TenantId};
pub use adapters::nonce_store::InMemoryNonceStore;
pub use adapters::scheduler::spawn_purge_task;
pub use config::{ConfigError, LaunchAuthConfig};
pub use domain::credentials::{generate_token, is_well_formed_token, CredentialError};
pub use domain::entities::{
    AuthenticatedLaunch, ConsumerCredential, ConsumerIdentity, ConsumerLookup, LaunchOutcome,
    LaunchRequest, LaunchStage,
};
pub use domain::errors::{BackendError, Rejection};
pub use domain::nonce::{NonceLedger, NonceVerdict};
pub use domain::signature::{sign_request, SignatureMethod, SignatureVerifier};
pub use ports::inbound::LaunchAuthenticationApi;
pub use ports::outbound::{CredentialStore, NonceStore, TimeSource};
pub use service::LaunchAuthenticator;
