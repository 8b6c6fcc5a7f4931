//! # Inbound Ports (Driving Ports / API)
//!
//! The public API of the launch authenticator.

use crate::domain::entities::{LaunchOutcome, LaunchRequest};
use crate::domain::errors::BackendError;
use async_trait::async_trait;

/// Launch authentication API.
///
/// Implementations must be thread-safe (`Send + Sync`); many verifications
/// may run concurrently against one instance.
#[async_trait]
pub trait LaunchAuthenticationApi: Send + Sync {
    /// Authenticate a launch request.
    ///
    /// Checks run in a fixed order (parameters, consumer, timestamp and
    /// nonce, signature) and stop at the first failure.
    async fn verify(&self, request: &LaunchRequest) -> LaunchOutcome;

    /// Remove nonce records older than the freshness window.
    ///
    /// Housekeeping only; correctness does not depend on it.
    async fn purge(&self) -> Result<usize, BackendError>;
}
