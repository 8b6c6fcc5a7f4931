//! # Launch Errors
//!
//! The closed set of rejection reasons a launch can end in, and the failures
//! that storage backends may report through the outbound ports.
//!
//! Nothing in a `Rejection` identifies the consumer or explains *why* a check
//! failed beyond the reason itself. Operator detail goes to the log.

use serde::Serialize;
use thiserror::Error;

/// Reason a launch was rejected.
///
/// `Display` is the operator-facing summary; [`Rejection::user_message`] is
/// the only text that should reach the person performing the launch.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// A required OAuth or LTI parameter is missing, empty, or duplicated
    #[error("Required launch parameter absent")]
    ParameterAbsent,

    /// Consumer key is unknown or the consumer has been revoked
    #[error("Consumer key rejected")]
    ConsumerRejected,

    /// Timestamp is unparseable or outside the freshness window
    #[error("Timestamp outside freshness window")]
    TimestampInvalid,

    /// Nonce was already used inside the freshness window
    #[error("Nonce already used")]
    NonceInvalid,

    /// Signature does not match the one computed from the request
    #[error("Signature mismatch")]
    SignatureInvalid,

    /// Signature method is missing or not accepted
    #[error("Signature method rejected")]
    SignatureMethodRejected,

    /// Credential store or nonce ledger failed or timed out
    #[error("Backend unavailable")]
    BackendUnavailable,
}

impl Rejection {
    /// Every rejection reason, in pipeline order.
    pub const ALL: [Rejection; 7] = [
        Rejection::ParameterAbsent,
        Rejection::ConsumerRejected,
        Rejection::TimestampInvalid,
        Rejection::NonceInvalid,
        Rejection::SignatureInvalid,
        Rejection::SignatureMethodRejected,
        Rejection::BackendUnavailable,
    ];

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::ParameterAbsent => "parameter_absent",
            Rejection::ConsumerRejected => "consumer_rejected",
            Rejection::TimestampInvalid => "timestamp_invalid",
            Rejection::NonceInvalid => "nonce_invalid",
            Rejection::SignatureInvalid => "signature_invalid",
            Rejection::SignatureMethodRejected => "signature_method_rejected",
            Rejection::BackendUnavailable => "backend_unavailable",
        }
    }

    /// Fixed message shown to the user whose launch failed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Rejection::ParameterAbsent => "A required launch parameter was not provided.",
            Rejection::ConsumerRejected => {
                "Consumer key is unknown, or has been temporarily disabled. \
                 Please check your consumer key settings and restart the launch process."
            }
            Rejection::TimestampInvalid => {
                "This request is too old. \
                 Please return to your application and restart the launch process."
            }
            Rejection::NonceInvalid => {
                "This LTI request has expired. \
                 Please return to your application and restart the launch process."
            }
            Rejection::SignatureInvalid => {
                "The request signature is invalid, or does not match the signature computed."
            }
            Rejection::SignatureMethodRejected => {
                "The signature method was not accepted by the service provider."
            }
            Rejection::BackendUnavailable => {
                "General launch error. Please follow up with the tool provider \
                 to consult any logs to further diagnose the issue."
            }
        }
    }

    /// HTTP status a host should answer with (RFC 5849 Section 3.2).
    pub fn http_status(&self) -> u16 {
        match self {
            Rejection::ParameterAbsent | Rejection::SignatureMethodRejected => 400,
            Rejection::ConsumerRejected
            | Rejection::TimestampInvalid
            | Rejection::NonceInvalid
            | Rejection::SignatureInvalid => 401,
            Rejection::BackendUnavailable => 503,
        }
    }
}

/// Failure reported by a credential store or nonce store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend did not answer within the configured bound
    #[error("Backend call timed out after {0} ms")]
    Timeout(u64),

    /// The backend reported an error
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
