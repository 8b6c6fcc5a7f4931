//! # Consumer Credentials
//!
//! Generation and well-formedness rules for consumer keys and secrets.
//! Both are the lowercase hex encoding of 160 random bits (40 characters).

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Length of a key or secret in hex characters.
pub const TOKEN_HEX_LEN: usize = 40;

/// Random bytes behind each token.
const TOKEN_BYTES: usize = TOKEN_HEX_LEN / 2;

/// Attempts before giving up on finding an unused token.
pub const MAX_GENERATION_ATTEMPTS: usize = 16;

/// Errors from credential administration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Every generated token collided with an existing one
    #[error("Could not generate a unique token after {0} attempts")]
    Exhausted(usize),

    /// No consumer with this id
    #[error("Unknown consumer id {0}")]
    UnknownConsumer(u64),

    /// Two consumers claim the same key
    #[error("Duplicate consumer key for consumer id {0}")]
    DuplicateKey(u64),

    /// Two consumers share an id
    #[error("Duplicate consumer id {0}")]
    DuplicateId(u64),
}

/// Generate a fresh 40-hex-character token from the OS CSPRNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a token that `is_taken` does not report as already in use.
pub fn generate_unique_token<F>(mut is_taken: F) -> Result<String, CredentialError>
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let token = generate_token();
        if !is_taken(&token) {
            return Ok(token);
        }
    }
    Err(CredentialError::Exhausted(MAX_GENERATION_ATTEMPTS))
}

/// Minimal shape check: exactly 40 hex digits.
pub fn is_well_formed_token(value: &str) -> bool {
    value.len() == TOKEN_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
