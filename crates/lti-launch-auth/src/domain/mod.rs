//! # Domain Layer
//!
//! Canonicalization, signature, nonce-window and credential rules.
//! This is the inner layer of the hexagonal architecture; nothing here
//! performs I/O.

pub mod base_string;
pub mod credentials;
pub mod encoding;
pub mod entities;
pub mod errors;
pub mod nonce;
pub mod signature;
