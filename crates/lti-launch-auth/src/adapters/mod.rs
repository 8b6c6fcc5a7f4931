//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports, plus the dispatch helpers
//! and purge scheduler a host wires around the authenticator.

pub mod clock;
pub mod credential_store;
pub mod dispatch;
pub mod nonce_store;
pub mod scheduler;
