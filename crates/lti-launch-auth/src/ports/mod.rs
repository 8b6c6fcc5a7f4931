//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that hosts call
//! - **Outbound (Driven)**: Dependencies the authenticator needs

pub mod inbound;
pub mod outbound;
