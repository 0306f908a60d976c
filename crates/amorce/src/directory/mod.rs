//! Trust Directory and orchestrator client.
//!
//! Secure agents register with the Trust Directory, discover peers by
//! capability, and route approval requests through the orchestrator.

pub mod client;

pub use client::{AgentListing, AmorceClient, ClientConfig};
