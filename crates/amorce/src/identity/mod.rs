//! Agent identity — key material, agent IDs, and public documents.
//!
//! An Amorce identity is an Ed25519 key pair. The public key IS the
//! identity; the private key proves ownership and signs every action
//! the agent takes.

pub mod document;
pub mod manager;

pub use document::{Attestation, AttestationClaim, IdentityDocument, PublicKeyRotation};
pub use manager::{AgentId, IdentityManager, KeyRotation, RotationReason};
