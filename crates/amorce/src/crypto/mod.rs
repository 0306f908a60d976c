//! Cryptographic primitives for Amorce.
//!
//! Ed25519 for signing, HKDF-SHA256 for scoped key derivation,
//! Argon2id + ChaCha20-Poly1305 for identity files at rest, and
//! canonical JSON so signatures are stable across serializations.

pub mod canonical;
pub mod derivation;
pub mod encryption;
pub mod keys;
pub mod random;
pub mod signing;

pub use canonical::canonicalize;
pub use keys::Ed25519KeyPair;
