//! Key derivation using HKDF-SHA256.
//!
//! Derives scoped child keys from a root signing key using context
//! strings, so session- and tool-scoped signing never exposes the root.

use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{AmorceError, Result};

/// Derive a 32-byte child key from a root key and context string.
///
/// Uses HKDF-SHA256 (RFC 5869) with the root key as IKM and
/// the context as info.
pub fn derive_key(root_key_bytes: &[u8; 32], context: &str) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, root_key_bytes);
    let mut output = [0u8; 32];
    hk.expand(context.as_bytes(), &mut output)
        .map_err(|e| AmorceError::DerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Derive an Ed25519 signing key from a root key and context.
pub fn derive_signing_key(root_key_bytes: &[u8; 32], context: &str) -> Result<SigningKey> {
    let derived = derive_key(root_key_bytes, context)?;
    Ok(SigningKey::from_bytes(&derived))
}

/// Build a derivation path string for a session key.
pub fn session_context(session_id: &str) -> String {
    format!("amorce/session/{session_id}")
}

/// Build a derivation path string for a tool-scoped key.
pub fn tool_context(tool_name: &str) -> String {
    format!("amorce/tool/{tool_name}")
}
