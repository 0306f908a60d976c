//! `.amid` file format — encrypted identity storage.
//!
//! An `.amid` file holds the agent's private key material encrypted
//! with ChaCha20-Poly1305 under a passphrase-derived key, plus the
//! public identity document in plaintext so the file can be inspected
//! without decryption.
//!
//! File format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "format": "amid-v1",
//!     "encryption": {
//!         "algorithm": "chacha20-poly1305",
//!         "kdf": "argon2id",
//!         "salt": "<base64-16-bytes>",
//!         "nonce": "<base64-12-bytes>"
//!     },
//!     "encrypted_identity": "<base64-ciphertext>",
//!     "public_document": { ... IdentityDocument ... }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::{derivation, encryption};
use crate::error::{AmorceError, Result};
use crate::identity::{IdentityDocument, IdentityManager, KeyRotation};

const AMID_VERSION: u32 = 1;
const AMID_FORMAT: &str = "amid-v1";
const AMID_ALGORITHM: &str = "chacha20-poly1305";
const AMID_KDF: &str = "argon2id";

/// HKDF context for the identity encryption key. Must stay stable
/// across versions or existing files stop decrypting.
const IDENTITY_ENCRYPTION_CONTEXT: &str = "identity-encryption";

/// Top-level structure of an `.amid` file.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmidFile {
    pub version: u32,
    pub format: String,
    pub encryption: EncryptionMetadata,
    /// Base64 ciphertext of the private identity data.
    pub encrypted_identity: String,
    /// Public identity document, readable without the passphrase.
    pub public_document: IdentityDocument,
}

/// Encryption parameters stored alongside the ciphertext.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub algorithm: String,
    pub kdf: String,
    pub salt: String,
    pub nonce: String,
}

/// What gets serialized and encrypted: everything needed to rebuild an
/// [`IdentityManager`] via `from_parts`.
#[derive(Debug, Serialize, Deserialize, Zeroize)]
struct IdentityPrivateData {
    signing_key_b64: String,
    created_at: u64,
    name: Option<String>,
    rotation_history: Vec<KeyRotation>,
}

/// Save an identity to an `.amid` file, encrypting the private key
/// under the passphrase.
///
/// The write is atomic: a sibling temp file is written first and then
/// renamed into place.
pub fn save_identity(identity: &IdentityManager, path: &Path, passphrase: &str) -> Result<()> {
    let mut signing_bytes = identity.signing_key_bytes();
    let signing_key_b64 =
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, signing_bytes);
    signing_bytes.zeroize();

    let private_data = IdentityPrivateData {
        signing_key_b64,
        created_at: identity.created_at,
        name: identity.name.clone(),
        rotation_history: identity.rotation_history.clone(),
    };

    let mut plaintext = serde_json::to_vec(&private_data)
        .map_err(|e| AmorceError::SerializationError(e.to_string()))?;

    // passphrase → Argon2id → HKDF("identity-encryption") → encryption key
    let salt = crate::crypto::random::random_salt_16();
    let mut master_key = encryption::derive_passphrase_key(passphrase.as_bytes(), &salt)?;
    let mut encryption_key = derivation::derive_key(&master_key, IDENTITY_ENCRYPTION_CONTEXT)?;
    master_key.zeroize();

    let (nonce_bytes, ciphertext) = encryption::encrypt(&encryption_key, &plaintext)?;
    encryption_key.zeroize();
    plaintext.zeroize();

    let amid = AmidFile {
        version: AMID_VERSION,
        format: AMID_FORMAT.to_string(),
        encryption: EncryptionMetadata {
            algorithm: AMID_ALGORITHM.to_string(),
            kdf: AMID_KDF.to_string(),
            salt: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, salt),
            nonce: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &nonce_bytes),
        },
        encrypted_identity: base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &ciphertext,
        ),
        public_document: identity.to_document(),
    };

    let json = serde_json::to_string_pretty(&amid)
        .map_err(|e| AmorceError::SerializationError(e.to_string()))?;
    write_atomic(path, json.as_bytes())
}

/// Load an identity from an `.amid` file.
///
/// A wrong passphrase surfaces as `InvalidPassphrase` (the AEAD tag
/// fails to authenticate).
pub fn load_identity(path: &Path, passphrase: &str) -> Result<IdentityManager> {
    let amid = parse_file(path)?;

    if amid.version != AMID_VERSION || amid.format != AMID_FORMAT {
        return Err(AmorceError::InvalidFileFormat(format!(
            "unsupported .amid file version={} format={}",
            amid.version, amid.format,
        )));
    }

    let salt_bytes = decode_b64(&amid.encryption.salt, "salt")?;
    let salt: [u8; 16] = salt_bytes
        .try_into()
        .map_err(|_| AmorceError::InvalidFileFormat("salt must be 16 bytes".to_string()))?;
    let nonce_bytes = decode_b64(&amid.encryption.nonce, "nonce")?;
    let ciphertext = decode_b64(&amid.encrypted_identity, "ciphertext")?;

    let mut master_key = encryption::derive_passphrase_key(passphrase.as_bytes(), &salt)?;
    let mut encryption_key = derivation::derive_key(&master_key, IDENTITY_ENCRYPTION_CONTEXT)?;
    master_key.zeroize();

    let mut plaintext = encryption::decrypt(&encryption_key, &nonce_bytes, &ciphertext)?;
    encryption_key.zeroize();

    let private_data: IdentityPrivateData = serde_json::from_slice(&plaintext)
        .map_err(|e| AmorceError::SerializationError(format!("identity data: {e}")))?;
    plaintext.zeroize();

    let key_bytes_vec = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        &private_data.signing_key_b64,
    )
    .map_err(|e| AmorceError::InvalidKey(format!("invalid signing key base64: {e}")))?;
    let mut key_bytes: [u8; 32] = key_bytes_vec
        .try_into()
        .map_err(|_| AmorceError::InvalidKey("signing key must be 32 bytes".to_string()))?;

    let identity = IdentityManager::from_parts(
        &key_bytes,
        private_data.created_at,
        private_data.name,
        private_data.rotation_history,
    )?;
    key_bytes.zeroize();

    Ok(identity)
}

/// Read only the public identity document, no passphrase needed.
pub fn read_public_document(path: &Path) -> Result<IdentityDocument> {
    Ok(parse_file(path)?.public_document)
}

fn parse_file(path: &Path) -> Result<AmidFile> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AmorceError::InvalidFileFormat(format!("failed to parse .amid file: {e}")))
}

fn decode_b64(value: &str, field: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, value)
        .map_err(|e| AmorceError::InvalidFileFormat(format!("invalid {field} base64: {e}")))
}

/// Write `data` to `path` through a sibling temp file and rename, so a
/// crash mid-write never leaves a partial file visible. Creates the
/// parent directory if missing.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("amid.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
