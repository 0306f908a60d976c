//! Identity manager — the root agent identity.
//!
//! Holds the Ed25519 key pair behind an agent, signs messages and
//! structured payloads, derives scoped child keys, and records key
//! rotations signed by the outgoing key.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::{canonical, derivation, signing};
use crate::error::Result;

use super::document::{DocumentSignPayload, IdentityDocument};

/// Unique identifier for an agent.
///
/// Format: `agt_` + base58 of first 16 bytes of SHA-256(public_key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Compute an agent ID from a verifying (public) key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let hash = Sha256::digest(key.as_bytes());
        let truncated = &hash[..16];
        let encoded = bs58::encode(truncated).into_string();
        Self(format!("agt_{encoded}"))
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The root identity behind an agent.
///
/// The signing key is zeroized on drop to prevent leakage.
pub struct IdentityManager {
    /// The root key pair.
    key_pair: Ed25519KeyPair,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Human-readable name (optional).
    pub name: Option<String>,
    /// Key rotation history.
    pub rotation_history: Vec<KeyRotation>,
}

impl IdentityManager {
    /// Generate a new identity with a fresh key pair.
    pub fn generate(name: Option<String>) -> Self {
        Self {
            key_pair: Ed25519KeyPair::generate(),
            created_at: crate::time::now_micros(),
            name,
            rotation_history: Vec::new(),
        }
    }

    /// Reconstruct from existing key bytes and metadata.
    pub fn from_parts(
        signing_key_bytes: &[u8; 32],
        created_at: u64,
        name: Option<String>,
        rotation_history: Vec<KeyRotation>,
    ) -> Result<Self> {
        let key_pair = Ed25519KeyPair::from_signing_key_bytes(signing_key_bytes)?;
        Ok(Self {
            key_pair,
            created_at,
            name,
            rotation_history,
        })
    }

    /// Return the agent ID (derived from the public key).
    pub fn agent_id(&self) -> AgentId {
        AgentId::from_verifying_key(self.key_pair.verifying_key())
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        self.key_pair.signing_key()
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key_pair.verifying_key()
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.key_pair.signing_key_bytes()
    }

    /// Return the verifying key bytes.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.key_pair.verifying_key_bytes()
    }

    /// Return the public key as base64.
    pub fn public_key_base64(&self) -> String {
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            self.verifying_key_bytes(),
        )
    }

    /// Sign a message, returning the signature as base64.
    pub fn sign(&self, message: &[u8]) -> String {
        signing::sign_to_base64(self.signing_key(), message)
    }

    /// Sign a structured payload over its canonical JSON form.
    ///
    /// Key order in the input does not affect the signature.
    pub fn sign_value(&self, value: &Value) -> String {
        let canonical = canonical::canonicalize(value);
        self.sign(canonical.as_bytes())
    }

    /// Verify a base64 signature made by this identity.
    pub fn verify(&self, message: &[u8], signature_b64: &str) -> Result<()> {
        signing::verify_from_base64(self.verifying_key(), message, signature_b64)
    }

    /// Derive a scoped signing key for a session.
    pub fn derive_session_key(&self, session_id: &str) -> Result<SigningKey> {
        let root = self.signing_key_bytes();
        let ctx = derivation::session_context(session_id);
        derivation::derive_signing_key(&root, &ctx)
    }

    /// Derive a scoped signing key for a tool.
    pub fn derive_tool_key(&self, tool_name: &str) -> Result<SigningKey> {
        let root = self.signing_key_bytes();
        let ctx = derivation::tool_context(tool_name);
        derivation::derive_signing_key(&root, &ctx)
    }

    /// Rotate the root key. Returns the new identity with the old key
    /// recorded in rotation history, authorization signed by the old key.
    pub fn rotate(&self, reason: RotationReason) -> Result<Self> {
        let old_pub_b64 = self.public_key_base64();
        let new_kp = Ed25519KeyPair::generate();
        let new_pub_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            new_kp.verifying_key_bytes(),
        );
        let now = crate::time::now_micros();

        let auth_message = format!(
            "rotate:{old_pub_b64}:{new_pub_b64}:{now}:{}",
            reason.as_str()
        );
        let auth_sig = signing::sign_to_base64(self.signing_key(), auth_message.as_bytes());

        let rotation = KeyRotation {
            previous_key: old_pub_b64,
            new_key: new_pub_b64,
            rotated_at: now,
            reason,
            authorization_signature: auth_sig,
        };

        let mut history = self.rotation_history.clone();
        history.push(rotation);

        Ok(Self {
            key_pair: new_kp,
            created_at: self.created_at,
            name: self.name.clone(),
            rotation_history: history,
        })
    }

    /// Generate the public identity document, self-signed.
    pub fn to_document(&self) -> IdentityDocument {
        let mut doc = IdentityDocument {
            id: self.agent_id(),
            public_key: self.public_key_base64(),
            algorithm: "ed25519".to_string(),
            created_at: self.created_at,
            name: self.name.clone(),
            rotation_history: self
                .rotation_history
                .iter()
                .map(|r| r.public_view())
                .collect(),
            attestations: Vec::new(),
            signature: String::new(),
        };

        let to_sign = serde_json::to_string(&DocumentSignPayload::from(&doc)).unwrap_or_default();
        doc.signature = signing::sign_to_base64(self.signing_key(), to_sign.as_bytes());

        doc
    }
}

/// Record of a key rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRotation {
    pub previous_key: String,
    pub new_key: String,
    pub rotated_at: u64,
    pub reason: RotationReason,
    pub authorization_signature: String,
}

impl KeyRotation {
    /// Return the public view for inclusion in an identity document.
    pub fn public_view(&self) -> super::document::PublicKeyRotation {
        super::document::PublicKeyRotation {
            previous_key: self.previous_key.clone(),
            new_key: self.new_key.clone(),
            rotated_at: self.rotated_at,
            reason: self.reason.clone(),
            authorization_signature: self.authorization_signature.clone(),
        }
    }
}

impl Zeroize for KeyRotation {
    fn zeroize(&mut self) {
        self.authorization_signature.zeroize();
    }
}

/// Reason for key rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RotationReason {
    Scheduled,
    Compromised,
    PolicyRequired,
    Manual,
}

impl RotationReason {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Compromised => "compromised",
            Self::PolicyRequired => "policy_required",
            Self::Manual => "manual",
        }
    }
}
