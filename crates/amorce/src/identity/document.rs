//! Public identity document — the shareable half of an identity.
//!
//! The document carries no private key material. It is self-signed so a
//! Trust Directory (or any peer) can check that whoever published it
//! controls the key it names.

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::signing;
use crate::error::{AmorceError, Result};

use super::manager::{AgentId, RotationReason};

/// Public identity document (shareable, does not contain private keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub id: AgentId,
    pub public_key: String,
    pub algorithm: String,
    pub created_at: u64,
    pub name: Option<String>,
    pub rotation_history: Vec<PublicKeyRotation>,
    pub attestations: Vec<Attestation>,
    pub signature: String,
}

impl IdentityDocument {
    /// Verify the self-signature on this document.
    pub fn verify_signature(&self) -> Result<()> {
        if self.algorithm != "ed25519" {
            return Err(AmorceError::InvalidKey(format!(
                "unsupported algorithm: {}",
                self.algorithm
            )));
        }

        let verifying_key = Ed25519KeyPair::verifying_key_from_base64(&self.public_key)?;

        let payload = DocumentSignPayload::from(self);
        let to_verify = serde_json::to_string(&payload)
            .map_err(|e| AmorceError::SerializationError(e.to_string()))?;

        signing::verify_from_base64(&verifying_key, to_verify.as_bytes(), &self.signature)
    }
}

/// Payload used for document self-signature (excludes the signature field).
#[derive(Serialize)]
pub(crate) struct DocumentSignPayload {
    id: String,
    public_key: String,
    algorithm: String,
    created_at: u64,
    name: Option<String>,
}

impl From<&IdentityDocument> for DocumentSignPayload {
    fn from(doc: &IdentityDocument) -> Self {
        Self {
            id: doc.id.0.clone(),
            public_key: doc.public_key.clone(),
            algorithm: doc.algorithm.clone(),
            created_at: doc.created_at,
            name: doc.name.clone(),
        }
    }
}

/// Public view of key rotation (no private data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyRotation {
    pub previous_key: String,
    pub new_key: String,
    pub rotated_at: u64,
    pub reason: RotationReason,
    pub authorization_signature: String,
}

/// Attestation from another identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub attester: AgentId,
    pub attester_key: String,
    pub claim: AttestationClaim,
    pub attested_at: u64,
    pub signature: String,
}

/// Types of attestations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttestationClaim {
    KeyOwnership,
    NameVerification { name: String },
    OrganizationMembership { org: String },
    Custom { claim_type: String, claim_value: String },
}
