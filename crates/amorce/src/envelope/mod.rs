//! A2A protocol envelope with Amorce signatures.
//!
//! Combines A2A protocol messaging with the Amorce security layer.
//! The wire format is fixed:
//!
//! ```json
//! {
//!     "protocol": "a2a/1.0",
//!     "security": {
//!         "layer": "amorce/3.0",
//!         "sender_id": "agt_...",
//!         "signature": "<base64>",
//!         "algorithm": "ed25519"
//!     },
//!     "payload": { "message": "..." },
//!     "metadata": { "timestamp": "<RFC 3339 UTC>", "version": "1.0" }
//! }
//! ```
//!
//! The signature covers the payload message bytes. Verification needs
//! the sender's public key, resolved out of band (identity document or
//! Trust Directory lookup).

use ed25519_dalek::VerifyingKey;
use serde_json::{json, Value};

use crate::crypto::signing;
use crate::error::{AmorceError, Result};
use crate::identity::{AgentId, IdentityManager};

/// Current A2A protocol version.
pub const A2A_PROTOCOL_VERSION: &str = "a2a/1.0";

/// Current Amorce security layer version.
pub const AMORCE_SECURITY_LAYER: &str = "amorce/3.0";

/// Signature algorithm carried in the security block.
const ENVELOPE_ALGORITHM: &str = "ed25519";

/// Metadata version string.
const METADATA_VERSION: &str = "1.0";

/// An A2A-compatible message envelope with an Amorce signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A2aEnvelope {
    pub sender_id: AgentId,
    pub message: String,
    pub signature: String,
    pub protocol_version: String,
    pub security_layer: String,
}

impl A2aEnvelope {
    /// Sign `message` with the sender's identity and build the envelope.
    pub fn seal(identity: &IdentityManager, message: impl Into<String>) -> Self {
        let message = message.into();
        let signature = identity.sign(message.as_bytes());
        Self {
            sender_id: identity.agent_id(),
            message,
            signature,
            protocol_version: A2A_PROTOCOL_VERSION.to_string(),
            security_layer: AMORCE_SECURITY_LAYER.to_string(),
        }
    }

    /// Build an envelope from already-computed parts (e.g. parsed input).
    pub fn from_parts(sender_id: AgentId, message: String, signature: String) -> Self {
        Self {
            sender_id,
            message,
            signature,
            protocol_version: A2A_PROTOCOL_VERSION.to_string(),
            security_layer: AMORCE_SECURITY_LAYER.to_string(),
        }
    }

    /// Convert to the A2A message format.
    pub fn to_value(&self) -> Value {
        json!({
            "protocol": self.protocol_version,
            "security": {
                "layer": self.security_layer,
                "sender_id": self.sender_id.0,
                "signature": self.signature,
                "algorithm": ENVELOPE_ALGORITHM,
            },
            "payload": {
                "message": self.message,
            },
            "metadata": {
                "timestamp": crate::time::now_rfc3339(),
                "version": METADATA_VERSION,
            },
        })
    }

    /// Serialize to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value())
            .map_err(|e| AmorceError::SerializationError(e.to_string()))
    }

    /// Parse an A2A message with an Amorce signature.
    ///
    /// `protocol` and `security.layer` fall back to the current versions
    /// when absent; `sender_id`, `signature`, and `payload.message` are
    /// required. An `algorithm` other than ed25519 is rejected.
    pub fn from_value(data: &Value) -> Result<Self> {
        let security = data
            .get("security")
            .ok_or_else(|| AmorceError::InvalidEnvelope("missing security block".into()))?;

        if let Some(alg) = security.get("algorithm").and_then(Value::as_str) {
            if alg != ENVELOPE_ALGORITHM {
                return Err(AmorceError::InvalidEnvelope(format!(
                    "unsupported algorithm: {alg}"
                )));
            }
        }

        let sender_id = security
            .get("sender_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AmorceError::InvalidEnvelope("missing security.sender_id".into()))?;

        let signature = security
            .get("signature")
            .and_then(Value::as_str)
            .ok_or_else(|| AmorceError::InvalidEnvelope("missing security.signature".into()))?;

        let message = data
            .get("payload")
            .and_then(|p| p.get("message"))
            .and_then(Value::as_str)
            .ok_or_else(|| AmorceError::InvalidEnvelope("missing payload.message".into()))?;

        let protocol_version = data
            .get("protocol")
            .and_then(Value::as_str)
            .unwrap_or(A2A_PROTOCOL_VERSION)
            .to_string();

        let security_layer = security
            .get("layer")
            .and_then(Value::as_str)
            .unwrap_or(AMORCE_SECURITY_LAYER)
            .to_string();

        Ok(Self {
            sender_id: AgentId(sender_id.to_string()),
            message: message.to_string(),
            signature: signature.to_string(),
            protocol_version,
            security_layer,
        })
    }

    /// Parse from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(json_str)
            .map_err(|e| AmorceError::InvalidEnvelope(format!("invalid JSON: {e}")))?;
        Self::from_value(&data)
    }

    /// Verify the envelope signature against the sender's public key.
    pub fn verify_with_key(&self, sender_key: &VerifyingKey) -> Result<()> {
        signing::verify_from_base64(sender_key, self.message.as_bytes(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seal_and_verify() {
        let identity = IdentityManager::generate(Some("sender".to_string()));
        let envelope = A2aEnvelope::seal(&identity, "What's the weather?");

        assert_eq!(envelope.sender_id, identity.agent_id());
        assert_eq!(envelope.protocol_version, "a2a/1.0");
        assert_eq!(envelope.security_layer, "amorce/3.0");
        assert!(envelope.verify_with_key(identity.verifying_key()).is_ok());
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let sender = IdentityManager::generate(None);
        let other = IdentityManager::generate(None);
        let envelope = A2aEnvelope::seal(&sender, "hello");
        assert!(envelope.verify_with_key(other.verifying_key()).is_err());
    }

    #[test]
    fn test_tampered_message_fails() {
        let sender = IdentityManager::generate(None);
        let mut envelope = A2aEnvelope::seal(&sender, "transfer 10 credits");
        envelope.message = "transfer 9999 credits".to_string();
        assert!(envelope.verify_with_key(sender.verifying_key()).is_err());
    }

    #[test]
    fn test_wire_format() {
        let identity = IdentityManager::generate(None);
        let envelope = A2aEnvelope::seal(&identity, "Hello");
        let value = envelope.to_value();

        assert_eq!(value["protocol"], "a2a/1.0");
        assert_eq!(value["security"]["layer"], "amorce/3.0");
        assert_eq!(value["security"]["algorithm"], "ed25519");
        assert_eq!(value["security"]["sender_id"], identity.agent_id().0);
        assert_eq!(value["payload"]["message"], "Hello");
        assert_eq!(value["metadata"]["version"], "1.0");
        assert!(value["metadata"]["timestamp"].as_str().is_some());
    }

    #[test]
    fn test_json_roundtrip() {
        let identity = IdentityManager::generate(None);
        let envelope = A2aEnvelope::seal(&identity, "Hello");

        let json = envelope.to_json().unwrap();
        let parsed = A2aEnvelope::from_json(&json).unwrap();

        assert_eq!(parsed, envelope);
        assert!(parsed.verify_with_key(identity.verifying_key()).is_ok());
    }

    #[test]
    fn test_parse_defaults() {
        // Minimal message without protocol or layer fields
        let data = json!({
            "security": { "sender_id": "agt_x", "signature": "sig" },
            "payload": { "message": "hi" },
        });
        let envelope = A2aEnvelope::from_value(&data).unwrap();
        assert_eq!(envelope.protocol_version, "a2a/1.0");
        assert_eq!(envelope.security_layer, "amorce/3.0");
    }

    #[test]
    fn test_parse_missing_security_fails() {
        let data = json!({ "payload": { "message": "hi" } });
        assert!(A2aEnvelope::from_value(&data).is_err());
    }

    #[test]
    fn test_parse_missing_message_fails() {
        let data = json!({
            "security": { "sender_id": "agt_x", "signature": "sig" },
            "payload": {},
        });
        assert!(A2aEnvelope::from_value(&data).is_err());
    }

    #[test]
    fn test_parse_unknown_algorithm_fails() {
        let data = json!({
            "security": {
                "sender_id": "agt_x",
                "signature": "sig",
                "algorithm": "rsa"
            },
            "payload": { "message": "hi" },
        });
        assert!(A2aEnvelope::from_value(&data).is_err());
    }
}
