//! Transaction record — signed proof of an agent action.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::signing;
use crate::error::Result;
use crate::identity::AgentId;

/// Unique identifier for a transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of action being recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordKind {
    RunStart,
    ToolCall,
    RunComplete,
    Custom(String),
}

impl RecordKind {
    /// Return a stable string tag for hashing.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::RunStart => "run_start",
            Self::ToolCall => "tool_call",
            Self::RunComplete => "run_complete",
            Self::Custom(s) => s.as_str(),
        }
    }
}

/// Content of a recorded action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordContent {
    /// Human-readable description.
    pub description: String,
    /// Structured data (kind-specific).
    pub data: Option<serde_json::Value>,
}

impl RecordContent {
    /// Create a simple record content with just a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            data: None,
        }
    }

    /// Create record content with description and structured data.
    pub fn with_data(description: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            description: description.into(),
            data: Some(data),
        }
    }
}

/// A signed record proving an agent took an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub actor: AgentId,
    pub actor_key: String,
    pub kind: RecordKind,
    pub content: RecordContent,
    pub timestamp: u64,
    pub previous_record: Option<RecordId>,
    pub record_hash: String,
    pub signature: String,
}

/// Builder for creating transaction records.
pub struct RecordBuilder {
    actor: AgentId,
    kind: RecordKind,
    content: RecordContent,
    previous_record: Option<RecordId>,
}

impl RecordBuilder {
    /// Start building a record for an action.
    pub fn new(actor: AgentId, kind: RecordKind, content: RecordContent) -> Self {
        Self {
            actor,
            kind,
            content,
            previous_record: None,
        }
    }

    /// Chain this record to a previous one.
    pub fn chain_to(mut self, previous: RecordId) -> Self {
        self.previous_record = Some(previous);
        self
    }

    /// Sign and finalize the record.
    pub fn sign(self, signing_key: &SigningKey) -> Result<TransactionRecord> {
        let now = crate::time::now_micros();
        let actor_key = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            signing_key.verifying_key().to_bytes(),
        );

        // Hash over all content fields
        let hash_input = format!(
            "{}:{}:{}:{}:{}:{}",
            self.actor.0,
            actor_key,
            self.kind.as_tag(),
            serde_json::to_string(&self.content).unwrap_or_default(),
            now,
            self.previous_record
                .as_ref()
                .map(|r| r.0.as_str())
                .unwrap_or(""),
        );
        let record_hash = hex::encode(Sha256::digest(hash_input.as_bytes()));

        // Generate record ID from the hash
        let id_hash = Sha256::digest(record_hash.as_bytes());
        let id_encoded = bs58::encode(&id_hash[..16]).into_string();
        let id = RecordId(format!("atx_{id_encoded}"));

        let signature = signing::sign_to_base64(signing_key, record_hash.as_bytes());

        Ok(TransactionRecord {
            id,
            actor: self.actor,
            actor_key,
            kind: self.kind,
            content: self.content,
            timestamp: now,
            previous_record: self.previous_record,
            record_hash,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityManager;

    #[test]
    fn test_record_create() {
        let identity = IdentityManager::generate(Some("test".into()));
        let record = RecordBuilder::new(
            identity.agent_id(),
            RecordKind::ToolCall,
            RecordContent::new("called search tool"),
        )
        .sign(identity.signing_key())
        .unwrap();

        assert!(record.id.0.starts_with("atx_"));
        assert!(!record.record_hash.is_empty());
        assert!(!record.signature.is_empty());
        assert_eq!(record.actor, identity.agent_id());
    }

    #[test]
    fn test_record_chain() {
        let identity = IdentityManager::generate(None);
        let r1 = RecordBuilder::new(
            identity.agent_id(),
            RecordKind::RunStart,
            RecordContent::new("run started"),
        )
        .sign(identity.signing_key())
        .unwrap();

        let r2 = RecordBuilder::new(
            identity.agent_id(),
            RecordKind::ToolCall,
            RecordContent::new("called search"),
        )
        .chain_to(r1.id.clone())
        .sign(identity.signing_key())
        .unwrap();

        assert_eq!(r2.previous_record.as_ref().unwrap(), &r1.id);
    }

    #[test]
    fn test_record_with_data() {
        let identity = IdentityManager::generate(None);
        let record = RecordBuilder::new(
            identity.agent_id(),
            RecordKind::ToolCall,
            RecordContent::with_data(
                "called send_email",
                serde_json::json!({"tool": "send_email", "hitl": true}),
            ),
        )
        .sign(identity.signing_key())
        .unwrap();

        assert!(record.content.data.is_some());
    }

    #[test]
    fn test_record_kinds() {
        let identity = IdentityManager::generate(None);
        for kind in [
            RecordKind::RunStart,
            RecordKind::ToolCall,
            RecordKind::RunComplete,
            RecordKind::Custom("audit".into()),
        ] {
            let record = RecordBuilder::new(
                identity.agent_id(),
                kind.clone(),
                RecordContent::new("test"),
            )
            .sign(identity.signing_key())
            .unwrap();
            assert_eq!(record.kind, kind);
        }
    }
}
