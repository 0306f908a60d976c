//! Verification of transaction records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::signing;
use crate::error::Result;
use crate::record::record::TransactionRecord;

/// Outcome of verifying a transaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVerification {
    /// Whether the signature matches the record hash and actor key.
    pub signature_valid: bool,
    /// Whether the stored hash matches the recomputed one.
    pub hash_valid: bool,
    /// Overall verdict.
    pub is_valid: bool,
    /// When verification ran (microseconds since epoch).
    pub verified_at: u64,
}

/// Verify a record's hash and signature.
///
/// Recomputes the record hash from the stored fields, then checks the
/// Ed25519 signature against the actor's embedded public key. A record
/// is valid only if both checks pass.
pub fn verify_record(record: &TransactionRecord) -> Result<RecordVerification> {
    let hash_input = format!(
        "{}:{}:{}:{}:{}:{}",
        record.actor.0,
        record.actor_key,
        record.kind.as_tag(),
        serde_json::to_string(&record.content).unwrap_or_default(),
        record.timestamp,
        record
            .previous_record
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or(""),
    );
    let computed = hex::encode(Sha256::digest(hash_input.as_bytes()));
    let hash_valid = computed == record.record_hash;

    let verifying_key = Ed25519KeyPair::verifying_key_from_base64(&record.actor_key)?;
    let signature_valid = signing::verify_from_base64(
        &verifying_key,
        record.record_hash.as_bytes(),
        &record.signature,
    )
    .is_ok();

    Ok(RecordVerification {
        signature_valid,
        hash_valid,
        is_valid: signature_valid && hash_valid,
        verified_at: crate::time::now_micros(),
    })
}
