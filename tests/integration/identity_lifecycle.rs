//! Integration test: identity lifecycle.
//!
//! Creates an identity, persists it encrypted, reloads it, rotates
//! keys, and checks that signatures and documents survive the round
//! trips.

use amorce::identity::{IdentityManager, RotationReason};
use amorce::record::{verify_record, RecordBuilder, RecordContent, RecordKind};
use amorce::storage::{load_identity, read_public_document, save_identity, RecordStore};

#[test]
fn identity_lifecycle_create_save_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.amid");
    let passphrase = "integration-test-passphrase";

    // Create and persist
    let identity = IdentityManager::generate(Some("lifecycle".to_string()));
    let original_id = identity.agent_id();
    save_identity(&identity, &path, passphrase).expect("save should succeed");

    // Public document is readable without the passphrase and self-signed
    let doc = read_public_document(&path).unwrap();
    assert_eq!(doc.id, original_id);
    assert_eq!(doc.algorithm, "ed25519");
    assert!(doc.verify_signature().is_ok());

    // Reload: same identity, signatures still verify
    let loaded = load_identity(&path, passphrase).expect("load should succeed");
    assert_eq!(loaded.agent_id(), original_id);

    let signature = identity.sign(b"cross-instance message");
    assert!(loaded.verify(b"cross-instance message", &signature).is_ok());

    // Rotate: new key, history grows, old signatures no longer verify
    // against the new key
    let rotated = loaded.rotate(RotationReason::Scheduled).unwrap();
    assert_ne!(rotated.agent_id(), original_id);
    assert_eq!(rotated.rotation_history.len(), 1);
    assert!(rotated.verify(b"cross-instance message", &signature).is_err());

    // Rotated identity persists with its history
    save_identity(&rotated, &path, passphrase).unwrap();
    let reloaded = load_identity(&path, passphrase).unwrap();
    assert_eq!(reloaded.rotation_history.len(), 1);
    assert_eq!(
        reloaded.rotation_history[0].reason,
        RotationReason::Scheduled
    );
}

#[test]
fn wrong_passphrase_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.amid");

    let identity = IdentityManager::generate(None);
    save_identity(&identity, &path, "correct").unwrap();

    assert!(load_identity(&path, "incorrect").is_err());
}

#[test]
fn record_chain_survives_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("records")).unwrap();
    let identity = IdentityManager::generate(Some("recorder".to_string()));

    // Build a three-record chain
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
        RecordContent::new("called get_weather"),
    )
    .chain_to(r1.id.clone())
    .sign(identity.signing_key())
    .unwrap();

    let r3 = RecordBuilder::new(
        identity.agent_id(),
        RecordKind::RunComplete,
        RecordContent::new("run completed"),
    )
    .chain_to(r2.id.clone())
    .sign(identity.signing_key())
    .unwrap();

    for record in [&r1, &r2, &r3] {
        store.save(record).unwrap();
    }

    // Reload and walk the chain backwards from the tail
    let tail = store.load(&r3.id).unwrap();
    let mid = store.load(tail.previous_record.as_ref().unwrap()).unwrap();
    let head = store.load(mid.previous_record.as_ref().unwrap()).unwrap();

    assert_eq!(head.id, r1.id);
    assert!(head.previous_record.is_none());

    for record in [&head, &mid, &tail] {
        assert!(verify_record(record).unwrap().is_valid);
    }
}

#[test]
fn tampered_record_detected_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path()).unwrap();
    let identity = IdentityManager::generate(None);

    let record = RecordBuilder::new(
        identity.agent_id(),
        RecordKind::ToolCall,
        RecordContent::new("innocuous action"),
    )
    .sign(identity.signing_key())
    .unwrap();
    store.save(&record).unwrap();

    let mut loaded = store.load(&record.id).unwrap();
    loaded.content.description = "malicious action".to_string();

    let verification = verify_record(&loaded).unwrap();
    assert!(!verification.hash_valid);
    assert!(!verification.is_valid);
}
