//! Signed transaction records — the audit trail of a secured agent.
//!
//! Every run and every secured tool call leaves a signed record. Records
//! chain to their predecessor within a run, so the full sequence of
//! actions is tamper-evident.

pub mod record;
pub mod verify;

pub use record::{RecordBuilder, RecordContent, RecordId, RecordKind, TransactionRecord};
pub use verify::{verify_record, RecordVerification};
