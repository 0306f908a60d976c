//! Persistence for identities and transaction records.
//!
//! Default root is `~/.amorce/`:
//!
//! ```text
//! ~/.amorce/
//! ├── identity/
//! │   └── {name}.amid
//! └── records/
//!     └── {record_id}.json
//! ```
//!
//! - [`identity_file`] — encrypted `.amid` save/load.
//! - [`record_store`] — CRUD for [`TransactionRecord`]s.
//!
//! [`TransactionRecord`]: crate::record::TransactionRecord

pub mod identity_file;
pub mod record_store;

pub use identity_file::{
    load_identity, read_public_document, save_identity, AmidFile, EncryptionMetadata,
};
pub use record_store::RecordStore;
