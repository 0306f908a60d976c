//! Error types for Amorce.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

/// Amorce error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum AmorceError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Human approval denied for tool: {tool}")]
    ApprovalDenied { tool: String },

    #[error("Human approval expired for tool: {tool}")]
    ApprovalExpired { tool: String },

    #[error("Human approval timed out for tool: {tool}")]
    ApprovalTimeout { tool: String },

    #[error("Operation requires secure mode: {0}")]
    SecureModeRequired(String),

    #[error("Budget exceeded: spent {spent}, next call costs {cost}, budget {budget}")]
    BudgetExceeded { spent: f64, cost: f64, budget: f64 },

    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Executor failed: {0}")]
    ExecutorFailed(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, AmorceError>;
