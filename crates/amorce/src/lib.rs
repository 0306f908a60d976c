//! Amorce — security layer for AI agents.
//!
//! Wraps any agent executor with a persistent Ed25519 identity, signed
//! tool calls and outputs, human-in-the-loop approval gates, A2A
//! protocol envelopes, and a signed transaction log.

pub mod agent;
pub mod crypto;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod hitl;
pub mod identity;
pub mod record;
pub mod storage;
pub mod time;
pub mod tool;

// Re-export primary types
pub use error::{AmorceError, Result};
pub use identity::{AgentId, IdentityDocument, IdentityManager, RotationReason};

// Re-export agent types
pub use agent::{AmorceAgent, AmorceAgentBuilder, Executor, SecuredResponse};

// Re-export tool and HITL types
pub use hitl::{ApprovalGate, ApprovalRequest, ApprovalStatus, HitlPolicy, MemoryApprovalGate};
pub use tool::{SecuredTool, SignedToolOutput, Tool};

// Re-export envelope and record types
pub use envelope::A2aEnvelope;
pub use record::{RecordKind, TransactionRecord};

// Re-export directory types
pub use directory::{AgentListing, AmorceClient, ClientConfig};
