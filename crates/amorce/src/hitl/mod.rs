//! Human-in-the-loop approval gating.
//!
//! Sensitive tool calls are intercepted before execution and held until
//! a human verdict arrives. The verdict comes through an
//! [`ApprovalGate`]: either the orchestrator service (network) or an
//! in-process [`MemoryApprovalGate`] for embedders running without one.

pub mod gate;
pub mod policy;

pub use gate::{
    await_approval, ApprovalGate, ApprovalId, ApprovalRequest, ApprovalStatus, MemoryApprovalGate,
};
pub use policy::HitlPolicy;
