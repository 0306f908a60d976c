//! Approval gates and the polling loop.
//!
//! An [`ApprovalGate`] submits an approval request and answers status
//! checks. [`await_approval`] drives the poll loop: it keeps asking
//! until the verdict is terminal or the policy timeout passes. The
//! caller must not run the gated tool unless the loop returns `Ok`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AmorceError, Result};
use crate::hitl::policy::HitlPolicy;

/// Unique identifier for an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request for human approval of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Name of the tool awaiting approval.
    pub tool: String,
    /// One-line summary shown to the approver.
    pub summary: String,
    /// Structured call details (tool, args, agent_id).
    pub details: Value,
    /// Request timestamp (microseconds since epoch).
    pub requested_at: u64,
}

impl ApprovalRequest {
    /// Build a request for a tool call.
    pub fn for_tool(tool: impl Into<String>, details: Value) -> Self {
        let tool = tool.into();
        Self {
            summary: format!("Approve {tool} execution"),
            tool,
            details,
            requested_at: crate::time::now_micros(),
        }
    }
}

/// Status of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Parse a status from its wire form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(AmorceError::Directory(format!(
                "unknown approval status: {other}"
            ))),
        }
    }
}

/// Source of human approval verdicts.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Submit an approval request, returning its ID.
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalId>;

    /// Check the current status of a request.
    async fn check_approval(&self, id: &ApprovalId) -> Result<ApprovalStatus>;
}

/// Poll the gate until the request is resolved or the policy timeout passes.
///
/// Returns `Ok(())` only on approval. Rejection, expiry, and timeout map
/// to `ApprovalDenied`, `ApprovalExpired`, and `ApprovalTimeout`; in all
/// three cases the gated tool must not run.
pub async fn await_approval(
    gate: &dyn ApprovalGate,
    request: &ApprovalRequest,
    policy: &HitlPolicy,
) -> Result<()> {
    let id = gate.request_approval(request).await?;
    log::info!("approval requested for tool '{}' ({id})", request.tool);

    let deadline = tokio::time::Instant::now() + policy.timeout;

    loop {
        match gate.check_approval(&id).await? {
            ApprovalStatus::Approved => {
                log::info!("approval granted for tool '{}'", request.tool);
                return Ok(());
            }
            ApprovalStatus::Rejected => {
                log::warn!("approval denied for tool '{}'", request.tool);
                return Err(AmorceError::ApprovalDenied {
                    tool: request.tool.clone(),
                });
            }
            ApprovalStatus::Expired => {
                return Err(AmorceError::ApprovalExpired {
                    tool: request.tool.clone(),
                });
            }
            ApprovalStatus::Pending => {
                if tokio::time::Instant::now() >= deadline {
                    return Err(AmorceError::ApprovalTimeout {
                        tool: request.tool.clone(),
                    });
                }
                tokio::time::sleep(policy.poll_interval).await;
            }
        }
    }
}

/// In-process approval gate.
///
/// Holds requests in memory until resolved through [`resolve`]; useful
/// for embedders that present their own approval UI, and for tests.
/// Auto-deciding variants resolve every request at submission time.
///
/// [`resolve`]: MemoryApprovalGate::resolve
pub struct MemoryApprovalGate {
    state: Mutex<GateState>,
    auto_decision: Option<ApprovalStatus>,
}

struct GateState {
    statuses: HashMap<ApprovalId, ApprovalStatus>,
    requests: Vec<(ApprovalId, ApprovalRequest)>,
}

impl MemoryApprovalGate {
    /// Create a gate that holds requests pending until resolved.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                statuses: HashMap::new(),
                requests: Vec::new(),
            }),
            auto_decision: None,
        }
    }

    /// Create a gate that approves every request immediately.
    pub fn approving() -> Self {
        Self {
            auto_decision: Some(ApprovalStatus::Approved),
            ..Self::new()
        }
    }

    /// Create a gate that rejects every request immediately.
    pub fn rejecting() -> Self {
        Self {
            auto_decision: Some(ApprovalStatus::Rejected),
            ..Self::new()
        }
    }

    /// Resolve a pending request with a verdict.
    pub fn resolve(&self, id: &ApprovalId, status: ApprovalStatus) -> Result<()> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        match state.statuses.get_mut(id) {
            Some(current) => {
                *current = status;
                Ok(())
            }
            None => Err(AmorceError::NotFound(format!("approval {id}"))),
        }
    }

    /// Return the pending requests in submission order.
    pub fn pending_requests(&self) -> Vec<(ApprovalId, ApprovalRequest)> {
        let state = self.state.lock().expect("gate lock poisoned");
        state
            .requests
            .iter()
            .filter(|(id, _)| state.statuses.get(id) == Some(&ApprovalStatus::Pending))
            .cloned()
            .collect()
    }
}

impl Default for MemoryApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalGate for MemoryApprovalGate {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalId> {
        let digest = Sha256::digest(
            format!("{}:{}:{}", request.tool, request.details, request.requested_at).as_bytes(),
        );
        let id = ApprovalId(format!("appr_{}", bs58::encode(&digest[..16]).into_string()));

        let mut state = self.state.lock().expect("gate lock poisoned");
        let status = self.auto_decision.unwrap_or(ApprovalStatus::Pending);
        state.statuses.insert(id.clone(), status);
        state.requests.push((id.clone(), request.clone()));
        Ok(id)
    }

    async fn check_approval(&self, id: &ApprovalId) -> Result<ApprovalStatus> {
        let state = self.state.lock().expect("gate lock poisoned");
        state
            .statuses
            .get(id)
            .copied()
            .ok_or_else(|| AmorceError::NotFound(format!("approval {id}")))
    }
}
