//! Secured tool execution.
//!
//! A [`Tool`] is anything an agent can invoke. [`SecuredTool`] wraps it
//! with the security layer: the call payload is canonicalized and
//! signed before execution, gated tools wait for human approval, and
//! the output carries the signature as proof of who acted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AmorceError, Result};
use crate::hitl::{await_approval, ApprovalGate, ApprovalRequest, HitlPolicy};
use crate::identity::{AgentId, IdentityManager};

/// A callable tool exposed to an agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the agent and approvers see.
    fn name(&self) -> &str;

    /// One-line description of what the tool does.
    fn description(&self) -> &str;

    /// Cost of one invocation, debited against the agent's budget.
    fn cost(&self) -> f64 {
        0.0
    }

    /// Execute the tool with JSON arguments.
    async fn invoke(&self, args: Value) -> Result<Value>;
}

/// Output of a secured tool call, signed by the calling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedToolOutput {
    /// The tool's result.
    pub result: Value,
    /// Name of the tool that ran.
    pub tool: String,
    /// Identity of the calling agent.
    pub agent_id: AgentId,
    /// Signature over the canonical call payload.
    pub signature: String,
    /// Whether this call went through human approval.
    pub hitl_required: bool,
}

/// A tool wrapped with the Amorce security layer.
///
/// Every call signs the payload `{"tool", "args", "agent_id"}` over its
/// canonical JSON form before the inner tool runs. Gated tools block on
/// [`await_approval`] first; a denied or timed-out approval means the
/// inner tool never runs.
pub struct SecuredTool {
    inner: Arc<dyn Tool>,
    hitl_required: bool,
}

impl SecuredTool {
    /// Wrap a tool. `hitl_required` gates it behind human approval.
    pub fn new(inner: Arc<dyn Tool>, hitl_required: bool) -> Self {
        Self {
            inner,
            hitl_required,
        }
    }

    /// Name of the wrapped tool.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Description of the wrapped tool.
    pub fn description(&self) -> &str {
        self.inner.description()
    }

    /// Cost of one invocation of the wrapped tool.
    pub fn cost(&self) -> f64 {
        self.inner.cost()
    }

    /// Whether this tool is gated behind human approval.
    pub fn hitl_required(&self) -> bool {
        self.hitl_required
    }

    /// Build the payload that gets signed for a call.
    pub fn call_payload(&self, agent_id: &AgentId, args: &Value) -> Value {
        json!({
            "tool": self.inner.name(),
            "args": args,
            "agent_id": agent_id.0,
        })
    }

    /// Execute the wrapped tool with signing and approval gating.
    pub async fn invoke_secured(
        &self,
        identity: &IdentityManager,
        gate: &dyn ApprovalGate,
        policy: &HitlPolicy,
        args: Value,
    ) -> Result<SignedToolOutput> {
        let agent_id = identity.agent_id();
        let payload = self.call_payload(&agent_id, &args);
        let signature = identity.sign_value(&payload);

        if self.hitl_required {
            let request = ApprovalRequest::for_tool(self.inner.name(), payload.clone());
            await_approval(gate, &request, policy).await?;
        }

        log::debug!("invoking tool '{}' as {agent_id}", self.inner.name());
        let result = self
            .inner
            .invoke(args)
            .await
            .map_err(|e| match e {
                failure @ AmorceError::ToolFailed { .. } => failure,
                other => AmorceError::ToolFailed {
                    tool: self.inner.name().to_string(),
                    message: other.to_string(),
                },
            })?;

        Ok(SignedToolOutput {
            result,
            tool: self.inner.name().to_string(),
            agent_id,
            signature,
            hitl_required: self.hitl_required,
        })
    }
}
