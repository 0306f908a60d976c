//! Builder for [`AmorceAgent`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AmorceAgent, Executor};
use crate::directory::AmorceClient;
use crate::error::{AmorceError, Result};
use crate::hitl::{ApprovalGate, HitlPolicy, MemoryApprovalGate};
use crate::identity::IdentityManager;
use crate::tool::Tool;

/// Builds an [`AmorceAgent`] around an executor.
///
/// Secure mode is the default: a fresh identity is generated unless one
/// is supplied. Turning security off drops signing, records, HITL, and
/// directory access entirely.
pub struct AmorceAgentBuilder {
    executor: Arc<dyn Executor>,
    tools: Vec<Arc<dyn Tool>>,
    secure: bool,
    identity: Option<IdentityManager>,
    hitl_required: Vec<String>,
    hitl_timeout: Option<Duration>,
    hitl_poll_interval: Option<Duration>,
    a2a_compatible: bool,
    approval_gate: Option<Arc<dyn ApprovalGate>>,
    max_budget: Option<f64>,
    client: Option<AmorceClient>,
    name: Option<String>,
    role: Option<String>,
}

impl AmorceAgentBuilder {
    /// Start building around an executor.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            tools: Vec::new(),
            secure: true,
            identity: None,
            hitl_required: Vec::new(),
            hitl_timeout: None,
            hitl_poll_interval: None,
            a2a_compatible: true,
            approval_gate: None,
            max_budget: None,
            client: None,
            name: None,
            role: None,
        }
    }

    /// Register a tool the agent may call.
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Register several tools at once.
    pub fn tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        self.tools.extend(tools);
        self
    }

    /// Enable or disable the security layer. On by default.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Use an existing identity instead of generating one.
    pub fn identity(mut self, identity: IdentityManager) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Name the tools that need human approval before running.
    pub fn hitl_required<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hitl_required
            .extend(tools.into_iter().map(Into::into));
        self
    }

    /// Override the approval timeout and poll interval.
    pub fn hitl_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.hitl_timeout = Some(timeout);
        self.hitl_poll_interval = Some(poll_interval);
        self
    }

    /// Enable or disable A2A envelope framing. On by default.
    pub fn a2a_compatible(mut self, enabled: bool) -> Self {
        self.a2a_compatible = enabled;
        self
    }

    /// Supply the source of approval verdicts.
    ///
    /// Defaults to an in-process [`MemoryApprovalGate`]. Use an
    /// [`AmorceClient`] to route approvals through the orchestrator.
    pub fn approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.approval_gate = Some(gate);
        self
    }

    /// Cap the cumulative cost of tool calls.
    pub fn max_budget(mut self, budget: f64) -> Self {
        self.max_budget = Some(budget);
        self
    }

    /// Attach a Trust Directory client for register and discover.
    pub fn client(mut self, client: AmorceClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the agent's human-readable name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the agent's declared role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Build the agent.
    ///
    /// Fails if HITL gating is requested without secure mode.
    pub fn build(self) -> Result<AmorceAgent> {
        if !self.secure && !self.hitl_required.is_empty() {
            return Err(AmorceError::SecureModeRequired(
                "HITL gating needs a signed identity".into(),
            ));
        }

        let identity = if self.secure {
            Some(
                self.identity
                    .unwrap_or_else(|| IdentityManager::generate(self.name.clone())),
            )
        } else {
            None
        };

        let mut policy = HitlPolicy::new(self.hitl_required);
        if let Some(timeout) = self.hitl_timeout {
            policy = policy.with_timeout(timeout);
        }
        if let Some(interval) = self.hitl_poll_interval {
            policy = policy.with_poll_interval(interval);
        }

        let gate = self
            .approval_gate
            .unwrap_or_else(|| Arc::new(MemoryApprovalGate::new()));

        let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();
        for tool in self.tools {
            tools.insert(tool.name().to_string(), tool);
        }

        Ok(AmorceAgent::from_builder(
            self.executor,
            tools,
            identity,
            policy,
            gate,
            self.a2a_compatible,
            self.max_budget,
            self.client,
            self.name,
            self.role,
        ))
    }
}
