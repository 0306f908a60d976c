//! The secured agent facade.
//!
//! [`AmorceAgent`] wraps any [`Executor`] with the security layer: runs
//! are sealed in A2A envelopes, outputs are signed, tool calls go
//! through [`SecuredTool`], and every action leaves a chained
//! [`TransactionRecord`].

pub mod builder;

pub use builder::AmorceAgentBuilder;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::directory::{AgentListing, AmorceClient};
use crate::envelope::{A2aEnvelope, A2A_PROTOCOL_VERSION, AMORCE_SECURITY_LAYER};
use crate::error::{AmorceError, Result};
use crate::hitl::{ApprovalGate, HitlPolicy};
use crate::identity::{AgentId, IdentityManager};
use crate::record::{RecordBuilder, RecordContent, RecordId, RecordKind, TransactionRecord};
use crate::tool::{SecuredTool, SignedToolOutput, Tool};

/// Whatever actually runs the prompt (an LLM chain, a local model, a
/// deterministic pipeline). Amorce wraps it; it never inspects it.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a prompt to completion and return the output text.
    async fn run(&self, prompt: &str) -> Result<String>;
}

/// A run result carrying the security layer's proof of origin.
///
/// The proof fields are set only for secure, A2A-compatible runs;
/// every other combination produces a plain output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuredResponse {
    /// The executor's output.
    pub output: String,
    /// Identity of the agent that produced it.
    pub agent_id: Option<AgentId>,
    /// Signature over the output bytes.
    pub signature: Option<String>,
    /// A2A protocol version.
    pub protocol: Option<String>,
    /// Amorce security layer version.
    pub security_layer: Option<String>,
}

impl SecuredResponse {
    fn plain(output: String) -> Self {
        Self {
            output,
            agent_id: None,
            signature: None,
            protocol: None,
            security_layer: None,
        }
    }
}

struct BudgetState {
    spent: f64,
}

/// An executor wrapped with the Amorce security layer.
pub struct AmorceAgent {
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) tools: HashMap<String, Arc<dyn Tool>>,
    pub(crate) identity: Option<IdentityManager>,
    pub(crate) policy: HitlPolicy,
    pub(crate) gate: Arc<dyn ApprovalGate>,
    pub(crate) a2a_compatible: bool,
    pub(crate) max_budget: Option<f64>,
    pub(crate) client: Option<AmorceClient>,
    pub(crate) name: Option<String>,
    pub(crate) role: Option<String>,
    budget: Mutex<BudgetState>,
    records: Mutex<Vec<TransactionRecord>>,
    last_record: Mutex<Option<RecordId>>,
}

impl AmorceAgent {
    /// Start building an agent around an executor.
    pub fn builder(executor: Arc<dyn Executor>) -> AmorceAgentBuilder {
        AmorceAgentBuilder::new(executor)
    }

    pub(crate) fn from_builder(
        executor: Arc<dyn Executor>,
        tools: HashMap<String, Arc<dyn Tool>>,
        identity: Option<IdentityManager>,
        policy: HitlPolicy,
        gate: Arc<dyn ApprovalGate>,
        a2a_compatible: bool,
        max_budget: Option<f64>,
        client: Option<AmorceClient>,
        name: Option<String>,
        role: Option<String>,
    ) -> Self {
        Self {
            executor,
            tools,
            identity,
            policy,
            gate,
            a2a_compatible,
            max_budget,
            client,
            name,
            role,
            budget: Mutex::new(BudgetState { spent: 0.0 }),
            records: Mutex::new(Vec::new()),
            last_record: Mutex::new(None),
        }
    }

    /// Whether the security layer is active.
    pub fn is_secure(&self) -> bool {
        self.identity.is_some()
    }

    /// The agent's identity, if running secure.
    pub fn agent_id(&self) -> Option<AgentId> {
        self.identity.as_ref().map(IdentityManager::agent_id)
    }

    /// The agent's human-readable name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The agent's declared role.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Total cost debited so far.
    pub fn spent(&self) -> f64 {
        self.budget.lock().expect("budget lock poisoned").spent
    }

    /// Transaction records accumulated so far, in order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().expect("records lock poisoned").clone()
    }

    /// Run a prompt through the wrapped executor.
    ///
    /// When secure and A2A-compatible, the prompt is sealed in an A2A
    /// envelope, the run is recorded, and the output is signed.
    /// Otherwise the output passes straight through with no security
    /// metadata.
    pub async fn run(&self, prompt: &str) -> Result<SecuredResponse> {
        let identity = match &self.identity {
            Some(identity) if self.a2a_compatible => identity,
            _ => {
                let output = self.executor.run(prompt).await?;
                return Ok(SecuredResponse::plain(output));
            }
        };

        let envelope = A2aEnvelope::seal(identity, prompt);
        log::info!("run started as {}", identity.agent_id());

        self.append_record(
            identity,
            RecordKind::RunStart,
            RecordContent::with_data(
                "run started",
                json!({
                    "envelope_signature": envelope.signature,
                    "protocol": envelope.protocol_version,
                }),
            ),
        )?;

        let output = self.executor.run(prompt).await?;
        let signature = identity.sign(output.as_bytes());

        self.append_record(
            identity,
            RecordKind::RunComplete,
            RecordContent::with_data(
                "run completed",
                json!({ "output_signature": signature }),
            ),
        )?;

        Ok(SecuredResponse {
            output,
            agent_id: Some(identity.agent_id()),
            signature: Some(signature),
            protocol: Some(A2A_PROTOCOL_VERSION.to_string()),
            security_layer: Some(AMORCE_SECURITY_LAYER.to_string()),
        })
    }

    /// Invoke a registered tool by name.
    ///
    /// In secure mode the call is signed, gated if the HITL policy
    /// requires it, debited against the budget, and recorded. The
    /// budget check happens before the inner tool runs.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<SignedToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AmorceError::NotFound(format!("tool {name}")))?;

        let Some(identity) = &self.identity else {
            let result = tool.invoke(args).await?;
            return Ok(SignedToolOutput {
                result,
                tool: name.to_string(),
                agent_id: AgentId(String::new()),
                signature: String::new(),
                hitl_required: false,
            });
        };

        self.debit(tool.cost())?;

        let secured = SecuredTool::new(tool.clone(), self.policy.requires(name));
        let output = secured
            .invoke_secured(identity, self.gate.as_ref(), &self.policy, args)
            .await?;

        self.append_record(
            identity,
            RecordKind::ToolCall,
            RecordContent::with_data(
                format!("called tool '{name}'"),
                json!({
                    "tool": name,
                    "hitl_required": output.hitl_required,
                    "call_signature": output.signature,
                    "cost": tool.cost(),
                }),
            ),
        )?;

        Ok(output)
    }

    /// Discover peer agents by capability through the Trust Directory.
    ///
    /// Requires secure mode and a configured client.
    pub async fn discover(&self, capability: &str) -> Result<Vec<AgentListing>> {
        if self.identity.is_none() {
            return Err(AmorceError::SecureModeRequired(
                "discover needs a signed identity".into(),
            ));
        }
        let client = self.client.as_ref().ok_or_else(|| {
            AmorceError::Directory("no directory client configured".into())
        })?;
        client.discover(capability).await
    }

    /// Register this agent with the Trust Directory.
    ///
    /// Requires secure mode and a configured client.
    pub async fn register(&self, capabilities: &[String]) -> Result<()> {
        let Some(identity) = &self.identity else {
            return Err(AmorceError::SecureModeRequired(
                "register needs a signed identity".into(),
            ));
        };
        let client = self.client.as_ref().ok_or_else(|| {
            AmorceError::Directory("no directory client configured".into())
        })?;
        client.register(identity, self.role.as_deref(), capabilities).await
    }

    fn debit(&self, cost: f64) -> Result<()> {
        let Some(budget) = self.max_budget else {
            return Ok(());
        };
        let mut state = self.budget.lock().expect("budget lock poisoned");
        if state.spent + cost > budget {
            return Err(AmorceError::BudgetExceeded {
                spent: state.spent,
                cost,
                budget,
            });
        }
        state.spent += cost;
        Ok(())
    }

    fn append_record(
        &self,
        identity: &IdentityManager,
        kind: RecordKind,
        content: RecordContent,
    ) -> Result<()> {
        let mut last = self.last_record.lock().expect("records lock poisoned");
        let mut builder = RecordBuilder::new(identity.agent_id(), kind, content);
        if let Some(previous) = last.clone() {
            builder = builder.chain_to(previous);
        }
        let record = builder.sign(identity.signing_key())?;
        *last = Some(record.id.clone());
        self.records
            .lock()
            .expect("records lock poisoned")
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitl::MemoryApprovalGate;
    use crate::record::verify_record;
    use std::time::Duration;

    struct UppercaseExecutor;

    #[async_trait]
    impl Executor for UppercaseExecutor {
        async fn run(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }
    }

    struct CostlyTool {
        cost: f64,
    }

    #[async_trait]
    impl Tool for CostlyTool {
        fn name(&self) -> &str {
            "costly"
        }

        fn description(&self) -> &str {
            "A tool with a per-call cost"
        }

        fn cost(&self) -> f64 {
            self.cost
        }

        async fn invoke(&self, _args: Value) -> Result<Value> {
            Ok(json!({"ok": true}))
        }
    }

    fn secure_agent() -> AmorceAgent {
        AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .name("test-agent")
            .tool(Arc::new(CostlyTool { cost: 1.0 }))
            .approval_gate(Arc::new(MemoryApprovalGate::approving()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_secure_run_signs_output() {
        let agent = secure_agent();
        let response = agent.run("hello").await.unwrap();

        assert_eq!(response.output, "HELLO");
        assert_eq!(response.agent_id, agent.agent_id());
        assert_eq!(response.protocol.as_deref(), Some("a2a/1.0"));
        assert_eq!(response.security_layer.as_deref(), Some("amorce/3.0"));

        let identity = agent.identity.as_ref().unwrap();
        assert!(identity
            .verify(b"HELLO", response.signature.as_deref().unwrap())
            .is_ok());
    }

    #[tokio::test]
    async fn test_insecure_run_plain_output() {
        let agent = AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .secure(false)
            .build()
            .unwrap();

        let response = agent.run("hello").await.unwrap();
        assert_eq!(response.output, "HELLO");
        assert!(response.agent_id.is_none());
        assert!(response.signature.is_none());
        assert!(agent.agent_id().is_none());
        assert!(agent.records().is_empty());
    }

    #[tokio::test]
    async fn test_secure_non_a2a_run_is_plain() {
        let agent = AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .name("legacy-agent")
            .a2a_compatible(false)
            .build()
            .unwrap();

        // Identity exists for tool calls, but the run output carries
        // no envelope framing or security metadata
        assert!(agent.is_secure());
        let response = agent.run("hello").await.unwrap();
        assert_eq!(response.output, "HELLO");
        assert!(response.agent_id.is_none());
        assert!(response.signature.is_none());
        assert!(response.protocol.is_none());
        assert!(response.security_layer.is_none());
        assert!(agent.records().is_empty());
    }

    #[tokio::test]
    async fn test_run_leaves_chained_records() {
        let agent = secure_agent();
        agent.run("hello").await.unwrap();

        let records = agent.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, RecordKind::RunStart);
        assert_eq!(records[1].kind, RecordKind::RunComplete);
        assert_eq!(records[1].previous_record.as_ref(), Some(&records[0].id));

        for record in &records {
            assert!(verify_record(record).unwrap().is_valid);
        }
    }

    #[tokio::test]
    async fn test_tool_call_recorded() {
        let agent = secure_agent();
        let output = agent.call_tool("costly", json!({})).await.unwrap();

        assert_eq!(output.tool, "costly");
        let records = agent.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::ToolCall);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let agent = secure_agent();
        let result = agent.call_tool("missing", json!({})).await;
        assert!(matches!(result, Err(AmorceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_budget_enforced_before_execution() {
        let agent = AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .tool(Arc::new(CostlyTool { cost: 3.0 }))
            .max_budget(5.0)
            .approval_gate(Arc::new(MemoryApprovalGate::approving()))
            .build()
            .unwrap();

        agent.call_tool("costly", json!({})).await.unwrap();
        assert_eq!(agent.spent(), 3.0);

        // The error reports what was actually spent, not the refused total
        let result = agent.call_tool("costly", json!({})).await;
        assert!(matches!(
            result,
            Err(AmorceError::BudgetExceeded { spent, cost, budget })
                if spent == 3.0 && cost == 3.0 && budget == 5.0
        ));
        // Failed call must not debit
        assert_eq!(agent.spent(), 3.0);
    }

    #[tokio::test]
    async fn test_hitl_gates_named_tool() {
        let agent = AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .tool(Arc::new(CostlyTool { cost: 0.0 }))
            .hitl_required(["costly"])
            .hitl_timing(Duration::from_millis(50), Duration::from_millis(5))
            .approval_gate(Arc::new(MemoryApprovalGate::rejecting()))
            .build()
            .unwrap();

        let result = agent.call_tool("costly", json!({})).await;
        assert!(matches!(result, Err(AmorceError::ApprovalDenied { .. })));
    }

    #[tokio::test]
    async fn test_discover_requires_secure() {
        let agent = AmorceAgent::builder(Arc::new(UppercaseExecutor))
            .secure(false)
            .build()
            .unwrap();
        let result = agent.discover("weather").await;
        assert!(matches!(result, Err(AmorceError::SecureModeRequired(_))));
    }
}
