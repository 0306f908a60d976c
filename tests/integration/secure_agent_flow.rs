//! Integration test: full secured agent run.
//!
//! Covers the complete flow: build a secured agent, run a prompt with
//! A2A framing, call signed and HITL-gated tools, enforce the budget,
//! and verify the resulting record chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use amorce::envelope::A2aEnvelope;
use amorce::hitl::{ApprovalStatus, MemoryApprovalGate};
use amorce::record::{verify_record, RecordKind};
use amorce::{AmorceAgent, AmorceError, Executor, Result, Tool};

struct ScriptedExecutor;

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn run(&self, prompt: &str) -> Result<String> {
        Ok(format!("answer to: {prompt}"))
    }
}

struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Returns the current weather for a city"
    }

    fn cost(&self) -> f64 {
        0.5
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let city = args["city"].as_str().unwrap_or("unknown");
        Ok(json!({ "city": city, "forecast": "sunny" }))
    }
}

struct SendEmailTool;

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Sends an email"
    }

    fn cost(&self) -> f64 {
        2.0
    }

    async fn invoke(&self, _args: Value) -> Result<Value> {
        Ok(json!({ "sent": true }))
    }
}

#[tokio::test]
async fn secure_run_end_to_end() {
    let agent = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .name("weather-agent")
        .role("forecaster")
        .tool(Arc::new(WeatherTool))
        .tool(Arc::new(SendEmailTool))
        .hitl_required(["send_email"])
        .hitl_timing(Duration::from_secs(5), Duration::from_millis(5))
        .approval_gate(Arc::new(MemoryApprovalGate::approving()))
        .max_budget(10.0)
        .build()
        .expect("agent should build");

    // Run a prompt: output must be signed and A2A-framed
    let response = agent.run("what's the weather in Paris?").await.unwrap();
    assert_eq!(response.output, "answer to: what's the weather in Paris?");
    assert_eq!(response.protocol.as_deref(), Some("a2a/1.0"));
    assert_eq!(response.security_layer.as_deref(), Some("amorce/3.0"));
    assert!(response.signature.is_some());
    assert_eq!(response.agent_id, agent.agent_id());

    // Ungated tool call: signed, no approval needed
    let weather = agent
        .call_tool("get_weather", json!({"city": "Paris"}))
        .await
        .unwrap();
    assert_eq!(weather.result["forecast"], "sunny");
    assert!(!weather.hitl_required);
    assert!(!weather.signature.is_empty());

    // Gated tool call: goes through the approval gate
    let email = agent
        .call_tool("send_email", json!({"to": "ops@example.com"}))
        .await
        .unwrap();
    assert!(email.hitl_required);
    assert_eq!(email.result["sent"], true);

    // Budget: 0.5 + 2.0 spent so far
    assert!((agent.spent() - 2.5).abs() < f64::EPSILON);

    // Record chain: RunStart, RunComplete, then two ToolCalls, all
    // signed by the agent and chained in order
    let records = agent.records();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].kind, RecordKind::RunStart);
    assert_eq!(records[1].kind, RecordKind::RunComplete);
    assert_eq!(records[2].kind, RecordKind::ToolCall);
    assert_eq!(records[3].kind, RecordKind::ToolCall);

    for window in records.windows(2) {
        assert_eq!(window[1].previous_record.as_ref(), Some(&window[0].id));
    }
    for record in &records {
        let verification = verify_record(record).unwrap();
        assert!(verification.is_valid, "record {} must verify", record.id);
    }
}

#[tokio::test]
async fn rejected_approval_blocks_tool() {
    let agent = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .tool(Arc::new(SendEmailTool))
        .hitl_required(["send_email"])
        .hitl_timing(Duration::from_millis(100), Duration::from_millis(5))
        .approval_gate(Arc::new(MemoryApprovalGate::rejecting()))
        .build()
        .unwrap();

    let result = agent.call_tool("send_email", json!({})).await;
    assert!(matches!(
        result,
        Err(AmorceError::ApprovalDenied { tool }) if tool == "send_email"
    ));

    // A denied call leaves no tool-call record
    assert!(agent.records().is_empty());
}

#[tokio::test]
async fn human_resolves_pending_approval() {
    let gate = Arc::new(MemoryApprovalGate::new());
    let agent = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .tool(Arc::new(SendEmailTool))
        .hitl_required(["send_email"])
        .hitl_timing(Duration::from_secs(5), Duration::from_millis(5))
        .approval_gate(gate.clone())
        .build()
        .unwrap();

    let approver = {
        let gate = gate.clone();
        tokio::spawn(async move {
            loop {
                if let Some((id, request)) = gate.pending_requests().first().cloned() {
                    assert_eq!(request.tool, "send_email");
                    gate.resolve(&id, ApprovalStatus::Approved).unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    };

    let output = agent.call_tool("send_email", json!({})).await.unwrap();
    approver.await.unwrap();
    assert!(output.hitl_required);
}

#[tokio::test]
async fn budget_exhaustion_stops_calls() {
    let agent = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .tool(Arc::new(SendEmailTool))
        .max_budget(3.0)
        .approval_gate(Arc::new(MemoryApprovalGate::approving()))
        .build()
        .unwrap();

    agent.call_tool("send_email", json!({})).await.unwrap();
    let result = agent.call_tool("send_email", json!({})).await;
    assert!(matches!(result, Err(AmorceError::BudgetExceeded { .. })));
}

#[tokio::test]
async fn envelope_interop_between_agents() {
    let sender = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .name("sender")
        .build()
        .unwrap();
    let response = sender.run("hello receiver").await.unwrap();

    // Rebuild the envelope on the receiving side from wire JSON
    let identity = amorce::IdentityManager::generate(Some("sender-copy".into()));
    let envelope = A2aEnvelope::seal(&identity, "hello receiver");
    let wire = envelope.to_json().unwrap();

    let parsed = A2aEnvelope::from_json(&wire).unwrap();
    assert_eq!(parsed.message, "hello receiver");
    assert!(parsed.verify_with_key(identity.verifying_key()).is_ok());

    // Response signature verifies against the sender's own identity
    assert!(response.signature.is_some());
}

#[tokio::test]
async fn insecure_agent_passthrough() {
    let agent = AmorceAgent::builder(Arc::new(ScriptedExecutor))
        .secure(false)
        .tool(Arc::new(WeatherTool))
        .build()
        .unwrap();

    let response = agent.run("hi").await.unwrap();
    assert!(response.agent_id.is_none());
    assert!(response.signature.is_none());
    assert!(response.protocol.is_none());

    // Tool calls work but are unsigned and unrecorded
    let output = agent
        .call_tool("get_weather", json!({"city": "Oslo"}))
        .await
        .unwrap();
    assert!(output.signature.is_empty());
    assert!(agent.records().is_empty());
}
