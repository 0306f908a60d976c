//! HTTP client for the Trust Directory and orchestrator services.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AmorceError, Result};
use crate::hitl::{ApprovalGate, ApprovalId, ApprovalRequest, ApprovalStatus};
use crate::identity::{AgentId, IdentityDocument, IdentityManager};

/// Default Trust Directory endpoint.
pub const DEFAULT_DIRECTORY_URL: &str = "https://directory.amorce.io";

/// Default orchestrator endpoint (approvals).
pub const DEFAULT_ORCHESTRATOR_URL: &str = "https://api.amorce.io";

/// Default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`AmorceClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Trust Directory base URL.
    pub directory_url: String,
    /// Orchestrator base URL.
    pub orchestrator_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Override the Trust Directory URL.
    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    /// Override the orchestrator URL.
    pub fn with_orchestrator_url(mut self, url: impl Into<String>) -> Self {
        self.orchestrator_url = url.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A registered agent as listed by the Trust Directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListing {
    pub agent_id: AgentId,
    pub public_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Client for the Trust Directory and orchestrator services.
pub struct AmorceClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl AmorceClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AmorceError::Directory(format!("client build failed: {e}")))?;
        Ok(Self { config, http })
    }

    /// Create a client against the production endpoints.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Return the active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register an agent's identity document with the Trust Directory.
    ///
    /// The registration payload is signed by the agent's own key; the
    /// directory verifies it against the document's public key.
    pub async fn register(
        &self,
        identity: &IdentityManager,
        role: Option<&str>,
        capabilities: &[String],
    ) -> Result<()> {
        let document = identity.to_document();
        let payload = json!({
            "document": document,
            "role": role,
            "capabilities": capabilities,
        });
        let signature = identity.sign_value(&payload);

        let url = format!("{}/v1/agents", self.config.directory_url);
        let body = json!({
            "registration": payload,
            "signature": signature,
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AmorceError::Directory(e.to_string()))?;

        if resp.status().is_success() {
            log::info!("registered agent {} with directory", identity.agent_id());
            Ok(())
        } else {
            Err(Self::error_from_response(resp).await)
        }
    }

    /// Discover registered agents by capability.
    pub async fn discover(&self, capability: &str) -> Result<Vec<AgentListing>> {
        let url = format!(
            "{}/v1/agents?capability={capability}",
            self.config.directory_url
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AmorceError::Directory(e.to_string()))?;

        if resp.status().is_success() {
            resp.json::<Vec<AgentListing>>()
                .await
                .map_err(|e| AmorceError::SerializationError(e.to_string()))
        } else {
            Err(Self::error_from_response(resp).await)
        }
    }

    /// Resolve an agent's public identity document by ID.
    pub async fn resolve(&self, agent_id: &AgentId) -> Result<IdentityDocument> {
        let url = format!("{}/v1/agents/{}", self.config.directory_url, agent_id.0);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AmorceError::Directory(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AmorceError::NotFound(format!("agent {agent_id}")));
        }
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let document: IdentityDocument = resp
            .json()
            .await
            .map_err(|e| AmorceError::SerializationError(e.to_string()))?;
        document.verify_signature()?;
        Ok(document)
    }

    async fn error_from_response(resp: reqwest::Response) -> AmorceError {
        let status = resp.status();
        let detail = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body["detail"].as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string());
        AmorceError::Directory(format!("{status}: {detail}"))
    }
}

#[async_trait]
impl ApprovalGate for AmorceClient {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<ApprovalId> {
        let url = format!("{}/v1/approvals", self.config.orchestrator_url);
        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AmorceError::Directory(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AmorceError::SerializationError(e.to_string()))?;
        let id = body["approval_id"]
            .as_str()
            .ok_or_else(|| AmorceError::Directory("missing approval_id in response".into()))?;
        Ok(ApprovalId(id.to_string()))
    }

    async fn check_approval(&self, id: &ApprovalId) -> Result<ApprovalStatus> {
        let url = format!("{}/v1/approvals/{}", self.config.orchestrator_url, id.0);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AmorceError::Directory(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AmorceError::NotFound(format!("approval {id}")));
        }
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AmorceError::SerializationError(e.to_string()))?;
        let status = body["status"]
            .as_str()
            .ok_or_else(|| AmorceError::Directory("missing status in response".into()))?;
        ApprovalStatus::parse(status)
    }
}
