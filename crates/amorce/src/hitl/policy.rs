//! HITL policy — which tools need approval, and how long to wait.

use std::collections::HashSet;
use std::time::Duration;

/// Default time to wait for a human verdict.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default interval between approval status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Policy controlling human-in-the-loop gating.
#[derive(Debug, Clone)]
pub struct HitlPolicy {
    /// Tool names that require human approval before execution.
    required: HashSet<String>,
    /// How long to wait for a verdict before giving up.
    pub timeout: Duration,
    /// How often to poll the gate for a verdict.
    pub poll_interval: Duration,
}

impl HitlPolicy {
    /// Create a policy requiring approval for the given tool names.
    pub fn new<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: tools.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_APPROVAL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the approval timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check whether a tool requires human approval.
    pub fn requires(&self, tool_name: &str) -> bool {
        self.required.contains(tool_name)
    }

    /// Return true if no tool is gated.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

impl Default for HitlPolicy {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}
