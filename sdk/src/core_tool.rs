//! Core tool trait and context types
//!
//! This module defines the CoreTool trait that every tool exposed to the
//! sandboxed agent implements, and the CoreContext that describes who is
//! calling and how to reach the host.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::ipc::IpcPaths;
use crate::requester::{Requester, RequesterConfig};
use crate::types::{ToolInput, ToolOutput};

/// Trait that all core tools must implement
#[async_trait]
pub trait CoreTool: Send + Sync {
    /// Returns the name of the tool
    fn name(&self) -> &str;

    /// Returns the version of the tool
    fn version(&self) -> &str;

    /// One-line description shown to the agent
    fn description(&self) -> &str;

    /// Called when the tool is loaded, provides CoreContext for host interaction
    fn start(&mut self, ctx: CoreContext) -> Result<(), EngineError>;

    /// Called when the tool is being unloaded
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Handle a tool invocation
    async fn handle(&self, input: ToolInput) -> Result<ToolOutput, EngineError>;
}

/// Context provided to core tools.
///
/// Carries the caller's identity and the mailbox used to reach the host.
/// Privileged tools check `is_main` before filing anything.
#[derive(Debug, Clone)]
pub struct CoreContext {
    /// Group the agent is running for
    pub group: String,

    /// Whether the caller is the main (privileged) group
    pub is_main: bool,

    /// Mailbox shared with the host
    pub ipc: IpcPaths,

    /// Polling parameters for privileged calls
    pub requester: RequesterConfig,
}

impl CoreContext {
    /// Create a new CoreContext with default polling parameters
    pub fn new(group: impl Into<String>, is_main: bool, ipc: IpcPaths) -> Self {
        Self {
            group: group.into(),
            is_main,
            ipc,
            requester: RequesterConfig::default(),
        }
    }

    /// Override the polling parameters
    pub fn with_requester_config(mut self, config: RequesterConfig) -> Self {
        self.requester = config;
        self
    }

    /// Build a requester bound to this context's mailbox
    pub fn requester(&self) -> Requester {
        Requester::new(self.ipc.clone(), self.requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_context_defaults() {
        let ctx = CoreContext::new("main", true, IpcPaths::new("/tmp/ipc"));
        assert!(ctx.is_main);
        assert_eq!(ctx.requester, RequesterConfig::default());
        assert_eq!(ctx.requester().paths().tasks_dir(), ctx.ipc.tasks_dir());
    }

    #[test]
    fn test_context_requester_override() {
        let config = RequesterConfig {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(50),
        };
        let ctx = CoreContext::new("family", false, IpcPaths::new("/tmp/ipc"))
            .with_requester_config(config);
        assert_eq!(ctx.requester, config);
        assert_eq!(ctx.group, "family");
    }
}
