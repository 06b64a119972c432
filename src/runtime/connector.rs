//! Connection abstraction handed out by the runtime

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use crate::runtime::error::ConnectionError;
use crate::runtime::host::Host;

/// Output of one remote command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// An open, reusable connection to one host
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Host this connector is bound to
    fn host(&self) -> &Host;

    /// Run a shell command on the host
    async fn exec(&self, command: &str) -> Result<CommandOutput, ConnectionError>;

    /// Write `data` to `remote_path` on the host
    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), ConnectionError>;

    /// Tear the connection down; the connector must not be used afterwards
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Builds connectors; the expensive, possibly slow part of connecting
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, host: &Host) -> Result<Arc<dyn Connector>, ConnectionError>;
}
