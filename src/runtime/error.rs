use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Duplicate host name: {host}")]
    DuplicateHost { host: String },

    #[error("Role {role} references unknown host {host}")]
    UnknownRoleHost { role: String, host: String },

    #[error("Failed to prepare working directory {path}: {error}")]
    WorkDir { path: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    #[error("Connection failed: {host} - {reason}")]
    ConnectFailed { host: String, reason: String },

    #[error("Authentication failed: {host}")]
    AuthenticationFailed { host: String },

    #[error("Command execution failed on {host}: {command} - {reason}")]
    CommandFailed {
        host: String,
        command: String,
        reason: String,
    },

    #[error("Upload to {host}:{path} failed: {reason}")]
    UploadFailed {
        host: String,
        path: String,
        reason: String,
    },

    #[error("Closing connection to {host} failed: {reason}")]
    CloseFailed { host: String, reason: String },

    #[error("Required binary not found: {binary}")]
    MissingBinary { binary: String },
}
