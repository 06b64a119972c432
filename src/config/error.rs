use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("IO error reading {path}: {error}")]
    Io { path: String, error: String },

    #[error("Invalid YAML format: {reason}")]
    InvalidYaml { reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unsupported kind: {kind} (expected one of {expected:?})")]
    UnsupportedKind {
        kind: String,
        expected: Vec<&'static str>,
    },

    #[error("Duplicate host name: {host}")]
    DuplicateHost { host: String },

    #[error("Host {host} in role group {role} is not declared in hosts")]
    UnknownRoleHost { role: String, host: String },

    #[error("Host {host} has no address")]
    MissingAddress { host: String },

    #[error("Invalid kubernetes version {version}: {reason}")]
    InvalidVersion { version: String, reason: String },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::InvalidYaml {
            reason: err.to_string(),
        }
    }
}
