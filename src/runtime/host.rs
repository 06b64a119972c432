use crate::types::cluster::{HostSpec, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a host for the lifetime of one runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(Uuid);

impl HostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 12 hex digits, enough to tell the hosts of one run apart
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(12);
        simple
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How the control process authenticates against a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credentials {
    Password(String),
    PrivateKey(String),
    /// Fall back to the local ssh agent / default identities
    Agent,
}

/// One managed machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub name: String,
    pub address: String,
    pub internal_address: String,
    pub port: u16,
    pub user: String,
    pub credentials: Credentials,
    pub roles: BTreeSet<String>,
}

impl Host {
    pub fn from_spec(spec: &HostSpec) -> Self {
        let credentials = match (&spec.private_key_path, &spec.password) {
            (Some(key), _) if !key.is_empty() => Credentials::PrivateKey(key.clone()),
            (_, Some(password)) if !password.is_empty() => Credentials::Password(password.clone()),
            _ => Credentials::Agent,
        };

        let internal_address = if spec.internal_address.is_empty() {
            spec.address.clone()
        } else {
            spec.internal_address.clone()
        };

        Self {
            id: HostId::new(),
            name: spec.name.clone(),
            address: spec.address.clone(),
            internal_address,
            port: spec.port.unwrap_or(DEFAULT_SSH_PORT),
            user: spec
                .user
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            credentials,
            roles: BTreeSet::new(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// `user@address` as understood by ssh
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> HostSpec {
        HostSpec {
            name: name.to_string(),
            address: "10.0.0.1".to_string(),
            ..HostSpec::default()
        }
    }

    #[test]
    fn test_host_serializes_with_id() {
        let host = Host::from_spec(&spec("node1"));
        let value = serde_json::to_value(&host).unwrap();

        assert_eq!(value["name"], "node1");
        assert_eq!(value["id"], host.id.to_string());
        assert_eq!(value["credentials"], "Agent");

        let back: Host = serde_json::from_value(value).unwrap();
        assert_eq!(back, host);
    }

    #[test]
    fn test_short_id() {
        let id = HostId::new();
        let short = id.short();
        assert_eq!(short.len(), 12);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(id.to_string().replace('-', "").starts_with(&short));
    }
}
