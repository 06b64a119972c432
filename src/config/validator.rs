use crate::config::error::ConfigError;
use crate::types::cluster::ClusterSpec;
use std::collections::HashSet;

pub const ACCEPTED_KINDS: [&str; 2] = ["Cluster", "ClusterConfiguration"];

pub trait ClusterValidator {
    fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError>;
}

pub struct RequiredFieldsValidator;
pub struct HostValidator;
pub struct RoleGroupValidator;
pub struct VersionValidator;

impl ClusterValidator for RequiredFieldsValidator {
    fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError> {
        if cluster.api_version.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "apiVersion".to_string(),
            });
        }
        if cluster.kind.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "kind".to_string(),
            });
        }
        if !ACCEPTED_KINDS.contains(&cluster.kind.as_str()) {
            return Err(ConfigError::UnsupportedKind {
                kind: cluster.kind.clone(),
                expected: ACCEPTED_KINDS.to_vec(),
            });
        }
        if cluster.metadata.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "metadata.name".to_string(),
            });
        }
        Ok(())
    }
}

impl ClusterValidator for HostValidator {
    fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for host in &cluster.spec.hosts {
            if host.name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "spec.hosts[].name".to_string(),
                });
            }
            if !seen.insert(host.name.as_str()) {
                return Err(ConfigError::DuplicateHost {
                    host: host.name.clone(),
                });
            }
            if host.address.trim().is_empty() {
                return Err(ConfigError::MissingAddress {
                    host: host.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl ClusterValidator for RoleGroupValidator {
    fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError> {
        let declared: HashSet<&str> = cluster
            .spec
            .hosts
            .iter()
            .map(|h| h.name.as_str())
            .collect();

        for (role, members) in &cluster.spec.role_groups {
            for member in members {
                if !declared.contains(member.as_str()) {
                    return Err(ConfigError::UnknownRoleHost {
                        role: role.clone(),
                        host: member.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ClusterValidator for VersionValidator {
    fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError> {
        let version = cluster.spec.kubernetes.version.trim();
        if version.is_empty() {
            return Ok(());
        }

        semver::Version::parse(version.trim_start_matches('v'))
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidVersion {
                version: version.to_string(),
                reason: e.to_string(),
            })
    }
}

pub struct ClusterValidatorSet {
    validators: Vec<Box<dyn ClusterValidator>>,
}

impl ClusterValidatorSet {
    pub fn new() -> Self {
        Self {
            validators: vec![
                Box::new(RequiredFieldsValidator),
                Box::new(HostValidator),
                Box::new(RoleGroupValidator),
                Box::new(VersionValidator),
            ],
        }
    }

    pub fn validate(&self, cluster: &ClusterSpec) -> Result<(), ConfigError> {
        for validator in &self.validators {
            validator.validate(cluster)?;
        }
        Ok(())
    }
}

impl Default for ClusterValidatorSet {
    fn default() -> Self {
        Self::new()
    }
}
