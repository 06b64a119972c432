//! Cluster definition loading: parse, validate, then fill defaults

use crate::config::error::ConfigError;
use crate::config::validator::ClusterValidatorSet;
use crate::types::cluster::*;
use std::path::Path;
use tracing::debug;

/// Read and parse a cluster definition from disk
pub async fn load_cluster_spec(path: &Path) -> Result<ClusterSpec, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

    debug!("Loaded cluster definition from {}", path.display());
    parse_cluster_spec(&content)
}

/// Parse a cluster definition from YAML text
pub fn parse_cluster_spec(content: &str) -> Result<ClusterSpec, ConfigError> {
    let mut cluster: ClusterSpec = serde_yaml::from_str(content)?;
    ClusterValidatorSet::new().validate(&cluster)?;
    apply_defaults(&mut cluster);
    Ok(cluster)
}

pub fn apply_defaults(cluster: &mut ClusterSpec) {
    let body = &mut cluster.spec;

    for host in &mut body.hosts {
        if host.port.is_none() {
            host.port = Some(DEFAULT_SSH_PORT);
        }
        if host.user.as_deref().map_or(true, str::is_empty) {
            host.user = Some(DEFAULT_SSH_USER.to_string());
        }
        if host.internal_address.is_empty() {
            host.internal_address = host.address.clone();
        }
    }

    let endpoint = &mut body.control_plane_endpoint;
    if endpoint.domain.is_empty() {
        endpoint.domain = DEFAULT_LB_DOMAIN.to_string();
    }
    if endpoint.port.is_none() {
        endpoint.port = Some(DEFAULT_API_SERVER_PORT);
    }

    let kubernetes = &mut body.kubernetes;
    if kubernetes.cluster_name.is_empty() {
        kubernetes.cluster_name = DEFAULT_CLUSTER_NAME.to_string();
    }
    if kubernetes.container_manager.is_empty() {
        kubernetes.container_manager = DEFAULT_CONTAINER_MANAGER.to_string();
    }

    if body.etcd.kind.is_empty() {
        body.etcd.kind = ETCD_TYPE_KUBEKEY.to_string();
    }

    let network = &mut body.network;
    if network.plugin.is_empty() {
        network.plugin = DEFAULT_NETWORK_PLUGIN.to_string();
    }
    if network.kube_pods_cidr.is_empty() {
        network.kube_pods_cidr = DEFAULT_POD_CIDR.to_string();
    }
    if network.kube_service_cidr.is_empty() {
        network.kube_service_cidr = DEFAULT_SERVICE_CIDR.to_string();
    }
}
