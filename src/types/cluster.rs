use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_CLUSTER_NAME: &str = "cluster.local";
pub const DEFAULT_CONTAINER_MANAGER: &str = "docker";
pub const DEFAULT_NETWORK_PLUGIN: &str = "calico";
pub const DEFAULT_POD_CIDR: &str = "10.233.64.0/18";
pub const DEFAULT_SERVICE_CIDR: &str = "10.233.0.0/18";
pub const DEFAULT_LB_DOMAIN: &str = "lb.kubesphere.local";
pub const DEFAULT_API_SERVER_PORT: u16 = 6443;
pub const ETCD_TYPE_KUBEKEY: &str = "kubekey";
pub const ETCD_TYPE_EXTERNAL: &str = "external";
pub const INTERNAL_LB_HAPROXY: &str = "haproxy";

pub const ROLE_CONTROL_PLANE: &str = "control-plane";
pub const ROLE_WORKER: &str = "worker";
pub const ROLE_ETCD: &str = "etcd";

/// Parsed cluster definition document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ClusterMetadata,
    #[serde(default)]
    pub spec: ClusterBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBody {
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub role_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub control_plane_endpoint: ControlPlaneEndpoint,
    #[serde(default)]
    pub kubernetes: KubernetesSpec,
    #[serde(default)]
    pub etcd: EtcdSpec,
    #[serde(default)]
    pub network: NetworkSpec,
    #[serde(default)]
    pub registry: RegistrySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSpec {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub internal_address: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneEndpoint {
    #[serde(default)]
    pub domain: String,
    /// Externally managed endpoint address; empty when the cluster owns it
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Embedded load balancer type, e.g. `haproxy`
    #[serde(default)]
    pub internal_loadbalancer: Option<String>,
}

impl ControlPlaneEndpoint {
    pub fn api_server_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_API_SERVER_PORT)
    }

    pub fn internal_lb_enabled(&self) -> bool {
        self.internal_loadbalancer.as_deref() == Some(INTERNAL_LB_HAPROXY)
    }

    pub fn externally_managed(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSpec {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub container_manager: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdSpec {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub external: ExternalEtcd,
}

impl EtcdSpec {
    pub fn is_external(&self) -> bool {
        self.kind == ETCD_TYPE_EXTERNAL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEtcd {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub ca_file: String,
    #[serde(default)]
    pub cert_file: String,
    #[serde(default)]
    pub key_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub plugin: String,
    #[serde(default, rename = "kubePodsCIDR")]
    pub kube_pods_cidr: String,
    #[serde(default, rename = "kubeServiceCIDR")]
    pub kube_service_cidr: String,
    #[serde(default)]
    pub block_size: Option<u8>,
    #[serde(default, rename = "multusCNI")]
    pub multus_cni: MultusCni,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultusCni {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    #[serde(default)]
    pub private_registry: String,
    #[serde(default)]
    pub registry_mirrors: Vec<String>,
    #[serde(default)]
    pub insecure_registries: Vec<String>,
    #[serde(default)]
    pub auths: BTreeMap<String, RegistryAuth>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
