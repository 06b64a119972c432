//! Typed slices of the cluster definition handed to modules at bind time

use std::sync::Arc;

use crate::engine::error::EngineError;
use crate::types::cluster::{ClusterSpec, ControlPlaneEndpoint, EtcdSpec};

#[derive(Debug, Clone)]
pub enum SpecSlice {
    Cluster(Arc<ClusterSpec>),
    ControlPlaneEndpoint(ControlPlaneEndpoint),
    Etcd(EtcdSpec),
    /// Module needs nothing from the definition
    Empty,
}

impl SpecSlice {
    pub fn shape(&self) -> &'static str {
        match self {
            SpecSlice::Cluster(_) => "cluster",
            SpecSlice::ControlPlaneEndpoint(_) => "controlPlaneEndpoint",
            SpecSlice::Etcd(_) => "etcd",
            SpecSlice::Empty => "empty",
        }
    }

    fn mismatch(&self, unit: &str, expected: &'static str) -> EngineError {
        EngineError::SpecShape {
            unit: unit.to_string(),
            expected,
            found: self.shape(),
        }
    }

    pub fn into_cluster(self, unit: &str) -> Result<Arc<ClusterSpec>, EngineError> {
        match self {
            SpecSlice::Cluster(cluster) => Ok(cluster),
            other => Err(other.mismatch(unit, "cluster")),
        }
    }

    pub fn into_control_plane_endpoint(
        self,
        unit: &str,
    ) -> Result<ControlPlaneEndpoint, EngineError> {
        match self {
            SpecSlice::ControlPlaneEndpoint(endpoint) => Ok(endpoint),
            other => Err(other.mismatch(unit, "controlPlaneEndpoint")),
        }
    }

    pub fn into_etcd(self, unit: &str) -> Result<EtcdSpec, EngineError> {
        match self {
            SpecSlice::Etcd(etcd) => Ok(etcd),
            other => Err(other.mismatch(unit, "etcd")),
        }
    }

    pub fn expect_empty(self, unit: &str) -> Result<(), EngineError> {
        match self {
            SpecSlice::Empty => Ok(()),
            other => Err(other.mismatch(unit, "empty")),
        }
    }
}
