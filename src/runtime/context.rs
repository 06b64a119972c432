//! Shared context for one pipeline run: inventory, roles and caches

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::runtime::cache::Cache;
use crate::runtime::config::RuntimeArgs;
use crate::runtime::connector::{Connector, Dialer};
use crate::runtime::error::{ConnectionError, RuntimeError};
use crate::runtime::host::{Host, HostId};
use crate::types::cluster::ClusterSpec;

pub struct Runtime {
    args: RuntimeArgs,
    cluster: Option<Arc<ClusterSpec>>,
    hosts: Vec<Arc<Host>>,
    roles: BTreeMap<String, Vec<Arc<Host>>>,
    dialer: Arc<dyn Dialer>,
    connectors: Mutex<HashMap<HostId, Arc<dyn Connector>>>,
    pipeline_cache: Cache,
}

impl Runtime {
    pub fn new(
        args: RuntimeArgs,
        cluster: Option<ClusterSpec>,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Self, RuntimeError> {
        let (hosts, roles) = match &cluster {
            Some(cluster) => Self::build_inventory(cluster)?,
            None => (Vec::new(), BTreeMap::new()),
        };

        debug!(
            "Runtime created with {} hosts across {} roles",
            hosts.len(),
            roles.len()
        );

        Ok(Self {
            args,
            cluster: cluster.map(Arc::new),
            hosts,
            roles,
            dialer,
            connectors: Mutex::new(HashMap::new()),
            pipeline_cache: Cache::new(),
        })
    }

    fn build_inventory(
        cluster: &ClusterSpec,
    ) -> Result<(Vec<Arc<Host>>, BTreeMap<String, Vec<Arc<Host>>>), RuntimeError> {
        let mut hosts: Vec<Host> = Vec::with_capacity(cluster.spec.hosts.len());
        for spec in &cluster.spec.hosts {
            if hosts.iter().any(|h| h.name == spec.name) {
                return Err(RuntimeError::DuplicateHost {
                    host: spec.name.clone(),
                });
            }
            hosts.push(Host::from_spec(spec));
        }

        for (role, members) in &cluster.spec.role_groups {
            for member in members {
                let host = hosts.iter_mut().find(|h| &h.name == member).ok_or_else(|| {
                    RuntimeError::UnknownRoleHost {
                        role: role.clone(),
                        host: member.clone(),
                    }
                })?;
                host.roles.insert(role.clone());
            }
        }

        let hosts: Vec<Arc<Host>> = hosts.into_iter().map(Arc::new).collect();

        let mut roles: BTreeMap<String, Vec<Arc<Host>>> = BTreeMap::new();
        for (role, members) in &cluster.spec.role_groups {
            let entry = roles.entry(role.clone()).or_default();
            for member in members {
                if let Some(host) = hosts.iter().find(|h| &h.name == member) {
                    if !entry.iter().any(|h| h.id == host.id) {
                        entry.push(Arc::clone(host));
                    }
                }
            }
        }

        Ok((hosts, roles))
    }

    /// Create the working directory; the run cannot proceed without it
    pub async fn ensure_work_dir(&self) -> Result<(), RuntimeError> {
        tokio::fs::create_dir_all(&self.args.work_dir)
            .await
            .map_err(|e| RuntimeError::WorkDir {
                path: self.args.work_dir.display().to_string(),
                error: e.to_string(),
            })
    }

    pub fn args(&self) -> &RuntimeArgs {
        &self.args
    }

    pub fn ignore_err(&self) -> bool {
        self.args.ignore_err
    }

    pub fn cluster(&self) -> Option<&Arc<ClusterSpec>> {
        self.cluster.as_ref()
    }

    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    pub fn host(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Hosts carrying `role`, in role-group order; empty for unknown roles
    pub fn hosts_with_role(&self, role: &str) -> &[Arc<Host>] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn pipeline_cache(&self) -> &Cache {
        &self.pipeline_cache
    }

    /// Fresh cache scoped to a single module execution
    pub fn new_module_cache(&self) -> Cache {
        Cache::new()
    }

    /// Cached connector for `host`, dialing on first use.
    ///
    /// The dial happens outside the lock. When two callers race on the same
    /// host, the first insert wins and the loser's connector is closed, so at
    /// most one connector per host is ever retained.
    pub async fn get_connector(&self, host: &Host) -> Result<Arc<dyn Connector>, ConnectionError> {
        if let Some(existing) = self.connectors.lock().await.get(&host.id) {
            return Ok(Arc::clone(existing));
        }

        let built = self.dialer.dial(host).await?;

        let winner = {
            let mut connectors = self.connectors.lock().await;
            match connectors.get(&host.id) {
                Some(existing) => Some(Arc::clone(existing)),
                None => {
                    connectors.insert(host.id, Arc::clone(&built));
                    None
                }
            }
        };

        match winner {
            Some(existing) => {
                debug!("Discarding duplicate connector for {}", host.name);
                if let Err(e) = built.close().await {
                    warn!("Failed to close duplicate connector for {}: {}", host.name, e);
                }
                Ok(existing)
            }
            None => Ok(built),
        }
    }

    pub async fn close_connector(&self, host: &Host) -> Result<(), ConnectionError> {
        let removed = self.connectors.lock().await.remove(&host.id);
        match removed {
            Some(connector) => connector.close().await,
            None => Ok(()),
        }
    }

    /// Close every retained connector; returns the first close error after
    /// attempting all of them
    pub async fn close_all_connectors(&self) -> Result<(), ConnectionError> {
        let drained: Vec<Arc<dyn Connector>> = {
            let mut connectors = self.connectors.lock().await;
            connectors.drain().map(|(_, c)| c).collect()
        };

        let mut first_error = None;
        for connector in drained {
            if let Err(e) = connector.close().await {
                warn!("Failed to close connector for {}: {}", connector.host().name, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn connector_count(&self) -> usize {
        self.connectors.lock().await.len()
    }

    /// End-of-run cleanup: connectors closed, pipeline cache cleared
    pub async fn teardown(&self) {
        if let Err(e) = self.close_all_connectors().await {
            warn!("Connector cleanup failed: {}", e);
        }
        self.pipeline_cache.clear().await;
    }
}
