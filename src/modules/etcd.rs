use async_trait::async_trait;
use std::path::PathBuf;

use crate::engine::{BaseModule, EngineError, ExecutionContext, Module, SpecSlice, StepTask, Task};
use crate::modules::steps::{HostSelector, LocalFilesStep, RemoteCommandStep};
use crate::runtime::Runtime;
use crate::types::cluster::{EtcdSpec, ROLE_ETCD};

pub const ETCD_CERT_DIR: &str = "/etc/ssl/etcd/ssl";

/// Verifies the etcd topology before anything depends on it
pub struct EtcdPreCheckModule {
    base: BaseModule,
    etcd: EtcdSpec,
}

impl EtcdPreCheckModule {
    pub fn new() -> Self {
        Self {
            base: BaseModule::new("etcd-precheck", "Check etcd topology"),
            etcd: EtcdSpec::default(),
        }
    }

    fn assertion(&self, reason: impl Into<String>) -> EngineError {
        EngineError::AssertionFailed {
            unit: self.base.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl Default for EtcdPreCheckModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for EtcdPreCheckModule {
    fn base(&self) -> &BaseModule {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModule {
        &mut self.base
    }

    fn bind(&mut self, _runtime: &Runtime, slice: SpecSlice) -> Result<(), EngineError> {
        self.etcd = slice.into_etcd(self.base.name())?;
        self.base.bind_span();
        Ok(())
    }

    async fn auto_assert(&self, ctx: &ExecutionContext) -> Result<(), EngineError> {
        if self.etcd.is_external() {
            let external = &self.etcd.external;
            if external.endpoints.is_empty() {
                return Err(self.assertion("external etcd requires at least one endpoint"));
            }
            if external.ca_file.is_empty()
                || external.cert_file.is_empty()
                || external.key_file.is_empty()
            {
                return Err(self.assertion("external etcd requires caFile, certFile and keyFile"));
            }
        } else if ctx.runtime().hosts_with_role(ROLE_ETCD).is_empty() {
            return Err(self.assertion(format!("no host carries the {ROLE_ETCD} role")));
        }
        Ok(())
    }

    fn build_tasks(&self, _ctx: &ExecutionContext) -> Result<Vec<Box<dyn Task>>, EngineError> {
        let task = if self.etcd.is_external() {
            let external = &self.etcd.external;
            StepTask::new("external-etcd-certs", "Check external etcd client certificates")
                .with_step(LocalFilesStep::new(
                    "client-certs",
                    vec![
                        PathBuf::from(&external.ca_file),
                        PathBuf::from(&external.cert_file),
                        PathBuf::from(&external.key_file),
                    ],
                ))
        } else {
            StepTask::new("etcd-cert-dir", "Prepare etcd certificate directory").with_step(
                RemoteCommandStep::new(
                    "mkdir",
                    format!("mkdir -p {ETCD_CERT_DIR}"),
                    HostSelector::role(ROLE_ETCD),
                )
                .sudo(),
            )
        };

        Ok(vec![Box::new(task)])
    }
}
