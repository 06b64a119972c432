//! Reusable steps backed by runtime connectors

use async_trait::async_trait;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::engine::{EngineError, ExecutionContext, Step, StepOutcome};
use crate::runtime::{CommandOutput, Host, Runtime};

/// Which hosts a step targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSelector {
    All,
    Role(String),
    /// Hosts carrying any of the roles, deduplicated
    AnyRole(Vec<String>),
}

impl HostSelector {
    pub fn role(role: impl Into<String>) -> Self {
        HostSelector::Role(role.into())
    }

    pub fn resolve(&self, runtime: &Runtime) -> Vec<Arc<Host>> {
        match self {
            HostSelector::All => runtime.hosts().to_vec(),
            HostSelector::Role(role) => runtime.hosts_with_role(role).to_vec(),
            HostSelector::AnyRole(roles) => runtime
                .hosts()
                .iter()
                .filter(|h| roles.iter().any(|r| h.has_role(r)))
                .cloned()
                .collect(),
        }
    }
}

/// Wrap `command` so it runs through bash under sudo
pub fn sudo_command(command: &str) -> String {
    format!("sudo -E /bin/bash -c {}", shell_words::quote(command))
}

/// Runs a shell command on every selected host
pub struct RemoteCommandStep {
    name: String,
    command: String,
    hosts: HostSelector,
    sudo: bool,
    parallel: bool,
    record_as: Option<String>,
}

impl RemoteCommandStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>, hosts: HostSelector) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            hosts,
            sudo: false,
            parallel: true,
            record_as: None,
        }
    }

    pub fn sudo(mut self) -> Self {
        self.sudo = true;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Store per-host outputs in the module cache under `key`
    pub fn record_as(mut self, key: impl Into<String>) -> Self {
        self.record_as = Some(key.into());
        self
    }

    fn rendered(&self) -> String {
        if self.sudo {
            sudo_command(&self.command)
        } else {
            self.command.clone()
        }
    }
}

async fn exec_on(
    ctx: &ExecutionContext,
    host: &Host,
    command: &str,
) -> Result<CommandOutput, EngineError> {
    let connector = ctx.runtime().get_connector(host).await?;
    Ok(connector.exec(command).await?)
}

#[async_trait]
impl Step for RemoteCommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        let hosts = self.hosts.resolve(ctx.runtime());
        if hosts.is_empty() {
            debug!("Step {} has no target hosts", self.name);
            return Ok(StepOutcome::ok("no target hosts"));
        }

        let command = self.rendered();
        let outputs: Vec<Result<CommandOutput, EngineError>> = if self.parallel {
            join_all(hosts.iter().map(|host| exec_on(ctx, host, &command))).await
        } else {
            let mut outputs = Vec::with_capacity(hosts.len());
            for host in &hosts {
                outputs.push(exec_on(ctx, host, &command).await);
            }
            outputs
        };

        let mut recorded = BTreeMap::new();
        let mut failures = Vec::new();
        for (host, output) in hosts.iter().zip(outputs) {
            let output = output?;
            if !output.success {
                failures.push(format!(
                    "{}: exit {} {}",
                    host.name,
                    output.exit_code,
                    output.stderr.trim()
                ));
            }
            recorded.insert(host.name.clone(), output);
        }

        if let Some(key) = &self.record_as {
            ctx.module_cache
                .set_as(key.clone(), &recorded)
                .await
                .map_err(|e| EngineError::Cache {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
        }

        if failures.is_empty() {
            Ok(StepOutcome::ok(format!("{} hosts ok", recorded.len())))
        } else {
            Ok(StepOutcome::failed(failures.join("; ")))
        }
    }
}

/// Copies content to every selected host and verifies its sha256
pub struct UploadStep {
    name: String,
    content: Vec<u8>,
    remote_path: String,
    hosts: HostSelector,
}

impl UploadStep {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        remote_path: impl Into<String>,
        hosts: HostSelector,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            remote_path: remote_path.into(),
            hosts,
        }
    }

    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(&self.content))
    }

    async fn upload_to(&self, ctx: &ExecutionContext, host: &Host) -> Result<Option<String>, EngineError> {
        let connector = ctx.runtime().get_connector(host).await?;
        connector.upload(&self.content, &self.remote_path).await?;

        let checksum_cmd = format!(
            "sha256sum {} | cut -d' ' -f1",
            shell_words::quote(&self.remote_path)
        );
        let result = connector.exec(&checksum_cmd).await?;
        let expected = self.checksum();
        let actual = result.stdout.trim();

        if !result.success || actual != expected {
            return Ok(Some(format!(
                "{}: checksum mismatch (expected {}, got {})",
                host.name, expected, actual
            )));
        }
        Ok(None)
    }
}

#[async_trait]
impl Step for UploadStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        let hosts = self.hosts.resolve(ctx.runtime());
        let mut mismatches = Vec::new();

        for host in &hosts {
            if let Some(mismatch) = self.upload_to(ctx, host).await? {
                mismatches.push(mismatch);
            }
        }

        if mismatches.is_empty() {
            Ok(StepOutcome::ok(format!(
                "{} uploaded to {} hosts",
                self.remote_path,
                hosts.len()
            )))
        } else {
            Ok(StepOutcome::failed(mismatches.join("; ")))
        }
    }
}

/// Checks that files exist on the control machine
pub struct LocalFilesStep {
    name: String,
    paths: Vec<PathBuf>,
}

impl LocalFilesStep {
    pub fn new(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            paths,
        }
    }
}

#[async_trait]
impl Step for LocalFilesStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self, _ctx: &ExecutionContext) -> Result<StepOutcome, EngineError> {
        let mut missing = Vec::new();
        for path in &self.paths {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                _ => missing.push(path.display().to_string()),
            }
        }

        if missing.is_empty() {
            Ok(StepOutcome::ok(format!("{} files present", self.paths.len())))
        } else {
            Ok(StepOutcome::failed(format!("missing: {}", missing.join(", "))))
        }
    }
}
