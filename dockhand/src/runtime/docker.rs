//! Docker CLI adapter.
//!
//! Drives the `docker` binary and parses its JSON output. Discovery runs
//! `docker ps` for ids and `docker inspect` for full records; mutation uses
//! plain subcommands. The binary name is injectable so a compatible CLI
//! (e.g. podman) can stand in.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::constants::{self, labels};
use crate::errors::{DockhandError, Result};
use crate::runtime::types::{
    ContainerRecord, ContainerState, ExecOptions, ExecOutput, LogOptions, LogStream,
    PublishedPort,
};
use crate::runtime::{ContainerRuntime, project_selector, service_selector};
use crate::topology::{PortMapping, ServiceSpec, StackDescriptor};

// ============================================================================
// ADAPTER
// ============================================================================

pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".into(),
        }
    }

    /// Use a different docker-compatible binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run a docker subcommand to completion, capturing output.
    async fn run(&self, project: &str, args: &[String]) -> Result<std::process::Output> {
        debug!(?args, "docker");
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DockhandError::runtime(project, format!("failed to run {}: {e}", self.binary))
            })
    }

    /// Run a docker subcommand, failing on non-zero exit with stderr.
    async fn run_checked(&self, project: &str, args: &[String]) -> Result<String> {
        let output = self.run(project, args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockhandError::runtime(
                project,
                format!("docker {} failed: {}", args.first().map(String::as_str).unwrap_or(""), stderr.trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn inspect(&self, project: &str, ids: &[String]) -> Result<Vec<ContainerRecord>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut args = string_args(&["inspect"]);
        args.extend(ids.iter().cloned());
        let stdout = self.run_checked(project, &args).await?;
        let entries: Vec<InspectEntry> = serde_json::from_str(&stdout).map_err(|e| {
            DockhandError::runtime(project, format!("could not parse docker inspect output: {e}"))
        })?;
        Ok(entries.into_iter().map(InspectEntry::into_record).collect())
    }

    /// Create and start one container from its spec.
    async fn run_container(&self, project: &str, network: &str, spec: &ServiceSpec) -> Result<()> {
        let mut args = string_args(&["run", "-d", "--name", &spec.container_name]);
        args.push("--network".into());
        args.push(network.into());
        for (key, value) in &spec.labels {
            args.push("--label".into());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        for mount in &spec.mounts {
            let mut bind = format!("{}:{}", mount.source.display(), mount.target);
            if mount.read_only {
                bind.push_str(":ro");
            }
            args.push("-v".into());
            args.push(bind);
        }
        for port in &spec.ports {
            args.push("-p".into());
            args.push(publish_arg(port));
        }
        if let Some(dir) = &spec.working_dir {
            args.push("-w".into());
            args.push(dir.clone());
        }
        args.push(spec.image.clone());

        let output = self.run(project, &args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_run_failure(project, spec, &stderr));
        }
        Ok(())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn find_by_labels(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ContainerRecord>> {
        let context = selector
            .get(labels::SITE_NAME)
            .map(String::as_str)
            .unwrap_or("discovery");
        let mut args = string_args(&["ps", "-a", "-q", "--no-trunc"]);
        for (key, value) in selector {
            args.push("--filter".into());
            args.push(format!("label={key}={value}"));
        }
        let stdout = self.run_checked(context, &args).await?;
        let ids: Vec<String> = stdout.lines().map(str::to_string).collect();
        self.inspect(context, &ids).await
    }

    async fn start_stack(&self, descriptor: &StackDescriptor) -> Result<()> {
        let project = &descriptor.project_name;
        self.ensure_network().await?;

        let existing = self
            .find_by_labels(&project_selector(project))
            .await?;

        for spec in &descriptor.services {
            let current = existing.iter().find(|r| r.name == spec.container_name);

            // A container still carrying another image or label set cannot be
            // mutated in place; replace it.
            if let Some(record) = current {
                let stale = record.image != spec.image
                    || spec
                        .labels
                        .iter()
                        .any(|(k, v)| record.labels.get(k) != Some(v));
                if stale {
                    self.run(project, &string_args(&["rm", "-f", &record.name]))
                        .await?;
                    self.run_container(project, &descriptor.network, spec).await?;
                    continue;
                }
            }

            match current.map(|r| r.state) {
                Some(ContainerState::Running) | Some(ContainerState::Restarting) => {
                    debug!(container = %spec.container_name, "already running");
                }
                Some(ContainerState::Paused) => {
                    self.run_checked(project, &string_args(&["unpause", &spec.container_name]))
                        .await?;
                }
                Some(ContainerState::Exited) | Some(ContainerState::Created) => {
                    self.run_checked(project, &string_args(&["start", &spec.container_name]))
                        .await?;
                }
                Some(ContainerState::Dead) => {
                    // Dead containers cannot be restarted; replace them.
                    self.run(project, &string_args(&["rm", "-f", &spec.container_name]))
                        .await?;
                    self.run_container(project, &descriptor.network, spec).await?;
                }
                Some(ContainerState::Removing) | Some(ContainerState::Unknown) | None => {
                    self.run_container(project, &descriptor.network, spec).await?;
                }
            }
        }
        Ok(())
    }

    async fn stop_project(&self, project: &str) -> Result<()> {
        let records = self.find_by_labels(&project_selector(project)).await?;
        for record in records.iter().filter(|r| r.state.is_active()) {
            let output = self
                .run(project, &string_args(&["stop", &record.name]))
                .await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !is_absence_error(&stderr) {
                    return Err(DockhandError::runtime(
                        project,
                        format!("docker stop {} failed: {}", record.name, stderr.trim()),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn remove_project(&self, project: &str, remove_data: bool) -> Result<()> {
        let records = self.find_by_labels(&project_selector(project)).await?;
        for record in &records {
            let output = self
                .run(project, &string_args(&["rm", "-f", "-v", &record.name]))
                .await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !is_absence_error(&stderr) {
                    return Err(DockhandError::runtime(
                        project,
                        format!("docker rm {} failed: {}", record.name, stderr.trim()),
                    ));
                }
            }
        }

        if remove_data {
            let filter = format!("label={}={}", labels::SITE_NAME, project);
            let stdout = self
                .run_checked(project, &string_args(&["volume", "ls", "-q", "--filter", &filter]))
                .await?;
            for volume in stdout.lines().filter(|l| !l.is_empty()) {
                let output = self
                    .run(project, &string_args(&["volume", "rm", volume]))
                    .await?;
                if !output.status.success() {
                    warn!(project, volume, "could not remove volume");
                }
            }
        }
        Ok(())
    }

    async fn exec(
        &self,
        project: &str,
        service: &str,
        command: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput> {
        let records = self
            .find_by_labels(&service_selector(project, service))
            .await?;
        let running = records.iter().find(|r| r.state.is_running());
        let Some(container) = running else {
            return Err(DockhandError::ServiceNotRunning {
                project: project.into(),
                service: service.into(),
            });
        };

        let mut args = vec!["exec".to_string()];
        if options.interactive {
            args.push("-it".into());
        }
        if let Some(dir) = &options.working_dir {
            args.push("-w".into());
            args.push(dir.clone());
        }
        args.push(container.name.clone());
        args.extend(command.iter().cloned());

        if options.interactive {
            debug!(?args, "docker (interactive)");
            let status = Command::new(&self.binary)
                .args(&args)
                .status()
                .await
                .map_err(|e| {
                    DockhandError::runtime(project, format!("failed to run {}: {e}", self.binary))
                })?;
            if !status.success() {
                return Err(DockhandError::runtime(
                    project,
                    format!("command in {service} exited with {status}"),
                ));
            }
            return Ok(ExecOutput::default());
        }

        let output = self.run(project, &args).await?;
        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !output.status.success() {
            return Err(DockhandError::runtime(
                project,
                format!(
                    "command in {service} exited with {}: {}",
                    output.status,
                    result.stderr.trim()
                ),
            ));
        }
        Ok(result)
    }

    async fn logs(&self, project: &str, service: &str, options: &LogOptions) -> Result<LogStream> {
        let records = self
            .find_by_labels(&service_selector(project, service))
            .await?;
        let Some(container) = records.first() else {
            return Err(DockhandError::runtime(
                project,
                format!("no container exists for service {service}"),
            ));
        };

        let mut args = string_args(&["logs"]);
        if options.follow {
            args.push("--follow".into());
        }
        if options.timestamps {
            args.push("--timestamps".into());
        }
        if let Some(tail) = options.tail {
            args.push("--tail".into());
            args.push(tail.to_string());
        }
        args.push(container.name.clone());

        debug!(?args, "docker (stream)");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DockhandError::runtime(project, format!("failed to run {}: {e}", self.binary))
            })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let project = project.to_string();

        let stream = async_stream::try_stream! {
            // Container stdout first; docker writes container stderr to its
            // own stderr pipe, drained after stdout closes.
            let mut buf = vec![0u8; 8192];
            if let Some(out) = stdout.as_mut() {
                loop {
                    let n = out.read(&mut buf).await.map_err(|e| {
                        DockhandError::runtime(&project, format!("log read failed: {e}"))
                    })?;
                    if n == 0 {
                        break;
                    }
                    yield buf[..n].to_vec();
                }
            }
            if let Some(err) = stderr.as_mut() {
                loop {
                    let n = err.read(&mut buf).await.map_err(|e| {
                        DockhandError::runtime(&project, format!("log read failed: {e}"))
                    })?;
                    if n == 0 {
                        break;
                    }
                    yield buf[..n].to_vec();
                }
            }
            drop(child);
        };
        Ok(Box::pin(stream))
    }

    async fn ensure_network(&self) -> Result<()> {
        let inspect = self
            .run(
                "network",
                &string_args(&["network", "inspect", constants::NETWORK_NAME]),
            )
            .await?;
        if inspect.status.success() {
            return Ok(());
        }
        let output = self
            .run(
                "network",
                &string_args(&["network", "create", constants::NETWORK_NAME]),
            )
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Lost a creation race with a concurrent invocation.
            if !stderr.contains("already exists") {
                return Err(DockhandError::runtime(
                    "network",
                    format!("could not create network: {}", stderr.trim()),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PARSING
// ============================================================================

fn string_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn publish_arg(port: &PortMapping) -> String {
    match port.host_port {
        Some(host) => format!("{host}:{}", port.container_port),
        None => port.container_port.to_string(),
    }
}

fn is_absence_error(stderr: &str) -> bool {
    stderr.contains("No such container")
}

/// Turn a failed `docker run` into the right error kind. Port collisions
/// get their own variant so callers can degrade instead of aborting.
fn classify_run_failure(project: &str, spec: &ServiceSpec, stderr: &str) -> DockhandError {
    let stderr = stderr.trim();
    if stderr.contains("port is already allocated") || stderr.contains("address already in use") {
        let port = parse_conflict_port(stderr)
            .or_else(|| spec.ports.iter().find_map(|p| p.host_port))
            .unwrap_or(0);
        return DockhandError::PortConflict {
            port,
            detail: stderr.to_string(),
        };
    }
    DockhandError::runtime(
        project,
        format!("could not create {}: {stderr}", spec.container_name),
    )
}

fn parse_conflict_port(stderr: &str) -> Option<u16> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"[Bb]ind for [0-9a-fA-F.:\[\]]*:(\d+)").expect("static port pattern")
    });
    re.captures(stderr)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Subset of `docker inspect` output the adapter reads.
#[derive(Deserialize)]
struct InspectEntry {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Created")]
    created: Option<DateTime<Utc>>,
    #[serde(rename = "State")]
    state: InspectState,
    #[serde(rename = "Config")]
    config: InspectConfig,
    #[serde(rename = "NetworkSettings")]
    network_settings: Option<InspectNetwork>,
}

#[derive(Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Deserialize)]
struct InspectConfig {
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Labels", default)]
    labels: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct InspectNetwork {
    #[serde(rename = "Ports", default)]
    ports: BTreeMap<String, Option<Vec<InspectPortBinding>>>,
}

#[derive(Deserialize)]
struct InspectPortBinding {
    #[serde(rename = "HostPort")]
    host_port: String,
}

impl InspectEntry {
    fn into_record(self) -> ContainerRecord {
        let ports = self
            .network_settings
            .map(|net| parse_ports(&net.ports))
            .unwrap_or_default();
        ContainerRecord {
            id: self.id,
            name: self.name.trim_start_matches('/').to_string(),
            image: self.config.image,
            state: ContainerState::parse(&self.state.status),
            labels: self.config.labels,
            ports,
            created: self.created,
        }
    }
}

fn parse_ports(ports: &BTreeMap<String, Option<Vec<InspectPortBinding>>>) -> Vec<PublishedPort> {
    let mut published = Vec::new();
    for (key, bindings) in ports {
        let Some(container_port) = key.split('/').next().and_then(|p| p.parse().ok()) else {
            continue;
        };
        for binding in bindings.iter().flatten() {
            if let Ok(host_port) = binding.host_port.parse() {
                published.push(PublishedPort {
                    container_port,
                    host_port,
                });
            }
        }
    }
    published
}
