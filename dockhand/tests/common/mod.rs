//! In-memory container backend and scaffolding shared by the integration
//! tests. The fake mirrors the convergence semantics the reconciler relies
//! on: label queries see every state, starting an existing matching
//! container is a no-op, and changed containers are replaced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;

use dockhand::errors::{DockhandError, Result};
use dockhand::runtime::{
    ContainerRecord, ContainerRuntime, ContainerState, ExecOptions, ExecOutput, LogOptions,
    LogStream, PublishedPort,
};
use dockhand::topology::StackDescriptor;
use dockhand::{SharedRuntime, Workspace, WorkspaceOptions};

// Router startup probes real host ports, so tests touching start/stop must
// not overlap.
static TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

#[allow(dead_code)]
pub fn lock() -> MutexGuard<'static, ()> {
    TEST_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// One recorded exec invocation.
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct ExecCall {
    pub project: String,
    pub service: String,
    pub command: Vec<String>,
    pub working_dir: Option<String>,
}

#[derive(Default)]
struct FakeState {
    containers: Vec<ContainerRecord>,
    exec_calls: Vec<ExecCall>,
    networks: Vec<String>,
    /// Substring of a command that should fail, with the error detail.
    exec_failures: Vec<(String, String)>,
    next_port: u16,
}

/// Clonable in-memory [`ContainerRuntime`].
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SharedRuntime {
        Arc::new(self.clone())
    }

    pub fn containers(&self) -> Vec<ContainerRecord> {
        self.state.lock().unwrap().containers.clone()
    }

    pub fn container_named(&self, name: &str) -> Option<ContainerRecord> {
        self.containers().into_iter().find(|r| r.name == name)
    }

    pub fn exec_calls(&self) -> Vec<ExecCall> {
        self.state.lock().unwrap().exec_calls.clone()
    }

    pub fn networks(&self) -> Vec<String> {
        self.state.lock().unwrap().networks.clone()
    }

    /// Force a container into a state, as if changed behind dockhand's back.
    pub fn set_state(&self, name: &str, state: ContainerState) {
        let mut guard = self.state.lock().unwrap();
        if let Some(record) = guard.containers.iter_mut().find(|r| r.name == name) {
            record.state = state;
        }
    }

    /// Seed a container record directly.
    pub fn insert_container(&self, record: ContainerRecord) {
        self.state.lock().unwrap().containers.push(record);
    }

    /// Make any exec whose command contains `needle` fail with `detail`.
    pub fn fail_exec_containing(&self, needle: &str, detail: &str) {
        self.state
            .lock()
            .unwrap()
            .exec_failures
            .push((needle.to_string(), detail.to_string()));
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn find_by_labels(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ContainerRecord>> {
        let guard = self.state.lock().unwrap();
        Ok(guard
            .containers
            .iter()
            .filter(|r| {
                selector
                    .iter()
                    .all(|(k, v)| r.labels.get(k).map(String::as_str) == Some(v))
            })
            .cloned()
            .collect())
    }

    async fn start_stack(&self, descriptor: &StackDescriptor) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        // Mirror DockerCli::start_stack: the shared network is created on
        // demand before any service comes up.
        if !guard.networks.iter().any(|n| n == "dockhand_default") {
            guard.networks.push("dockhand_default".to_string());
        }
        for spec in &descriptor.services {
            let existing = guard
                .containers
                .iter_mut()
                .find(|r| r.name == spec.container_name);
            if let Some(record) = existing {
                let stale = record.image != spec.image || record.labels != spec.labels;
                if !stale {
                    record.state = ContainerState::Running;
                    continue;
                }
                let name = record.name.clone();
                guard.containers.retain(|r| r.name != name);
            }

            guard.next_port += 1;
            let next_port = 32768 + guard.next_port;
            let ports = spec
                .ports
                .iter()
                .map(|p| PublishedPort {
                    container_port: p.container_port,
                    host_port: p.host_port.unwrap_or(next_port),
                })
                .collect();
            guard.containers.push(ContainerRecord {
                id: format!("fake-{}", spec.container_name),
                name: spec.container_name.clone(),
                image: spec.image.clone(),
                state: ContainerState::Running,
                labels: spec.labels.clone(),
                ports,
                created: Some(Utc::now()),
            });
        }
        Ok(())
    }

    async fn stop_project(&self, project: &str) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        for record in guard.containers.iter_mut() {
            if record.site_name() == Some(project) && record.state.is_active() {
                record.state = ContainerState::Exited;
            }
        }
        Ok(())
    }

    async fn remove_project(&self, project: &str, _remove_data: bool) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        guard
            .containers
            .retain(|r| r.site_name() != Some(project));
        Ok(())
    }

    async fn exec(
        &self,
        project: &str,
        service: &str,
        command: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput> {
        let mut guard = self.state.lock().unwrap();
        let running = guard.containers.iter().any(|r| {
            r.site_name() == Some(project)
                && r.service_role() == Some(service)
                && r.state.is_running()
        });
        if !running {
            return Err(DockhandError::ServiceNotRunning {
                project: project.to_string(),
                service: service.to_string(),
            });
        }

        guard.exec_calls.push(ExecCall {
            project: project.to_string(),
            service: service.to_string(),
            command: command.to_vec(),
            working_dir: options.working_dir.clone(),
        });

        let joined = command.join(" ");
        if let Some((_, detail)) = guard
            .exec_failures
            .iter()
            .find(|(needle, _)| joined.contains(needle))
        {
            return Err(DockhandError::runtime(project, detail.clone()));
        }
        Ok(ExecOutput::default())
    }

    async fn logs(
        &self,
        project: &str,
        service: &str,
        _options: &LogOptions,
    ) -> Result<LogStream> {
        let guard = self.state.lock().unwrap();
        let exists = guard
            .containers
            .iter()
            .any(|r| r.site_name() == Some(project) && r.service_role() == Some(service));
        if !exists {
            return Err(DockhandError::runtime(
                project,
                format!("no container exists for service {service}"),
            ));
        }
        let chunks = vec![Ok(b"fake log line\n".to_vec())];
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn ensure_network(&self) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        if !guard.networks.iter().any(|n| n == "dockhand_default") {
            guard.networks.push("dockhand_default".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// SCAFFOLDING
// ============================================================================

/// Workspace rooted under the given global dir, on the fake backend.
#[allow(dead_code)]
pub fn workspace(fake: &FakeRuntime, global_dir: &Path) -> Workspace {
    Workspace::new(
        WorkspaceOptions {
            global_dir: Some(global_dir.to_path_buf()),
        },
        fake.handle(),
    )
    .unwrap()
}

/// Write a minimal project tree: an approot with a descriptor.
#[allow(dead_code)]
pub fn scaffold_project(parent: &Path, name: &str, config_body: &str) -> PathBuf {
    let approot = parent.join(name);
    std::fs::create_dir_all(approot.join(".dockhand")).unwrap();
    std::fs::write(
        approot.join(".dockhand/config.yaml"),
        format!("name: {name}\n{config_body}"),
    )
    .unwrap();
    approot
}
