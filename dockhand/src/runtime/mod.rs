//! Container backend capability surface.
//!
//! The reconciler only ever talks to [`ContainerRuntime`]; the production
//! implementation shells out to the `docker` binary, tests substitute an
//! in-memory fake. Semantics the reconciler depends on are part of this
//! contract: label queries return containers in every lifecycle state,
//! start converges instead of duplicating, stop and remove tolerate
//! absence.

pub mod docker;
pub mod types;

pub use docker::DockerCli;
pub use types::{
    ContainerRecord, ContainerState, ExecOptions, ExecOutput, LogOptions, LogStream,
    PublishedPort,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::constants::{self, labels};
use crate::errors::{DockhandError, Result};
use crate::topology::StackDescriptor;

/// Shared handle to the container backend.
pub type SharedRuntime = Arc<dyn ContainerRuntime>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers matching every given label pair, in any lifecycle
    /// state. An empty result is not an error.
    async fn find_by_labels(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ContainerRecord>>;

    /// Converge the backend toward a descriptor: create absent services,
    /// start exited ones, replace ones whose image or labels changed, and
    /// leave matching running ones alone. Services are processed in
    /// descriptor order.
    async fn start_stack(&self, descriptor: &StackDescriptor) -> Result<()>;

    /// Halt all containers labeled for a project, leaving them in place.
    /// Absent or already stopped containers are success.
    async fn stop_project(&self, project: &str) -> Result<()>;

    /// Stop and delete all containers labeled for a project; with
    /// `remove_data`, also delete their labeled volumes. Absence is success.
    async fn remove_project(&self, project: &str, remove_data: bool) -> Result<()>;

    /// Run a command inside the running container for a service. Fails with
    /// [`DockhandError::ServiceNotRunning`] when there is none.
    async fn exec(
        &self,
        project: &str,
        service: &str,
        command: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput>;

    /// Stream logs from a service container. Fails when the container does
    /// not exist at all.
    async fn logs(&self, project: &str, service: &str, options: &LogOptions) -> Result<LogStream>;

    /// Create the shared network if absent. Idempotent.
    async fn ensure_network(&self) -> Result<()>;
}

// ============================================================================
// LABEL SELECTORS
// ============================================================================

/// Selector matching every managed container on this machine.
pub fn platform_selector() -> BTreeMap<String, String> {
    let mut selector = BTreeMap::new();
    selector.insert(labels::PLATFORM.into(), constants::PLATFORM_NAME.into());
    selector
}

/// Selector matching all containers of one project.
pub fn project_selector(project: &str) -> BTreeMap<String, String> {
    let mut selector = platform_selector();
    selector.insert(labels::SITE_NAME.into(), project.into());
    selector
}

/// Selector matching one service of one project.
pub fn service_selector(project: &str, service: &str) -> BTreeMap<String, String> {
    let mut selector = project_selector(project);
    selector.insert(labels::SERVICE.into(), service.into());
    selector
}

// ============================================================================
// BOUNDED HEALTH WAIT
// ============================================================================

/// First poll interval after a start.
const WAIT_INITIAL: Duration = Duration::from_millis(500);
/// Poll intervals grow by this factor up to [`WAIT_MAX_INTERVAL`].
const WAIT_BACKOFF_FACTOR: f64 = 1.5;
/// Longest pause between polls.
const WAIT_MAX_INTERVAL: Duration = Duration::from_secs(5);
/// Default ceiling for one stack to come up.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(120);

/// Poll with backoff until every service in the descriptor reports
/// `running`, or fail with a Timeout once the ceiling is reached.
pub async fn wait_for_stack_running(
    runtime: &dyn ContainerRuntime,
    descriptor: &StackDescriptor,
    ceiling: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + ceiling;
    let mut interval = WAIT_INITIAL;

    loop {
        let records = runtime
            .find_by_labels(&project_selector(&descriptor.project_name))
            .await?;
        let pending: Vec<&str> = descriptor
            .services
            .iter()
            .filter(|spec| {
                !records
                    .iter()
                    .any(|r| r.name == spec.container_name && r.state.is_running())
            })
            .map(|spec| spec.container_name.as_str())
            .collect();

        if pending.is_empty() {
            return Ok(());
        }
        debug!(project = %descriptor.project_name, ?pending, "waiting for containers");

        if tokio::time::Instant::now() + interval > deadline {
            return Err(DockhandError::Timeout {
                operation: format!(
                    "project {} containers to report running ({})",
                    descriptor.project_name,
                    pending.join(", ")
                ),
                seconds: ceiling.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
        interval = next_backoff(interval);
    }
}

fn next_backoff(current: Duration) -> Duration {
    let grown = current.mul_f64(WAIT_BACKOFF_FACTOR);
    if grown > WAIT_MAX_INTERVAL {
        WAIT_MAX_INTERVAL
    } else {
        grown
    }
}
