//! Project status snapshots.
//!
//! Status is always computed fresh from a config load plus a label query;
//! nothing is cached because container state changes out-of-band. The
//! constructors here are pure so both describe and list share them.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{AppType, ProjectConfig};
use crate::constants;
use crate::runtime::{ContainerRecord, ContainerState, PublishedPort};
use crate::topology::ServiceRole;

// ============================================================================
// STATE
// ============================================================================

/// Observed lifecycle state of a whole project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectState {
    Running,
    Stopped,
    Paused,
    DirMissing,
    ConfigMissing,
    NotFound,
}

impl ProjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectState::Running => "running",
            ProjectState::Stopped => "stopped",
            ProjectState::Paused => "paused",
            ProjectState::DirMissing => "project directory missing",
            ProjectState::ConfigMissing => "config missing",
            ProjectState::NotFound => "not found",
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STATUS
// ============================================================================

/// One service's contribution to a status snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub container_name: String,
    pub state: ContainerState,
    pub published_ports: Vec<PublishedPort>,
}

/// Renderable snapshot of one project.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectStatus {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<AppType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub state: ProjectState,
    pub services: Vec<ServiceStatus>,
    /// Degradation note when the descriptor could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

impl ProjectStatus {
    /// Full snapshot for a loadable config.
    pub fn from_config(config: &ProjectConfig, records: &[ContainerRecord]) -> Self {
        Self {
            name: config.name.clone(),
            app_type: Some(config.app_type),
            approot: Some(config.approot.clone()),
            url: Some(config.url()),
            state: aggregate_state(records),
            services: service_statuses(records),
            problem: None,
        }
    }

    /// Snapshot reconstructed from container labels alone, for projects
    /// whose descriptor is unreadable or whose directory is gone.
    pub fn from_labels(name: &str, records: &[ContainerRecord]) -> Self {
        let first = records.first();
        let app_type = first
            .and_then(|r| r.app_type_label())
            .and_then(|t| t.parse().ok());
        let approot = first.and_then(|r| r.approot()).map(PathBuf::from);
        Self {
            name: name.to_string(),
            app_type,
            approot,
            url: Some(constants::project_url(name)),
            state: aggregate_state(records),
            services: service_statuses(records),
            problem: None,
        }
    }

    /// Snapshot for a project whose directory no longer exists.
    pub fn dir_missing(name: &str, records: &[ContainerRecord]) -> Self {
        let mut status = Self::from_labels(name, records);
        status.state = ProjectState::DirMissing;
        status
    }

    /// Snapshot for a directory without a descriptor.
    pub fn config_missing(name: &str, approot: PathBuf, records: &[ContainerRecord]) -> Self {
        let mut status = Self::from_labels(name, records);
        status.approot = Some(approot);
        status.state = ProjectState::ConfigMissing;
        status
    }

    /// Attach a degradation note.
    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }
}

/// Collapse container records into one project state. The web service is
/// authoritative when present.
pub fn aggregate_state(records: &[ContainerRecord]) -> ProjectState {
    if records.is_empty() {
        return ProjectState::NotFound;
    }
    let representative = records
        .iter()
        .find(|r| r.service_role() == Some(ServiceRole::Web.as_str()))
        .unwrap_or(&records[0]);
    match representative.state {
        ContainerState::Running | ContainerState::Restarting => ProjectState::Running,
        ContainerState::Paused => ProjectState::Paused,
        _ => ProjectState::Stopped,
    }
}

fn service_statuses(records: &[ContainerRecord]) -> Vec<ServiceStatus> {
    let mut statuses: Vec<ServiceStatus> = records
        .iter()
        .map(|r| ServiceStatus {
            service: r.service_role().unwrap_or("unknown").to_string(),
            container_name: r.name.clone(),
            state: r.state,
            published_ports: r.ports.clone(),
        })
        .collect();
    statuses.sort_by_key(|s| service_rank(&s.service));
    statuses
}

fn service_rank(service: &str) -> (u8, String) {
    let rank = match service {
        "web" => 0,
        "db" => 1,
        "dba" => 2,
        _ => 3,
    };
    (rank, service.to_string())
}
