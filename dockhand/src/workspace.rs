//! Workspace context: the explicit object tying together the global
//! layout, the app-type registry, and the container backend handle.
//!
//! Everything that would otherwise be process-global state lives here and
//! is passed by reference into project handles, which keeps every consumer
//! testable against a substitute backend.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{AppTypeRegistry, ProjectConfig};
use crate::constants;
use crate::errors::{DockhandError, Result};
use crate::layout::GlobalLayout;
use crate::lifecycle::Project;
use crate::router::RouterManager;
use crate::runtime::{ContainerRecord, SharedRuntime, platform_selector, project_selector};
use crate::status::ProjectStatus;

/// Construction options for a workspace.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceOptions {
    /// Override for the global per-machine directory (default `~/.dockhand`).
    pub global_dir: Option<PathBuf>,
}

/// Shared context for all project operations on this machine.
#[derive(Clone)]
pub struct Workspace {
    layout: GlobalLayout,
    registry: AppTypeRegistry,
    runtime: SharedRuntime,
}

impl Workspace {
    pub fn new(options: WorkspaceOptions, runtime: SharedRuntime) -> Result<Self> {
        let layout = match options.global_dir {
            Some(dir) => GlobalLayout::new(dir),
            None => GlobalLayout::default_base().ok_or_else(|| {
                DockhandError::io(
                    "locating home directory",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
                )
            })?,
        };
        layout.prepare()?;
        Ok(Self {
            layout,
            registry: AppTypeRegistry::new(),
            runtime,
        })
    }

    pub fn layout(&self) -> &GlobalLayout {
        &self.layout
    }

    pub fn registry(&self) -> &AppTypeRegistry {
        &self.registry
    }

    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    pub fn router(&self) -> RouterManager {
        RouterManager::new(self.runtime.clone(), self.layout.clone())
    }

    // ========================================================================
    // PROJECT HANDLES
    // ========================================================================

    /// Fresh descriptor with defaults for a directory, for the config flow.
    pub fn new_project_config(&self, approot: &Path) -> ProjectConfig {
        ProjectConfig::new(approot, &self.layout)
    }

    /// Project handle for a directory containing a descriptor.
    pub fn project_at(&self, approot: &Path) -> Result<Project> {
        let config = ProjectConfig::load(approot, &self.layout)?;
        Ok(Project::with_config(self.clone(), config))
    }

    /// Project handle by name, resolved through label discovery so it works
    /// after the project directory is gone.
    pub async fn project_named(&self, name: &str) -> Result<Project> {
        let records = self
            .runtime
            .find_by_labels(&project_selector(name))
            .await?;
        let labeled_approot = records
            .iter()
            .find_map(|r| r.approot())
            .map(PathBuf::from);

        let Some(approot) = labeled_approot else {
            return Err(DockhandError::ProjectNotFound { name: name.into() });
        };

        if approot.is_dir() {
            match ProjectConfig::load(&approot, &self.layout) {
                Ok(config) => return Ok(Project::with_config(self.clone(), config)),
                Err(DockhandError::ConfigNotFound { .. }) => {
                    return Ok(Project::from_labels(self.clone(), name, approot, None));
                }
                Err(e) => {
                    debug!(name, error = %e, "descriptor unreadable; using labels");
                    return Ok(Project::from_labels(
                        self.clone(),
                        name,
                        approot,
                        Some(e.to_string()),
                    ));
                }
            }
        }
        Ok(Project::from_labels(self.clone(), name, approot, None))
    }

    // ========================================================================
    // LISTING
    // ========================================================================

    /// Status of every discoverable project, sorted by name. A project
    /// whose descriptor cannot be read still yields an entry, degraded.
    pub async fn list(&self) -> Result<Vec<ProjectStatus>> {
        let records = self.runtime.find_by_labels(&platform_selector()).await?;

        let mut names: Vec<String> = records
            .iter()
            .filter(|r| r.is_discoverable())
            .filter_map(|r| r.site_name())
            .filter(|name| *name != constants::ROUTER_PROJECT_NAME)
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();

        let mut statuses = Vec::with_capacity(names.len());
        for name in &names {
            let project_records: Vec<ContainerRecord> = records
                .iter()
                .filter(|r| r.site_name() == Some(name.as_str()))
                .cloned()
                .collect();
            statuses.push(self.status_for(name, &project_records));
        }
        Ok(statuses)
    }

    /// Best-effort status from one project's container records.
    fn status_for(&self, name: &str, records: &[ContainerRecord]) -> ProjectStatus {
        let approot = records.iter().find_map(|r| r.approot()).map(PathBuf::from);

        let Some(approot) = approot else {
            return ProjectStatus::from_labels(name, records)
                .with_problem("containers carry no approot label");
        };
        if !approot.is_dir() {
            return ProjectStatus::dir_missing(name, records)
                .with_problem(format!("project directory missing: {}", approot.display()));
        }
        match ProjectConfig::load(&approot, &self.layout) {
            Ok(config) => ProjectStatus::from_config(&config, records),
            Err(DockhandError::ConfigNotFound { .. }) => {
                ProjectStatus::config_missing(name, approot, records)
            }
            Err(e) => ProjectStatus::from_labels(name, records)
                .with_problem(format!("could not read project config: {e}")),
        }
    }

    // ========================================================================
    // OFFLINE MODE
    // ========================================================================

    /// Whether offline mode is on (marker file present).
    pub fn is_offline(&self) -> bool {
        self.layout.offline_marker_path().exists()
    }

    pub fn set_offline(&self, offline: bool) -> Result<()> {
        let marker = self.layout.offline_marker_path();
        if offline {
            std::fs::write(&marker, "")
                .map_err(|e| DockhandError::io(format!("writing {}", marker.display()), e))
        } else {
            match std::fs::remove_file(&marker) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(DockhandError::io(
                    format!("removing {}", marker.display()),
                    e,
                )),
            }
        }
    }
}

/// Walk up from a directory to the nearest project root (a directory
/// containing the descriptor). Used to resolve which project a command
/// invoked inside a project tree refers to.
pub fn find_approot(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if ProjectConfig::config_path(dir).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_approot_walks_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        let nested = approot.join("web/sites/default");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(approot.join(constants::CONFIG_DIR)).unwrap();
        std::fs::write(ProjectConfig::config_path(&approot), "name: site\n").unwrap();

        assert_eq!(find_approot(&nested), Some(approot.clone()));
        assert_eq!(find_approot(&approot), Some(approot));
    }

    #[test]
    fn test_find_approot_none_outside_projects() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_approot(tmp.path()), None);
    }
}
