//! Global per-machine directory layout.
//!
//! Everything dockhand stores outside a project tree lives under one base
//! directory (default `~/.dockhand`):
//!
//! ```text
//! {base}/
//! ├── offline              # marker file, present while offline mode is on
//! ├── router/
//! │   └── routes.yaml      # last applied router route table
//! └── projects/
//!     └── {name}/
//!         ├── mysql/       # database data, bind-mounted into the db service
//!         └── import-db/   # staging area, bind-mounted into the db service
//! ```

use std::path::{Path, PathBuf};

use crate::errors::{DockhandError, Result};

/// Directory and file names under the global base.
pub mod dirs {
    /// Per-project subtree root.
    pub const PROJECTS: &str = "projects";

    /// Database data directory inside a project subtree.
    pub const MYSQL: &str = "mysql";

    /// Import staging directory inside a project subtree.
    pub const IMPORT_DB: &str = "import-db";

    /// Router subtree root.
    pub const ROUTER: &str = "router";

    /// Applied router route table inside the router subtree.
    pub const ROUTER_CONFIG: &str = "routes.yaml";

    /// Offline-mode marker file directly under the base.
    pub const OFFLINE_MARKER: &str = "offline";
}

/// Layout rooted at the global per-machine directory.
///
/// Created on first use and never torn down automatically; only a project's
/// own subtree is removed, and only on an explicit `remove --remove-data`.
#[derive(Clone, Debug)]
pub struct GlobalLayout {
    base: PathBuf,
}

impl GlobalLayout {
    /// Create a layout with the given base path.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Default layout under the user's home directory.
    pub fn default_base() -> Option<Self> {
        ::dirs::home_dir().map(|home| Self::new(home.join(".dockhand")))
    }

    /// Base directory of this layout.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Projects directory: {base}/projects
    pub fn projects_dir(&self) -> PathBuf {
        self.base.join(dirs::PROJECTS)
    }

    /// Subtree for one project: {base}/projects/{name}
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.projects_dir().join(name)
    }

    /// Database data directory: {base}/projects/{name}/mysql
    pub fn data_dir(&self, name: &str) -> PathBuf {
        self.project_dir(name).join(dirs::MYSQL)
    }

    /// Import staging directory: {base}/projects/{name}/import-db
    pub fn import_dir(&self, name: &str) -> PathBuf {
        self.project_dir(name).join(dirs::IMPORT_DB)
    }

    /// Router subtree: {base}/router
    pub fn router_dir(&self) -> PathBuf {
        self.base.join(dirs::ROUTER)
    }

    /// Applied router route table: {base}/router/routes.yaml
    pub fn router_config_path(&self) -> PathBuf {
        self.router_dir().join(dirs::ROUTER_CONFIG)
    }

    /// Offline-mode marker: {base}/offline
    pub fn offline_marker_path(&self) -> PathBuf {
        self.base.join(dirs::OFFLINE_MARKER)
    }

    /// Create the base and router directories. Idempotent.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(self.router_dir())
            .map_err(|e| DockhandError::io(format!("creating {}", self.router_dir().display()), e))
    }

    /// Create one project's data and import directories. Idempotent.
    pub fn prepare_project(&self, name: &str) -> Result<()> {
        for dir in [self.data_dir(name), self.import_dir(name)] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| DockhandError::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }

    /// Remove one project's subtree. Missing subtree is not an error.
    pub fn remove_project(&self, name: &str) -> Result<()> {
        let dir = self.project_dir(name);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DockhandError::io(format!("removing {}", dir.display()), e)),
        }
    }
}
