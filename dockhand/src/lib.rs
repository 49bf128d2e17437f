//! dockhand - Label-driven local development environments on containers.
//!
//! A project is a directory with a small YAML descriptor. dockhand renders
//! the descriptor into a web/db/dba container stack, converges the backend
//! toward it, and fronts every running project with one shared router. The
//! containers themselves are the only state store: discovery, status, and
//! teardown all work from container labels, so they survive a deleted
//! project directory.

pub mod config;
pub mod constants;
pub mod errors;
pub mod layout;
pub mod lifecycle;
pub mod router;
pub mod runtime;
pub mod settings;
pub mod status;
pub mod topology;
pub mod workspace;

pub use config::{AppType, AppTypeRegistry, HookPhase, HookTask, ProjectConfig, ProviderKind};
pub use errors::{DockhandError, Result};
pub use layout::GlobalLayout;
pub use lifecycle::{Project, StartReport};
pub use router::{RouteTable, RouterManager, RouterSync};
pub use runtime::{ContainerRuntime, DockerCli, SharedRuntime};
pub use status::{ProjectState, ProjectStatus};
pub use topology::StackDescriptor;
pub use workspace::{Workspace, WorkspaceOptions, find_approot};
