//! Error taxonomy for all dockhand operations.
//!
//! Lifecycle code never panics on expected failure: every fallible path
//! returns [`DockhandError`] and callers add project/phase/service context
//! at the point where it is known.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DockhandError>;

#[derive(Debug, Error)]
pub enum DockhandError {
    /// No descriptor file exists at the expected project-local path.
    #[error("no project configuration found at {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// The descriptor exists but could not be parsed.
    #[error("could not parse project configuration {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// A descriptor field failed validation.
    #[error("invalid configuration field {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Another running project already owns this name at a different path.
    #[error(
        "project {name} is already running at {} (created {created}); \
         refusing to start a second instance at {}",
        other_approot.display(),
        approot.display()
    )]
    NameCollision {
        name: String,
        approot: PathBuf,
        other_approot: PathBuf,
        created: String,
    },

    /// Container backend failure, wrapped with the acting project name.
    #[error("runtime error for project {project}: {message}")]
    Runtime { project: String, message: String },

    /// A required host port is already bound by something else.
    #[error("port {port} is already in use: {detail}")]
    PortConflict { port: u16, detail: String },

    /// The project root directory no longer exists.
    #[error("project directory missing: {}", approot.display())]
    DirMissing { approot: PathBuf },

    /// The project root exists but carries no descriptor.
    #[error("no configuration found in {}", approot.display())]
    ConfigMissing { approot: PathBuf },

    /// Neither containers nor a descriptor identify the project.
    #[error("no containers or configuration found for project {name}")]
    ProjectNotFound { name: String },

    /// A lifecycle hook task failed; remaining tasks in that phase were skipped.
    #[error("hook failure in {phase} task '{task}': {detail}")]
    HookFailed {
        phase: String,
        task: String,
        detail: String,
    },

    /// A bounded wait expired before the condition held.
    #[error("timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Exec was requested against a service with no running container.
    #[error("service {service} is not running for project {project}")]
    ServiceNotRunning { project: String, service: String },

    /// Hosting-provider operation failed.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// An import source is not one of the accepted archive/dump formats.
    #[error("unsupported import format: {}", path.display())]
    UnsupportedImportFormat { path: PathBuf },

    /// Filesystem failure with the operation that caused it.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DockhandError {
    /// Wrap an I/O error with its operation context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a backend failure with the acting project name.
    pub fn runtime(project: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            project: project.into(),
            message: message.into(),
        }
    }

    /// Validation failure for a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
