//! CLI definition and argument parsing for dockhand-cli.
//! This module contains the main CLI structure, subcommands, the global
//! flags shared by every command, and project resolution.

use clap::{Args, Command, Parser, Subcommand, ValueEnum};
use clap_complete::shells::{Bash, Fish, Zsh};
use dockhand::{DockerCli, Project, Workspace, WorkspaceOptions};
use std::io::Write;
use std::sync::Arc;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "dockhand",
    author,
    version,
    about = "Label-driven local development environments on containers"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[non_exhaustive]
pub enum Commands {
    /// Create or update the project configuration
    Config(crate::commands::config::ConfigArgs),

    /// Start the project and route traffic to it
    #[command(visible_alias = "add")]
    Start(crate::commands::start::StartArgs),

    /// Stop the project's containers, keeping them for a later start
    Stop(crate::commands::stop::StopArgs),

    /// Stop and start the project
    Restart(crate::commands::restart::RestartArgs),

    /// Remove the project's containers
    #[command(visible_alias = "rm")]
    Remove(crate::commands::remove::RemoveArgs),

    /// Show one project in detail
    #[command(visible_alias = "status", visible_alias = "st", visible_alias = "desc")]
    Describe(crate::commands::describe::DescribeArgs),

    /// List projects
    #[command(visible_alias = "ls")]
    List(crate::commands::list::ListArgs),

    /// Run a command in a service container
    #[command(visible_alias = ".")]
    Exec(crate::commands::exec::ExecArgs),

    /// Show service logs
    Logs(crate::commands::logs::LogsArgs),

    /// Load a database dump into the db service
    ImportDb(crate::commands::import_db::ImportDbArgs),

    /// Replace uploaded user files from an archive or directory
    ImportFiles(crate::commands::import_files::ImportFilesArgs),

    /// Turn offline mode on or off, or show it
    Offline(crate::commands::offline::OfflineArgs),

    /// Generate shell completion script (hidden from help)
    #[command(hide = true)]
    Completion(CompletionArgs),
}

/// Shell for which to generate completion script.
#[derive(ValueEnum, Clone, Debug)]
#[value(rename_all = "lower")]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

/// Arguments for the completion subcommand.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completion for (bash, zsh, fish).
    pub shell: Shell,
}

/// Writes a completion script for the given shell to `out`.
pub fn generate_completion(shell: &Shell, cmd: &mut Command, name: &str, out: &mut dyn Write) {
    match shell {
        Shell::Bash => clap_complete::generate(Bash, cmd, name, out),
        Shell::Zsh => clap_complete::generate(Zsh, cmd, name, out),
        Shell::Fish => clap_complete::generate(Fish, cmd, name, out),
    }
}

// ============================================================================
// GLOBAL FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Dockhand home directory (global state and routing live here)
    #[arg(long, global = true, env = "DOCKHAND_HOME")]
    pub home: Option<std::path::PathBuf>,
}

impl GlobalFlags {
    /// Open the workspace over the docker CLI adapter.
    pub fn workspace(&self) -> anyhow::Result<Workspace> {
        let options = WorkspaceOptions {
            global_dir: self.home.clone(),
        };
        Workspace::new(options, Arc::new(DockerCli::new())).map_err(Into::into)
    }
}

// ============================================================================
// PROJECT RESOLUTION
// ============================================================================

/// Resolve the project a command acts on. An explicit name is looked up
/// through container labels; without one, the nearest enclosing project
/// directory wins.
pub async fn resolve_project(
    workspace: &Workspace,
    name: Option<&str>,
) -> anyhow::Result<Project> {
    match name {
        Some(name) => Ok(workspace.project_named(name).await?),
        None => {
            let cwd = std::env::current_dir()?;
            let Some(approot) = dockhand::find_approot(&cwd) else {
                anyhow::bail!(
                    "no project configuration found in {} or any parent; run 'dockhand config' first",
                    cwd.display()
                );
            };
            Ok(workspace.project_at(&approot)?)
        }
    }
}
