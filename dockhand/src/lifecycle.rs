//! Project lifecycle operations.
//!
//! A [`Project`] is a handle over one site: it converges containers toward
//! the rendered topology on start, tears them down on stop and remove, and
//! drives the exec, logs, and import flows. All container work goes through
//! the [`ContainerRuntime`](crate::runtime::ContainerRuntime) trait held by
//! the workspace, so every operation here is testable against a substitute
//! backend.
//!
//! Start never rolls back: once containers exist, later failures leave them
//! in place for diagnosis and surface as errors or warnings instead.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tracing::{info, warn};

use crate::config::{HookPhase, HookTask, ProjectConfig};
use crate::errors::{DockhandError, Result};
use crate::runtime::{
    DEFAULT_START_TIMEOUT, ExecOptions, ExecOutput, LogOptions, LogStream, project_selector,
    wait_for_stack_running,
};
use crate::settings::{self, SettingsOutcome};
use crate::status::ProjectStatus;
use crate::topology;
use crate::workspace::Workspace;

// ============================================================================
// START REPORT
// ============================================================================

/// Outcome of a start: the resulting status plus anything that degraded
/// instead of failing (router port conflicts, user-frozen settings files).
#[derive(Debug)]
pub struct StartReport {
    pub status: ProjectStatus,
    pub warnings: Vec<String>,
    pub settings: SettingsOutcome,
}

// ============================================================================
// PROJECT HANDLE
// ============================================================================

/// Handle over one project, with or without a readable descriptor.
///
/// Handles built by [`Workspace::project_at`] carry a loaded config; handles
/// built from container labels may not, which is what lets stop, remove, and
/// describe keep working after the project directory disappears.
pub struct Project {
    workspace: Workspace,
    name: String,
    config: Option<ProjectConfig>,
    approot: PathBuf,
    config_problem: Option<String>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("approot", &self.approot)
            .field("config_problem", &self.config_problem)
            .finish_non_exhaustive()
    }
}

impl Project {
    pub(crate) fn with_config(workspace: Workspace, config: ProjectConfig) -> Self {
        let name = config.name.clone();
        let approot = config.approot.clone();
        Self {
            workspace,
            name,
            config: Some(config),
            approot,
            config_problem: None,
        }
    }

    pub(crate) fn from_labels(
        workspace: Workspace,
        name: &str,
        approot: PathBuf,
        config_problem: Option<String>,
    ) -> Self {
        Self {
            workspace,
            name: name.to_string(),
            config: None,
            approot,
            config_problem,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> Option<&ProjectConfig> {
        self.config.as_ref()
    }

    /// The descriptor, or the error explaining why this handle has none.
    fn require_config(&self) -> Result<&ProjectConfig> {
        match &self.config {
            Some(config) => Ok(config),
            None if !self.approot.is_dir() => Err(DockhandError::DirMissing {
                approot: self.approot.clone(),
            }),
            None => Err(DockhandError::ConfigMissing {
                approot: self.approot.clone(),
            }),
        }
    }

    // ========================================================================
    // START
    // ========================================================================

    /// Bring the project up: validate, render, converge containers, run the
    /// start hooks, and resync the router.
    pub async fn start(&self) -> Result<StartReport> {
        let config = self.require_config()?;
        config.validate()?;
        self.check_name_collision(config).await?;

        self.workspace.layout().prepare_project(&self.name)?;

        let mut warnings = Vec::new();
        let settings = settings::ensure_settings_files(config, self.workspace.registry())?;
        if settings.local_frozen {
            warnings
                .push("existing settings file is user-managed and was left untouched".to_string());
        }
        if self.workspace.is_offline() {
            warnings.push(format!(
                "offline mode is on; add \"127.0.0.1 {}\" to /etc/hosts to reach the site",
                config.hostname()
            ));
        }

        let descriptor = topology::render(config);
        let runtime = self.workspace.runtime();
        runtime.start_stack(&descriptor).await?;
        if let Err(e) = wait_for_stack_running(runtime.as_ref(), &descriptor, DEFAULT_START_TIMEOUT)
            .await
        {
            warn!(project = %self.name, "start incomplete; containers are left in place for diagnosis");
            return Err(e);
        }

        for phase in [HookPhase::PreStart, HookPhase::PostStart] {
            if let Err(e) = self.run_hooks(config, phase).await {
                warn!(project = %self.name, "hook failed after containers were created; leaving them for diagnosis");
                return Err(e);
            }
        }

        let router = self.workspace.router();
        let routing = match router.resync().await {
            Ok(_) => router.ensure_running().await,
            Err(e) => Err(e),
        };
        if let Err(e) = routing {
            match e {
                DockhandError::PortConflict { .. } => {
                    warn!(project = %self.name, error = %e, "router unavailable; project ports still work");
                    warnings.push(format!("router not started: {e}"));
                }
                other => {
                    warn!(project = %self.name, "router sync failed after start; containers are left in place");
                    return Err(other);
                }
            }
        }

        let status = self.describe().await?;
        info!(project = %self.name, url = %config.url(), "project started");
        Ok(StartReport {
            status,
            warnings,
            settings,
        })
    }

    /// Reject a start that would shadow the same project name already active
    /// from a different directory. A stopped duplicate is fine.
    async fn check_name_collision(&self, config: &ProjectConfig) -> Result<()> {
        let records = self
            .workspace
            .runtime()
            .find_by_labels(&project_selector(&self.name))
            .await?;
        for record in &records {
            if !record.state.is_active() {
                continue;
            }
            let Some(other) = record.approot() else {
                continue;
            };
            if Path::new(other) != config.approot {
                return Err(DockhandError::NameCollision {
                    name: self.name.clone(),
                    approot: config.approot.clone(),
                    other_approot: PathBuf::from(other),
                    created: record
                        .created
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // STOP / REMOVE / RESTART
    // ========================================================================

    /// Halt the project's containers in place. Works from labels alone, so a
    /// deleted project directory is not an obstacle; it is an error only
    /// when neither a descriptor nor any containers identify the project.
    pub async fn stop(&self) -> Result<()> {
        let records = self
            .workspace
            .runtime()
            .find_by_labels(&project_selector(&self.name))
            .await?;
        if records.is_empty() && self.config.is_none() {
            return Err(DockhandError::ProjectNotFound {
                name: self.name.clone(),
            });
        }

        self.workspace.runtime().stop_project(&self.name).await?;
        self.settle_router().await?;
        info!(project = %self.name, "project stopped");
        Ok(())
    }

    /// Delete the project's containers; with `remove_data`, also its volumes
    /// and per-project global state. The site code is never touched.
    pub async fn remove(&self, remove_data: bool) -> Result<()> {
        let records = self
            .workspace
            .runtime()
            .find_by_labels(&project_selector(&self.name))
            .await?;
        if records.is_empty() && self.config.is_none() {
            return Err(DockhandError::ProjectNotFound {
                name: self.name.clone(),
            });
        }

        self.workspace
            .runtime()
            .remove_project(&self.name, remove_data)
            .await?;
        if remove_data {
            self.workspace.layout().remove_project(&self.name)?;
        }
        self.settle_router().await?;
        info!(project = %self.name, remove_data, "project removed");
        Ok(())
    }

    pub async fn restart(&self) -> Result<StartReport> {
        self.stop().await?;
        self.start().await
    }

    /// After a teardown: drop the router if no projects remain, otherwise
    /// bring its route table up to date.
    async fn settle_router(&self) -> Result<()> {
        let router = self.workspace.router();
        if !router.stop_if_idle().await? {
            router.resync().await?;
        }
        Ok(())
    }

    // ========================================================================
    // DESCRIBE
    // ========================================================================

    /// Current status, composed from the descriptor when readable and from
    /// container labels otherwise. Never fails just because the project
    /// directory or descriptor is gone.
    pub async fn describe(&self) -> Result<ProjectStatus> {
        let records = self
            .workspace
            .runtime()
            .find_by_labels(&project_selector(&self.name))
            .await?;

        let status = match &self.config {
            Some(config) if config.approot.is_dir() => ProjectStatus::from_config(config, &records),
            Some(config) => ProjectStatus::dir_missing(&self.name, &records).with_problem(format!(
                "project directory missing: {}",
                config.approot.display()
            )),
            None if !self.approot.is_dir() => ProjectStatus::dir_missing(&self.name, &records)
                .with_problem(format!(
                    "project directory missing: {}",
                    self.approot.display()
                )),
            None => match &self.config_problem {
                Some(problem) => ProjectStatus::from_labels(&self.name, &records)
                    .with_problem(format!("could not read project config: {problem}")),
                None => {
                    ProjectStatus::config_missing(&self.name, self.approot.clone(), &records)
                }
            },
        };
        Ok(status)
    }

    // ========================================================================
    // EXEC / LOGS
    // ========================================================================

    /// Run a command in a service container. Non-interactive runs return
    /// captured output; interactive ones attach the caller's terminal.
    pub async fn exec(
        &self,
        service: &str,
        command: &[String],
        interactive: bool,
    ) -> Result<ExecOutput> {
        let options = ExecOptions {
            interactive,
            working_dir: self.service_working_dir(service),
        };
        self.workspace
            .runtime()
            .exec(&self.name, service, command, &options)
            .await
    }

    pub async fn logs(&self, service: &str, options: &LogOptions) -> Result<LogStream> {
        self.workspace
            .runtime()
            .logs(&self.name, service, options)
            .await
    }

    /// Commands in the web container land in the docroot.
    fn service_working_dir(&self, service: &str) -> Option<String> {
        match (&self.config, service) {
            (Some(config), "web") => Some(topology::web_working_dir(config)),
            _ => None,
        }
    }

    // ========================================================================
    // IMPORTS
    // ========================================================================

    /// Load a database dump into the db service, replacing the current
    /// contents. Without an explicit source, falls back to the provider's
    /// recorded backup.
    pub async fn import_db(&self, source: Option<&Path>, extract_path: Option<&str>) -> Result<()> {
        let config = self.require_config()?;
        let source_path = match source {
            Some(path) => path.to_path_buf(),
            None => self
                .provider_asset(config, AssetKind::Database)?
                .ok_or_else(|| DockhandError::Provider {
                    message: format!(
                        "no database backup recorded for {}; pass an import source",
                        self.name
                    ),
                })?,
        };

        self.run_hooks(config, HookPhase::PreImportDb).await?;

        self.workspace.layout().prepare_project(&self.name)?;
        let staged = stage_database_asset(&source_path, extract_path, &config.import_dir)?;
        info!(project = %self.name, file = %staged, "importing database");

        let script = format!(
            "mysql -uroot -proot -e 'DROP DATABASE IF EXISTS {db}; CREATE DATABASE {db};' \
             && mysql -uroot -proot {db} < {mount}/{staged}",
            db = settings::DB_NAME,
            mount = topology::IMPORT_MOUNT,
        );
        let command = vec!["sh".to_string(), "-c".to_string(), script];
        self.workspace
            .runtime()
            .exec(&self.name, "db", &command, &ExecOptions::default())
            .await?;

        self.run_hooks(config, HookPhase::PostImportDb).await?;
        info!(project = %self.name, "database import finished");
        Ok(())
    }

    /// Replace the project's uploaded-assets directory from an archive or
    /// directory. Only app types with a known upload directory qualify.
    pub async fn import_files(
        &self,
        source: Option<&Path>,
        extract_path: Option<&str>,
    ) -> Result<()> {
        let config = self.require_config()?;
        let definition = self.workspace.registry().definition(config.app_type);
        let upload_rel = definition.upload_dir.ok_or_else(|| {
            DockhandError::validation(
                "type",
                format!(
                    "app type {} has no upload directory to import into",
                    config.app_type
                ),
            )
        })?;

        let source_path = match source {
            Some(path) => path.to_path_buf(),
            None => self
                .provider_asset(config, AssetKind::Files)?
                .ok_or_else(|| DockhandError::Provider {
                    message: format!(
                        "no files backup recorded for {}; pass an import source",
                        self.name
                    ),
                })?,
        };

        self.run_hooks(config, HookPhase::PreImportFiles).await?;

        let target = config.docroot_abs().join(upload_rel);
        stage_files_asset(&source_path, extract_path, &target)?;

        self.run_hooks(config, HookPhase::PostImportFiles).await?;
        info!(project = %self.name, target = %target.display(), "files import finished");
        Ok(())
    }

    fn provider_asset(&self, config: &ProjectConfig, kind: AssetKind) -> Result<Option<PathBuf>> {
        if self.workspace.is_offline() {
            return Err(DockhandError::Provider {
                message: "offline mode is on; provider pulls are disabled".into(),
            });
        }
        let assets = config.provider().pull()?;
        Ok(match kind {
            AssetKind::Database => assets.db_archive,
            AssetKind::Files => assets.files_archive,
        })
    }

    // ========================================================================
    // HOOKS
    // ========================================================================

    /// Run one phase's hook tasks in declared order, stopping at the first
    /// failure.
    async fn run_hooks(&self, config: &ProjectConfig, phase: HookPhase) -> Result<()> {
        let tasks = config.hooks_for(phase);
        if tasks.is_empty() {
            return Ok(());
        }
        info!(project = %self.name, %phase, count = tasks.len(), "running hooks");

        for task in tasks {
            println!("--- Running {} task: {} ---", task.kind(), task.command());
            match task {
                HookTask::Exec(command) => self.run_container_task(phase, command).await?,
                HookTask::ExecHost(command) => {
                    self.run_host_task(config, phase, command).await?;
                }
            }
        }
        Ok(())
    }

    async fn run_container_task(&self, phase: HookPhase, command: &str) -> Result<()> {
        let argv = vec!["sh".to_string(), "-c".to_string(), command.to_string()];
        let options = ExecOptions {
            interactive: false,
            working_dir: self.service_working_dir("web"),
        };
        let output = self
            .workspace
            .runtime()
            .exec(&self.name, "web", &argv, &options)
            .await
            .map_err(|e| DockhandError::HookFailed {
                phase: phase.to_string(),
                task: command.to_string(),
                detail: e.to_string(),
            })?;
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        Ok(())
    }

    async fn run_host_task(
        &self,
        config: &ProjectConfig,
        phase: HookPhase,
        command: &str,
    ) -> Result<()> {
        let status: ExitStatus = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&config.approot)
            .status()
            .await
            .map_err(|e| DockhandError::HookFailed {
                phase: phase.to_string(),
                task: command.to_string(),
                detail: format!("failed to spawn: {e}"),
            })?;
        if !status.success() {
            return Err(DockhandError::HookFailed {
                phase: phase.to_string(),
                task: command.to_string(),
                detail: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

// ============================================================================
// IMPORT STAGING
// ============================================================================

enum AssetKind {
    Database,
    Files,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImportFormat {
    Sql,
    SqlGz,
    Tar,
    TarGz,
    Directory,
}

fn classify_import(path: &Path) -> Result<ImportFormat> {
    if path.is_dir() {
        return Ok(ImportFormat::Directory);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".sql.gz") {
        Ok(ImportFormat::SqlGz)
    } else if name.ends_with(".sql") {
        Ok(ImportFormat::Sql)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ImportFormat::TarGz)
    } else if name.ends_with(".tar") {
        Ok(ImportFormat::Tar)
    } else {
        Err(DockhandError::UnsupportedImportFormat {
            path: path.to_path_buf(),
        })
    }
}

/// Stage a database source into the import directory the db container sees,
/// returning the dump's path relative to that directory.
///
/// The directory is cleared first so exactly one import's files are ever
/// staged.
fn stage_database_asset(
    source: &Path,
    extract_path: Option<&str>,
    import_dir: &Path,
) -> Result<String> {
    if !source.exists() {
        return Err(DockhandError::io(
            format!("reading import source {}", source.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    clear_dir(import_dir)?;

    match classify_import(source)? {
        ImportFormat::Sql => {
            let file_name = file_name_string(source);
            std::fs::copy(source, import_dir.join(&file_name))
                .map_err(|e| DockhandError::io(format!("copying {}", source.display()), e))?;
            Ok(file_name)
        }
        ImportFormat::SqlGz => {
            let file_name = file_name_string(source);
            let staged = file_name[..file_name.len() - ".gz".len()].to_string();
            let input = std::fs::File::open(source)
                .map_err(|e| DockhandError::io(format!("opening {}", source.display()), e))?;
            let mut decoder = flate2::read::GzDecoder::new(input);
            let mut output = std::fs::File::create(import_dir.join(&staged))
                .map_err(|e| DockhandError::io(format!("creating {staged}"), e))?;
            std::io::copy(&mut decoder, &mut output)
                .map_err(|e| DockhandError::io(format!("decompressing {}", source.display()), e))?;
            Ok(staged)
        }
        format @ (ImportFormat::Tar | ImportFormat::TarGz) => {
            extract_tar(source, format == ImportFormat::TarGz, import_dir)?;
            pick_staged_dump(import_dir, extract_path)
        }
        ImportFormat::Directory => {
            copy_tree(source, import_dir)?;
            pick_staged_dump(import_dir, extract_path)
        }
    }
}

/// Replace the target directory's contents from a files source.
fn stage_files_asset(source: &Path, extract_path: Option<&str>, target: &Path) -> Result<()> {
    if !source.exists() {
        return Err(DockhandError::io(
            format!("reading import source {}", source.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    match classify_import(source)? {
        ImportFormat::Directory => {
            let root = resolve_subdir(source, extract_path)?;
            replace_dir_from(&root, target)
        }
        format @ (ImportFormat::Tar | ImportFormat::TarGz) => {
            let scratch = tempfile::tempdir()
                .map_err(|e| DockhandError::io("creating extraction directory", e))?;
            extract_tar(source, format == ImportFormat::TarGz, scratch.path())?;
            let root = resolve_subdir(scratch.path(), extract_path)?;
            replace_dir_from(&root, target)
        }
        ImportFormat::Sql | ImportFormat::SqlGz => Err(DockhandError::UnsupportedImportFormat {
            path: source.to_path_buf(),
        }),
    }
}

fn resolve_subdir(root: &Path, extract_path: Option<&str>) -> Result<PathBuf> {
    match extract_path {
        None => Ok(root.to_path_buf()),
        Some(rel) => {
            let sub = root.join(rel);
            if sub.is_dir() {
                Ok(sub)
            } else {
                Err(DockhandError::validation(
                    "extract-path",
                    format!("{rel} is not a directory in the import source"),
                ))
            }
        }
    }
}

/// The dump to feed to mysql: the named file when `extract_path` is given,
/// otherwise the single `.sql` file in the staged tree.
fn pick_staged_dump(import_dir: &Path, extract_path: Option<&str>) -> Result<String> {
    if let Some(rel) = extract_path {
        if import_dir.join(rel).is_file() {
            return Ok(rel.to_string());
        }
        return Err(DockhandError::validation(
            "extract-path",
            format!("{rel} not found in the import source"),
        ));
    }

    let mut dumps = Vec::new();
    for entry in walkdir::WalkDir::new(import_dir) {
        let entry =
            entry.map_err(|e| DockhandError::io("scanning import files", std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_sql = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if is_sql {
            if let Ok(rel) = entry.path().strip_prefix(import_dir) {
                dumps.push(rel.to_string_lossy().to_string());
            }
        }
    }
    dumps.sort();

    match dumps.len() {
        1 => Ok(dumps.remove(0)),
        0 => Err(DockhandError::validation(
            "src",
            "no .sql file found in the import source",
        )),
        _ => Err(DockhandError::validation(
            "extract-path",
            format!(
                "import source holds several dumps ({}); pass --extract-path",
                dumps.join(", ")
            ),
        )),
    }
}

fn extract_tar(source: &Path, gzipped: bool, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(source)
        .map_err(|e| DockhandError::io(format!("opening {}", source.display()), e))?;
    let result = if gzipped {
        tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(dest)
    } else {
        tar::Archive::new(file).unpack(dest)
    };
    result.map_err(|e| DockhandError::io(format!("extracting {}", source.display()), e))
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(source) {
        let entry = entry
            .map_err(|e| DockhandError::io("walking import source", std::io::Error::other(e)))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| DockhandError::io("walking import source", std::io::Error::other(e)))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| DockhandError::io(format!("creating {}", target.display()), e))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DockhandError::io(format!("creating {}", parent.display()), e))?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| {
                DockhandError::io(format!("copying {}", entry.path().display()), e)
            })?;
        }
    }
    Ok(())
}

fn replace_dir_from(source: &Path, target: &Path) -> Result<()> {
    match std::fs::remove_dir_all(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(DockhandError::io(
                format!("clearing {}", target.display()),
                e,
            ));
        }
    }
    std::fs::create_dir_all(target)
        .map_err(|e| DockhandError::io(format!("creating {}", target.display()), e))?;
    copy_tree(source, target)
}

fn clear_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(DockhandError::io(format!("clearing {}", dir.display()), e)),
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| DockhandError::io(format!("creating {}", dir.display()), e))
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
