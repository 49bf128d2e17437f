//! Project descriptor: schema, defaults, load/save, validation.
//!
//! The descriptor is the only durable per-project state dockhand owns. It
//! lives at `{approot}/.dockhand/config.yaml` and stays small enough to be
//! hand-edited; everything else is derived from it or discovered from
//! container labels.

pub mod apptype;
pub mod hooks;
pub mod provider;

pub use apptype::{AppType, AppTypeDefinition, AppTypeRegistry};
pub use hooks::{HookPhase, HookTask};
pub use provider::{ImportState, Provider, ProviderKind, PullAssets};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{DockhandError, Result};
use crate::layout::GlobalLayout;

// ============================================================================
// PROJECT CONFIG
// ============================================================================

/// The durable, user-editable project descriptor.
///
/// Serialized fields map 1:1 onto the YAML schema; the trailing fields are
/// runtime context resolved at load time and never written back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Descriptor schema version.
    #[serde(rename = "APIVersion", default = "default_api_version")]
    pub api_version: String,

    /// Project name; defaults to the approot directory name.
    #[serde(default)]
    pub name: String,

    /// Application type tag.
    #[serde(rename = "type", default = "default_app_type")]
    pub app_type: AppType,

    /// Served directory relative to the approot; empty means the approot.
    #[serde(default)]
    pub docroot: String,

    // === Service images ===
    #[serde(default = "default_web_image")]
    pub webimage: String,
    #[serde(default = "default_db_image")]
    pub dbimage: String,
    #[serde(default = "default_dba_image")]
    pub dbaimage: String,

    /// Hosting provider; omitted from the file when default.
    #[serde(default, skip_serializing_if = "ProviderKind::is_default")]
    pub provider: ProviderKind,

    /// Lifecycle hooks keyed by phase; task order within a phase is kept.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hooks: BTreeMap<HookPhase, Vec<HookTask>>,

    // === Runtime context (resolved on load, never serialized) ===
    #[serde(skip)]
    pub approot: PathBuf,
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(skip)]
    pub import_dir: PathBuf,
}

fn default_api_version() -> String {
    constants::API_VERSION.to_string()
}

fn default_app_type() -> AppType {
    AppType::Generic
}

fn default_web_image() -> String {
    constants::images::WEB.to_string()
}

fn default_db_image() -> String {
    constants::images::DB.to_string()
}

fn default_dba_image() -> String {
    constants::images::DBA.to_string()
}

impl ProjectConfig {
    /// Descriptor path for a project root.
    pub fn config_path(approot: &Path) -> PathBuf {
        approot
            .join(constants::CONFIG_DIR)
            .join(constants::CONFIG_FILE)
    }

    /// Fresh descriptor with defaults for a project root.
    pub fn new(approot: &Path, layout: &GlobalLayout) -> Self {
        let name = derive_name(approot);
        let mut config = Self {
            api_version: default_api_version(),
            name: name.clone(),
            app_type: default_app_type(),
            docroot: String::new(),
            webimage: default_web_image(),
            dbimage: default_db_image(),
            dbaimage: default_dba_image(),
            provider: ProviderKind::Default,
            hooks: BTreeMap::new(),
            approot: approot.to_path_buf(),
            data_dir: PathBuf::new(),
            import_dir: PathBuf::new(),
        };
        config.bind_layout(layout);
        config
    }

    /// Load the descriptor for a project root, applying defaults for any
    /// missing optional field.
    pub fn load(approot: &Path, layout: &GlobalLayout) -> Result<Self> {
        let path = Self::config_path(approot);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DockhandError::ConfigNotFound { path });
            }
            Err(e) => return Err(DockhandError::io(format!("reading {}", path.display()), e)),
        };

        let mut config: ProjectConfig =
            serde_yaml::from_str(&raw).map_err(|e| DockhandError::ConfigParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        config.approot = approot.to_path_buf();
        if config.name.is_empty() {
            config.name = derive_name(approot);
        }
        config.bind_layout(layout);
        Ok(config)
    }

    /// Resolve the per-machine data and import directories for this project.
    pub fn bind_layout(&mut self, layout: &GlobalLayout) {
        self.data_dir = layout.data_dir(&self.name);
        self.import_dir = layout.import_dir(&self.name);
    }

    /// Serialize the descriptor, creating `.dockhand/` when absent and
    /// appending the commented hook examples for the app type. User hooks
    /// already in `self.hooks` are serialized normally and survive every
    /// rewrite; the scaffolding stays comment-only.
    pub fn save(&self, registry: &AppTypeRegistry) -> Result<()> {
        let path = Self::config_path(&self.approot);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DockhandError::io(format!("creating {}", parent.display()), e))?;
        }

        let yaml = serde_yaml::to_string(self).map_err(|e| DockhandError::ConfigParse {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let scaffold = registry.definition(self.app_type).hook_scaffold;
        let contents = format!("{yaml}\n# Lifecycle hook examples for this project type:\n{scaffold}");

        std::fs::write(&path, contents)
            .map_err(|e| DockhandError::io(format!("writing {}", path.display()), e))
    }

    /// Check the descriptor against the rules enforced before any container
    /// operation: hostname grammar, allowed type set, docroot presence, and
    /// the reserved router name.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DockhandError::validation("name", "project name is empty"));
        }
        if self.name == constants::ROUTER_PROJECT_NAME {
            return Err(DockhandError::validation(
                "name",
                format!("'{}' is reserved for the shared router", self.name),
            ));
        }

        let hostname = self.hostname();
        if !hostname_regex().is_match(&hostname) {
            return Err(DockhandError::validation(
                "name",
                format!("'{hostname}' is not a valid hostname"),
            ));
        }

        let docroot_abs = self.docroot_abs();
        if !docroot_abs.is_dir() {
            return Err(DockhandError::validation(
                "docroot",
                format!("no such directory: {}", docroot_abs.display()),
            ));
        }
        Ok(())
    }

    /// Hostname the project is served under.
    pub fn hostname(&self) -> String {
        constants::project_hostname(&self.name)
    }

    /// Primary project URL.
    pub fn url(&self) -> String {
        constants::project_url(&self.name)
    }

    /// Absolute path to the served directory.
    pub fn docroot_abs(&self) -> PathBuf {
        if self.docroot.is_empty() {
            self.approot.clone()
        } else {
            self.approot.join(&self.docroot)
        }
    }

    /// Tasks declared for a phase, empty when none.
    pub fn hooks_for(&self, phase: HookPhase) -> &[HookTask] {
        self.hooks.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Provider binding for this project.
    pub fn provider(&self) -> Provider {
        Provider::for_project(self.provider, &self.approot)
    }
}

fn derive_name(approot: &Path) -> String {
    approot
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// RFC-1123 hostname grammar.
fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$",
        )
        .expect("static hostname pattern")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_layout(tmp: &tempfile::TempDir) -> GlobalLayout {
        GlobalLayout::new(tmp.path().join("global"))
    }

    fn write_config(approot: &Path, contents: &str) {
        let dir = approot.join(constants::CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(constants::CONFIG_FILE), contents).unwrap();
    }

    // ------------------------------------------------------------------------
    // load + defaults
    // ------------------------------------------------------------------------

    #[test]
    fn test_load_applies_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("mysite");
        std::fs::create_dir_all(&approot).unwrap();
        write_config(&approot, "type: wordpress\n");

        let config = ProjectConfig::load(&approot, &test_layout(&tmp)).unwrap();

        assert_eq!(config.name, "mysite");
        assert_eq!(config.app_type, AppType::Wordpress);
        assert_eq!(config.webimage, constants::images::WEB);
        assert_eq!(config.provider, ProviderKind::Default);
        assert!(config.data_dir.ends_with("projects/mysite/mysql"));
        assert!(config.import_dir.ends_with("projects/mysite/import-db"));
    }

    #[test]
    fn test_load_missing_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(tmp.path(), &test_layout(&tmp)).unwrap_err();
        assert!(matches!(err, DockhandError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_hook_phase() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();
        write_config(
            &approot,
            "name: site\nhooks:\n  mid-start:\n    - exec: \"echo\"\n",
        );

        let err = ProjectConfig::load(&approot, &test_layout(&tmp)).unwrap_err();
        assert!(matches!(err, DockhandError::ConfigParse { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_task_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();
        write_config(
            &approot,
            "name: site\nhooks:\n  post-start:\n    - exec-remote: \"echo\"\n",
        );

        assert!(ProjectConfig::load(&approot, &test_layout(&tmp)).is_err());
    }

    // ------------------------------------------------------------------------
    // save
    // ------------------------------------------------------------------------

    #[test]
    fn test_save_roundtrip_preserves_hooks() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("mysite");
        std::fs::create_dir_all(&approot).unwrap();
        let layout = test_layout(&tmp);
        let registry = AppTypeRegistry::new();

        let mut config = ProjectConfig::new(&approot, &layout);
        config.app_type = AppType::Drupal7;
        config.hooks.insert(
            HookPhase::PostStart,
            vec![
                HookTask::Exec("drush cc all".into()),
                HookTask::ExecHost("echo done".into()),
            ],
        );
        config.save(&registry).unwrap();
        config.save(&registry).unwrap(); // rewriting is stable

        let loaded = ProjectConfig::load(&approot, &layout).unwrap();
        assert_eq!(loaded.app_type, AppType::Drupal7);
        assert_eq!(
            loaded.hooks_for(HookPhase::PostStart),
            &[
                HookTask::Exec("drush cc all".into()),
                HookTask::ExecHost("echo done".into()),
            ]
        );
    }

    #[test]
    fn test_save_appends_commented_scaffold() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("mysite");
        std::fs::create_dir_all(&approot).unwrap();

        let config = ProjectConfig::new(&approot, &test_layout(&tmp));
        config.save(&AppTypeRegistry::new()).unwrap();

        let raw = std::fs::read_to_string(ProjectConfig::config_path(&approot)).unwrap();
        assert!(raw.contains("# Lifecycle hook examples"));
        // The scaffold must never introduce live hook entries.
        let reloaded = ProjectConfig::load(&approot, &test_layout(&tmp)).unwrap();
        assert!(reloaded.hooks.is_empty());
    }

    // ------------------------------------------------------------------------
    // validate
    // ------------------------------------------------------------------------

    #[test]
    fn test_validate_accepts_simple_name() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("my-site2");
        std::fs::create_dir_all(&approot).unwrap();

        let config = ProjectConfig::new(&approot, &test_layout(&tmp));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_hostname() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();

        let mut config = ProjectConfig::new(&approot, &test_layout(&tmp));
        config.name = "my site".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a valid hostname"));

        config.name = "-leading".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_router_name() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();

        let mut config = ProjectConfig::new(&approot, &test_layout(&tmp));
        config.name = constants::ROUTER_PROJECT_NAME.into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_validate_rejects_missing_docroot() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();

        let mut config = ProjectConfig::new(&approot, &test_layout(&tmp));
        config.docroot = "htdocs".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("docroot"));

        std::fs::create_dir_all(approot.join("htdocs")).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_docroot_abs_empty_means_approot() {
        let tmp = tempfile::tempdir().unwrap();
        let approot = tmp.path().join("site");
        std::fs::create_dir_all(&approot).unwrap();

        let config = ProjectConfig::new(&approot, &test_layout(&tmp));
        assert_eq!(config.docroot_abs(), approot);
    }
}
