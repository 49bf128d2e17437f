//! Hosting-provider integration.
//!
//! Providers are a closed set. Each project records at most one, plus a
//! small import state file under the project-local hidden directory. Pull
//! resolves the recorded backup assets for import; push copies local assets
//! into the provider's recorded backup directory. Remote transport is out
//! of scope: assets are paths on this machine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{DockhandError, Result};

/// Closed set of provider kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Default,
    Pantheon,
    Acquia,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Default => "default",
            ProviderKind::Pantheon => "pantheon",
            ProviderKind::Acquia => "acquia",
        }
    }

    pub fn names() -> &'static [&'static str] {
        &["default", "pantheon", "acquia"]
    }

    /// True for the no-op provider; used to omit the field when serializing.
    pub fn is_default(&self) -> bool {
        *self == ProviderKind::Default
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" | "" => Ok(ProviderKind::Default),
            "pantheon" => Ok(ProviderKind::Pantheon),
            "acquia" => Ok(ProviderKind::Acquia),
            other => Err(DockhandError::validation(
                "provider",
                format!(
                    "'{other}' is not a valid provider (expected one of: {})",
                    ProviderKind::names().join(", ")
                ),
            )),
        }
    }
}

// ============================================================================
// IMPORT STATE
// ============================================================================

/// Per-project provider state, persisted at `.dockhand/import.yaml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportState {
    /// Provider environment the project tracks (e.g. "dev").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Recorded database dump or archive to pull from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_archive: Option<PathBuf>,
    /// Recorded uploaded-files archive to pull from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_archive: Option<PathBuf>,
    /// Directory push copies assets into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}

/// Assets resolved by [`Provider::pull`].
#[derive(Clone, Debug, Default)]
pub struct PullAssets {
    pub db_archive: Option<PathBuf>,
    pub files_archive: Option<PathBuf>,
}

// ============================================================================
// PROVIDER
// ============================================================================

/// A project's provider binding.
#[derive(Clone, Debug)]
pub struct Provider {
    kind: ProviderKind,
    state_path: PathBuf,
}

impl Provider {
    /// Bind a provider kind to a project root.
    pub fn for_project(kind: ProviderKind, approot: &Path) -> Self {
        Self {
            kind,
            state_path: approot
                .join(constants::CONFIG_DIR)
                .join("import.yaml"),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Validate one state field before it is recorded.
    ///
    /// The default provider accepts anything; hosted providers require
    /// lowercase alphanumeric environment names.
    pub fn validate_field(&self, field: &str, value: &str) -> Result<()> {
        if self.kind == ProviderKind::Default {
            return Ok(());
        }
        match field {
            "environment" => {
                let ok = !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
                if ok {
                    Ok(())
                } else {
                    Err(DockhandError::validation(
                        field,
                        format!("'{value}' is not a valid {} environment name", self.kind),
                    ))
                }
            }
            "db_archive" | "files_archive" | "backup_dir" => {
                if value.is_empty() {
                    Err(DockhandError::validation(field, "path must not be empty"))
                } else {
                    Ok(())
                }
            }
            other => Err(DockhandError::validation(
                other,
                "unknown provider state field",
            )),
        }
    }

    /// Read the recorded import state. A missing file yields the default.
    pub fn read_state(&self) -> Result<ImportState> {
        let raw = match std::fs::read_to_string(&self.state_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ImportState::default());
            }
            Err(e) => {
                return Err(DockhandError::io(
                    format!("reading {}", self.state_path.display()),
                    e,
                ));
            }
        };
        serde_yaml::from_str(&raw).map_err(|e| DockhandError::Provider {
            message: format!("could not parse {}: {e}", self.state_path.display()),
        })
    }

    /// Persist the import state, creating the hidden directory if needed.
    pub fn write_state(&self, state: &ImportState) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DockhandError::io(format!("creating {}", parent.display()), e))?;
        }
        let yaml = serde_yaml::to_string(state).map_err(|e| DockhandError::Provider {
            message: format!("could not serialize import state: {e}"),
        })?;
        std::fs::write(&self.state_path, yaml)
            .map_err(|e| DockhandError::io(format!("writing {}", self.state_path.display()), e))
    }

    /// Resolve the recorded backup assets for an import.
    pub fn pull(&self) -> Result<PullAssets> {
        if self.kind == ProviderKind::Default {
            return Err(DockhandError::Provider {
                message: "project uses no hosting provider; pass an import source instead".into(),
            });
        }
        let state = self.read_state()?;
        let assets = PullAssets {
            db_archive: state.db_archive,
            files_archive: state.files_archive,
        };
        if assets.db_archive.is_none() && assets.files_archive.is_none() {
            return Err(DockhandError::Provider {
                message: format!("no {} backups recorded for this project", self.kind),
            });
        }
        for path in [&assets.db_archive, &assets.files_archive].into_iter().flatten() {
            if !path.exists() {
                return Err(DockhandError::Provider {
                    message: format!("recorded backup asset not found: {}", path.display()),
                });
            }
        }
        Ok(assets)
    }

    /// Copy local assets into the provider's recorded backup directory.
    pub fn push(&self, assets: &PullAssets) -> Result<()> {
        if self.kind == ProviderKind::Default {
            return Err(DockhandError::Provider {
                message: "project uses no hosting provider; nothing to push to".into(),
            });
        }
        let state = self.read_state()?;
        let backup_dir = state.backup_dir.ok_or_else(|| DockhandError::Provider {
            message: format!("no {} backup directory recorded for this project", self.kind),
        })?;
        std::fs::create_dir_all(&backup_dir)
            .map_err(|e| DockhandError::io(format!("creating {}", backup_dir.display()), e))?;

        for source in [&assets.db_archive, &assets.files_archive].into_iter().flatten() {
            let file_name = source
                .file_name()
                .ok_or_else(|| DockhandError::Provider {
                    message: format!("cannot push a directory: {}", source.display()),
                })?;
            std::fs::copy(source, backup_dir.join(file_name)).map_err(|e| {
                DockhandError::io(format!("copying {} to backup", source.display()), e)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosted(tmp: &tempfile::TempDir) -> Provider {
        Provider::for_project(ProviderKind::Pantheon, tmp.path())
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("pantheon".parse::<ProviderKind>().unwrap(), ProviderKind::Pantheon);
        assert_eq!("".parse::<ProviderKind>().unwrap(), ProviderKind::Default);
        assert!("heroku".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_state_roundtrip_and_missing_file_default() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = hosted(&tmp);

        assert_eq!(provider.read_state().unwrap(), ImportState::default());

        let state = ImportState {
            environment: Some("dev".into()),
            db_archive: Some(tmp.path().join("backup.sql.gz")),
            ..Default::default()
        };
        provider.write_state(&state).unwrap();
        assert_eq!(provider.read_state().unwrap(), state);
    }

    #[test]
    fn test_validate_field() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = hosted(&tmp);

        provider.validate_field("environment", "dev").unwrap();
        assert!(provider.validate_field("environment", "Dev Env").is_err());
        assert!(provider.validate_field("nonsense", "x").is_err());

        // The default provider validates nothing.
        let noop = Provider::for_project(ProviderKind::Default, tmp.path());
        noop.validate_field("nonsense", "x").unwrap();
    }

    #[test]
    fn test_pull_requires_recorded_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = hosted(&tmp);

        let err = provider.pull().unwrap_err();
        assert!(err.to_string().contains("no pantheon backups recorded"));

        let dump = tmp.path().join("backup.sql");
        std::fs::write(&dump, "SELECT 1;").unwrap();
        provider
            .write_state(&ImportState {
                db_archive: Some(dump.clone()),
                ..Default::default()
            })
            .unwrap();

        let assets = provider.pull().unwrap();
        assert_eq!(assets.db_archive.as_deref(), Some(dump.as_path()));
    }

    #[test]
    fn test_default_provider_refuses_pull() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Provider::for_project(ProviderKind::Default, tmp.path());
        assert!(provider.pull().is_err());
    }

    #[test]
    fn test_push_copies_into_backup_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = hosted(&tmp);
        let backup_dir = tmp.path().join("backups");
        let dump = tmp.path().join("db.sql.gz");
        std::fs::write(&dump, "dump").unwrap();

        provider
            .write_state(&ImportState {
                backup_dir: Some(backup_dir.clone()),
                ..Default::default()
            })
            .unwrap();
        provider
            .push(&PullAssets {
                db_archive: Some(dump),
                files_archive: None,
            })
            .unwrap();

        assert!(backup_dir.join("db.sql.gz").is_file());
    }
}
