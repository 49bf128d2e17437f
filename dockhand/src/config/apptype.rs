//! Application types and the registry describing their on-disk shape.
//!
//! The registry is an explicit object built once at startup and handed to
//! whoever needs it. It answers three questions per type: how to recognize
//! a codebase, where its settings files live, and where uploaded assets go.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DockhandError, Result};

// ============================================================================
// APP TYPE
// ============================================================================

/// Closed set of supported application types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Drupal6,
    Drupal7,
    Drupal8,
    Wordpress,
    Generic,
}

impl AppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppType::Drupal6 => "drupal6",
            AppType::Drupal7 => "drupal7",
            AppType::Drupal8 => "drupal8",
            AppType::Wordpress => "wordpress",
            AppType::Generic => "generic",
        }
    }

    /// All valid type names, for validation messages and prompt choices.
    pub fn names() -> &'static [&'static str] {
        &["drupal6", "drupal7", "drupal8", "wordpress", "generic"]
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppType {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drupal6" => Ok(AppType::Drupal6),
            "drupal7" => Ok(AppType::Drupal7),
            "drupal8" => Ok(AppType::Drupal8),
            "wordpress" => Ok(AppType::Wordpress),
            "generic" => Ok(AppType::Generic),
            other => Err(DockhandError::validation(
                "type",
                format!(
                    "'{other}' is not a valid application type (expected one of: {})",
                    AppType::names().join(", ")
                ),
            )),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Static description of one application type.
#[derive(Clone, Debug)]
pub struct AppTypeDefinition {
    pub app_type: AppType,
    /// File whose presence under the docroot identifies this type.
    pub fingerprint: Option<&'static str>,
    /// Framework settings file, relative to the docroot.
    pub settings_path: Option<&'static str>,
    /// Managed local settings file, relative to the docroot.
    pub local_settings_path: Option<&'static str>,
    /// Uploaded-assets directory, relative to the docroot.
    pub upload_dir: Option<&'static str>,
    /// Commented hook examples appended to newly written descriptors.
    pub hook_scaffold: &'static str,
}

/// Registry of all known application types.
///
/// Detection checks fingerprints in declaration order; a codebase matching
/// nothing is [`AppType::Generic`].
#[derive(Clone, Debug)]
pub struct AppTypeRegistry {
    definitions: Vec<AppTypeDefinition>,
}

impl AppTypeRegistry {
    pub fn new() -> Self {
        Self {
            definitions: vec![
                AppTypeDefinition {
                    app_type: AppType::Drupal6,
                    fingerprint: Some("misc/ahah.js"),
                    settings_path: Some("sites/default/settings.php"),
                    local_settings_path: Some("sites/default/settings.dockhand.php"),
                    upload_dir: Some("sites/default/files"),
                    hook_scaffold: DRUPAL_HOOK_SCAFFOLD,
                },
                AppTypeDefinition {
                    app_type: AppType::Drupal7,
                    fingerprint: Some("misc/ajax.js"),
                    settings_path: Some("sites/default/settings.php"),
                    local_settings_path: Some("sites/default/settings.dockhand.php"),
                    upload_dir: Some("sites/default/files"),
                    hook_scaffold: DRUPAL_HOOK_SCAFFOLD,
                },
                AppTypeDefinition {
                    app_type: AppType::Drupal8,
                    fingerprint: Some("core/scripts/drupal.sh"),
                    settings_path: Some("sites/default/settings.php"),
                    local_settings_path: Some("sites/default/settings.dockhand.php"),
                    upload_dir: Some("sites/default/files"),
                    hook_scaffold: DRUPAL8_HOOK_SCAFFOLD,
                },
                AppTypeDefinition {
                    app_type: AppType::Wordpress,
                    fingerprint: Some("wp-settings.php"),
                    settings_path: Some("wp-config.php"),
                    local_settings_path: Some("wp-config.dockhand.php"),
                    upload_dir: Some("wp-content/uploads"),
                    hook_scaffold: WORDPRESS_HOOK_SCAFFOLD,
                },
                AppTypeDefinition {
                    app_type: AppType::Generic,
                    fingerprint: None,
                    settings_path: None,
                    local_settings_path: None,
                    upload_dir: None,
                    hook_scaffold: GENERIC_HOOK_SCAFFOLD,
                },
            ],
        }
    }

    /// Look up the definition for a type. Every enum variant is registered,
    /// in declaration order.
    pub fn definition(&self, app_type: AppType) -> &AppTypeDefinition {
        let idx = match app_type {
            AppType::Drupal6 => 0,
            AppType::Drupal7 => 1,
            AppType::Drupal8 => 2,
            AppType::Wordpress => 3,
            AppType::Generic => 4,
        };
        &self.definitions[idx]
    }

    /// Classify the codebase rooted at `docroot` by fingerprint files.
    pub fn detect(&self, docroot: &Path) -> AppType {
        for def in &self.definitions {
            if let Some(fingerprint) = def.fingerprint
                && docroot.join(fingerprint).exists()
            {
                return def.app_type;
            }
        }
        AppType::Generic
    }
}

impl Default for AppTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HOOK SCAFFOLDING
// ============================================================================

const DRUPAL_HOOK_SCAFFOLD: &str = "\
# hooks:
#   post-start:
#     - exec: \"drush cc all\"
#   post-import-db:
#     - exec: \"drush updb -y\"
";

const DRUPAL8_HOOK_SCAFFOLD: &str = "\
# hooks:
#   post-start:
#     - exec: \"drush cr\"
#   post-import-db:
#     - exec: \"drush updb -y\"
";

const WORDPRESS_HOOK_SCAFFOLD: &str = "\
# hooks:
#   post-start:
#     - exec: \"wp cache flush\"
#   post-import-db:
#     - exec: \"wp search-replace https://example.com https://{site}.dockhand.local\"
";

const GENERIC_HOOK_SCAFFOLD: &str = "\
# hooks:
#   post-start:
#     - exec-host: \"echo project started\"
";

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("wordpress".parse::<AppType>().unwrap(), AppType::Wordpress);
        assert_eq!(AppType::Drupal8.to_string(), "drupal8");
        assert!("rails".parse::<AppType>().is_err());
    }

    #[test]
    fn test_detect_wordpress() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("wp-settings.php"), "<?php").unwrap();

        let registry = AppTypeRegistry::new();
        assert_eq!(registry.detect(tmp.path()), AppType::Wordpress);
    }

    #[test]
    fn test_detect_drupal8() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("core/scripts")).unwrap();
        fs::write(tmp.path().join("core/scripts/drupal.sh"), "#!/bin/sh").unwrap();

        let registry = AppTypeRegistry::new();
        assert_eq!(registry.detect(tmp.path()), AppType::Drupal8);
    }

    #[test]
    fn test_detect_falls_back_to_generic() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("index.html"), "<html>").unwrap();

        let registry = AppTypeRegistry::new();
        assert_eq!(registry.detect(tmp.path()), AppType::Generic);
    }

    #[test]
    fn test_every_type_has_a_definition() {
        let registry = AppTypeRegistry::new();
        for app_type in [
            AppType::Drupal6,
            AppType::Drupal7,
            AppType::Drupal8,
            AppType::Wordpress,
            AppType::Generic,
        ] {
            assert_eq!(registry.definition(app_type).app_type, app_type);
        }
    }

    #[test]
    fn test_scaffold_is_fully_commented() {
        let registry = AppTypeRegistry::new();
        for def in [AppType::Drupal7, AppType::Wordpress, AppType::Generic] {
            for line in registry.definition(def).hook_scaffold.lines() {
                assert!(line.starts_with('#'), "scaffold line not commented: {line}");
            }
        }
    }
}
