//! Framework settings-file generation.
//!
//! Split into pure renderers (config in, file contents out) and one
//! filesystem applier. The applier is generate-if-absent plus
//! ensure-include: it never rewrites a file the user has taken over, which
//! a removed signature line marks.

use std::path::PathBuf;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

use crate::config::{AppType, AppTypeRegistry, ProjectConfig};
use crate::errors::{DockhandError, Result};

/// First line of every generated file. Removing it freezes the file.
pub const GENERATED_SIGNATURE: &str = "#dockhand-generated";

/// Database credentials inside the stack. The db service provisions the
/// same triple, so settings and topology cannot drift apart.
pub const DB_NAME: &str = "db";
pub const DB_USER: &str = "db";
pub const DB_PASSWORD: &str = "db";
pub const DB_HOST: &str = "db";

// ============================================================================
// PURE RENDERERS
// ============================================================================

/// Inputs the renderers need beyond the static credentials.
#[derive(Clone, Debug)]
pub struct SettingsContext {
    pub project_name: String,
    pub hostname: String,
    pub hash_salt: String,
}

impl SettingsContext {
    /// Context for a project with a freshly generated hash salt.
    pub fn generate(config: &ProjectConfig) -> Self {
        Self {
            project_name: config.name.clone(),
            hostname: config.hostname(),
            hash_salt: random_salt(64),
        }
    }
}

fn random_salt(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Contents of the dockhand-managed local settings file, or `None` when the
/// app type has no settings concept.
pub fn render_local_settings(app_type: AppType, ctx: &SettingsContext) -> Option<String> {
    let body = match app_type {
        AppType::Drupal6 => format!(
            "<?php\n{GENERATED_SIGNATURE}\n\n\
             $db_url = 'mysqli://{DB_USER}:{DB_PASSWORD}@{DB_HOST}/{DB_NAME}';\n\
             $conf['file_public_path'] = 'sites/default/files';\n\
             $base_url = 'https://{host}';\n",
            host = ctx.hostname,
        ),
        AppType::Drupal7 => format!(
            "<?php\n{GENERATED_SIGNATURE}\n\n\
             $databases['default']['default'] = array(\n\
             \x20 'driver' => 'mysql',\n\
             \x20 'database' => '{DB_NAME}',\n\
             \x20 'username' => '{DB_USER}',\n\
             \x20 'password' => '{DB_PASSWORD}',\n\
             \x20 'host' => '{DB_HOST}',\n\
             \x20 'port' => 3306,\n\
             \x20 'prefix' => '',\n\
             );\n\
             $drupal_hash_salt = '{salt}';\n",
            salt = ctx.hash_salt,
        ),
        AppType::Drupal8 => format!(
            "<?php\n{GENERATED_SIGNATURE}\n\n\
             $databases['default']['default'] = array(\n\
             \x20 'driver' => 'mysql',\n\
             \x20 'database' => '{DB_NAME}',\n\
             \x20 'username' => '{DB_USER}',\n\
             \x20 'password' => '{DB_PASSWORD}',\n\
             \x20 'host' => '{DB_HOST}',\n\
             \x20 'port' => 3306,\n\
             \x20 'prefix' => '',\n\
             );\n\
             $settings['hash_salt'] = '{salt}';\n\
             $settings['trusted_host_patterns'] = ['^{name}\\.dockhand\\.local$'];\n",
            salt = ctx.hash_salt,
            name = regex::escape(&ctx.project_name),
        ),
        AppType::Wordpress => format!(
            "<?php\n{GENERATED_SIGNATURE}\n\n\
             define('DB_NAME', '{DB_NAME}');\n\
             define('DB_USER', '{DB_USER}');\n\
             define('DB_PASSWORD', '{DB_PASSWORD}');\n\
             define('DB_HOST', '{DB_HOST}');\n\
             define('DB_CHARSET', 'utf8mb4');\n\
             define('DB_COLLATE', '');\n\
             define('WP_HOME', 'https://{host}');\n\
             define('WP_SITEURL', 'https://{host}');\n\
             define('AUTH_KEY', '{salt}');\n\
             define('SECURE_AUTH_KEY', '{salt}');\n\
             define('LOGGED_IN_KEY', '{salt}');\n\
             define('NONCE_KEY', '{salt}');\n\
             define('AUTH_SALT', '{salt}');\n\
             define('SECURE_AUTH_SALT', '{salt}');\n\
             define('LOGGED_IN_SALT', '{salt}');\n\
             define('NONCE_SALT', '{salt}');\n\
             $table_prefix = 'wp_';\n",
            host = ctx.hostname,
            salt = ctx.hash_salt,
        ),
        AppType::Generic => return None,
    };
    Some(body)
}

/// The include line the main settings file must carry, or `None` when the
/// app type has no settings concept.
pub fn include_snippet(app_type: AppType) -> Option<String> {
    let local = local_settings_file_name(app_type)?;
    Some(match app_type {
        AppType::Wordpress => format!(
            "if (is_readable(__DIR__ . '/{local}')) {{\n  require_once __DIR__ . '/{local}';\n}}\n"
        ),
        _ => format!(
            "if (is_readable(__DIR__ . '/{local}')) {{\n  include __DIR__ . '/{local}';\n}}\n"
        ),
    })
}

/// Fresh main settings file for codebases that ship none.
pub fn render_main_settings(app_type: AppType) -> Option<String> {
    let include = include_snippet(app_type)?;
    Some(match app_type {
        AppType::Wordpress => format!(
            "<?php\n{GENERATED_SIGNATURE}\n\n{include}\n\
             /* That's all, stop editing! Happy publishing. */\n\
             if (!defined('ABSPATH')) {{\n\
             \x20 define('ABSPATH', __DIR__ . '/');\n\
             }}\n\
             require_once ABSPATH . 'wp-settings.php';\n"
        ),
        _ => format!("<?php\n{GENERATED_SIGNATURE}\n\n{include}"),
    })
}

/// Pure ensure-include step: `Some(new contents)` when the include is
/// missing and must be appended, `None` when the file is already wired up.
pub fn ensure_include(existing: &str, app_type: AppType) -> Option<String> {
    let local = local_settings_file_name(app_type)?;
    if existing.contains(local) {
        return None;
    }
    let include = include_snippet(app_type)?;
    let mut updated = existing.to_string();
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push('\n');
    updated.push_str(&include);
    Some(updated)
}

fn local_settings_file_name(app_type: AppType) -> Option<&'static str> {
    match app_type {
        AppType::Drupal6 | AppType::Drupal7 | AppType::Drupal8 => Some("settings.dockhand.php"),
        AppType::Wordpress => Some("wp-config.dockhand.php"),
        AppType::Generic => None,
    }
}

// ============================================================================
// APPLIER
// ============================================================================

/// What the applier did, for logging and start reports.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SettingsOutcome {
    pub wrote_main: bool,
    pub wrote_local: bool,
    /// Local settings file exists without the signature; left untouched.
    pub local_frozen: bool,
}

/// Bring the project's settings files into the managed state.
///
/// Creates missing files, appends the include line to an existing main
/// settings file, and refuses to touch any file whose signature the user
/// removed.
pub fn ensure_settings_files(
    config: &ProjectConfig,
    registry: &AppTypeRegistry,
) -> Result<SettingsOutcome> {
    let def = registry.definition(config.app_type);
    let mut outcome = SettingsOutcome::default();

    let (Some(settings_rel), Some(local_rel)) = (def.settings_path, def.local_settings_path)
    else {
        return Ok(outcome);
    };

    let docroot = config.docroot_abs();
    let main_path = docroot.join(settings_rel);
    let local_path = docroot.join(local_rel);

    if let Some(parent) = local_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DockhandError::io(format!("creating {}", parent.display()), e))?;
    }

    // Local override file: generate if absent, freeze if user-owned.
    match read_optional(&local_path)? {
        None => {
            let ctx = SettingsContext::generate(config);
            if let Some(contents) = render_local_settings(config.app_type, &ctx) {
                write_file(&local_path, &contents)?;
                outcome.wrote_local = true;
            }
        }
        Some(existing) if !existing.contains(GENERATED_SIGNATURE) => {
            outcome.local_frozen = true;
        }
        Some(_) => {}
    }

    // Main settings file: generate if absent, otherwise ensure the include.
    match read_optional(&main_path)? {
        None => {
            if let Some(contents) = render_main_settings(config.app_type) {
                write_file(&main_path, &contents)?;
                outcome.wrote_main = true;
            }
        }
        Some(existing) => {
            if let Some(updated) = ensure_include(&existing, config.app_type) {
                write_file(&main_path, &updated)?;
                outcome.wrote_main = true;
            }
        }
    }

    Ok(outcome)
}

fn read_optional(path: &std::path::Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DockhandError::io(format!("reading {}", path.display()), e)),
    }
}

fn write_file(path: &std::path::Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| DockhandError::io(format!("writing {}", path.display()), e))
}

/// Paths the applier manages for a config, for describe output.
pub fn managed_paths(config: &ProjectConfig, registry: &AppTypeRegistry) -> Vec<PathBuf> {
    let def = registry.definition(config.app_type);
    let docroot = config.docroot_abs();
    [def.settings_path, def.local_settings_path]
        .into_iter()
        .flatten()
        .map(|rel| docroot.join(rel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::GlobalLayout;

    fn wordpress_config(tmp: &tempfile::TempDir) -> ProjectConfig {
        let approot = tmp.path().join("wpsite");
        std::fs::create_dir_all(&approot).unwrap();
        let layout = GlobalLayout::new(tmp.path().join("global"));
        let mut config = ProjectConfig::new(&approot, &layout);
        config.app_type = AppType::Wordpress;
        config
    }

    fn ctx() -> SettingsContext {
        SettingsContext {
            project_name: "wpsite".into(),
            hostname: "wpsite.dockhand.local".into(),
            hash_salt: "s".repeat(64),
        }
    }

    // --- pure renderers ---

    #[test]
    fn test_render_is_deterministic_given_context() {
        let a = render_local_settings(AppType::Drupal8, &ctx()).unwrap();
        let b = render_local_settings(AppType::Drupal8, &ctx()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("<?php"));
        assert!(a.contains(GENERATED_SIGNATURE));
        assert!(a.contains("'database' => 'db'"));
    }

    #[test]
    fn test_generic_renders_nothing() {
        assert!(render_local_settings(AppType::Generic, &ctx()).is_none());
        assert!(render_main_settings(AppType::Generic).is_none());
        assert!(include_snippet(AppType::Generic).is_none());
    }

    #[test]
    fn test_ensure_include_appends_once() {
        let bare = "<?php\n$custom = true;\n";
        let updated = ensure_include(bare, AppType::Wordpress).unwrap();
        assert!(updated.contains("wp-config.dockhand.php"));
        // Already wired files are left alone.
        assert!(ensure_include(&updated, AppType::Wordpress).is_none());
    }

    #[test]
    fn test_wordpress_render_pins_home_url() {
        let contents = render_local_settings(AppType::Wordpress, &ctx()).unwrap();
        assert!(contents.contains("define('WP_HOME', 'https://wpsite.dockhand.local')"));
    }

    // --- applier ---

    #[test]
    fn test_applier_generates_both_files_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = wordpress_config(&tmp);
        let registry = AppTypeRegistry::new();

        let outcome = ensure_settings_files(&config, &registry).unwrap();
        assert!(outcome.wrote_main);
        assert!(outcome.wrote_local);

        let main = std::fs::read_to_string(config.docroot_abs().join("wp-config.php")).unwrap();
        assert!(main.contains("wp-config.dockhand.php"));
    }

    #[test]
    fn test_applier_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = wordpress_config(&tmp);
        let registry = AppTypeRegistry::new();

        ensure_settings_files(&config, &registry).unwrap();
        let local_before =
            std::fs::read_to_string(config.docroot_abs().join("wp-config.dockhand.php")).unwrap();

        let second = ensure_settings_files(&config, &registry).unwrap();
        assert!(!second.wrote_main);
        assert!(!second.wrote_local);

        let local_after =
            std::fs::read_to_string(config.docroot_abs().join("wp-config.dockhand.php")).unwrap();
        assert_eq!(local_before, local_after);
    }

    #[test]
    fn test_applier_appends_include_to_user_main_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = wordpress_config(&tmp);
        let registry = AppTypeRegistry::new();
        let main_path = config.docroot_abs().join("wp-config.php");
        std::fs::write(&main_path, "<?php\n// user managed\n").unwrap();

        ensure_settings_files(&config, &registry).unwrap();

        let main = std::fs::read_to_string(&main_path).unwrap();
        assert!(main.starts_with("<?php\n// user managed"));
        assert!(main.contains("wp-config.dockhand.php"));
    }

    #[test]
    fn test_applier_freezes_unsigned_local_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = wordpress_config(&tmp);
        let registry = AppTypeRegistry::new();
        let local_path = config.docroot_abs().join("wp-config.dockhand.php");
        std::fs::write(&local_path, "<?php\n// mine now\n").unwrap();

        let outcome = ensure_settings_files(&config, &registry).unwrap();
        assert!(outcome.local_frozen);
        assert_eq!(
            std::fs::read_to_string(&local_path).unwrap(),
            "<?php\n// mine now\n"
        );
    }
}
