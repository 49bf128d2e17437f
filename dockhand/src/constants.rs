//! Platform-wide constants: the label discovery protocol, container and
//! network naming, and the default service images.

// ============================================================================
// LABEL PROTOCOL
// ============================================================================

/// Label keys attached to every managed container.
///
/// These labels are the only index mapping containers back to projects.
/// A container missing any of the first four keys is invisible to discovery.
pub mod labels {
    /// Fixed platform tag; value is always [`super::PLATFORM_NAME`].
    pub const PLATFORM: &str = "com.dockhand.platform";

    /// Project name the container belongs to.
    pub const SITE_NAME: &str = "com.dockhand.site-name";

    /// Absolute path to the project root at the time the container was created.
    pub const APPROOT: &str = "com.dockhand.approot";

    /// Application type tag (drupal7, wordpress, ...).
    pub const APP_TYPE: &str = "com.dockhand.app-type";

    /// Service role within the stack (web, db, dba, router).
    pub const SERVICE: &str = "com.dockhand.service";
}

/// Value of the [`labels::PLATFORM`] label on every managed container.
pub const PLATFORM_NAME: &str = "dockhand";

// ============================================================================
// NAMING
// ============================================================================

/// TLD appended to project names to form the per-project hostname.
pub const PROJECT_TLD: &str = "dockhand.local";

/// Descriptor schema version written into new config files.
pub const API_VERSION: &str = "1";

/// Project-local hidden directory holding the descriptor.
pub const CONFIG_DIR: &str = ".dockhand";

/// Descriptor file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

/// Shared docker network all managed containers join.
pub const NETWORK_NAME: &str = "dockhand_default";

/// Reserved name of the shared router stack. Rejected as a project name.
pub const ROUTER_PROJECT_NAME: &str = "dockhand-router";

/// Fixed host ports owned by the router.
pub const ROUTER_HTTP_PORT: u16 = 80;
pub const ROUTER_HTTPS_PORT: u16 = 443;

/// Default service images, overridable per project in the descriptor.
pub mod images {
    pub const WEB: &str = "dockhand/nginx-php-fpm:v0.6.0";
    pub const DB: &str = "dockhand/mariadb:v0.5.2";
    pub const DBA: &str = "dockhand/phpmyadmin:v0.5.0";
    pub const ROUTER: &str = "dockhand/router:v0.4.1";
}

/// Container name for a project service: `dockhand-{project}-{service}`.
pub fn container_name(project: &str, service: &str) -> String {
    format!("dockhand-{project}-{service}")
}

/// Hostname a project is served under: `{name}.{PROJECT_TLD}`.
pub fn project_hostname(name: &str) -> String {
    format!("{name}.{PROJECT_TLD}")
}

/// Primary URL for a project.
pub fn project_url(name: &str) -> String {
    format!("https://{}", project_hostname(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name() {
        assert_eq!(container_name("mysite", "web"), "dockhand-mysite-web");
        assert_eq!(container_name("mysite", "db"), "dockhand-mysite-db");
    }

    #[test]
    fn test_project_hostname_and_url() {
        assert_eq!(project_hostname("mysite"), "mysite.dockhand.local");
        assert_eq!(project_url("mysite"), "https://mysite.dockhand.local");
    }

    #[test]
    fn test_router_name_is_not_a_valid_container_prefix_clash() {
        // The router container is named exactly like a project called "router",
        // which is why ROUTER_PROJECT_NAME is reserved at validation time.
        assert_eq!(container_name("router", "web"), "dockhand-router-web");
        assert!(ROUTER_PROJECT_NAME.starts_with("dockhand-"));
    }
}
