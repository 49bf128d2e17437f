//! Desired container topology derived from a project descriptor.
//!
//! `render` is a pure function: the same config always produces the same
//! descriptor, which is what makes repeated starts converge instead of
//! accumulating containers. Nothing here touches the container backend or
//! the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ProjectConfig;
use crate::constants::{self, labels};
use crate::settings::{DB_NAME, DB_PASSWORD, DB_USER};

/// Where the database import staging directory is mounted inside the db
/// service.
pub const IMPORT_MOUNT: &str = "/mnt/import-db";

// ============================================================================
// TYPES
// ============================================================================

/// Service roles within a stack. The role is also the value of the
/// service label on the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Web,
    Db,
    Dba,
    Router,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::Web => "web",
            ServiceRole::Db => "db",
            ServiceRole::Dba => "dba",
            ServiceRole::Router => "router",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published port. `host_port: None` asks the backend for an ephemeral
/// host port; only the router pins fixed ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: Option<u16>,
}

/// One host path mounted into a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Desired state of one container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceSpec {
    pub role: ServiceRole,
    pub container_name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<BindMount>,
    pub ports: Vec<PortMapping>,
    pub labels: BTreeMap<String, String>,
    pub working_dir: Option<String>,
}

/// Desired state of a whole project stack. Services are listed in start
/// order; the adapter creates and starts them front to back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StackDescriptor {
    pub project_name: String,
    pub network: String,
    pub services: Vec<ServiceSpec>,
}

impl StackDescriptor {
    pub fn service(&self, role: ServiceRole) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.role == role)
    }
}

// ============================================================================
// RENDER
// ============================================================================

/// Compute the desired stack for a project: db, then web, then dba.
pub fn render(config: &ProjectConfig) -> StackDescriptor {
    let name = &config.name;

    let mut db_env = BTreeMap::new();
    db_env.insert("MYSQL_DATABASE".into(), DB_NAME.into());
    db_env.insert("MYSQL_USER".into(), DB_USER.into());
    db_env.insert("MYSQL_PASSWORD".into(), DB_PASSWORD.into());
    db_env.insert("MYSQL_ROOT_PASSWORD".into(), "root".into());

    let db = ServiceSpec {
        role: ServiceRole::Db,
        container_name: constants::container_name(name, "db"),
        image: config.dbimage.clone(),
        env: db_env,
        mounts: vec![
            BindMount {
                source: config.data_dir.clone(),
                target: "/var/lib/mysql".into(),
                read_only: false,
            },
            BindMount {
                source: config.import_dir.clone(),
                target: IMPORT_MOUNT.into(),
                read_only: true,
            },
        ],
        ports: vec![PortMapping {
            container_port: 3306,
            host_port: None,
        }],
        labels: service_labels(config, ServiceRole::Db),
        working_dir: None,
    };

    let mut web_env = BTreeMap::new();
    web_env.insert("VIRTUAL_HOST".into(), config.hostname());
    web_env.insert("DOCKHAND_SITENAME".into(), name.clone());
    web_env.insert("DOCROOT".into(), config.docroot.clone());
    web_env.insert("DEPLOY_NAME".into(), "local".into());

    let web = ServiceSpec {
        role: ServiceRole::Web,
        container_name: constants::container_name(name, "web"),
        image: config.webimage.clone(),
        env: web_env,
        mounts: vec![BindMount {
            source: config.approot.clone(),
            target: "/var/www/html".into(),
            read_only: false,
        }],
        ports: vec![PortMapping {
            container_port: 80,
            host_port: None,
        }],
        labels: service_labels(config, ServiceRole::Web),
        working_dir: Some(web_working_dir(config)),
    };

    let mut dba_env = BTreeMap::new();
    dba_env.insert("PMA_HOST".into(), "db".into());
    dba_env.insert("PMA_USER".into(), DB_USER.into());
    dba_env.insert("PMA_PASSWORD".into(), DB_PASSWORD.into());

    let dba = ServiceSpec {
        role: ServiceRole::Dba,
        container_name: constants::container_name(name, "dba"),
        image: config.dbaimage.clone(),
        env: dba_env,
        mounts: vec![],
        ports: vec![PortMapping {
            container_port: 80,
            host_port: None,
        }],
        labels: service_labels(config, ServiceRole::Dba),
        working_dir: None,
    };

    StackDescriptor {
        project_name: name.clone(),
        network: constants::NETWORK_NAME.into(),
        services: vec![db, web, dba],
    }
}

/// Working directory inside the web container, honoring the docroot.
pub fn web_working_dir(config: &ProjectConfig) -> String {
    if config.docroot.is_empty() {
        "/var/www/html".to_string()
    } else {
        format!("/var/www/html/{}", config.docroot)
    }
}

/// Desired router stack. The route table file is bind-mounted read-only so
/// resync can replace it on the host side.
pub fn render_router(route_config_path: &Path, image: &str) -> StackDescriptor {
    let mut router_labels = BTreeMap::new();
    router_labels.insert(labels::PLATFORM.into(), constants::PLATFORM_NAME.into());
    router_labels.insert(
        labels::SITE_NAME.into(),
        constants::ROUTER_PROJECT_NAME.into(),
    );
    router_labels.insert(
        labels::APPROOT.into(),
        route_config_path
            .parent()
            .unwrap_or(route_config_path)
            .display()
            .to_string(),
    );
    router_labels.insert(labels::APP_TYPE.into(), "router".into());
    router_labels.insert(labels::SERVICE.into(), ServiceRole::Router.to_string());

    let router = ServiceSpec {
        role: ServiceRole::Router,
        container_name: constants::ROUTER_PROJECT_NAME.into(),
        image: image.to_string(),
        env: BTreeMap::new(),
        mounts: vec![BindMount {
            source: route_config_path.to_path_buf(),
            target: "/etc/router/routes.yaml".into(),
            read_only: true,
        }],
        ports: vec![
            PortMapping {
                container_port: 80,
                host_port: Some(constants::ROUTER_HTTP_PORT),
            },
            PortMapping {
                container_port: 443,
                host_port: Some(constants::ROUTER_HTTPS_PORT),
            },
        ],
        labels: router_labels,
        working_dir: None,
    };

    StackDescriptor {
        project_name: constants::ROUTER_PROJECT_NAME.into(),
        network: constants::NETWORK_NAME.into(),
        services: vec![router],
    }
}

/// The five-label set every managed container carries.
fn service_labels(config: &ProjectConfig, role: ServiceRole) -> BTreeMap<String, String> {
    let mut labels_map = BTreeMap::new();
    labels_map.insert(labels::PLATFORM.into(), constants::PLATFORM_NAME.into());
    labels_map.insert(labels::SITE_NAME.into(), config.name.clone());
    labels_map.insert(labels::APPROOT.into(), config.approot.display().to_string());
    labels_map.insert(labels::APP_TYPE.into(), config.app_type.to_string());
    labels_map.insert(labels::SERVICE.into(), role.to_string());
    labels_map
}
