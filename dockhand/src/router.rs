//! Shared router management.
//!
//! One router stack per machine fronts every running project. Its desired
//! route table is always recomputed in full from label discovery and
//! compared against the applied file; the router only restarts when the
//! two differ. Full recomputation makes concurrent resyncs safe without
//! locking: the last writer wins and every writer derives from the same
//! authoritative container state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{self, labels};
use crate::errors::{DockhandError, Result};
use crate::layout::GlobalLayout;
use crate::runtime::{
    ContainerRecord, SharedRuntime, platform_selector, project_selector, wait_for_stack_running,
};
use crate::topology::{ServiceRole, render_router};

/// Ceiling for the router container itself to come up.
const ROUTER_START_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

// ============================================================================
// ROUTE TABLE
// ============================================================================

/// One hostname -> upstream mapping.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    pub hostname: String,
    pub upstream: String,
}

/// The full routing configuration handed to the router image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<Route>,
}

impl RouteTable {
    /// Derive the table from currently running web containers. Routes are
    /// sorted and deduplicated so equal container states always produce
    /// byte-equal tables.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ContainerRecord>) -> Self {
        let mut routes: Vec<Route> = records
            .into_iter()
            .filter(|r| r.state.is_running() && r.is_discoverable())
            .filter(|r| r.service_role() == Some(ServiceRole::Web.as_str()))
            .filter_map(|r| {
                let site = r.site_name()?;
                Some(Route {
                    hostname: constants::project_hostname(site),
                    upstream: format!("{}:80", r.name),
                })
            })
            .collect();
        routes.sort();
        routes.dedup();
        Self { routes }
    }
}

/// What a resync did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterSync {
    /// Applied table already matched; router untouched.
    Unchanged,
    /// New table written; router restarted if it was up.
    Applied { routes: usize },
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct RouterManager {
    runtime: SharedRuntime,
    layout: GlobalLayout,
    image: String,
}

impl RouterManager {
    pub fn new(runtime: SharedRuntime, layout: GlobalLayout) -> Self {
        Self {
            runtime,
            layout,
            image: constants::images::ROUTER.into(),
        }
    }

    /// Recompute the route table and converge the router onto it. The
    /// router restarts only when the computed table differs from the
    /// applied one.
    pub async fn resync(&self) -> Result<RouterSync> {
        let desired = self.desired_table().await?;
        if self.read_applied().as_ref() == Some(&desired) {
            debug!(routes = desired.routes.len(), "router table unchanged");
            return Ok(RouterSync::Unchanged);
        }

        self.write_table(&desired)?;
        info!(routes = desired.routes.len(), "router table updated");

        let router_running = self
            .router_record()
            .await?
            .is_some_and(|r| r.state.is_running());
        if router_running {
            // Replace the container so it picks up the new table.
            self.runtime
                .remove_project(constants::ROUTER_PROJECT_NAME, false)
                .await?;
            self.start_router().await?;
        }
        Ok(RouterSync::Applied {
            routes: desired.routes.len(),
        })
    }

    /// Start the router when it is not already running.
    ///
    /// Fails with a PortConflict when 80/443 are held by something else;
    /// callers surface that as a warning rather than failing project start.
    pub async fn ensure_running(&self) -> Result<()> {
        if let Some(record) = self.router_record().await?
            && record.state.is_running()
        {
            return Ok(());
        }

        preflight_ports(&[constants::ROUTER_HTTP_PORT, constants::ROUTER_HTTPS_PORT]).await?;

        if self.read_applied().is_none() {
            let desired = self.desired_table().await?;
            self.write_table(&desired)?;
        }
        self.start_router().await
    }

    /// Tear the router down once no project web containers remain running.
    /// Returns whether it was stopped.
    pub async fn stop_if_idle(&self) -> Result<bool> {
        let records = self.runtime.find_by_labels(&platform_selector()).await?;
        let busy = records.iter().any(|r| {
            r.state.is_running()
                && r.service_role() == Some(ServiceRole::Web.as_str())
                && r.site_name() != Some(constants::ROUTER_PROJECT_NAME)
        });
        if busy {
            return Ok(false);
        }
        if self.router_record().await?.is_some() {
            info!("no running projects remain; stopping router");
            self.runtime
                .remove_project(constants::ROUTER_PROJECT_NAME, false)
                .await?;
        }
        Ok(true)
    }

    /// Router container snapshot, for status output.
    pub async fn router_record(&self) -> Result<Option<ContainerRecord>> {
        let records = self
            .runtime
            .find_by_labels(&project_selector(constants::ROUTER_PROJECT_NAME))
            .await?;
        Ok(records.into_iter().next())
    }

    async fn desired_table(&self) -> Result<RouteTable> {
        let records = self.runtime.find_by_labels(&platform_selector()).await?;
        let project_webs: Vec<&ContainerRecord> = records
            .iter()
            .filter(|r| r.site_name() != Some(constants::ROUTER_PROJECT_NAME))
            .collect();
        Ok(RouteTable::from_records(project_webs))
    }

    async fn start_router(&self) -> Result<()> {
        let descriptor = render_router(&self.layout.router_config_path(), &self.image);
        self.runtime.start_stack(&descriptor).await?;
        wait_for_stack_running(self.runtime.as_ref(), &descriptor, ROUTER_START_TIMEOUT).await
    }

    fn read_applied(&self) -> Option<RouteTable> {
        let path = self.layout.router_config_path();
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_yaml::from_str(&raw) {
            Ok(table) => Some(table),
            Err(e) => {
                // An unreadable table forces a rewrite on the next resync.
                warn!(path = %path.display(), error = %e, "discarding unreadable router table");
                None
            }
        }
    }

    fn write_table(&self, table: &RouteTable) -> Result<()> {
        self.layout.prepare()?;
        let path = self.layout.router_config_path();
        let yaml = serde_yaml::to_string(table).map_err(|e| DockhandError::Runtime {
            project: constants::ROUTER_PROJECT_NAME.into(),
            message: format!("could not serialize route table: {e}"),
        })?;
        std::fs::write(&path, yaml)
            .map_err(|e| DockhandError::io(format!("writing {}", path.display()), e))
    }
}

/// Verify fixed ports are free before asking the backend to bind them.
/// Only an occupied port counts; other bind failures (low ports need
/// privileges this process may lack) say nothing about the backend.
async fn preflight_ports(ports: &[u16]) -> Result<()> {
    for &port in ports {
        match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => drop(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                return Err(DockhandError::PortConflict {
                    port,
                    detail: e.to_string(),
                });
            }
            Err(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::runtime::{ContainerState, PublishedPort};

    fn web_record(site: &str, state: ContainerState) -> ContainerRecord {
        let mut labels_map = BTreeMap::new();
        labels_map.insert(labels::PLATFORM.to_string(), "dockhand".to_string());
        labels_map.insert(labels::SITE_NAME.to_string(), site.to_string());
        labels_map.insert(labels::APPROOT.to_string(), format!("/home/dev/{site}"));
        labels_map.insert(labels::APP_TYPE.to_string(), "wordpress".to_string());
        labels_map.insert(labels::SERVICE.to_string(), "web".to_string());
        ContainerRecord {
            id: format!("{site}-id"),
            name: constants::container_name(site, "web"),
            image: "dockhand/nginx-php-fpm:v0.6.0".into(),
            state,
            labels: labels_map,
            ports: vec![PublishedPort {
                container_port: 80,
                host_port: 32768,
            }],
            created: None,
        }
    }

    #[test]
    fn test_table_only_includes_running_web() {
        let records = vec![
            web_record("alpha", ContainerState::Running),
            web_record("beta", ContainerState::Exited),
        ];
        let table = RouteTable::from_records(records.iter());
        assert_eq!(table.routes.len(), 1);
        assert_eq!(table.routes[0].hostname, "alpha.dockhand.local");
        assert_eq!(table.routes[0].upstream, "dockhand-alpha-web:80");
    }

    #[test]
    fn test_table_is_sorted_and_deterministic() {
        let records = vec![
            web_record("zeta", ContainerState::Running),
            web_record("alpha", ContainerState::Running),
        ];
        let forward = RouteTable::from_records(records.iter());
        let reversed = RouteTable::from_records(records.iter().rev());
        assert_eq!(forward, reversed);
        assert_eq!(forward.routes[0].hostname, "alpha.dockhand.local");
    }

    #[test]
    fn test_table_skips_unlabeled_containers() {
        let mut stray = web_record("gamma", ContainerState::Running);
        stray.labels.remove(labels::APPROOT);
        let table = RouteTable::from_records([&stray]);
        assert!(table.routes.is_empty());
    }

    #[test]
    fn test_table_yaml_roundtrip() {
        let table = RouteTable {
            routes: vec![Route {
                hostname: "alpha.dockhand.local".into(),
                upstream: "dockhand-alpha-web:80".into(),
            }],
        };
        let yaml = serde_yaml::to_string(&table).unwrap();
        let parsed: RouteTable = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, table);
    }
}
