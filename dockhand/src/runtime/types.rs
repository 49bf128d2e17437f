//! Read-only snapshot types observed from the container backend, plus the
//! option structs lifecycle operations pass through the adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::constants::labels;
use crate::errors::Result;

// ============================================================================
// CONTAINER STATE
// ============================================================================

/// Backend lifecycle state of one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl ContainerState {
    /// Map a backend state string; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "unknown",
        }
    }

    pub fn is_running(&self) -> bool {
        *self == ContainerState::Running
    }

    /// Running, restarting, or paused: the states that count as "in use"
    /// for collision checks and that stop must act on.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ContainerState::Running | ContainerState::Restarting | ContainerState::Paused
        )
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONTAINER RECORD
// ============================================================================

/// One host port published by a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPort {
    pub container_port: u16,
    pub host_port: u16,
}

/// Snapshot of one backend container. Owned by the backend; dockhand only
/// observes it and never caches between calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub labels: BTreeMap<String, String>,
    pub ports: Vec<PublishedPort>,
    pub created: Option<DateTime<Utc>>,
}

impl ContainerRecord {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn site_name(&self) -> Option<&str> {
        self.label(labels::SITE_NAME)
    }

    pub fn approot(&self) -> Option<&str> {
        self.label(labels::APPROOT)
    }

    pub fn app_type_label(&self) -> Option<&str> {
        self.label(labels::APP_TYPE)
    }

    pub fn service_role(&self) -> Option<&str> {
        self.label(labels::SERVICE)
    }

    /// True when the record carries the full discovery label set.
    pub fn is_discoverable(&self) -> bool {
        [labels::PLATFORM, labels::SITE_NAME, labels::APPROOT, labels::APP_TYPE]
            .iter()
            .all(|key| self.labels.contains_key(*key))
    }

    /// Host port published for a container port, if any.
    pub fn host_port_for(&self, container_port: u16) -> Option<u16> {
        self.ports
            .iter()
            .find(|p| p.container_port == container_port)
            .map(|p| p.host_port)
    }
}

// ============================================================================
// OPERATION OPTIONS
// ============================================================================

/// How a command runs inside a service container.
#[derive(Clone, Debug, Default)]
pub struct ExecOptions {
    /// Attach the caller's terminal; output capture is skipped and no
    /// timeout applies (the operator cancels via signal).
    pub interactive: bool,
    /// Working directory inside the container.
    pub working_dir: Option<String>,
}

/// Captured output of a non-interactive exec.
#[derive(Clone, Debug, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Log streaming controls.
#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub timestamps: bool,
    pub tail: Option<u64>,
}

/// Byte-chunk stream produced by the logs capability.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: ContainerState, labels: &[(&str, &str)]) -> ContainerRecord {
        ContainerRecord {
            id: "abc123".into(),
            name: "dockhand-mysite-web".into(),
            image: "dockhand/nginx-php-fpm:v0.6.0".into(),
            state,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ports: vec![PublishedPort {
                container_port: 80,
                host_port: 32768,
            }],
            created: None,
        }
    }

    #[test]
    fn test_state_parse() {
        assert_eq!(ContainerState::parse("running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("exited"), ContainerState::Exited);
        assert_eq!(ContainerState::parse("weird"), ContainerState::Unknown);
    }

    #[test]
    fn test_state_active_set() {
        assert!(ContainerState::Running.is_active());
        assert!(ContainerState::Paused.is_active());
        assert!(ContainerState::Restarting.is_active());
        assert!(!ContainerState::Exited.is_active());
        assert!(!ContainerState::Created.is_active());
    }

    #[test]
    fn test_discoverability_requires_all_four_keys() {
        let full = record(
            ContainerState::Running,
            &[
                (labels::PLATFORM, "dockhand"),
                (labels::SITE_NAME, "mysite"),
                (labels::APPROOT, "/home/dev/mysite"),
                (labels::APP_TYPE, "wordpress"),
            ],
        );
        assert!(full.is_discoverable());
        assert_eq!(full.site_name(), Some("mysite"));

        let partial = record(
            ContainerState::Running,
            &[(labels::PLATFORM, "dockhand"), (labels::SITE_NAME, "mysite")],
        );
        assert!(!partial.is_discoverable());
    }

    #[test]
    fn test_host_port_lookup() {
        let rec = record(ContainerState::Running, &[]);
        assert_eq!(rec.host_port_for(80), Some(32768));
        assert_eq!(rec.host_port_for(443), None);
    }
}
