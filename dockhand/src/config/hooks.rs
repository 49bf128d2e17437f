//! Lifecycle hook declarations.
//!
//! Hooks live in the project descriptor under `hooks:`, keyed by phase name,
//! each phase holding an ordered task list. Task tags are closed: `exec`
//! runs inside the web service, `exec-host` runs on the invoking machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six lifecycle points at which user tasks may run.
///
/// Any other key under `hooks:` is rejected when the descriptor is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookPhase {
    #[serde(rename = "pre-start")]
    PreStart,
    #[serde(rename = "post-start")]
    PostStart,
    #[serde(rename = "pre-import-db")]
    PreImportDb,
    #[serde(rename = "post-import-db")]
    PostImportDb,
    #[serde(rename = "pre-import-files")]
    PreImportFiles,
    #[serde(rename = "post-import-files")]
    PostImportFiles,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::PreStart => "pre-start",
            HookPhase::PostStart => "post-start",
            HookPhase::PreImportDb => "pre-import-db",
            HookPhase::PostImportDb => "post-import-db",
            HookPhase::PreImportFiles => "pre-import-files",
            HookPhase::PostImportFiles => "post-import-files",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task within a hook phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookTask {
    /// Run a shell command inside the project's web service.
    Exec(String),
    /// Run a shell command on the host, from the project root.
    ExecHost(String),
}

impl HookTask {
    /// The command string, regardless of where it runs.
    pub fn command(&self) -> &str {
        match self {
            HookTask::Exec(cmd) | HookTask::ExecHost(cmd) => cmd,
        }
    }

    /// Short label used in progress banners.
    pub fn kind(&self) -> &'static str {
        match self {
            HookTask::Exec(_) => "exec",
            HookTask::ExecHost(_) => "exec-host",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_parse_hook_table() {
        let yaml = r#"
post-start:
  - exec: "drush cc all"
  - exec-host: "echo done"
pre-import-db:
  - exec: "mysql --version"
"#;
        let hooks: BTreeMap<HookPhase, Vec<HookTask>> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            hooks[&HookPhase::PostStart],
            vec![
                HookTask::Exec("drush cc all".into()),
                HookTask::ExecHost("echo done".into()),
            ]
        );
        assert_eq!(hooks[&HookPhase::PreImportDb].len(), 1);
    }

    #[test]
    fn test_task_order_is_preserved() {
        let yaml = r#"
post-start:
  - exec-host: "echo 2"
  - exec: "echo 1"
  - exec-host: "echo 3"
"#;
        let hooks: BTreeMap<HookPhase, Vec<HookTask>> = serde_yaml::from_str(yaml).unwrap();
        let commands: Vec<&str> = hooks[&HookPhase::PostStart]
            .iter()
            .map(|t| t.command())
            .collect();
        assert_eq!(commands, vec!["echo 2", "echo 1", "echo 3"]);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let yaml = "mid-start:\n  - exec: \"echo hi\"\n";
        let parsed: std::result::Result<BTreeMap<HookPhase, Vec<HookTask>>, _> =
            serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_task_tag_is_rejected() {
        let yaml = "post-start:\n  - exec-remote: \"echo hi\"\n";
        let parsed: std::result::Result<BTreeMap<HookPhase, Vec<HookTask>>, _> =
            serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serialize_uses_kebab_tags() {
        let mut hooks: BTreeMap<HookPhase, Vec<HookTask>> = BTreeMap::new();
        hooks.insert(
            HookPhase::PostStart,
            vec![HookTask::ExecHost("make build".into())],
        );
        let yaml = serde_yaml::to_string(&hooks).unwrap();
        assert!(yaml.contains("post-start:"));
        assert!(yaml.contains("exec-host: make build"));
    }
}
