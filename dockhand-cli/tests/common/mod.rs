use assert_cmd::Command;
use std::time::Duration;
use tempfile::TempDir;

/// Context for one test: an isolated home directory, so global state
/// (offline marker, routing table) never leaks between tests.
pub struct TestContext {
    pub home: TempDir,
}

impl TestContext {
    pub fn cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_dockhand");
        let mut cmd = Command::new(bin_path);
        cmd.timeout(Duration::from_secs(30));
        cmd.arg("--home").arg(self.home.path());
        cmd
    }
}

pub fn dockhand() -> TestContext {
    TestContext {
        home: TempDir::new().expect("create test home"),
    }
}

/// A project directory with a served subdirectory, ready for `config`.
pub fn project_dir(docroot: &str) -> TempDir {
    let dir = TempDir::new().expect("create project dir");
    if !docroot.is_empty() {
        std::fs::create_dir_all(dir.path().join(docroot)).expect("create docroot");
    }
    dir
}
