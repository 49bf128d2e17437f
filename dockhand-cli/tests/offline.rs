use predicates::prelude::*;

mod common;

#[test]
fn test_offline_defaults_to_off() {
    let ctx = common::dockhand();
    ctx.cmd()
        .arg("offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Offline mode is off"));
}

#[test]
fn test_offline_round_trip() {
    let ctx = common::dockhand();

    ctx.cmd()
        .args(["offline", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provider pulls are disabled"));

    ctx.cmd()
        .args(["offline", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Offline mode is on"));

    ctx.cmd().args(["offline", "off"]).assert().success();

    ctx.cmd()
        .arg("offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Offline mode is off"));
}

#[test]
fn test_offline_rejects_unknown_mode() {
    let ctx = common::dockhand();
    ctx.cmd().args(["offline", "sideways"]).assert().failure();
}
