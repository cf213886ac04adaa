//! Error reporting and exit codes

use predicates::prelude::*;
use std::fs;

use super::{KpmEnv, hello};

#[test]
fn test_unknown_package_suggests_similar() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));

    env.kpm()
        .args(["run", "acme/helo"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("'acme/helo' not found in local repository"))
        .stderr(predicate::str::contains("Did you mean acme/hello?"));
}

#[test]
fn test_invalid_version_rejected() {
    let env = KpmEnv::new();
    for version in ["0.0.0", "01.0.0", "1.0", "latest"] {
        env.kpm()
            .args(["run", "acme/hello", version])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package version"));
    }
}

#[test]
fn test_invalid_name_rejected() {
    let env = KpmEnv::new();
    env.kpm()
        .args(["remove", "Acme/Hello", "1.0.0", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid"));
}

#[test]
fn test_strict_config_file() {
    let env = KpmEnv::new();
    fs::write(env.work().join(".kpm.yaml"), "loglevel: debug\n").unwrap();

    env.kpm()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains(".kpm.yaml"));
}

#[test]
fn test_bad_log_level_env() {
    let env = KpmEnv::new();
    env.kpm()
        .arg("list")
        .env("KPM_LOGLEVEL", "loud")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown log level"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));

    env.kpm()
        .args(["-v", "run", "acme/hello"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Visiting"));
}
