//! `kpm repo` against filesystem repositories

use kpm_cli::package::PackageInfo;
use predicates::prelude::*;
use std::path::Path;

use super::{KpmEnv, hello};

fn repositories(mirror: &Path) -> String {
    format!(
        "- name: mirror\n  type: filesystem\n  connection:\n    path: {}\n",
        mirror.display()
    )
}

#[test]
fn test_push_find_pull() {
    let env = KpmEnv::new();
    let mirror = env.root().join("mirror");
    let repos = repositories(&mirror);
    env.pack(&hello("1.2.3"));
    let newest = env.pack(&hello("1.10.0"));

    for version in ["1.2.3", "1.10.0"] {
        env.kpm()
            .args(["repo", "push", "acme/hello", version, "-y"])
            .env("KPM_REPOSITORIES", &repos)
            .assert()
            .success();
    }

    env.kpm()
        .args(["repo", "find", "hello"])
        .env("KPM_REPOSITORIES", &repos)
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/hello-1.2.3"))
        .stdout(predicate::str::contains("acme/hello-1.10.0"));

    env.kpm().args(["purge", "-y"]).assert().success();
    assert!(!env.installed(&newest));

    env.kpm()
        .args(["repo", "pull", "acme/hello"])
        .env("KPM_REPOSITORIES", &repos)
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/hello-1.10.0"));
    assert!(env.installed(&newest));
    assert!(!env.installed(&PackageInfo::new("acme/hello", "1.2.3")));
}

#[test]
fn test_repo_list_from_config_file() {
    let env = KpmEnv::new();
    let config = format!("logLevel: error\nrepositories:\n{}", repositories(&env.root().join("m")));
    std::fs::write(env.work().join(".kpm.yaml"), config).unwrap();

    env.kpm()
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mirror (filesystem)"));
}

#[test]
fn test_pull_missing_package() {
    let env = KpmEnv::new();
    let repos = repositories(&env.root().join("empty"));

    env.kpm()
        .args(["repo", "pull", "acme/hello", "1.0.0", "--repo", "mirror"])
        .env("KPM_REPOSITORIES", &repos)
        .assert()
        .failure()
        .stderr(predicate::str::contains("acme/hello-1.0.0"));
}

#[test]
fn test_unknown_repository() {
    let env = KpmEnv::new();
    let repos = repositories(&env.root().join("empty"));

    env.kpm()
        .args(["repo", "find", "--repo", "nope"])
        .env("KPM_REPOSITORIES", &repos)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_no_repositories_configured() {
    let env = KpmEnv::new();
    env.kpm()
        .args(["repo", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repositories are configured"));
}
