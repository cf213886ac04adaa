//! `kpm purge`

use kpm_cli::test_utils::PackageFixture;
use predicates::prelude::*;

use super::KpmEnv;

#[test]
fn test_purge_one_package() {
    let env = KpmEnv::new();
    let a = env.pack(&PackageFixture::new("pkg-a", "1.0.0"));
    let a2 = env.pack(&PackageFixture::new("pkg-a", "2.0.0"));
    let b = env.pack(&PackageFixture::new("pkg-b", "1.0.0"));

    env.kpm().args(["purge", "pkg-a", "-y"]).assert().success();

    assert!(!env.installed(&a));
    assert!(!env.installed(&a2));
    assert!(env.installed(&b));
}

#[test]
fn test_purge_everything_needs_confirmation() {
    let env = KpmEnv::new();
    let a = env.pack(&PackageFixture::new("pkg-a", "1.0.0"));
    let b = env.pack(&PackageFixture::new("acme/pkg-b", "1.0.0"));

    env.kpm().arg("purge").assert().failure().stderr(predicate::str::contains("Aborted"));
    assert!(env.installed(&a));
    assert!(env.installed(&b));

    env.kpm().args(["purge", "-y"]).assert().success();
    assert!(!env.installed(&a));
    assert!(!env.installed(&b));
    env.kpm().arg("list").assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_purge_unknown_package() {
    let env = KpmEnv::new();
    env.pack(&PackageFixture::new("pkg-a", "1.0.0"));

    env.kpm()
        .args(["purge", "pkg-ab", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in local repository"));
}
