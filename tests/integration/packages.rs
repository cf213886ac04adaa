//! Package lifecycle: new-package, pack, list, inspect, unpack, remove

use kpm_cli::package::PackageInfo;
use kpm_cli::test_utils::PackageFixture;
use predicates::prelude::*;
use std::fs;

use super::{KpmEnv, hello};

#[test]
fn test_sample_package_round_trip() {
    let env = KpmEnv::new();
    let target = env.root().join("sample");

    env.kpm()
        .args(["new-package", "-y", "-d"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("tester/hello-kpm-0.0.1"));
    assert!(target.join("templates/hello.yaml").is_file());

    env.kpm().arg("pack").arg(&target).arg("-y").assert().success();
    env.kpm()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::diff("tester/hello-kpm-0.0.1\n"));

    env.kpm().args(["run", "tester/hello-kpm", "-n", "sample"]).assert().success();
    let rendered = env.read("sample/hello.yaml");
    assert!(rendered.contains("kind: ConfigMap"), "{rendered}");
    assert!(rendered.contains("Hello, World!"), "{rendered}");
}

#[test]
fn test_new_package_requires_empty_dir() {
    let env = KpmEnv::new();
    let target = env.root().join("busy");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("file.txt"), "x").unwrap();

    env.kpm()
        .args(["new", "acme/demo", "-y", "-d"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not empty"));
}

#[test]
fn test_list_sorted() {
    let env = KpmEnv::new();
    env.pack(&PackageFixture::new("zeta", "1.0.0"));
    env.pack(&PackageFixture::new("acme/alpha", "2.0.0"));
    env.pack(&PackageFixture::new("acme/alpha", "1.0.0"));

    env.kpm()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::diff("acme/alpha-1.0.0\nacme/alpha-2.0.0\nzeta-1.0.0\n"));
}

#[test]
fn test_pack_rejects_unknown_manifest_key() {
    let env = KpmEnv::new();
    let dir = env.root().join("bad");
    hello("0.0.1").write_at(&dir).unwrap();
    fs::write(dir.join("package.yaml"), "name: acme/hello\nversion: 0.0.1\nauthor: me\n").unwrap();

    env.kpm()
        .arg("pack")
        .arg(&dir)
        .arg("-y")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid package manifest"));
    assert!(!env.installed(&PackageInfo::new("acme/hello", "0.0.1")));
}

#[test]
fn test_repack_needs_confirmation() {
    let env = KpmEnv::new();
    let info = env.pack(&hello("0.0.1"));
    let dir = env.root().join("src").join(info.full_name());

    env.kpm().arg("pack").arg(&dir).assert().failure().stderr(predicate::str::contains("Aborted"));
    env.kpm().arg("pack").arg(&dir).arg("-y").assert().success();
}

#[test]
fn test_inspect_prints_files() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));

    env.kpm()
        .args(["inspect", "acme/hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: acme/hello"))
        .stdout(predicate::str::contains("Version: 0.0.1"))
        .stdout(predicate::str::contains("name: World"))
        .stdout(predicate::str::contains("templates/out.txt"))
        .stdout(predicate::str::contains("{{ values.greeting }}"));
}

#[test]
fn test_unpack() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));

    env.kpm().args(["unpack", "acme/hello"]).assert().success();
    let exported = env.work().join("acme/hello-0.0.1");
    assert_eq!(fs::read_to_string(exported.join("templates/out.txt")).unwrap(), "{{ values.greeting }}");

    env.kpm()
        .args(["unpack", "acme/hello", "0.0.1", "-n", "copy", "-d"])
        .arg(env.root())
        .assert()
        .success();
    assert!(env.root().join("copy/package.yaml").is_file());

    env.kpm()
        .args(["unpack", "acme/hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Aborted"));
}

#[test]
fn test_unpack_rejects_unsafe_export_name() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));
    fs::write(env.root().join("sibling.txt"), "keep").unwrap();

    for name in ["..", ".", "/", "../escape", "a/../.."] {
        env.kpm()
            .args(["unpack", "acme/hello", "-y", "-n", name])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid output name"));
    }

    assert_eq!(fs::read_to_string(env.root().join("sibling.txt")).unwrap(), "keep");
    assert!(env.work().is_dir());
}

#[test]
fn test_pack_from_installed_dir() {
    let env = KpmEnv::new();
    let info = env.pack(&hello("0.0.1"));
    let installed = env.home().join("packages").join(info.full_name());

    env.kpm().arg("pack").arg(&installed).arg("-y").assert().success();
    assert!(env.installed(&info));
    env.kpm().args(["run", "acme/hello"]).assert().success();
    assert_eq!(env.read("acme/hello-0.0.1/out.txt"), "Hello, World");
}

#[test]
fn test_remove() {
    let env = KpmEnv::new();
    let old = env.pack(&hello("1.0.0"));
    let new = env.pack(&hello("1.1.0"));

    env.kpm().args(["rm", "acme/hello"]).assert().failure();
    assert!(env.installed(&new));

    env.kpm().args(["remove", "acme/hello", "-y"]).assert().success();
    assert!(!env.installed(&new));
    assert!(env.installed(&old));

    env.kpm().args(["remove", "acme/hello", "1.0.0", "-y"]).assert().success();
    assert!(!env.home().join("packages/acme").exists());
}
