//! `kpm run`

use kpm_cli::test_utils::PackageFixture;
use predicates::prelude::*;
use std::fs;

use super::{KpmEnv, hello};

#[test]
fn test_minimal_run() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));

    env.kpm()
        .args(["run", "acme/hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 1 package(s)"));

    assert_eq!(env.read("acme/hello-0.0.1/out.txt"), "Hello, World");
    let entries = fs::read_dir(env.work().join("acme/hello-0.0.1")).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_override_wins() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));
    fs::write(env.root().join("overrides.yaml"), "name: KPM\n").unwrap();

    env.kpm()
        .args(["run", "acme/hello", "0.0.1", "-n", "greeting", "-p"])
        .arg(env.root().join("overrides.yaml"))
        .assert()
        .success();

    assert_eq!(env.read("greeting/out.txt"), "Hello, KPM");
}

#[test]
fn test_missing_key_fails() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1").template("out.txt", "{{ values.unknown }}"));

    env.kpm()
        .args(["run", "acme/hello"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Template error"))
        .stderr(predicate::str::contains("out.txt"));
}

#[test]
fn test_dependency_fanout() {
    let env = KpmEnv::new();
    env.pack(
        &PackageFixture::new("leaf", "1.0.0")
            .parameters("greeting: hello\n")
            .template("leaf.txt", "{{ values.greeting }}"),
    );
    env.pack(
        &PackageFixture::new("root", "1.0.0")
            .template("root.txt", "{{ package.name }}")
            .dependency(
                "child.yaml",
                "package: {name: leaf, version: 1.0.0}\nparameters: {greeting: hi}\n",
            ),
    );

    env.kpm()
        .args(["run", "root", "-d"])
        .arg(env.root().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 package(s)"));

    let out = env.root().join("out");
    assert_eq!(fs::read_to_string(out.join("root-1.0.0/root.txt")).unwrap(), "root");
    assert_eq!(fs::read_to_string(out.join("root-1.0.0/child/leaf.txt")).unwrap(), "hi");
}

#[test]
fn test_cycle_fails() {
    let env = KpmEnv::new();
    env.pack(&PackageFixture::new("a", "1.0.0").depends_on("b", "b", "1.0.0", "{}"));
    env.pack(&PackageFixture::new("b", "1.0.0").depends_on("a", "a", "1.0.0", "{}"));

    env.kpm()
        .args(["run", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"))
        .stderr(predicate::str::contains("a-1.0.0"))
        .stderr(predicate::str::contains("b-1.0.0"));
    assert!(!env.work().join("a-1.0.0").exists());
}

#[test]
fn test_highest_version_is_run() {
    let env = KpmEnv::new();
    env.pack(&hello("1.2.3").template("out.txt", "old"));
    env.pack(&hello("1.10.0").template("out.txt", "new"));

    env.kpm().args(["run", "acme/hello"]).assert().success();
    assert_eq!(env.read("acme/hello-1.10.0/out.txt"), "new");
    assert!(!env.work().join("acme/hello-1.2.3").exists());
}

#[test]
fn test_existing_output_needs_confirmation() {
    let env = KpmEnv::new();
    env.pack(&hello("0.0.1"));
    let target = env.work().join("acme/hello-0.0.1");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("stale.txt"), "stale").unwrap();
    fs::write(env.work().join("acme/sibling.txt"), "keep").unwrap();

    env.kpm()
        .args(["run", "acme/hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Aborted"));
    assert!(target.join("stale.txt").exists());

    env.kpm().args(["run", "acme/hello", "-y"]).assert().success();
    assert!(!target.join("stale.txt").exists());
    assert_eq!(env.read("acme/hello-0.0.1/out.txt"), "Hello, World");
    assert_eq!(env.read("acme/sibling.txt"), "keep");
}

#[test]
fn test_runs_are_deterministic() {
    let env = KpmEnv::new();
    env.pack(&PackageFixture::new("leaf", "1.0.0").parameters("n: 1\n").template("n.txt", "{{ values.n }}"));
    env.pack(
        &PackageFixture::new("root", "1.0.0")
            .parameters("items: [a, b]\n")
            .template("items.yaml", "{{ values.items | toYaml }}\n")
            .depends_on("one", "leaf", "1.0.0", "{n: 1}")
            .depends_on("two", "leaf", "1.0.0", "{n: 2}"),
    );

    for out in ["first", "second"] {
        env.kpm().args(["run", "root", "-d", out]).assert().success();
    }
    for file in ["root-1.0.0/items.yaml", "root-1.0.0/one/n.txt", "root-1.0.0/two/n.txt"] {
        assert_eq!(env.read(&format!("first/{file}")), env.read(&format!("second/{file}")));
    }
    assert_eq!(env.read("first/root-1.0.0/two/n.txt"), "2");
}
