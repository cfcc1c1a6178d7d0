use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{Value, json};
use tempfile::TempDir;

fn clapboard(workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("clapboard"));
    cmd.current_dir(workdir.path())
        .env_remove("PROJECTS_DIR")
        .env_remove("PROJECT_FILE")
        .env_remove("CLAPBOARD_CONFIG_FILE")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn new_then_projects_lists_the_scaffold() {
    let workdir = TempDir::new().expect("temp dir");

    clapboard(&workdir)
        .args(["new", "intro", "--projects-dir", "projects"])
        .assert()
        .success()
        .stdout(contains("Created project \"intro\""))
        .stdout(contains("/render/intro"));

    let project = workdir.path().join("projects/intro");
    assert!(project.join("src/project.ts").is_file());
    assert!(project.join("package.json").is_file());

    let assert = clapboard(&workdir)
        .args(["projects", "--projects-dir", "projects"])
        .env("PROJECT_FILE", "./projects/intro/src/project.ts")
        .assert()
        .success();
    let listing: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json listing");
    assert_eq!(listing, json!({ "projects": ["intro"], "default": "intro" }));
}

#[test]
fn scaffolding_twice_fails() {
    let workdir = TempDir::new().expect("temp dir");

    clapboard(&workdir)
        .args(["new", "intro", "--projects-dir", "projects"])
        .assert()
        .success();
    clapboard(&workdir)
        .args(["new", "intro", "--projects-dir", "projects"])
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn invalid_config_fails_fast() {
    let workdir = TempDir::new().expect("temp dir");

    clapboard(&workdir)
        .arg("projects")
        .env("CLAPBOARD__PROJECTS__DEFINITION_FILE", "../escape.ts")
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}
