//! CLI integration tests for macrobuild.
//!
//! These tests run the binary against small projects written to temporary
//! directories, from compilation through packaging and test reporting.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const PROJECT: &str = r#"
[project]
service_folders = ["sasjs/services/common"]
job_folders = ["sasjs/jobs/daily"]
macro_folders = ["sasjs/macros"]

[[target]]
name = "server"
server_type = "SASJS"
app_loc = "/Public/demo"
"#;

/// Get the macrobuild binary command, isolated from user-wide config.
fn macrobuild(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("macrobuild").unwrap();
    cmd.current_dir(project)
        .env("HOME", project)
        .env_remove("MACROBUILD_PROJECT")
        .arg("--color")
        .arg("never");
    cmd
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A project with one service, one job, one macro and one test.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "macrobuild.toml", PROJECT);
    write(
        root,
        "sasjs/services/common/hello.sas",
        "/**\n  @file\n  <h4> SAS Macros </h4>\n  @li mf_greet.sas\n**/\n%mf_greet();\n",
    );
    write(root, "sasjs/services/common/hello.test.sas", "%put testing hello;\n");
    write(root, "sasjs/jobs/daily/refresh.sas", "data _null_; run;\n");
    write(root, "sasjs/macros/mf_greet.sas", "%macro mf_greet();%put hi;%mend;\n");
    tmp
}

// ============================================================================
// macrobuild compile
// ============================================================================

#[test]
fn test_compile_creates_build_folder() {
    let tmp = project();

    macrobuild(tmp.path())
        .arg("compile")
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));

    let build = tmp.path().join("sasjsbuild");
    let hello = fs::read_to_string(build.join("services/common/hello.sas")).unwrap();
    assert!(hello.contains("* Dependencies start;"));
    assert!(hello.contains("%macro mf_greet();"));
    assert!(hello.contains("* Service start;"));

    assert!(build.join("jobs/daily/refresh.sas").exists());
    assert!(build.join("tests/services/common/hello.test.sas").exists());
    assert!(build.join("testFlow.json").exists());
}

#[test]
fn test_second_compile_is_fresh() {
    let tmp = project();
    macrobuild(tmp.path()).arg("compile").assert().success();

    macrobuild(tmp.path())
        .arg("compile")
        .assert()
        .success()
        .stderr(predicate::str::contains("Fresh"));

    macrobuild(tmp.path())
        .args(["compile", "--force"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));
}

#[test]
fn test_compile_missing_source_folder() {
    let tmp = project();
    fs::remove_dir_all(tmp.path().join("sasjs/jobs/daily")).unwrap();

    macrobuild(tmp.path())
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_compile_missing_macro() {
    let tmp = project();
    fs::remove_file(tmp.path().join("sasjs/macros/mf_greet.sas")).unwrap();

    macrobuild(tmp.path())
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("mf_greet.sas"));
}

#[test]
fn test_compile_without_project_file() {
    let tmp = TempDir::new().unwrap();

    macrobuild(tmp.path())
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("macrobuild.toml"));
}

#[test]
fn test_unknown_target() {
    let tmp = project();

    macrobuild(tmp.path())
        .args(["compile", "--target", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

// ============================================================================
// macrobuild build
// ============================================================================

#[test]
fn test_build_writes_bundle() {
    let tmp = project();

    macrobuild(tmp.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("build.sas"));

    let build = tmp.path().join("sasjsbuild");
    let script = fs::read_to_string(build.join("build.sas")).unwrap();
    assert!(script.contains("%let appLoc=/Public/demo;"));
    assert!(script.contains("%let path=services/common;"));
    assert!(!script.contains("%mv_"));

    let tree: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(build.join("build.json")).unwrap()).unwrap();
    assert_eq!(tree["appLoc"], "/Public/demo");
    assert!(build.join("build.json.gz").exists());
}

#[test]
fn test_build_json_messages() {
    let tmp = project();

    macrobuild(tmp.path())
        .args(["build", "--message-format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reason\":\"built\""));
}

// ============================================================================
// macrobuild test
// ============================================================================

#[test]
fn test_test_prints_coverage_table() {
    let tmp = project();
    write(
        tmp.path(),
        "results.json",
        r#"{ "tests/services/common/hello.test.sas": [
            { "test_description": "greets", "test_result": "PASS" } ] }"#,
    );

    macrobuild(tmp.path())
        .args(["test", "--results", "results.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tests/services/common/hello.test.sas"))
        .stdout(predicate::str::contains("overall"));

    let results = tmp.path().join("sasjsresults");
    assert!(results.join("testResults.json").exists());
    assert!(results.join("coverage.lcov").exists());
    assert!(results.join("testResults.xml").exists());
}

#[test]
fn test_test_json_format() {
    let tmp = project();

    let output = macrobuild(tmp.path())
        .args(["test", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["target"], "server");
    assert_eq!(report["summary"]["notProvided"], 1);
}

#[test]
fn test_failing_results_fail_the_command() {
    let tmp = project();
    write(
        tmp.path(),
        "results.json",
        r#"{ "tests/services/common/hello.test.sas": [
            { "test_description": "greets", "test_result": "FAIL" } ] }"#,
    );

    macrobuild(tmp.path())
        .args(["test", "--results", "results.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 test failed"));
}

// ============================================================================
// macrobuild clean
// ============================================================================

#[test]
fn test_clean_removes_build_folder() {
    let tmp = project();
    macrobuild(tmp.path()).arg("compile").assert().success();
    assert!(tmp.path().join("sasjsbuild").exists());

    macrobuild(tmp.path())
        .arg("clean")
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));
    assert!(!tmp.path().join("sasjsbuild").exists());
}

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();

    macrobuild(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("clean"));
}
