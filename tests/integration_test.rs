use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Mock, Server, ServerGuard};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const NO_SEARCH: &str = "nph-test-no-such-program";

fn packument(versions: &[&str]) -> String {
    let entries: Vec<String> = versions
        .iter()
        .map(|v| format!(r#""{}": {{"version": "{}"}}"#, v, v))
        .collect();
    format!(r#"{{"versions": {{{}}}}}"#, entries.join(", "))
}

fn mock_package(server: &mut ServerGuard, path: &str, versions: &[&str]) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(packument(versions))
        .create()
}

fn mock_missing(server: &mut ServerGuard, path: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(404)
        .with_body(r#"{"error": "Not found"}"#)
        .create()
}

fn project(manifest: &str) -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package.json"), manifest).unwrap();
    dir
}

fn read_manifest(dir: &Path) -> String {
    fs::read_to_string(dir.join("package.json")).unwrap()
}

/// A `dep` invocation isolated from the caller's environment.
fn nph_dep(dir: &Path, registry_url: &str, search_command: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("nph"));
    cmd.arg("dep")
        .arg("--dir")
        .arg(dir)
        .arg("--registry-url")
        .arg(registry_url)
        .env("NPH_SEARCH_COMMAND", search_command)
        .env("NO_COLOR", "1")
        .env_remove("NPH_TIMEOUT")
        .env_remove("NPH_DIR");
    cmd
}

/// A search command that always suggests `lodash`.
fn fake_search(dir: &Path) -> String {
    let script = dir.join("fake-npm.sh");
    fs::write(&script, "#!/bin/sh\necho '[{\"name\": \"lodash\"}, {\"name\": \"lodash-es\"}]'\n")
        .unwrap();
    format!("sh {}", script.display())
}

const BROKEN: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "dependencies": {
    "left-pad": "99.0.0",
    "lodahs": "^4.17.21"
  },
  "devDependencies": {
    "@types/node": "^20.0.0"
  },
  "license": "MIT"
}
"#;

const FIXED: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "dependencies": {
    "left-pad": "1.3.0",
    "lodash": "^4.17.21"
  },
  "devDependencies": {
    "@types/node": "^20.0.0"
  },
  "license": "MIT"
}
"#;

fn broken_registry(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        mock_package(server, "/left-pad", &["1.0.0", "1.1.0", "1.2.0", "1.3.0"]),
        mock_missing(server, "/lodahs"),
        mock_package(server, "/lodash", &["4.17.20", "4.17.21"]),
        mock_package(server, "/@types%2Fnode", &["20.0.0", "20.1.0"]),
    ]
}

#[test]
fn test_dep_fix_all_rewrites_manifest() {
    let mut server = Server::new();
    let _mocks = broken_registry(&mut server);
    let dir = project(BROKEN);
    let search = fake_search(dir.path());

    nph_dep(dir.path(), &server.url(), &search)
        .arg("--fix-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking 3 dependencies..."))
        .stdout(predicate::str::contains("Closest version available: 1.3.0"))
        .stdout(predicate::str::contains("Did you mean: lodash"))
        .stdout(predicate::str::contains("package.json has been updated"));

    assert_eq!(read_manifest(dir.path()), FIXED);
}

#[test]
fn test_dep_fix_all_is_idempotent() {
    let mut server = Server::new();
    let _mocks = broken_registry(&mut server);
    let dir = project(FIXED);

    nph_dep(dir.path(), &server.url(), NO_SEARCH)
        .arg("--fix-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("All dependencies are valid!"))
        .stdout(predicate::str::contains("has been updated").not());

    assert_eq!(read_manifest(dir.path()), FIXED);
}

#[test]
fn test_dep_without_fix_flags_leaves_manifest_alone() {
    let mut server = Server::new();
    let _mocks = broken_registry(&mut server);
    let dir = project(BROKEN);

    nph_dep(dir.path(), &server.url(), NO_SEARCH)
        .assert()
        .success()
        .stdout(predicate::str::contains("Version 99.0.0 does not exist for left-pad"))
        .stdout(predicate::str::contains("This package does not exist"))
        .stdout(predicate::str::contains("No similar packages found"))
        .stdout(predicate::str::contains("--fix-all"));

    assert_eq!(read_manifest(dir.path()), BROKEN);
}

#[test]
fn test_dep_fix_version_keeps_misspelled_name() {
    let mut server = Server::new();
    let _mocks = broken_registry(&mut server);
    let dir = project(BROKEN);
    let search = fake_search(dir.path());

    nph_dep(dir.path(), &server.url(), &search)
        .arg("--fix-version")
        .assert()
        .success();

    let written = read_manifest(dir.path());
    assert!(written.contains(r#""left-pad": "1.3.0""#));
    assert!(written.contains(r#""lodahs": "^4.17.21""#));
}

#[test]
fn test_dep_transient_error_is_reported_and_preserved() {
    let mut server = Server::new();
    let _ok = mock_package(&mut server, "/left-pad", &["1.3.0"]);
    let _down = server.mock("GET", "/react").with_status(503).create();
    let dir = project(
        r#"{"dependencies": {"react": "^18.2.0", "left-pad": "99.0.0"}}"#,
    );

    nph_dep(dir.path(), &server.url(), NO_SEARCH)
        .arg("--fix-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("react@^18.2.0 - Error: HTTP 503"));

    let written = read_manifest(dir.path());
    assert!(written.contains(r#""react": "^18.2.0""#));
    assert!(written.contains(r#""left-pad": "1.3.0""#));
}

#[test]
fn test_dep_drops_empty_tables_on_write() {
    let mut server = Server::new();
    let _mock = mock_package(&mut server, "/left-pad", &["1.3.0"]);
    let dir = project(
        r#"{"name": "x", "dependencies": {"left-pad": "2.0.0"}, "devDependencies": {}}"#,
    );

    nph_dep(dir.path(), &server.url(), NO_SEARCH)
        .arg("--fix-all")
        .assert()
        .success();

    assert_eq!(
        read_manifest(dir.path()),
        "{\n  \"name\": \"x\",\n  \"dependencies\": {\n    \"left-pad\": \"1.3.0\"\n  }\n}\n"
    );
}

#[test]
fn test_dep_no_dependencies() {
    let dir = project(r#"{"name": "empty"}"#);

    nph_dep(dir.path(), "http://127.0.0.1:9", NO_SEARCH)
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependencies found in package.json"));
}

#[test]
fn test_dep_missing_manifest_fails() {
    let dir = tempdir().unwrap();

    nph_dep(dir.path(), "http://127.0.0.1:9", NO_SEARCH)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No package.json found"));
}

#[test]
fn test_dep_invalid_manifest_fails() {
    let dir = project("{ not json");

    nph_dep(dir.path(), "http://127.0.0.1:9", NO_SEARCH)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_script_list() {
    let dir = project(
        r#"{"scripts": {"build": "tsc", "test": "jest --coverage"}}"#,
    );

    Command::new(cargo::cargo_bin!("nph"))
        .arg("--dir")
        .arg(dir.path())
        .arg("script")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("build → tsc"))
        .stdout(predicate::str::contains("test  → jest --coverage"));
}

#[test]
fn test_script_add_from_stdin() {
    let dir = project("{\n  \"name\": \"demo\"\n}\n");

    Command::new(cargo::cargo_bin!("nph"))
        .args(["script", "add"])
        .arg("--dir")
        .arg(dir.path())
        .env("NO_COLOR", "1")
        .write_stdin("start\nnode index.js\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Script \"start\" added"));

    assert_eq!(
        read_manifest(dir.path()),
        "{\n  \"name\": \"demo\",\n  \"scripts\": {\n    \"start\": \"node index.js\"\n  }\n}\n"
    );
}

#[test]
fn test_script_rm_cancelled() {
    let original = r#"{"scripts": {"build": "tsc"}}"#;
    let dir = project(original);

    Command::new(cargo::cargo_bin!("nph"))
        .args(["script", "rm"])
        .arg("--dir")
        .arg(dir.path())
        .env("NO_COLOR", "1")
        .write_stdin("1\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Operation cancelled"));

    assert_eq!(read_manifest(dir.path()), original);
}

#[test]
fn test_script_rm_out_of_range_fails() {
    let dir = project(r#"{"scripts": {"build": "tsc"}}"#);

    Command::new(cargo::cargo_bin!("nph"))
        .args(["script", "rm"])
        .arg("--dir")
        .arg(dir.path())
        .write_stdin("5\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid script number(s): 5"));
}
