//! CLI integration tests for extforge.
//!
//! These tests run the binary against throwaway projects. None of them
//! need the network or the external tools (tsc, tfx, npm, nuget).

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the extforge binary command.
fn extforge() -> Command {
    Command::cargo_bin("extforge").unwrap()
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

// ============================================================================
// extforge --help / completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    extforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("nuget-package"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_completions_bash() {
    extforge()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extforge"));
}

// ============================================================================
// extforge clean
// ============================================================================

#[test]
fn test_clean_removes_outputs() {
    let tmp = temp_dir();
    write(tmp.path(), "_build/Extensions/A/a.js", "");
    write(tmp.path(), "_package/A/a.vsix", "");
    write(tmp.path(), "_nuget/pack-source/A.nuspec", "");
    write(tmp.path(), "_temp/archive/x/f", "");

    extforge()
        .arg("clean")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!tmp.path().join("_build").exists());
    assert!(!tmp.path().join("_package").exists());
    assert!(!tmp.path().join("_nuget").exists());
    assert!(tmp.path().join("_temp/archive/x/f").exists());
}

// ============================================================================
// extforge loc
// ============================================================================

#[test]
fn test_loc_generates_resjson() {
    let tmp = temp_dir();
    write(
        tmp.path(),
        "Extensions/A/Src/Tasks/Deploy/messages.json",
        r#"{ "messages": { "Started": "Deployment started", "Done": "Done" } }"#,
    );

    extforge()
        .args(["loc", "--no-color"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated"));

    let resjson = fs::read_to_string(tmp.path().join(
        "Extensions/A/Src/Tasks/Deploy/Strings/resources.resjson/en-US/resources.resjson",
    ))
    .unwrap();
    assert_eq!(
        resjson,
        "{\n  \"loc.messages.Started\": \"Deployment started\",\n  \"loc.messages.Done\": \"Done\"\n}"
    );
}

// ============================================================================
// extforge build
// ============================================================================

#[test]
fn test_build_copies_sources_and_task_modules() {
    let tmp = temp_dir();
    write(tmp.path(), "definitions/node.d.ts", "");
    write(tmp.path(), "Extensions/A/Src/vss-extension.json", "{}");
    write(
        tmp.path(),
        "Extensions/A/externals.json",
        r#"{ "taskModule": { "0": { "type": "ps", "name": "Helpers", "dest": "Src/Tasks/T" } } }"#,
    );
    write(tmp.path(), "TaskModules/ps/Helpers/Helpers.psm1", "");

    extforge()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .success();

    let build = tmp.path().join("_build");
    assert!(build.join("definitions/node.d.ts").is_file());
    assert!(build.join("Extensions/A/Src/vss-extension.json").is_file());
    assert!(build.join("Extensions/A/Src/Tasks/T/Helpers/Helpers.psm1").is_file());
}

#[test]
fn test_build_with_empty_area_list() {
    let tmp = temp_dir();
    write(tmp.path(), "Extensions/A/Src/vss-extension.json", "{}");

    extforge()
        .args(["build", "--test-area-path", ""])
        .current_dir(tmp.path())
        .assert()
        .success();

    let built = tmp.path().join("_build/Extensions");
    assert!(built.is_dir());
    assert!(!built.join("A").exists());
}

// ============================================================================
// extforge fetch
// ============================================================================

#[test]
fn test_fetch_without_externals() {
    let tmp = temp_dir();

    extforge()
        .arg("fetch")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No external dependencies declared"));
}

#[test]
fn test_offline_fetch_of_missing_archive_fails() {
    let tmp = temp_dir();
    write(
        tmp.path(),
        "externals.json",
        r#"{ "archivePackages": [ { "url": "https://example.invalid/tool.zip" } ] }"#,
    );

    extforge()
        .args(["fetch", "--offline", "--no-color"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("offline mode is enabled"));

    assert!(!tmp.path().join("_temp/archive").exists());
}

#[test]
fn test_offline_fetch_uses_committed_entry() {
    let tmp = temp_dir();
    write(
        tmp.path(),
        "externals.json",
        r#"{ "archivePackages": [ { "url": "https://example.invalid/tool.zip" } ] }"#,
    );
    write(
        tmp.path(),
        "_temp/archive/https___example.invalid_tool.zip/bin/tool",
        "",
    );

    extforge()
        .args(["fetch", "--offline"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Cached"));
}

#[test]
fn test_invalid_declaration_reports_diagnostic() {
    let tmp = temp_dir();
    write(tmp.path(), "externals.json", r#"{ "npm": { "left-pad": "" } }"#);

    extforge()
        .args(["fetch", "--no-color"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid dependency declaration"))
        .stderr(predicate::str::contains("help: consider:"));
}

// ============================================================================
// extforge cache
// ============================================================================

#[test]
fn test_cache_path_default_and_override() {
    let tmp = temp_dir();

    extforge()
        .args(["cache", "path"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::ends_with("_temp\n"));

    let custom = tmp.path().join("custom-cache");
    extforge()
        .args(["cache", "path", "--cache-dir"])
        .arg(&custom)
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-cache"));
}

#[test]
fn test_cache_list_and_clean_partial() {
    let tmp = temp_dir();
    write(tmp.path(), "_temp/archive/https___h_a.zip/f", "abc");
    write(tmp.path(), "_temp/npm/q/1.4.1/node_modules/q/package.json", "{}");
    write(tmp.path(), "_temp/partial/npm/q/2.0.0/junk", "");

    extforge()
        .args(["cache", "list"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("https___h_a.zip"))
        .stdout(predicate::str::contains("q@1.4.1"))
        .stdout(predicate::str::contains("partial:"));

    extforge()
        .args(["cache", "clean", "--partial"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join("_temp/partial").exists());
    assert!(tmp.path().join("_temp/npm/q/1.4.1").exists());
}

// ============================================================================
// extforge package / nuget-package
// ============================================================================

#[test]
fn test_package_unknown_extension_fails() {
    let tmp = temp_dir();

    extforge()
        .args(["package", "--extension", "Missing"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no manifest"));
}

#[test]
fn test_nuget_package_rejects_invalid_version() {
    let tmp = temp_dir();
    write(tmp.path(), "_package/A/a.vsix", "");

    extforge()
        .args(["nuget-package", "--version", "1.0", "--extension", "A"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid semver version"));

    assert!(!tmp.path().join("_nuget").exists());
}
