// tests/cli_test.rs
mod common;

use std::fs;
use std::path::Path;
use std::process::Command;

use common::{git_available, monorepo};
use tempfile::TempDir;

fn run_hydro(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let config_home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_git-hydro"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run git-hydro");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, success) = run_hydro(dir.path(), &["--help"]);
    assert!(success);
    assert!(stdout.contains("git-hydro"));
    assert!(stdout.contains("versions"));
}

#[test]
fn test_outside_repository_fails() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let (_, stderr, success) = run_hydro(dir.path(), &["changed"]);
    assert!(!success);
    assert!(stderr.contains("Cannot open repository"));
}

#[test]
fn test_changed() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["changed"]);
    assert!(success);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["api", "web"]);
}

#[test]
fn test_versions() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["--jobs", "1", "versions"]);
    assert!(success);
    assert!(stdout.contains(" |-- api"));
    assert!(stdout.contains("1.0.0 -> 1.1.0"));
    assert!(stdout.contains("0.0.0 -> 0.0.1"));
}

#[test]
fn test_check() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["check"]);
    assert!(success);
    assert!(stdout.contains("2 projects"));
    assert!(stdout.contains(" |-- Web"));
}

#[test]
fn test_commits_json() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["commits", "api", "--json"]);
    assert!(success);

    let commits: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let commits = commits.as_array().unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["short_subject"], "add search endpoint");
    assert_eq!(commits[0]["convention"]["kind"], "feat");
    assert_eq!(commits[0]["convention"]["bump"], "minor");
}

#[test]
fn test_commits_since_revision() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["commits", "Web", "--since", "HEAD~1"]);
    assert!(success);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("fix: capitalize greeting"));
}

#[test]
fn test_unknown_project_fails() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (_, stderr, success) = run_hydro(repo.path(), &["commits", "nope"]);
    assert!(!success);
    assert!(stderr.contains("Unknown project 'nope'"));
}

#[test]
fn test_bump_writes_versions() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (_, _, success) = run_hydro(repo.path(), &["bump", "--dry-run"]);
    assert!(success);
    assert_eq!(
        fs::read_to_string(repo.path().join("api/VERSION")).unwrap(),
        "1.0.0\n"
    );

    let (_, _, success) = run_hydro(repo.path(), &["bump"]);
    assert!(success);
    assert_eq!(
        fs::read_to_string(repo.path().join("api/VERSION")).unwrap(),
        "1.1.0\n"
    );
    assert_eq!(
        fs::read_to_string(repo.path().join("web/VERSION")).unwrap(),
        "0.0.1\n"
    );
}

#[test]
fn test_run_prepare_release_writes_changelog() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["run", "prepare-release"]);
    assert!(success);
    assert!(stdout.contains("api [changelog]"));

    let changelog = fs::read_to_string(repo.path().join("api/CHANGELOG.md")).unwrap();
    assert!(changelog.starts_with("# Changelog\n\n## 1.1.0\n"));
    assert!(changelog.contains("- **search:** add search endpoint"));
    assert!(!repo.path().join("web/CHANGELOG.md").exists());
}

#[test]
fn test_run_unknown_step_is_neutral() {
    if !git_available() {
        return;
    }
    let repo = monorepo();
    let (stdout, _, success) = run_hydro(repo.path(), &["run", "publish"]);
    assert!(success);
    assert!(stdout.contains("No project ran step 'publish'"));
}
