#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Whether a usable `git` executable is on the PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity and signing disabled
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test Author",
            "-c",
            "user.email=author@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn write(dir: &Path, file: &str, content: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
}

pub const MONOREPO_CONFIG: &str = r#"
[config]
versioners = ["text"]

[projects.api]
processors = ["changelog"]

[projects.web]
name = "Web"
"#;

/// Repository with two released-or-not projects and new work on both:
///
/// - `api` is at 1.0.0, tagged `api/1.0.0`, with one `feat` commit since
/// - `web` was never released and has one `fix` commit besides the initial one
pub fn monorepo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    git(root, &["init", "-q"]);

    write(root, "hydro.toml", MONOREPO_CONFIG);
    write(root, "api/VERSION", "1.0.0\n");
    write(root, "web/index.html", "<h1>hello</h1>\n");
    commit_all(root, "chore: initial import");
    git(root, &["tag", "api/1.0.0"]);

    write(root, "api/src/lib.rs", "pub fn search() {}\n");
    commit_all(root, "feat(search): add search endpoint");

    write(root, "web/index.html", "<h1>Hello</h1>\n");
    commit_all(root, "fix: capitalize greeting");

    dir
}
