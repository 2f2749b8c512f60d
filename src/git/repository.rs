use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Repository as Git2Repo, StatusOptions};
use serde::Serialize;
use tracing::debug;

use crate::error::{HydroError, Result};
use crate::git::log::LOG_FORMAT;
use crate::git::range::RangeSelector;
use crate::git::Vcs;

/// stderr of `git log` on a repository without commits
const EMPTY_HISTORY_MARKER: &str = "does not have any commits yet";

/// Snapshot of the repository state at HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    /// Working directory root
    pub path: PathBuf,
    /// Current branch, or "detached"
    pub branch: String,
    /// Full HEAD commit id
    pub commit: String,
    /// Abbreviated HEAD commit id
    pub short: String,
    /// Tags pointing at HEAD, sorted
    pub tags: Vec<String>,
    /// Whether tracked files have uncommitted changes
    pub is_dirty: bool,
}

/// Version control backed by the `git` executable.
///
/// Each query spawns and waits for its own process, without a shell. Only the
/// working directory path is held, so the executor is freely shareable across
/// threads.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Discover the repository containing `path` (searching parent directories)
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| HydroError::config("Bare repositories are not supported"))?
            .to_path_buf();
        Ok(GitCli { workdir })
    }

    /// Use `workdir` as-is without discovery
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        GitCli {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Branch, HEAD and status information read through libgit2
    pub fn repository_info(&self) -> Result<RepositoryInfo> {
        let repo = Git2Repo::open(&self.workdir)?;
        let head = repo.head()?;
        let branch = if head.is_branch() {
            head.shorthand().unwrap_or("detached").to_string()
        } else {
            "detached".to_string()
        };

        let head_commit = head.peel_to_commit()?;
        let commit = head_commit.id().to_string();
        let short = head_commit
            .as_object()
            .short_id()?
            .as_str()
            .unwrap_or_default()
            .to_string();

        let mut tags = Vec::new();
        for tag_name in repo.tag_names(None)?.iter().flatten() {
            if let Ok(reference) = repo.find_reference(&format!("refs/tags/{}", tag_name)) {
                if let Ok(target) = reference.peel_to_commit() {
                    if target.id() == head_commit.id() {
                        tags.push(tag_name.to_string());
                    }
                }
            }
        }
        tags.sort();

        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let is_dirty = !repo.statuses(Some(&mut options))?.is_empty();

        Ok(RepositoryInfo {
            path: self.workdir.clone(),
            branch,
            commit,
            short,
            tags,
            is_dirty,
        })
    }

    fn run(&self, args: &[String]) -> Result<std::process::Output> {
        debug!(workdir = %self.workdir.display(), args = ?args, "Running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| HydroError::ingestion(format!("Failed to execute git: {}", e)))
    }
}

/// `git log` arguments; signature output would corrupt the record stream
fn log_args(selector: &RangeSelector) -> Vec<String> {
    let mut args = vec![
        "log".to_string(),
        "--no-show-signature".to_string(),
        format!("--format=format:{}", LOG_FORMAT),
    ];
    args.extend(selector.args());
    args
}

fn command_failure(command: &str, output: &std::process::Output) -> HydroError {
    HydroError::ingestion(format!(
        "{} exited with status {}: {}",
        command,
        output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        String::from_utf8_lossy(&output.stderr).trim()
    ))
}

impl Vcs for GitCli {
    fn log(&self, selector: &RangeSelector) -> Result<String> {
        let output = self.run(&log_args(selector))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains(EMPTY_HISTORY_MARKER) {
                debug!(selector = %selector, "Repository has no commits yet");
                return Ok(String::new());
            }
            return Err(command_failure("git log", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn changed_paths(&self, commit_id: &str) -> Result<String> {
        let args = [
            "diff-tree",
            "--no-commit-id",
            "--name-only",
            "-r",
            "--root",
            commit_id,
        ]
        .map(String::from);

        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(command_failure("git diff-tree", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        let args = [
            "rev-parse".to_string(),
            "--verify".to_string(),
            "--quiet".to_string(),
            format!("refs/tags/{}", tag),
        ];
        let output = self.run(&args)?;
        // --quiet exits 1 with empty stderr when the ref is missing
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) if output.stderr.is_empty() => Ok(false),
            _ => Err(command_failure("git rev-parse", &output)),
        }
    }
}
