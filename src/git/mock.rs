use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::CommitRecord;
use crate::error::{HydroError, Result};
use crate::git::log::{parse_log_output, FIELD_SEPARATOR, RECORD_TERMINATOR};
use crate::git::range::RangeSelector;
use crate::git::Vcs;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Builder for a commit served by [MockVcs]
#[derive(Debug, Clone)]
pub struct MockCommit {
    id: String,
    parents: Vec<String>,
    author: (String, String),
    timestamp: i64,
    subject: String,
    body: String,
    footers: Vec<(String, String)>,
    paths: Vec<String>,
}

impl MockCommit {
    pub fn new(subject: impl Into<String>) -> Self {
        MockCommit {
            id: format!("{:040x}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            parents: Vec::new(),
            author: ("Test Author".to_string(), "author@example.com".to_string()),
            timestamp: 1_700_000_000,
            subject: subject.into(),
            body: String::new(),
            footers: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn parents(mut self, parents: &[&str]) -> Self {
        self.parents = parents.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn footer(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.footers.push((key.into(), value.into()));
        self
    }

    pub fn paths(mut self, paths: &[&str]) -> Self {
        self.paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Serialize the commit the way `git log` does with the log format
    pub fn serialize(&self) -> String {
        let short: String = self.id.chars().take(7).collect();
        let timestamp = self.timestamp.to_string();
        let parents = self.parents.join(" ");
        let trailers: String = self
            .footers
            .iter()
            .map(|(k, v)| format!("{}: {}\n", k, v))
            .collect();
        let fields = [
            self.id.as_str(),
            short.as_str(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904",
            parents.as_str(),
            self.author.0.as_str(),
            self.author.1.as_str(),
            timestamp.as_str(),
            self.author.0.as_str(),
            self.author.1.as_str(),
            timestamp.as_str(),
            self.subject.as_str(),
            self.body.as_str(),
            "N",
            "",
            trailers.as_str(),
        ];
        let separator = FIELD_SEPARATOR.to_string();
        format!("{}{}", fields.join(&separator), RECORD_TERMINATOR)
    }

    /// Parse this commit into a record, changed paths included
    pub fn into_record(self) -> CommitRecord {
        let mut record = parse_log_output(&self.serialize())
            .ok()
            .and_then(|records| records.into_iter().next())
            .expect("mock commit serializes to one record");
        record.changed_paths = self.paths;
        record
    }
}

/// Mock version control for testing without a repository
///
/// Commits are keyed by the path they touch; a log query for a path also
/// returns commits registered under its sub-paths. Every query is recorded.
#[derive(Default)]
pub struct MockVcs {
    commits: Vec<(String, MockCommit)>,
    tags: HashMap<String, Option<String>>,
    failures: HashMap<String, String>,
    queries: Mutex<Vec<String>>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit as the newest one touching `path`
    pub fn add_commit(&mut self, path: impl Into<String>, commit: MockCommit) {
        self.commits.insert(0, (path.into(), commit));
    }

    /// Add a tag that exists but does not bound any range
    pub fn add_tag(&mut self, name: impl Into<String>) {
        self.tags.insert(name.into(), None);
    }

    /// Add a tag pointing at a commit; ranges starting at it stop there
    pub fn add_tag_at(&mut self, name: impl Into<String>, commit_id: impl Into<String>) {
        self.tags.insert(name.into(), Some(commit_id.into()));
    }

    /// Make log queries for `path` fail with the given error output
    pub fn fail_log(&mut self, path: impl Into<String>, stderr: impl Into<String>) {
        self.failures.insert(path.into(), stderr.into());
    }

    /// Queries issued so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, query: String) {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query);
    }

    fn touches(commit_path: &str, scope: &str) -> bool {
        scope.is_empty()
            || scope == "."
            || commit_path == scope
            || commit_path.starts_with(&format!("{}/", scope.trim_end_matches('/')))
    }
}

impl Vcs for MockVcs {
    fn log(&self, selector: &RangeSelector) -> Result<String> {
        self.record(format!("log {}", selector));

        if let Some(stderr) = self.failures.get(&selector.path) {
            return Err(HydroError::ingestion(format!(
                "git log exited with status 128: {}",
                stderr
            )));
        }

        let stop_at = selector
            .since
            .as_ref()
            .and_then(|tag| self.tags.get(tag).cloned().flatten());

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (path, commit) in &self.commits {
            if stop_at.as_deref() == Some(commit.id.as_str()) {
                break;
            }
            if Self::touches(path, &selector.path) && seen.insert(commit.id.clone()) {
                out.push(commit.serialize());
            }
        }
        Ok(out.join("\n"))
    }

    fn changed_paths(&self, commit_id: &str) -> Result<String> {
        self.record(format!("diff-tree {}", commit_id));
        let paths: Vec<&str> = self
            .commits
            .iter()
            .filter(|(_, c)| c.id == commit_id)
            .flat_map(|(_, c)| c.paths.iter().map(String::as_str))
            .collect();
        Ok(paths.join("\n"))
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        self.record(format!("tag {}", tag));
        Ok(self.tags.contains_key(tag))
    }
}
