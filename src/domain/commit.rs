use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::version::BumpLevel;

/// Name and email of a commit author or committer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

/// Signature verification state as reported by git's `%G?` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureStatus {
    Good,
    Bad,
    UntrustedGood,
    ExpiredSignature,
    ExpiredKey,
    Revoked,
    CannotCheck,
    None,
}

impl SignatureStatus {
    /// Map a `%G?` code to a status. Unknown codes are treated as unsigned.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "G" => SignatureStatus::Good,
            "B" => SignatureStatus::Bad,
            "U" => SignatureStatus::UntrustedGood,
            "X" => SignatureStatus::ExpiredSignature,
            "Y" => SignatureStatus::ExpiredKey,
            "R" => SignatureStatus::Revoked,
            "E" => SignatureStatus::CannotCheck,
            _ => SignatureStatus::None,
        }
    }
}

/// Commit kinds recognised by the conventional-commit grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    Feat,
    Fix,
    Chore,
    Ci,
    Build,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
}

impl CommitKind {
    pub const ALL: [CommitKind; 10] = [
        CommitKind::Feat,
        CommitKind::Fix,
        CommitKind::Chore,
        CommitKind::Ci,
        CommitKind::Build,
        CommitKind::Docs,
        CommitKind::Style,
        CommitKind::Refactor,
        CommitKind::Perf,
        CommitKind::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitKind::Feat => "feat",
            CommitKind::Fix => "fix",
            CommitKind::Chore => "chore",
            CommitKind::Ci => "ci",
            CommitKind::Build => "build",
            CommitKind::Docs => "docs",
            CommitKind::Style => "style",
            CommitKind::Refactor => "refactor",
            CommitKind::Perf => "perf",
            CommitKind::Test => "test",
        }
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown commit kind: {}", s))
    }
}

/// Classification extracted from a subject line that follows the convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Convention {
    pub kind: CommitKind,
    pub scope: Option<String>,
    /// `!` marker before the colon
    pub breaking: bool,
    pub bump: BumpLevel,
}

/// One historical change, as ingested from the log of a single project.
///
/// Records are built once by the log parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub id: String,
    pub short_id: String,
    pub tree_id: String,
    pub parent_ids: Vec<String>,
    pub author: Person,
    pub committer: Person,
    pub author_timestamp: i64,
    pub committer_timestamp: i64,
    pub subject: String,
    pub body: String,
    pub footers: BTreeMap<String, String>,
    pub signature_status: SignatureStatus,
    pub signer: Option<String>,
    pub changed_paths: Vec<String>,
    /// Present iff the subject matched the conventional-commit grammar
    pub convention: Option<Convention>,
    pub short_subject: String,
    /// Tracking ticket stripped from the subject, e.g. `ABC-123`
    pub ticket: Option<String>,
}

impl CommitRecord {
    /// Bump level this commit contributes, if it follows the convention
    pub fn bump_level(&self) -> Option<BumpLevel> {
        self.convention.as_ref().map(|c| c.bump)
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}
