//! Conventional-commit grammar applied to subject lines
//!
//! A subject is matched against
//! `kind(scope)!: TICKET-123: short subject` where every prefix part is
//! optional. Only subjects carrying a recognised kind produce a
//! [`Convention`]; the ticket token is stripped either way.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{CommitKind, Convention};
use crate::version::BumpLevel;

static SUBJECT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<kind>feat|fix|chore|ci|build|docs|style|refactor|perf|test)(?:\((?P<scope>[^)]*)\))?(?P<breaking>!)?: )?(?:(?P<ticket>[A-Z]+-\d+):? ?)?(?P<short>.+)$",
    )
    .expect("subject grammar is a valid regex")
});

/// Literal that marks a breaking change when it opens the commit body
pub const BREAKING_CHANGE_TOKEN: &str = "BREAKING CHANGE";

/// Result of matching one subject line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubject {
    pub convention: Option<Convention>,
    pub short_subject: String,
    pub ticket: Option<String>,
}

/// Parse a subject line, using the (trimmed) body to detect breaking changes
pub fn parse_subject(subject: &str, body: &str) -> ParsedSubject {
    let Some(captures) = SUBJECT_GRAMMAR.captures(subject) else {
        return ParsedSubject {
            convention: None,
            short_subject: subject.to_string(),
            ticket: None,
        };
    };

    let short_subject = captures
        .name("short")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| subject.to_string());
    let ticket = captures.name("ticket").map(|m| m.as_str().to_string());

    let convention = captures
        .name("kind")
        .and_then(|m| m.as_str().parse::<CommitKind>().ok())
        .map(|kind| {
            let breaking = captures.name("breaking").is_some();
            Convention {
                kind,
                scope: captures
                    .name("scope")
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty()),
                breaking,
                bump: bump_level(kind, breaking, body),
            }
        });

    ParsedSubject {
        convention,
        short_subject,
        ticket,
    }
}

/// Bump level for a recognised kind.
///
/// `feat` is minor, every other kind is patch; a `!` marker or a body opening
/// with `BREAKING CHANGE` forces major.
pub fn bump_level(kind: CommitKind, breaking: bool, body: &str) -> BumpLevel {
    if breaking || body.starts_with(BREAKING_CHANGE_TOKEN) {
        return BumpLevel::Major;
    }
    match kind {
        CommitKind::Feat => BumpLevel::Minor,
        _ => BumpLevel::Patch,
    }
}
