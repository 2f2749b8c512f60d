//! Log ingestion
//!
//! Each commit is serialized by git as fields joined with the ASCII unit
//! separator and terminated by the ASCII record separator. Neither control
//! character occurs in ordinary commit text, so bodies containing `|`, `#` or
//! newlines survive intact.

use std::collections::BTreeMap;

use tracing::debug;

use crate::conventional::parse_subject;
use crate::domain::{CommitRecord, Person, SignatureStatus};
use crate::error::{HydroError, Result};
use crate::git::range::RangeSelector;
use crate::git::Vcs;

pub const FIELD_SEPARATOR: char = '\x1f';
pub const RECORD_TERMINATOR: char = '\x1e';

/// `--format` argument producing the records read by [parse_log_output]
pub const LOG_FORMAT: &str = "%H%x1f%h%x1f%T%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%ce%x1f%ct%x1f%s%x1f%b%x1f%G?%x1f%GS%x1f%(trailers:only,unfold)%x1e";

const FIELD_COUNT: usize = 15;

/// Turns log queries into commit records
pub struct LogParser<'a> {
    vcs: &'a dyn Vcs,
}

impl<'a> LogParser<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        LogParser { vcs }
    }

    /// Commits selected by `selector`, newest first.
    ///
    /// The selector is validated before any query runs. Changed paths are
    /// listed with one extra query per commit. Any failure discards the
    /// records gathered so far.
    pub fn parse(&self, selector: &RangeSelector) -> Result<Vec<CommitRecord>> {
        selector.validate()?;

        let raw = self.vcs.log(selector)?;
        let mut commits = parse_log_output(&raw)?;

        for commit in &mut commits {
            let listing = self.vcs.changed_paths(&commit.id)?;
            commit.changed_paths = parse_path_listing(&listing);
        }

        debug!(selector = %selector, count = commits.len(), "Parsed commits");
        Ok(commits)
    }
}

/// Parse raw log text into records without touching the repository.
///
/// `changed_paths` is left empty.
pub fn parse_log_output(raw: &str) -> Result<Vec<CommitRecord>> {
    raw.split(RECORD_TERMINATOR)
        .map(|chunk| chunk.trim_start_matches(|c| c == '\n' || c == '\r'))
        .filter(|chunk| !chunk.trim().is_empty())
        .map(parse_record)
        .collect()
}

/// Non-empty lines of a path listing, in order
pub fn parse_path_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_record(chunk: &str) -> Result<CommitRecord> {
    let fields: Vec<&str> = chunk.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT {
        return Err(HydroError::ingestion(format!(
            "malformed log record: expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let subject = fields[10].to_string();
    let body = fields[11].trim().to_string();
    let parsed = parse_subject(&subject, &body);

    Ok(CommitRecord {
        id: fields[0].to_string(),
        short_id: fields[1].to_string(),
        tree_id: fields[2].to_string(),
        parent_ids: fields[3].split_whitespace().map(str::to_string).collect(),
        author: Person {
            name: fields[4].to_string(),
            email: fields[5].to_string(),
        },
        author_timestamp: parse_timestamp(fields[6], fields[0])?,
        committer: Person {
            name: fields[7].to_string(),
            email: fields[8].to_string(),
        },
        committer_timestamp: parse_timestamp(fields[9], fields[0])?,
        subject,
        body,
        footers: parse_footers(fields[14]),
        signature_status: SignatureStatus::from_code(fields[12]),
        signer: Some(fields[13].trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        changed_paths: Vec::new(),
        convention: parsed.convention,
        short_subject: parsed.short_subject,
        ticket: parsed.ticket,
    })
}

fn parse_timestamp(value: &str, commit_id: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        HydroError::ingestion(format!(
            "malformed timestamp '{}' in commit {}",
            value, commit_id
        ))
    })
}

/// `Key: value` trailer lines; a repeated key keeps its last value
fn parse_footers(trailers: &str) -> BTreeMap<String, String> {
    let mut footers = BTreeMap::new();
    for line in trailers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                footers.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    footers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommitKind;
    use crate::git::mock::MockCommit;
    use crate::git::MockVcs;
    use crate::version::BumpLevel;

    fn sample_log() -> String {
        [
            MockCommit::new("feat(core): add parser")
                .id("1111111111111111111111111111111111111111")
                .parents(&["2222222222222222222222222222222222222222"])
                .body("Adds the parser.\n\nIt has | pipes and # hashes.")
                .footer("Reviewed-by", "Alice <alice@example.com>")
                .footer("Refs", "#12")
                .footer("Refs", "#13")
                .serialize(),
            MockCommit::new("update readme")
                .id("2222222222222222222222222222222222222222")
                .parents(&[])
                .serialize(),
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_fields() {
        let commits = parse_log_output(&sample_log()).unwrap();
        assert_eq!(commits.len(), 2);

        let first = &commits[0];
        assert_eq!(first.id, "1111111111111111111111111111111111111111");
        assert_eq!(first.short_id, "1111111");
        assert_eq!(
            first.parent_ids,
            vec!["2222222222222222222222222222222222222222"]
        );
        assert_eq!(first.author.name, "Test Author");
        assert_eq!(first.author.email, "author@example.com");
        assert_eq!(first.author_timestamp, 1_700_000_000);
        assert_eq!(first.body, "Adds the parser.\n\nIt has | pipes and # hashes.");
        assert_eq!(first.signature_status, SignatureStatus::None);
        assert_eq!(first.signer, None);

        let convention = first.convention.as_ref().unwrap();
        assert_eq!(convention.kind, CommitKind::Feat);
        assert_eq!(convention.scope.as_deref(), Some("core"));
        assert_eq!(convention.bump, BumpLevel::Minor);
        assert_eq!(first.short_subject, "add parser");
    }

    #[test]
    fn test_footers_last_occurrence_wins() {
        let commits = parse_log_output(&sample_log()).unwrap();
        let footers = &commits[0].footers;
        assert_eq!(footers.get("Refs").map(String::as_str), Some("#13"));
        assert_eq!(
            footers.get("Reviewed-by").map(String::as_str),
            Some("Alice <alice@example.com>")
        );
    }

    #[test]
    fn test_root_commit_has_no_parents() {
        let commits = parse_log_output(&sample_log()).unwrap();
        assert!(commits[1].parent_ids.is_empty());
        assert!(commits[1].convention.is_none());
        assert_eq!(commits[1].short_subject, "update readme");
    }

    #[test]
    fn test_merge_commit_parents() {
        let raw = MockCommit::new("Merge branch 'topic'")
            .parents(&["aaaaaaa", "bbbbbbb"])
            .serialize();
        let commits = parse_log_output(&raw).unwrap();
        assert!(commits[0].is_merge());
        assert_eq!(commits[0].parent_ids.len(), 2);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = sample_log();
        assert_eq!(
            parse_log_output(&raw).unwrap(),
            parse_log_output(&raw).unwrap()
        );
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_log_output("").unwrap().is_empty());
        assert!(parse_log_output("\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_record() {
        let raw = format!("abc{}def{}", FIELD_SEPARATOR, RECORD_TERMINATOR);
        assert!(matches!(
            parse_log_output(&raw),
            Err(HydroError::Ingestion(_))
        ));
    }

    #[test]
    fn test_malformed_timestamp() {
        let raw = MockCommit::new("fix: x")
            .serialize()
            .replace("1700000000", "yesterday");
        assert!(matches!(
            parse_log_output(&raw),
            Err(HydroError::Ingestion(_))
        ));
    }

    #[test]
    fn test_path_listing() {
        assert_eq!(
            parse_path_listing("a/b.rs\nc.rs\n\n"),
            vec!["a/b.rs".to_string(), "c.rs".to_string()]
        );
        assert!(parse_path_listing("").is_empty());
    }

    #[test]
    fn test_parser_lists_changed_paths() {
        let mut vcs = MockVcs::new();
        vcs.add_commit(
            "api",
            MockCommit::new("fix(api): timeout")
                .id("abc")
                .paths(&["api/src/lib.rs", "api/Cargo.toml"]),
        );

        let commits = LogParser::new(&vcs)
            .parse(&RangeSelector::full_history("api"))
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(
            commits[0].changed_paths,
            vec!["api/src/lib.rs", "api/Cargo.toml"]
        );
        assert_eq!(vcs.queries(), vec!["log HEAD -- api", "diff-tree abc"]);
    }

    #[test]
    fn test_parser_empty_range() {
        let vcs = MockVcs::new();
        let commits = LogParser::new(&vcs)
            .parse(&RangeSelector::full_history("api"))
            .unwrap();
        assert!(commits.is_empty());
    }

    #[test]
    fn test_parser_rejects_selector_without_querying() {
        let vcs = MockVcs::new();
        let selector = RangeSelector::new(Some("v1 && echo pwned".to_string()), "api");
        let result = LogParser::new(&vcs).parse(&selector);
        assert!(matches!(result, Err(HydroError::InvalidSelector(_))));
        assert!(vcs.queries().is_empty());
    }

    #[test]
    fn test_parser_surfaces_log_failure() {
        let mut vcs = MockVcs::new();
        vcs.add_commit("api", MockCommit::new("fix: a"));
        vcs.fail_log("api", "fatal: bad revision 'api/9.9.9..HEAD'");
        let result = LogParser::new(&vcs).parse(&RangeSelector::full_history("api"));
        match result {
            Err(HydroError::Ingestion(msg)) => assert!(msg.contains("bad revision")),
            other => panic!("expected ingestion failure, got {:?}", other),
        }
    }
}
