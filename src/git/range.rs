use std::fmt;

use tracing::{debug, warn};

use crate::domain::TagContext;
use crate::error::{HydroError, Result};
use crate::git::Vcs;
use crate::project::ProjectNode;
use crate::version::UNRELEASED;

/// Characters that could chain a second command onto a log query
const FORBIDDEN_CHARS: [char; 3] = ['&', '|', ';'];

/// Identifies which commits a log query retrieves
///
/// Renders as `<since>..<until> -- <path>`, or `<until> -- <path>` when there
/// is no lower bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelector {
    /// Exclusive lower bound (a tag or revision); `None` means start of history
    pub since: Option<String>,
    /// Inclusive upper bound
    pub until: String,
    /// Repository-relative path restricting the query
    pub path: String,
}

impl RangeSelector {
    /// Range from `since` (exclusive) up to HEAD, restricted to `path`
    pub fn new(since: Option<String>, path: impl Into<String>) -> Self {
        RangeSelector {
            since,
            until: "HEAD".to_string(),
            path: path.into(),
        }
    }

    /// Whole history up to HEAD, restricted to `path`
    pub fn full_history(path: impl Into<String>) -> Self {
        RangeSelector::new(None, path)
    }

    /// Revision expression passed to the log query
    pub fn revision(&self) -> String {
        match &self.since {
            Some(since) => format!("{}..{}", since, self.until),
            None => self.until.clone(),
        }
    }

    /// Arguments appended to `git log`
    pub fn args(&self) -> Vec<String> {
        vec![self.revision(), "--".to_string(), self.path.clone()]
    }

    /// Reject selectors that could alter the intended query
    pub fn validate(&self) -> Result<()> {
        let parts = self
            .since
            .iter()
            .chain([&self.until, &self.path]);
        for part in parts {
            if let Some(c) = part.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
                return Err(HydroError::selector(format!(
                    "'{}' contains forbidden character '{}'",
                    part, c
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for RangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.revision(), self.path)
    }
}

/// Computes the commit range of a project from its latest release tag
pub struct RangeResolver<'a> {
    vcs: &'a dyn Vcs,
}

impl<'a> RangeResolver<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        RangeResolver { vcs }
    }

    /// Latest release tag of a project, `None` while it is unreleased
    pub fn latest_tag(&self, node: &ProjectNode) -> Result<Option<String>> {
        let version = node.current_version()?;
        if version == UNRELEASED {
            return Ok(None);
        }
        let tag = node.tag_template().render(&TagContext {
            name: node.display_name(),
            version: &version,
        })?;
        Ok(Some(tag))
    }

    /// Selector covering the commits of `node` since its latest release
    pub fn resolve(&self, node: &ProjectNode) -> Result<RangeSelector> {
        let tag = self.latest_tag(node)?;
        if let Some(tag) = &tag {
            RangeSelector::new(Some(tag.clone()), node.path()).validate()?;
        }

        let since = match tag {
            Some(tag) if self.vcs.tag_exists(&tag)? => Some(tag),
            Some(tag) => {
                warn!(
                    project = %node.path(),
                    tag = %tag,
                    "Release tag not found, using full history"
                );
                None
            }
            None => None,
        };

        let selector = RangeSelector::new(since, node.path());
        debug!(project = %node.path(), selector = %selector, "Resolved commit range");
        Ok(selector)
    }
}
