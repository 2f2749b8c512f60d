//! Version-control access layer
//!
//! This module provides a trait-based abstraction over the read-only git
//! queries git-hydro needs, allowing for a real implementation that spawns
//! `git` and an in-memory mock for testing.
//!
//! # Overview
//!
//! - [Vcs]: raw queries (log text, changed paths, tag lookup)
//! - [log::LogParser]: turns raw log text into [crate::domain::CommitRecord]s
//! - [range::RangeResolver]: computes the commit range of a project
//!
//! The implementations are:
//!
//! - [repository::GitCli]: spawns one `git` process per query
//! - [mock::MockVcs]: canned answers plus a record of issued queries
//!
//! ```rust
//! # use git_hydro::git::{log::LogParser, range::RangeSelector, Vcs};
//! # fn example(vcs: &dyn Vcs) -> git_hydro::Result<()> {
//! let selector = RangeSelector::new(Some("api/1.2.3".to_string()), "packages/api");
//! let commits = LogParser::new(vcs).parse(&selector)?;
//! # Ok(())
//! # }
//! ```

pub mod log;
pub mod mock;
pub mod range;
pub mod repository;

pub use mock::MockVcs;
pub use range::{RangeResolver, RangeSelector};
pub use repository::{GitCli, RepositoryInfo};

use crate::error::Result;

/// Read-only version-control queries
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync`; sibling projects query the same
/// executor concurrently.
///
/// ## Error Handling
///
/// A failing query surfaces [crate::error::HydroError::Ingestion] carrying the
/// exit status and raw error output. An empty result is never an error.
pub trait Vcs: Send + Sync {
    /// Raw log text for the selector, serialized with [log::LOG_FORMAT]
    ///
    /// Callers validate the selector first; implementations may assume it
    /// holds no command separators.
    fn log(&self, selector: &RangeSelector) -> Result<String>;

    /// Raw listing of the paths touched by one commit, one per line
    fn changed_paths(&self, commit_id: &str) -> Result<String>;

    /// Whether a tag with this exact name exists
    fn tag_exists(&self, tag: &str) -> Result<bool>;
}
