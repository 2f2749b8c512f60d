use serde::Serialize;
use std::fmt;

use crate::domain::CommitRecord;
use crate::error::{HydroError, Result};

/// Version recorded for a project that has never been released
pub const UNRELEASED: &str = "0.0.0";

/// Ordinal severity of a change.
///
/// Variants are declared from least to most severe so that `Ord` picks the
/// strongest bump with `max()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    Patch = 0,
    Minor = 1,
    Major = 2,
}

impl BumpLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpLevel::Patch => "patch",
            BumpLevel::Minor => "minor",
            BumpLevel::Major => "major",
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a strict semantic version (`MAJOR.MINOR.PATCH[-pre][+build]`).
///
/// No repair is attempted: prefixes such as `v` or surrounding whitespace are
/// rejected.
pub fn parse_version(version: &str) -> Result<semver::Version> {
    semver::Version::parse(version)
        .map_err(|e| HydroError::malformed_version(version, e.to_string()))
}

/// Bumps a version according to the specified level.
///
/// Increments the appropriate component and resets lower components to 0:
/// - **Major**: major += 1, minor = 0, patch = 0
/// - **Minor**: minor += 1, patch = 0
/// - **Patch**: patch += 1
///
/// Pre-release and build metadata are dropped.
pub fn bump(version: &semver::Version, level: BumpLevel) -> semver::Version {
    let mut next = semver::Version::new(version.major, version.minor, version.patch);
    match level {
        BumpLevel::Major => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
        }
        BumpLevel::Minor => {
            next.minor += 1;
            next.patch = 0;
        }
        BumpLevel::Patch => {
            next.patch += 1;
        }
    }
    next
}

/// Strongest bump level among commits that follow the convention
pub fn max_bump_level(commits: &[CommitRecord]) -> Option<BumpLevel> {
    commits.iter().filter_map(CommitRecord::bump_level).max()
}

/// Computes the next version from the current one and a set of commits.
///
/// Only conventional commits are considered. When none qualify the current
/// version is returned unchanged.
pub fn next_version(current: &str, commits: &[CommitRecord]) -> Result<String> {
    let version = parse_version(current)?;
    match max_bump_level(commits) {
        Some(level) => Ok(bump(&version, level).to_string()),
        None => Ok(version.to_string()),
    }
}
