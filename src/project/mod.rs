//! Projects of the monorepo and the tree they form

pub mod tree;

pub use tree::{LoadReport, ProjectTree, ProjectTreeBuilder, TreeEntry};

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{InheritedConfig, ProjectConfig};
use crate::domain::{CommitRecord, TagTemplate};
use crate::error::{HydroError, Result};
use crate::git::log::LogParser;
use crate::git::range::{RangeResolver, RangeSelector};
use crate::git::Vcs;
use crate::plugins::{
    BumpStrategy, Outcome, ProcessorReport, Registry, ReleaseContext, ReleaseProcessor, Versioner,
};

/// Where a project lives: the repository root plus its relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    root: PathBuf,
    path: String,
}

impl NodeLocation {
    pub fn new(root: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        NodeLocation {
            root: root.into(),
            path: path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository-relative path, `.` for the repository root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute directory of the project
    pub fn dir(&self) -> PathBuf {
        if self.path.is_empty() || self.path == "." {
            self.root.clone()
        } else {
            self.root.join(&self.path)
        }
    }

    /// Resolve a file option: `/x` is relative to the repository root, `x` to
    /// the project directory
    pub fn resolve(&self, file: &str) -> PathBuf {
        match file.strip_prefix('/') {
            Some(from_root) => self.root.join(from_root),
            None => self.dir().join(file),
        }
    }
}

/// One project of the repository.
///
/// Owns its effective configuration, its plugins and, once computed, the
/// commits that touched its path since its latest release. Children are owned
/// directly; there is no link back to the parent.
pub struct ProjectNode {
    identifier: String,
    display_name: String,
    description: Option<String>,
    tag_template: TagTemplate,
    skip: bool,
    level: usize,
    config: InheritedConfig,
    location: NodeLocation,
    children: Vec<ProjectNode>,
    commits: Option<Vec<CommitRecord>>,
    versioners: Vec<Box<dyn Versioner>>,
    bumper: Box<dyn BumpStrategy>,
    processors: Vec<Box<dyn ReleaseProcessor>>,
}

impl ProjectNode {
    /// Create a node from its declaration and its already merged configuration,
    /// instantiating its plugins from `registry`
    pub fn new(
        identifier: &str,
        declaration: &ProjectConfig,
        config: InheritedConfig,
        location: NodeLocation,
        level: usize,
        registry: &Registry,
    ) -> Result<Self> {
        let versioners = config
            .versioners()
            .iter()
            .map(|component| registry.versioner(&location, component))
            .collect::<Result<Vec<_>>>()?;
        let processors = config
            .processors()
            .iter()
            .map(|component| registry.processor(&location, component))
            .collect::<Result<Vec<_>>>()?;
        let bumper = registry.bumper(&location, &config.version_bumper())?;
        let display_name = declaration
            .name
            .clone()
            .unwrap_or_else(|| default_display_name(identifier, location.path()));

        Ok(ProjectNode {
            identifier: identifier.to_string(),
            display_name,
            description: declaration.description.clone(),
            tag_template: config.tag_template(),
            skip: config.skip(),
            level,
            config,
            location,
            children: Vec::new(),
            commits: None,
            versioners,
            bumper,
            processors,
        })
    }

    /// Key of the declaration
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Repository-relative path
    pub fn path(&self) -> &str {
        self.location.path()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tag_template(&self) -> &TagTemplate {
        &self.tag_template
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Depth in the tree, 1 for roots
    pub fn level(&self) -> usize {
        self.level
    }

    /// Effective configuration, inheritance applied
    pub fn config(&self) -> &InheritedConfig {
        &self.config
    }

    pub fn location(&self) -> &NodeLocation {
        &self.location
    }

    pub fn children(&self) -> &[ProjectNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ProjectNode> {
        &mut self.children
    }

    /// Commits since the latest release, `None` until computed
    pub fn commits(&self) -> Option<&[CommitRecord]> {
        self.commits.as_deref()
    }

    /// Version recorded by the first versioner
    pub fn current_version(&self) -> Result<String> {
        let versioner = self.versioners.first().ok_or_else(|| {
            HydroError::config(format!("Project '{}' has no versioner", self.display_name))
        })?;
        versioner.read_version()
    }

    /// Read the commits since the latest release without storing them
    pub fn fetch_commits(&self, vcs: &dyn Vcs) -> Result<Vec<CommitRecord>> {
        let selector = RangeResolver::new(vcs).resolve(self)?;
        LogParser::new(vcs).parse(&selector)
    }

    /// Read the commits since an explicit revision (full history for `None`)
    pub fn fetch_commits_since(
        &self,
        vcs: &dyn Vcs,
        since: Option<&str>,
    ) -> Result<Vec<CommitRecord>> {
        let selector = RangeSelector::new(since.map(String::from), self.path());
        LogParser::new(vcs).parse(&selector)
    }

    /// Compute and store the commits since the latest release.
    ///
    /// Skipped projects are left uncomputed and issue no query.
    pub fn compute_commits(&mut self, vcs: &dyn Vcs) -> Result<()> {
        if self.skip {
            debug!(project = %self.path(), "Skipped, not computing commits");
            return Ok(());
        }
        let commits = self.fetch_commits(vcs)?;
        self.set_commits(commits);
        Ok(())
    }

    /// Compute and store the commits since an explicit revision
    pub fn compute_commits_since(&mut self, vcs: &dyn Vcs, since: Option<&str>) -> Result<()> {
        let commits = self.fetch_commits_since(vcs, since)?;
        self.set_commits(commits);
        Ok(())
    }

    pub fn set_commits(&mut self, commits: Vec<CommitRecord>) {
        debug!(project = %self.path(), count = commits.len(), "Commits computed");
        self.commits = Some(commits);
    }

    /// Whether any commit touched the project since its latest release.
    ///
    /// Always false for skipped projects.
    pub fn has_changed(&self) -> bool {
        !self.skip && self.commits.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn computed_commits(&self) -> Result<&[CommitRecord]> {
        self.commits
            .as_deref()
            .ok_or_else(|| HydroError::CommitsNotComputed(self.display_name.clone()))
    }

    /// Version the computed commits call for
    pub fn next_version(&self) -> Result<String> {
        let commits = self.computed_commits()?;
        self.bumper
            .next_version(&self.current_version()?, commits)
    }

    /// Record `version` through every versioner
    pub fn write_version(&self, version: &str) -> Result<()> {
        for versioner in &self.versioners {
            versioner.write_version(version)?;
        }
        Ok(())
    }

    /// Run `step` with every processor that provides it
    pub fn run_step(&self, step: &str) -> Result<Vec<ProcessorReport>> {
        let commits = self.computed_commits()?;
        let context = ReleaseContext {
            project: &self.display_name,
            location: &self.location,
            current_version: self.current_version()?,
            next_version: self.next_version()?,
            commits,
        };

        let mut reports = Vec::new();
        for processor in &self.processors {
            match processor.has_step(step) {
                Ok(true) => {
                    debug!(project = %self.path(), processor = processor.name(), step, "Running step");
                    reports.push(processor.execute(step, &context)?);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        project = %self.path(),
                        processor = processor.name(),
                        error = %e,
                        "Cannot resolve step"
                    );
                    reports.push(ProcessorReport::new(
                        processor.name(),
                        Outcome::Error,
                        e.to_string(),
                    ));
                }
            }
        }
        Ok(reports)
    }
}

/// Last segment of the project path, or of the key for the repository root
fn default_display_name(identifier: &str, path: &str) -> String {
    let source = if path == "." { identifier } else { path };
    source
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(source)
        .to_string()
}

impl fmt::Debug for ProjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectNode")
            .field("identifier", &self.identifier)
            .field("path", &self.location.path())
            .field("display_name", &self.display_name)
            .field("skip", &self.skip)
            .field("level", &self.level)
            .field("commits", &self.commits.as_ref().map(Vec::len))
            .field("children", &self.children)
            .finish()
    }
}
