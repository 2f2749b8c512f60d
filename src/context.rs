use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{self, Configuration};
use crate::error::Result;
use crate::git::{GitCli, Vcs};
use crate::plugins::Registry;

/// Everything a run needs: repository root, configuration, plugin registry and
/// version control. Built once at startup and passed by reference.
pub struct HydroContext {
    root: PathBuf,
    config: Configuration,
    registry: Registry,
    vcs: Box<dyn Vcs>,
}

impl HydroContext {
    pub fn new(
        root: impl Into<PathBuf>,
        config: Configuration,
        registry: Registry,
        vcs: Box<dyn Vcs>,
    ) -> Self {
        HydroContext {
            root: root.into(),
            config,
            registry,
            vcs,
        }
    }

    /// Open the repository containing `path` with its configuration and the
    /// built-in plugins
    pub fn open(path: &Path, config_path: Option<&Path>) -> Result<Self> {
        let git = GitCli::discover(path)?;
        let root = git.workdir().to_path_buf();
        debug!(root = %root.display(), "Repository discovered");

        let config = config::load_config(&root, config_path)?;
        Ok(HydroContext::new(
            root,
            config,
            Registry::with_builtins(),
            Box::new(git),
        ))
    }

    /// Override the configured number of parallel jobs
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = Some(jobs);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    pub fn jobs(&self) -> usize {
        self.config.config.jobs()
    }
}
