//! Pluggable collaborators of a project
//!
//! Three roles exist, each behind its own trait:
//!
//! - [Versioner]: reads and writes the recorded version of a project
//! - [BumpStrategy]: computes the next version from a commit set
//! - [ReleaseProcessor]: runs release steps (changelog, scripts)
//!
//! Implementations are looked up by string key in a [Registry] built once at
//! startup. Every lookup creates a fresh instance bound to the requesting
//! project's [NodeLocation]; instances are never shared between projects.

pub mod bumper;
pub mod processor;
pub mod versioner;

pub use bumper::{BumpStrategy, ConventionalBump, PatchBump};
pub use processor::{Outcome, ProcessorReport, ReleaseContext, ReleaseProcessor};
pub use versioner::Versioner;

use std::collections::HashMap;

use crate::config::ComponentConfig;
use crate::error::{HydroError, Result};
use crate::project::NodeLocation;

pub type VersionerFactory = fn(&NodeLocation, &ComponentConfig) -> Result<Box<dyn Versioner>>;
pub type BumperFactory = fn(&NodeLocation, &ComponentConfig) -> Result<Box<dyn BumpStrategy>>;
pub type ProcessorFactory =
    fn(&NodeLocation, &ComponentConfig) -> Result<Box<dyn ReleaseProcessor>>;

/// String-keyed factories for each plugin role
#[derive(Clone, Default)]
pub struct Registry {
    versioners: HashMap<String, VersionerFactory>,
    bumpers: HashMap<String, BumperFactory>,
    processors: HashMap<String, ProcessorFactory>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        registry.register_versioner("json", versioner::json_factory);
        registry.register_versioner("yaml", versioner::yaml_factory);
        registry.register_versioner("npm", versioner::npm_factory);
        registry.register_versioner("text", versioner::text_factory);
        registry.register_bumper("conventional", bumper::conventional_factory);
        registry.register_bumper("patch", bumper::patch_factory);
        registry.register_processor("changelog", processor::changelog_factory);
        registry.register_processor("npm", processor::npm_factory);
        registry
    }

    pub fn register_versioner(&mut self, key: impl Into<String>, factory: VersionerFactory) {
        self.versioners.insert(key.into(), factory);
    }

    pub fn register_bumper(&mut self, key: impl Into<String>, factory: BumperFactory) {
        self.bumpers.insert(key.into(), factory);
    }

    pub fn register_processor(&mut self, key: impl Into<String>, factory: ProcessorFactory) {
        self.processors.insert(key.into(), factory);
    }

    pub fn versioner(
        &self,
        location: &NodeLocation,
        component: &ComponentConfig,
    ) -> Result<Box<dyn Versioner>> {
        let factory = lookup(&self.versioners, "versioner", &component.kind)?;
        factory(location, component)
    }

    pub fn bumper(
        &self,
        location: &NodeLocation,
        component: &ComponentConfig,
    ) -> Result<Box<dyn BumpStrategy>> {
        let factory = lookup(&self.bumpers, "bumper", &component.kind)?;
        factory(location, component)
    }

    pub fn processor(
        &self,
        location: &NodeLocation,
        component: &ComponentConfig,
    ) -> Result<Box<dyn ReleaseProcessor>> {
        let factory = lookup(&self.processors, "processor", &component.kind)?;
        factory(location, component)
    }
}

fn lookup<F: Copy>(factories: &HashMap<String, F>, role: &'static str, kind: &str) -> Result<F> {
    factories
        .get(kind)
        .copied()
        .ok_or_else(|| HydroError::UnknownComponent {
            role,
            kind: kind.to_string(),
        })
}
