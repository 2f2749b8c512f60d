pub mod config;
pub mod context;
pub mod conventional;
pub mod domain;
pub mod error;
pub mod git;
pub mod plugins;
pub mod project;
pub mod version;

pub use context::HydroContext;
pub use error::{HydroError, NodeError, Result};
pub use project::{LoadReport, ProjectNode, ProjectTree, ProjectTreeBuilder};
