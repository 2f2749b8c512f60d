use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{TagTemplate, DEFAULT_TAG_TEMPLATE};
use crate::error::{HydroError, Result};

/// File names looked up at the repository root, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["hydro.toml", ".hydro.toml"];

/// Parallel commit computations when `jobs` is not configured
pub const DEFAULT_JOBS: usize = 4;

/// Bump strategy used when none is declared
pub const DEFAULT_BUMPER: &str = "conventional";

/// Represents the complete repository configuration document.
///
/// Contains global defaults and the tree of project declarations.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub config: GlobalConfig,

    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// Global defaults applied to every root project.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    /// Tag naming template, `${name}/${version}` when absent
    pub tag_name: Option<String>,

    /// Upper bound on concurrent commit computations
    pub jobs: Option<usize>,

    pub versioners: Option<Vec<ComponentConfig>>,

    pub processors: Option<Vec<ComponentConfig>>,

    pub version_bumper: Option<ComponentConfig>,
}

impl GlobalConfig {
    /// Field-by-field overlay; values set in `over` win
    pub fn overlay(&self, over: &GlobalConfig) -> GlobalConfig {
        GlobalConfig {
            tag_name: over.tag_name.clone().or_else(|| self.tag_name.clone()),
            jobs: over.jobs.or(self.jobs),
            versioners: over.versioners.clone().or_else(|| self.versioners.clone()),
            processors: over.processors.clone().or_else(|| self.processors.clone()),
            version_bumper: over
                .version_bumper
                .clone()
                .or_else(|| self.version_bumper.clone()),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs.filter(|jobs| *jobs > 0).unwrap_or(DEFAULT_JOBS)
    }

    /// Context inherited by root projects
    pub fn inherited(&self) -> InheritedConfig {
        InheritedConfig {
            tag_name: self.tag_name.clone(),
            skip: None,
            versioners: self.versioners.clone(),
            processors: self.processors.clone(),
            version_bumper: self.version_bumper.clone(),
        }
    }
}

/// Declaration of one project.
///
/// `name`, `description` and `path` describe this node only. `subprojects`
/// declares children and `subconfig` holds defaults applied to the children
/// but not to the node itself.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ProjectConfig {
    pub name: Option<String>,

    /// Shown for this project only, never passed down to subprojects
    pub description: Option<String>,

    /// Path relative to the parent project, defaults to the declaration key
    pub path: Option<String>,

    pub tag_name: Option<String>,

    pub skip: Option<bool>,

    pub versioners: Option<Vec<ComponentConfig>>,

    pub processors: Option<Vec<ComponentConfig>>,

    pub version_bumper: Option<ComponentConfig>,

    #[serde(default)]
    pub subprojects: BTreeMap<String, ProjectConfig>,

    pub subconfig: Option<Box<ProjectConfig>>,
}

/// The configuration fields that propagate from a project to its children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedConfig {
    pub tag_name: Option<String>,
    pub skip: Option<bool>,
    pub versioners: Option<Vec<ComponentConfig>>,
    pub processors: Option<Vec<ComponentConfig>>,
    pub version_bumper: Option<ComponentConfig>,
}

impl InheritedConfig {
    /// Apply a declaration on top of this context; declared values win
    pub fn merge(&self, own: &ProjectConfig) -> InheritedConfig {
        InheritedConfig {
            tag_name: own.tag_name.clone().or_else(|| self.tag_name.clone()),
            skip: own.skip.or(self.skip),
            versioners: own.versioners.clone().or_else(|| self.versioners.clone()),
            processors: own.processors.clone().or_else(|| self.processors.clone()),
            version_bumper: own
                .version_bumper
                .clone()
                .or_else(|| self.version_bumper.clone()),
        }
    }

    pub fn tag_template(&self) -> TagTemplate {
        TagTemplate::new(self.tag_name.as_deref().unwrap_or(DEFAULT_TAG_TEMPLATE))
    }

    pub fn skip(&self) -> bool {
        self.skip.unwrap_or(false)
    }

    pub fn versioners(&self) -> &[ComponentConfig] {
        self.versioners.as_deref().unwrap_or_default()
    }

    pub fn processors(&self) -> &[ComponentConfig] {
        self.processors.as_deref().unwrap_or_default()
    }

    pub fn version_bumper(&self) -> ComponentConfig {
        self.version_bumper
            .clone()
            .unwrap_or_else(|| ComponentConfig::named(DEFAULT_BUMPER))
    }
}

/// Reference to a plugin: its registry key plus free-form options.
///
/// Written either as a bare string (`"npm"`) or as a table
/// (`{ type = "json", path = "package.json" }`).
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(from = "RawComponent")]
pub struct ComponentConfig {
    pub kind: String,
    pub options: toml::Table,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Name(String),
    Table {
        #[serde(rename = "type")]
        kind: String,
        #[serde(flatten)]
        options: toml::Table,
    },
}

impl From<RawComponent> for ComponentConfig {
    fn from(raw: RawComponent) -> Self {
        match raw {
            RawComponent::Name(kind) => ComponentConfig::named(kind),
            RawComponent::Table { kind, options } => ComponentConfig { kind, options },
        }
    }
}

impl ComponentConfig {
    pub fn named(kind: impl Into<String>) -> Self {
        ComponentConfig {
            kind: kind.into(),
            options: toml::Table::new(),
        }
    }

    /// Deserialize the options into a plugin-specific struct
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T> {
        toml::Value::Table(self.options.clone())
            .try_into()
            .map_err(|e| {
                HydroError::config(format!("Invalid options for '{}': {}", self.kind, e))
            })
    }
}

#[derive(Debug, Deserialize, Default)]
struct UserConfig {
    #[serde(default)]
    config: GlobalConfig,
}

/// Location of the per-user defaults file
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("git-hydro").join("config.toml"))
}

/// Per-user `[config]` defaults, empty when the file does not exist
pub fn load_user_defaults() -> Result<GlobalConfig> {
    match user_config_path() {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading user defaults");
            let user: UserConfig = toml::from_str(&fs::read_to_string(path)?)?;
            Ok(user.config)
        }
        _ => Ok(GlobalConfig::default()),
    }
}

/// Parse a configuration document
pub fn parse_config(content: &str) -> Result<Configuration> {
    Ok(toml::from_str(content)?)
}

/// Loads the repository configuration.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `hydro.toml` at the repository root
/// 3. `.hydro.toml` at the repository root
///
/// Per-user defaults are applied underneath the repository's `[config]`.
///
/// # Returns
/// * `Ok(Configuration)` - Loaded configuration
/// * `Err` - If no file is found, or it cannot be read or parsed
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Configuration> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                HydroError::config(format!(
                    "No {} found in {}: this is not a git-hydro project",
                    CONFIG_FILE_NAMES[0],
                    root.display()
                ))
            })?,
    };

    debug!(path = %path.display(), "Loading configuration");
    let mut config = parse_config(&fs::read_to_string(&path)?)?;
    config.config = load_user_defaults()?.overlay(&config.config);
    Ok(config)
}
