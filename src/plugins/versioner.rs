use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ComponentConfig;
use crate::error::{HydroError, Result};
use crate::project::NodeLocation;
use crate::version::UNRELEASED;

const DEFAULT_KEY: &str = "$.version";
const DEFAULT_TEXT_FILE: &str = "VERSION";
const NPM_MANIFEST: &str = "package.json";

/// Reads and writes the recorded version of one project
pub trait Versioner: Send + Sync {
    /// The recorded version, `0.0.0` when nothing is recorded yet
    fn read_version(&self) -> Result<String>;

    fn write_version(&self, version: &str) -> Result<()>;
}

/// Dotted key inside a structured document, written `$.a.b`
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyPath(Vec<String>);

impl KeyPath {
    fn parse(key: &str) -> Result<Self> {
        let segments: Vec<String> = key
            .strip_prefix("$.")
            .ok_or_else(|| {
                HydroError::config(format!("Version key '{}' must start with '$.'", key))
            })?
            .split('.')
            .map(String::from)
            .collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(HydroError::config(format!("Invalid version key '{}'", key)));
        }
        Ok(KeyPath(segments))
    }

    fn get<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.0
            .iter()
            .try_fold(document, |value, segment| value.get(segment))
    }

    fn set(&self, document: &mut Value, version: &str) -> Result<()> {
        let mut current = document;
        for segment in &self.0 {
            if current.is_null() {
                *current = Value::Object(Default::default());
            }
            let object = current.as_object_mut().ok_or_else(|| {
                HydroError::config(format!(
                    "Cannot set '{}': parent of '{}' is not an object",
                    self, segment
                ))
            })?;
            current = object.entry(segment.clone()).or_insert(Value::Null);
        }
        *current = Value::String(version.to_string());
        Ok(())
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$.{}", self.0.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

/// Version stored under a key of a JSON or YAML document
#[derive(Debug, Clone)]
pub struct DocumentVersioner {
    file: PathBuf,
    key: KeyPath,
    format: Format,
}

impl DocumentVersioner {
    fn load(&self) -> Result<Option<Value>> {
        if !self.file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file)?;
        let document = match self.format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Yaml => serde_yaml::from_str(&content)?,
        };
        Ok(Some(document))
    }
}

impl Versioner for DocumentVersioner {
    fn read_version(&self) -> Result<String> {
        let Some(document) = self.load()? else {
            warn!(file = %self.file.display(), "Version file not found, assuming {}", UNRELEASED);
            return Ok(UNRELEASED.to_string());
        };

        match self.key.get(&document) {
            Some(Value::String(version)) => Ok(version.clone()),
            Some(Value::Number(number)) => Ok(number.to_string()),
            Some(other) => Err(HydroError::config(format!(
                "Version key {} in {} is not a string: {}",
                self.key,
                self.file.display(),
                other
            ))),
            None => {
                warn!(file = %self.file.display(), key = %self.key, "Version key not found, assuming {}", UNRELEASED);
                Ok(UNRELEASED.to_string())
            }
        }
    }

    fn write_version(&self, version: &str) -> Result<()> {
        let mut document = self.load()?.unwrap_or(Value::Null);
        self.key.set(&mut document, version)?;

        let content = match self.format {
            Format::Json => serde_json::to_string_pretty(&document)? + "\n",
            Format::Yaml => serde_yaml::to_string(&document)?,
        };
        debug!(file = %self.file.display(), version, "Writing version");
        fs::write(&self.file, content)?;
        Ok(())
    }
}

/// Version stored as the whole content of a plain text file
#[derive(Debug, Clone)]
pub struct TextVersioner {
    file: PathBuf,
}

impl Versioner for TextVersioner {
    fn read_version(&self) -> Result<String> {
        if !self.file.exists() {
            warn!(file = %self.file.display(), "Version file not found, assuming {}", UNRELEASED);
            return Ok(UNRELEASED.to_string());
        }
        Ok(fs::read_to_string(&self.file)?.trim().to_string())
    }

    fn write_version(&self, version: &str) -> Result<()> {
        debug!(file = %self.file.display(), version, "Writing version");
        fs::write(&self.file, format!("{}\n", version))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DocumentOptions {
    path: Option<String>,
    key: Option<String>,
}

fn document_versioner(
    location: &NodeLocation,
    component: &ComponentConfig,
    format: Format,
    default_path: Option<&str>,
) -> Result<Box<dyn Versioner>> {
    let options: DocumentOptions = component.options_as()?;
    let path = options
        .path
        .as_deref()
        .or(default_path)
        .ok_or_else(|| {
            HydroError::config(format!(
                "Versioner '{}' of '{}' requires a 'path' option",
                component.kind,
                location.path()
            ))
        })?;
    Ok(Box::new(DocumentVersioner {
        file: location.resolve(path),
        key: KeyPath::parse(options.key.as_deref().unwrap_or(DEFAULT_KEY))?,
        format,
    }))
}

pub(crate) fn json_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn Versioner>> {
    document_versioner(location, component, Format::Json, None)
}

pub(crate) fn yaml_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn Versioner>> {
    document_versioner(location, component, Format::Yaml, None)
}

pub(crate) fn npm_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn Versioner>> {
    document_versioner(location, component, Format::Json, Some(NPM_MANIFEST))
}

#[derive(Debug, Deserialize)]
struct TextOptions {
    path: Option<String>,
}

pub(crate) fn text_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn Versioner>> {
    let options: TextOptions = component.options_as()?;
    Ok(Box::new(TextVersioner {
        file: location.resolve(options.path.as_deref().unwrap_or(DEFAULT_TEXT_FILE)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn component(kind: &str, options: &[(&str, &str)]) -> ComponentConfig {
        let mut component = ComponentConfig::named(kind);
        for (key, value) in options {
            component
                .options
                .insert(key.to_string(), toml::Value::String(value.to_string()));
        }
        component
    }

    fn setup() -> (TempDir, NodeLocation) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("web")).unwrap();
        let location = NodeLocation::new(dir.path(), "web");
        (dir, location)
    }

    #[test]
    fn test_key_path() {
        assert_eq!(
            KeyPath::parse("$.meta.version").unwrap(),
            KeyPath(vec!["meta".to_string(), "version".to_string()])
        );
        assert!(KeyPath::parse("version").is_err());
        assert!(KeyPath::parse("$.a..b").is_err());
    }

    #[test]
    fn test_npm_reads_package_json() {
        let (dir, location) = setup();
        fs::write(
            dir.path().join("web/package.json"),
            r#"{"name": "web", "version": "2.1.0"}"#,
        )
        .unwrap();
        let versioner = npm_factory(&location, &ComponentConfig::named("npm")).unwrap();
        assert_eq!(versioner.read_version().unwrap(), "2.1.0");
    }

    #[test]
    fn test_json_write_keeps_other_keys_in_order() {
        let (dir, location) = setup();
        let file = dir.path().join("web/manifest.json");
        fs::write(&file, r#"{"name": "web", "meta": {"version": "1.0.0"}, "z": 1}"#).unwrap();

        let versioner = json_factory(
            &location,
            &component("json", &[("path", "manifest.json"), ("key", "$.meta.version")]),
        )
        .unwrap();
        versioner.write_version("1.1.0").unwrap();
        assert_eq!(versioner.read_version().unwrap(), "1.1.0");

        let written = fs::read_to_string(&file).unwrap();
        let name_at = written.find("\"name\"").unwrap();
        let z_at = written.find("\"z\"").unwrap();
        assert!(name_at < z_at);
    }

    #[test]
    fn test_missing_file_or_key_is_unreleased() {
        let (dir, location) = setup();
        let versioner =
            json_factory(&location, &component("json", &[("path", "none.json")])).unwrap();
        assert_eq!(versioner.read_version().unwrap(), UNRELEASED);

        fs::write(dir.path().join("web/package.json"), r#"{"name": "web"}"#).unwrap();
        let versioner = npm_factory(&location, &ComponentConfig::named("npm")).unwrap();
        assert_eq!(versioner.read_version().unwrap(), UNRELEASED);
    }

    #[test]
    fn test_json_requires_path() {
        let (_dir, location) = setup();
        assert!(matches!(
            json_factory(&location, &ComponentConfig::named("json")).err(),
            Some(HydroError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip_at_root_relative_path() {
        let (dir, location) = setup();
        fs::write(dir.path().join("chart.yaml"), "name: chart\nversion: 0.3.0\n").unwrap();
        let versioner =
            yaml_factory(&location, &component("yaml", &[("path", "/chart.yaml")])).unwrap();
        assert_eq!(versioner.read_version().unwrap(), "0.3.0");

        versioner.write_version("0.4.0").unwrap();
        let written = fs::read_to_string(dir.path().join("chart.yaml")).unwrap();
        assert!(written.contains("name: chart"));
        assert_eq!(versioner.read_version().unwrap(), "0.4.0");
    }

    #[test]
    fn test_text_versioner() {
        let (dir, location) = setup();
        let versioner = text_factory(&location, &ComponentConfig::named("text")).unwrap();
        assert_eq!(versioner.read_version().unwrap(), UNRELEASED);

        versioner.write_version("3.0.0").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("web/VERSION")).unwrap(),
            "3.0.0\n"
        );
        assert_eq!(versioner.read_version().unwrap(), "3.0.0");
    }

    #[test]
    fn test_non_string_version_is_rejected() {
        let (dir, location) = setup();
        fs::write(dir.path().join("web/package.json"), r#"{"version": [1]}"#).unwrap();
        let versioner = npm_factory(&location, &ComponentConfig::named("npm")).unwrap();
        assert!(versioner.read_version().is_err());
    }
}
