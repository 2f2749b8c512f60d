use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ComponentConfig;
use crate::domain::{CommitKind, CommitRecord};
use crate::error::{HydroError, Result};
use crate::project::NodeLocation;

/// Step handled by the changelog processor
pub const PREPARE_RELEASE: &str = "prepare-release";

const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";
const CHANGELOG_HEADER: &str = "# Changelog";

/// What a processor gets to know about the release of one project
#[derive(Debug, Clone)]
pub struct ReleaseContext<'a> {
    /// Display name of the project
    pub project: &'a str,
    pub location: &'a NodeLocation,
    pub current_version: String,
    pub next_version: String,
    /// Commits since the last release, newest first
    pub commits: &'a [CommitRecord],
}

impl ReleaseContext<'_> {
    /// Whether the commits call for a new version
    pub fn is_bump(&self) -> bool {
        self.current_version != self.next_version
    }

    /// Environment exported to release scripts
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("HYDRO_PROJECT".to_string(), self.project.to_string());
        env.insert("HYDRO_VERSION".to_string(), self.current_version.clone());
        env.insert("HYDRO_NEXT_VERSION".to_string(), self.next_version.clone());
        env.insert(
            "HYDRO_COMMIT_COUNT".to_string(),
            self.commits.len().to_string(),
        );
        env
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    /// Nothing to do
    Neutral,
    Error,
}

/// Result of running one step with one processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorReport {
    pub processor: String,
    pub outcome: Outcome,
    pub report: String,
}

impl ProcessorReport {
    pub fn new(processor: &str, outcome: Outcome, report: impl Into<String>) -> Self {
        ProcessorReport {
            processor: processor.to_string(),
            outcome,
            report: report.into(),
        }
    }
}

/// Runs named release steps for one project
pub trait ReleaseProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this processor handles `step` for the project
    fn has_step(&self, step: &str) -> Result<bool>;

    fn execute(&self, step: &str, context: &ReleaseContext<'_>) -> Result<ProcessorReport>;
}

/// Prepends a section per release to a markdown changelog
#[derive(Debug, Clone)]
pub struct ChangelogProcessor {
    file: PathBuf,
}

impl ChangelogProcessor {
    /// Markdown section for the next version, commits grouped by kind
    pub fn render_section(context: &ReleaseContext<'_>) -> String {
        let mut breaking = Vec::new();
        let mut features = Vec::new();
        let mut fixes = Vec::new();
        let mut other = Vec::new();

        for commit in context.commits {
            let line = changelog_line(commit);
            match &commit.convention {
                Some(convention) if convention.breaking => breaking.push(line),
                Some(convention) if convention.kind == CommitKind::Feat => features.push(line),
                Some(convention) if convention.kind == CommitKind::Fix => fixes.push(line),
                _ => other.push(line),
            }
        }

        let mut section = format!("## {}\n", context.next_version);
        for (title, lines) in [
            ("Breaking changes", breaking),
            ("Features", features),
            ("Fixes", fixes),
            ("Other", other),
        ] {
            if lines.is_empty() {
                continue;
            }
            section.push_str(&format!("\n### {}\n\n", title));
            for line in lines {
                section.push_str(&line);
                section.push('\n');
            }
        }
        section
    }
}

fn changelog_line(commit: &CommitRecord) -> String {
    let scope = commit
        .convention
        .as_ref()
        .and_then(|c| c.scope.as_deref())
        .map(|scope| format!("**{}:** ", scope))
        .unwrap_or_default();
    let ticket = commit
        .ticket
        .as_deref()
        .map(|ticket| format!("{} ", ticket))
        .unwrap_or_default();
    format!(
        "- {}{}{} ({})",
        scope, ticket, commit.short_subject, commit.short_id
    )
}

/// Insert `section` below the top-level header, or after a fresh one
fn prepend_section(existing: &str, section: &str) -> String {
    let (header, rest) = match existing.strip_prefix("# ") {
        Some(_) => match existing.split_once('\n') {
            Some((header, rest)) => (header, rest.trim_start_matches('\n')),
            None => (existing, ""),
        },
        None => (CHANGELOG_HEADER, existing),
    };

    if rest.is_empty() {
        format!("{}\n\n{}", header, section)
    } else {
        format!("{}\n\n{}\n{}", header, section, rest)
    }
}

impl ReleaseProcessor for ChangelogProcessor {
    fn name(&self) -> &str {
        "changelog"
    }

    fn has_step(&self, step: &str) -> Result<bool> {
        Ok(step == PREPARE_RELEASE)
    }

    fn execute(&self, step: &str, context: &ReleaseContext<'_>) -> Result<ProcessorReport> {
        if !self.has_step(step)? {
            return Ok(ProcessorReport::new(self.name(), Outcome::Neutral, ""));
        }
        if !context.is_bump() {
            return Ok(ProcessorReport::new(
                self.name(),
                Outcome::Neutral,
                "No version change",
            ));
        }

        let existing = if self.file.exists() {
            fs::read_to_string(&self.file)?
        } else {
            String::new()
        };
        let section = Self::render_section(context);
        fs::write(&self.file, prepend_section(&existing, &section))?;
        debug!(file = %self.file.display(), version = %context.next_version, "Changelog updated");

        Ok(ProcessorReport::new(
            self.name(),
            Outcome::Success,
            format!("Added {} to {}", context.next_version, self.file.display()),
        ))
    }
}

/// Runs scripts declared in the project's `package.json`
#[derive(Debug, Clone)]
pub struct NpmProcessor {
    dir: PathBuf,
    yarn: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: HashMap<String, String>,
}

impl NpmProcessor {
    fn scripts(&self) -> Result<HashMap<String, String>> {
        let manifest = self.dir.join("package.json");
        if !manifest.exists() {
            return Ok(HashMap::new());
        }
        let manifest: PackageManifest = serde_json::from_str(&fs::read_to_string(manifest)?)?;
        Ok(manifest.scripts)
    }

    fn program(&self) -> &'static str {
        if self.yarn {
            "yarn"
        } else {
            "npm"
        }
    }
}

impl ReleaseProcessor for NpmProcessor {
    fn name(&self) -> &str {
        "npm"
    }

    fn has_step(&self, step: &str) -> Result<bool> {
        let scripts = self.scripts().map_err(|e| {
            HydroError::processor(format!(
                "Cannot read scripts of {}: {}",
                self.dir.join("package.json").display(),
                e
            ))
        })?;
        Ok(scripts.contains_key(step))
    }

    fn execute(&self, step: &str, context: &ReleaseContext<'_>) -> Result<ProcessorReport> {
        if !self.has_step(step)? {
            return Ok(ProcessorReport::new(self.name(), Outcome::Neutral, ""));
        }

        debug!(dir = %self.dir.display(), program = self.program(), step, "Running script");
        let output = Command::new(self.program())
            .args(["run", step])
            .current_dir(&self.dir)
            .envs(context.to_env_vars())
            .output()
            .map_err(|e| {
                HydroError::processor(format!("Failed to execute {}: {}", self.program(), e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(ProcessorReport::new(
                self.name(),
                Outcome::Error,
                format!(
                    "{} run {} failed with exit code {}\nStdout: {}\nStderr: {}",
                    self.program(),
                    step,
                    output.status.code().unwrap_or(-1),
                    stdout.trim(),
                    stderr.trim()
                ),
            ));
        }

        Ok(ProcessorReport::new(
            self.name(),
            Outcome::Success,
            stdout.trim().to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChangelogOptions {
    path: Option<String>,
}

pub(crate) fn changelog_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn ReleaseProcessor>> {
    let options: ChangelogOptions = component.options_as()?;
    Ok(Box::new(ChangelogProcessor {
        file: location.resolve(options.path.as_deref().unwrap_or(DEFAULT_CHANGELOG)),
    }))
}

#[derive(Debug, Deserialize)]
struct NpmOptions {
    #[serde(default)]
    yarn: bool,
}

pub(crate) fn npm_factory(
    location: &NodeLocation,
    component: &ComponentConfig,
) -> Result<Box<dyn ReleaseProcessor>> {
    let options: NpmOptions = component.options_as()?;
    Ok(Box::new(NpmProcessor {
        dir: location.dir(),
        yarn: options.yarn,
    }))
}
