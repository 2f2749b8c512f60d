use crate::config::ComponentConfig;
use crate::domain::CommitRecord;
use crate::error::Result;
use crate::project::NodeLocation;
use crate::version::{self, BumpLevel};

/// Computes the next version of a project from its commits
pub trait BumpStrategy: Send + Sync {
    fn next_version(&self, current: &str, commits: &[CommitRecord]) -> Result<String>;
}

/// Strongest conventional bump wins; no conventional commit means no bump
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalBump;

impl BumpStrategy for ConventionalBump {
    fn next_version(&self, current: &str, commits: &[CommitRecord]) -> Result<String> {
        version::next_version(current, commits)
    }
}

/// Ignores the convention and always increments the patch component
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchBump;

impl BumpStrategy for PatchBump {
    fn next_version(&self, current: &str, _commits: &[CommitRecord]) -> Result<String> {
        let parsed = version::parse_version(current)?;
        Ok(version::bump(&parsed, BumpLevel::Patch).to_string())
    }
}

pub(crate) fn conventional_factory(
    _location: &NodeLocation,
    _component: &ComponentConfig,
) -> Result<Box<dyn BumpStrategy>> {
    Ok(Box::new(ConventionalBump))
}

pub(crate) fn patch_factory(
    _location: &NodeLocation,
    _component: &ComponentConfig,
) -> Result<Box<dyn BumpStrategy>> {
    Ok(Box::new(PatchBump))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HydroError;
    use crate::git::mock::MockCommit;

    #[test]
    fn test_conventional_strategy() {
        let commits = vec![
            MockCommit::new("fix: a").into_record(),
            MockCommit::new("feat(ui): b").into_record(),
        ];
        assert_eq!(
            ConventionalBump.next_version("0.4.1", &commits).unwrap(),
            "0.5.0"
        );
    }

    #[test]
    fn test_patch_strategy_ignores_convention() {
        let commits = vec![MockCommit::new("feat!: rewrite").into_record()];
        assert_eq!(PatchBump.next_version("1.2.3", &commits).unwrap(), "1.2.4");
        assert_eq!(PatchBump.next_version("1.2.3", &[]).unwrap(), "1.2.4");
    }

    #[test]
    fn test_patch_strategy_rejects_malformed_version() {
        assert!(matches!(
            PatchBump.next_version("one", &[]),
            Err(HydroError::MalformedVersion { .. })
        ));
    }
}
