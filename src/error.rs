use thiserror::Error;

/// Unified error type for git-hydro operations
#[derive(Error, Debug)]
pub enum HydroError {
    #[error("Invalid range selector: {0}")]
    InvalidSelector(String),

    #[error("Ingestion failure: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    #[error("Cannot find component {role}:{kind}")]
    UnknownComponent { role: &'static str, kind: String },

    #[error("Commits of project '{0}' have not been computed")]
    CommitsNotComputed(String),

    #[error("Processor error: {0}")]
    Processor(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Results in git-hydro
pub type Result<T> = std::result::Result<T, HydroError>;

impl HydroError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        HydroError::Config(msg.into())
    }

    /// Create an ingestion error with context
    pub fn ingestion(msg: impl Into<String>) -> Self {
        HydroError::Ingestion(msg.into())
    }

    /// Create an invalid selector error
    pub fn selector(msg: impl Into<String>) -> Self {
        HydroError::InvalidSelector(msg.into())
    }

    /// Create a processor error with context
    pub fn processor(msg: impl Into<String>) -> Self {
        HydroError::Processor(msg.into())
    }

    pub fn malformed_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        HydroError::MalformedVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }
}

/// An error raised while computing a single project, kept apart from its siblings
#[derive(Debug)]
pub struct NodeError {
    /// Repository-relative path of the failing project
    pub project: String,
    pub error: HydroError,
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.project, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HydroError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HydroError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_malformed_version_display() {
        let err = HydroError::malformed_version("1.x", "unexpected character");
        assert_eq!(
            err.to_string(),
            "Malformed version '1.x': unexpected character"
        );
    }

    #[test]
    fn test_unknown_component_display() {
        let err = HydroError::UnknownComponent {
            role: "versioner",
            kind: "toml".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot find component versioner:toml");
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (HydroError::config("x"), "Configuration error"),
            (HydroError::ingestion("x"), "Ingestion failure"),
            (HydroError::selector("x"), "Invalid range selector"),
            (HydroError::processor("x"), "Processor error"),
            (
                HydroError::CommitsNotComputed("x".to_string()),
                "Commits of project",
            ),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }

    #[test]
    fn test_node_error_display() {
        let err = NodeError {
            project: "packages/api".to_string(),
            error: HydroError::ingestion("git log exited with status 128"),
        };
        assert_eq!(
            err.to_string(),
            "packages/api: Ingestion failure: git log exited with status 128"
        );
    }
}
