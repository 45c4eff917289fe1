use std::path::PathBuf;

/// Errors surfaced by a strata run.
#[derive(Debug, thiserror::Error)]
pub enum StrataError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to build export index: {0}")]
    Resolve(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StrataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Configuration(_) => "configuration",
            Self::Resolve(_) => "resolve",
            Self::Serialization(_) => "serialization",
        }
    }
}

pub type Result<T, E = StrataError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let io = StrataError::io(
            "repos/a.java",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let parse = StrataError::parse("repos/a.java", "no tree");
        let config = StrataError::Configuration("bad glob".to_string());

        assert_eq!(io.kind(), "io");
        assert_eq!(parse.kind(), "parse");
        assert_eq!(config.kind(), "configuration");
    }

    #[test]
    fn test_io_error_message_names_path() {
        let err = StrataError::io(
            "repos/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("repos/missing"));
    }
}
