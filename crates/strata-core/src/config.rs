use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};
use crate::qualify::QualifiedPathTrim;

/// Name of the configuration file looked up in the root and its ancestors.
pub const CONFIG_FILE: &str = ".strata.toml";

/// Top-level configuration from `.strata.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to do when a source file cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadErrorPolicy {
    /// Leave the file out and report it with the results.
    #[default]
    Skip,
    /// Fail the whole run.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Languages to extract; empty means every registered adapter.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Directory names that exclude every path containing them.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Extra glob patterns, matched against paths relative to the root.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Minimum extracted files for a top-level directory to be listed in `modules`.
    #[serde(default = "default_min_module_files")]
    pub min_module_files: usize,
    #[serde(default)]
    pub on_read_error: ReadErrorPolicy,
}

fn default_exclude_dirs() -> Vec<String> {
    [
        "node_modules",
        "build",
        "dist",
        "out",
        "bin",
        ".git",
        ".svn",
        ".vscode",
        "__pycache__",
        ".idea",
        "obj",
        "vendor",
        "target",
        ".next",
        "venv",
        ".tox",
        "wheels",
        "Debug",
        "Release",
        "deps",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_module_files() -> usize {
    1
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            exclude_dirs: default_exclude_dirs(),
            exclude_patterns: Vec::new(),
            min_module_files: default_min_module_files(),
            on_read_error: ReadErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default)]
    pub qualified_path_trim: QualifiedPathTrim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for the graph artifacts.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Directory for the raw file-tree dump.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            index_dir: default_index_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a `.strata.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            StrataError::Configuration(format!(
                "failed to parse '{}': {e}. Run `strata init` to create a valid config file",
                path.display()
            ))
        })
    }

    /// Load from `.strata.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(
                            path = %config_path.display(),
                            "failed to load config: {e}. Using defaults."
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `strata init`.
    pub fn default_toml() -> String {
        r#"# Strata - cross-file dependency graph configuration

[project]
# Languages to extract: java, kotlin, javascript, go, python, c, cpp.
# Leave empty to use all of them.
languages = []
# Any path containing one of these directory names is skipped.
exclude_dirs = [
  "node_modules", "build", "dist", "out", "bin", ".git", ".svn", ".vscode",
  "__pycache__", ".idea", "obj", "vendor", "target", ".next", "venv", ".tox",
  "wheels", "Debug", "Release", "deps",
]
# Extra globs relative to the scanned root, e.g. ["**/generated/**"]
exclude_patterns = []
# A top-level directory is listed under `modules` once it has this many files.
min_module_files = 1
# "skip" reports unreadable files alongside the results, "abort" fails the run.
on_read_error = "skip"

[resolve]
# "legacy" trims the characters of "package " from qualified paths (compatible
# with existing graph consumers); "exact" removes only the keyword.
qualified_path_trim = "legacy"

[output]
dir = "assets"
index_dir = "index"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.project.languages.is_empty());
        assert!(config.project.exclude_dirs.contains(&"node_modules".to_string()));
        assert_eq!(config.project.exclude_dirs.len(), 20);
        assert_eq!(config.project.min_module_files, 1);
        assert_eq!(config.project.on_read_error, ReadErrorPolicy::Skip);
        assert_eq!(
            config.resolve.qualified_path_trim,
            QualifiedPathTrim::Legacy
        );
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[project]
languages = ["java", "kotlin"]
min_module_files = 10
on_read_error = "abort"

[resolve]
qualified_path_trim = "exact"

[output]
dir = "out/graphs"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project.languages, vec!["java", "kotlin"]);
        assert_eq!(config.project.min_module_files, 10);
        assert_eq!(config.project.on_read_error, ReadErrorPolicy::Abort);
        assert_eq!(config.resolve.qualified_path_trim, QualifiedPathTrim::Exact);
        assert_eq!(config.output.dir, PathBuf::from("out/graphs"));
        // Omitted fields keep their defaults
        assert_eq!(config.output.index_dir, PathBuf::from("index"));
        assert!(!config.project.exclude_dirs.is_empty());
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.project.exclude_dirs, default_exclude_dirs());
        assert_eq!(config.project.on_read_error, ReadErrorPolicy::Skip);
    }

    #[test]
    fn test_invalid_config_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[project]\nmin_module_files = \"many\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_load_or_default_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[project]\nmin_module_files = 3\n",
        )
        .unwrap();
        let nested = dir.path().join("repos/teamA");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.project.min_module_files, 3);
    }
}
