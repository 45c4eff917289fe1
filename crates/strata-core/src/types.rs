use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Component assigned to files outside the `<component>/(app/)?src/` layout.
pub const UNKNOWN_COMPONENT: &str = "Unknown";

static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]+)/(?:app/)?src/").unwrap());

/// A function or method recovered from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub parameters: Vec<String>,
    pub return_type: String,
    pub body: String,
    pub is_abstract: bool,
    /// Enclosing type names, outermost first, space separated.
    #[serde(rename = "class_name")]
    pub owning_class_names: String,
    pub annotations: Vec<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            ..Self::default()
        }
    }

    /// True when both declarations share name, return type and parameters.
    pub fn same_signature(&self, other: &Declaration) -> bool {
        self.name == other.name
            && self.return_type == other.return_type
            && self.parameters == other.parameters
    }
}

/// Normalized extraction result for one source file.
///
/// Field order matches the file-tree dump consumed by the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub file_path: String,
    pub class_names: BTreeSet<String>,
    pub imports: BTreeSet<String>,
    pub exports: BTreeSet<String>,
    #[serde(rename = "package_import_paths")]
    pub qualified_exports: BTreeMap<String, String>,
    pub package: Option<String>,
    pub property_declarations: BTreeSet<String>,
    pub functions: Vec<Declaration>,
}

impl SourceUnit {
    /// True when the unit declares nothing another file could import.
    pub fn is_empty(&self) -> bool {
        self.class_names.is_empty()
            && self.functions.is_empty()
            && self.property_declarations.is_empty()
    }
}

/// `consumer` imports something `provider` declares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    #[serde(rename = "source")]
    pub consumer: String,
    #[serde(rename = "target")]
    pub provider: String,
}

impl DependencyEdge {
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.consumer, self.provider)
    }
}

/// README content found directly inside a top-level directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeEntry {
    pub id: String,
    pub content: String,
}

/// A file that could not be read and was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Stable string id for a path: forward slashes on every platform.
pub fn path_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Owning component of a file, derived from `/<component>/(app/)?src/`.
pub fn component_for_path(path: &str) -> String {
    COMPONENT_RE
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_COMPONENT.to_string())
}

/// Declared package without the `package` keyword or the trailing `;`.
/// Empty when the unit declares none.
pub fn package_name(package: Option<&str>) -> String {
    let Some(package) = package else {
        return String::new();
    };
    let package = package.trim();
    package
        .strip_prefix("package ")
        .unwrap_or(package)
        .trim_end_matches(';')
        .trim()
        .to_string()
}
