use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword the raw package text of Java and Kotlin files starts with.
const PACKAGE_KEYWORD: &str = "package ";

static PROPERTY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:(?:public|private|protected)\s+)*(?:(?:static|final)\s+)*",
        r"[a-zA-Z_]\w*(?:<.*>)?(?:\[\])?\s+([a-zA-Z_]\w*)",
        r"|(?:val|var)\s+([a-zA-Z_]\w*)",
    ))
    .unwrap()
});

/// How the `package ` keyword is removed from a derived qualified path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualifiedPathTrim {
    /// Strip any of the characters of `"package "` from both ends.
    /// Output-compatible with existing graph consumers, but it also eats
    /// leading/trailing name characters that belong to that set.
    #[default]
    Legacy,
    /// Remove a literal leading `package ` keyword and nothing else.
    Exact,
}

/// Build `"{package}.{name}"` and trim it according to `mode`.
pub fn qualified_path(package: &str, name: &str, mode: QualifiedPathTrim) -> String {
    let package = package.replace(';', "");
    let joined = format!("{}.{name}", package.trim());
    match mode {
        QualifiedPathTrim::Legacy => legacy_trim(&joined).to_string(),
        QualifiedPathTrim::Exact => exact_trim(&joined).to_string(),
    }
}

fn legacy_trim(path: &str) -> &str {
    path.trim_matches(|c: char| PACKAGE_KEYWORD.contains(c))
}

fn exact_trim(path: &str) -> &str {
    path.strip_prefix(PACKAGE_KEYWORD)
        .unwrap_or(path)
        .trim()
}

/// Name declared by a raw field/variable declaration, if one is recognisable.
pub fn property_name(declaration: &str) -> Option<String> {
    let caps = PROPERTY_NAME_RE.captures(declaration)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Derive the qualified export map for a unit with a known package.
///
/// Every class name, function name and recognisable property name is
/// qualified with the package. Keys and values are identical; the map
/// shape is kept for the file-tree dump.
pub fn derive_qualified_exports<'a>(
    package: &str,
    class_names: impl IntoIterator<Item = &'a str>,
    function_names: impl IntoIterator<Item = &'a str>,
    property_declarations: impl IntoIterator<Item = &'a str>,
    mode: QualifiedPathTrim,
) -> BTreeMap<String, String> {
    let property_names: Vec<String> = property_declarations
        .into_iter()
        .filter_map(property_name)
        .collect();

    let mut names: Vec<&str> = class_names.into_iter().chain(function_names).collect();
    names.extend(property_names.iter().map(String::as_str));

    let mut exports = BTreeMap::new();
    for name in names.into_iter().filter(|name| !name.is_empty()) {
        let path = qualified_path(package, name, mode);
        if mode == QualifiedPathTrim::Legacy {
            let exact = qualified_path(package, name, QualifiedPathTrim::Exact);
            if exact != path {
                tracing::debug!(legacy = %path, exact = %exact, "legacy trim altered qualified path");
            }
        }
        exports.insert(path.clone(), path);
    }
    exports
}
