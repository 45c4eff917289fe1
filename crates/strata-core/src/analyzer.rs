use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Tree};

use crate::qualify::QualifiedPathTrim;
use crate::types::SourceUnit;

/// A parsed source file with its tree-sitter AST and original content.
pub struct ParsedFile {
    pub path: PathBuf,
    pub tree: Tree,
    pub content: String,
}

impl ParsedFile {
    /// Parse `content` with `language`. A missing tree or a root that is
    /// itself an error node counts as unparseable.
    pub fn parse(language: &Language, label: &str, path: &Path, content: &str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .with_context(|| format!("failed to set {label} language"))?;
        let tree = parser
            .parse(content, None)
            .with_context(|| format!("failed to parse {label} file"))?;
        if tree.root_node().is_error() {
            anyhow::bail!("{label} parser produced no usable tree");
        }
        Ok(Self {
            path: path.to_path_buf(),
            tree,
            content: content.to_string(),
        })
    }
}

/// Trait that each language adapter must implement.
pub trait LanguageAdapter: Send + Sync {
    /// Language name (e.g., "java", "go")
    fn language(&self) -> &'static str;

    /// File extensions this adapter handles, without the dot (e.g., &["go"])
    fn file_extensions(&self) -> &[&str];

    /// Parse a source file into a ParsedFile.
    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile>;

    /// Walk a parsed file and produce its normalized record.
    fn extract(&self, parsed: &ParsedFile, trim: QualifiedPathTrim) -> SourceUnit;

    /// Whether this adapter handles the file at `path`.
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.file_extensions().contains(&ext))
    }
}
