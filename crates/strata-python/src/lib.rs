use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{
    declared_name, enclosing_type_names, node_text, paren_group, split_parameters,
};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

const RETURN_TYPE: &str = "None";

const CAPTURE_QUERY: &str = r#"
(import_from_statement) @import_from
(import_statement) @import
(class_definition) @class
(function_definition) @function
(assignment) @variable
"#;

/// Body lines after the header colon, up to the first blank line.
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms):\s*\n(.*?)(?:^\s*$|\z)").unwrap());

/// Python language adapter using tree-sitter.
pub struct PythonAdapter {
    language: Language,
    query: Query,
}

impl PythonAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let query = Query::new(&language, CAPTURE_QUERY)
            .context("failed to compile Python capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "Python", path, content)
    }

    fn extract(&self, parsed: &ParsedFile, trim: QualifiedPathTrim) -> SourceUnit {
        let source = parsed.content.as_str();
        let mut builder = UnitBuilder::new();
        capture_walk(&self.query, parsed, &mut builder, |capture, pass, unit| {
            visit(capture, source, pass, unit)
        });
        builder.finish(path_id(&parsed.path), trim)
    }
}

fn visit(capture: &Capture<'_>, source: &str, pass: &mut PassState, unit: &mut UnitBuilder) {
    match capture.name {
        "import" => unit.add_import(capture.text),
        "import_from" => unit.add_import(normalize_from_import(capture.node, source)),
        "class" => {
            if let Some(name) = declared_name(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        "function" => {
            let declaration = function_definition(capture.node, source);
            pass.function_stored(unit.add_function_by_name(declaration));
        }
        // Module-level state only: anything after the first class or def is local
        "variable" => {
            if !unit.has_functions() && !unit.has_class_names() {
                unit.add_property(capture.text);
            }
        }
        _ => {}
    }
}

/// `from pkg.mod import a, b as c`, however the statement is wrapped.
fn normalize_from_import(node: Node<'_>, source: &str) -> String {
    let module = node
        .child_by_field_name("module_name")
        .map(|n| node_text(n, source))
        .unwrap_or_default();

    let mut cursor = node.walk();
    let mut names: Vec<&str> = node
        .children_by_field_name("name", &mut cursor)
        .map(|n| node_text(n, source))
        .collect();
    if names.is_empty() {
        let mut cursor = node.walk();
        if node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            names.push("*");
        }
    }
    format!("from {module} import {}", names.join(", "))
}

fn function_definition(node: Node<'_>, source: &str) -> Declaration {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous");
    let mut declaration = Declaration::new(name, RETURN_TYPE);

    if let Some(params) = node.child_by_field_name("parameters") {
        let text = node_text(params, source);
        declaration.parameters = paren_group(text, 0).map(split_parameters).unwrap_or_default();
    }
    declaration.body = BODY_RE
        .captures(node_text(node, source))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    declaration.owning_class_names =
        enclosing_type_names(node, source, &["class_definition"]).join(" ");
    declaration.annotations = decorators(node, source);
    declaration
}

/// Decorators of a function wrapped in a `decorated_definition`.
fn decorators(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(parent) = node.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };
    let mut cursor = parent.walk();
    let decorators: Vec<String> = parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|d| node_text(d, source).trim().to_string())
        .collect();
    decorators
}
