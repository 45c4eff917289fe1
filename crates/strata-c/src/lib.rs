use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{brace_body, function_declarator, node_text, paren_group, split_parameters};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

/// Implicit `int` of pre-C99 definitions.
const DEFAULT_RETURN_TYPE: &str = "int";

const CAPTURE_QUERY: &str = r#"
(preproc_include) @include
(function_definition) @function
(declaration) @variable
(struct_specifier) @struct
"#;

/// C language adapter using tree-sitter.
pub struct CAdapter {
    language: Language,
    query: Query,
}

impl CAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_c::LANGUAGE.into();
        let query = Query::new(&language, CAPTURE_QUERY).context("failed to compile C capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for CAdapter {
    fn language(&self) -> &'static str {
        "c"
    }

    fn file_extensions(&self) -> &[&str] {
        &["c"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "C", path, content)
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
        "include" => unit.add_import(capture.text),
        "function" => {
            let declaration = function_definition(capture.node, source);
            pass.function_stored(unit.add_function_by_name(declaration));
        }
        // Globals only; once a function is seen every declaration is a local
        "variable" => {
            if !unit.has_functions() {
                unit.add_property(capture.text);
            }
        }
        "struct" => {
            if let Some(name) = struct_name(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        _ => {}
    }
}

fn function_definition(node: Node<'_>, source: &str) -> Declaration {
    let declarator = function_declarator(node);
    let name = declarator
        .and_then(|d| d.child_by_field_name("declarator"))
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous");
    let return_type = node
        .child_by_field_name("type")
        .map(|t| node_text(t, source))
        .unwrap_or(DEFAULT_RETURN_TYPE);
    let mut declaration = Declaration::new(name, return_type);

    if let Some(params) = declarator.and_then(|d| d.child_by_field_name("parameters")) {
        let text = node_text(params, source);
        declaration.parameters = paren_group(text, 0).map(split_parameters).unwrap_or_default();
    }
    if let Some(body) = node.child_by_field_name("body") {
        declaration.body = brace_body(node_text(body, source));
    }
    declaration
}

/// Name of a struct definition; `struct node *next` references are skipped.
fn struct_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name("body")?;
    node.child_by_field_name("name").map(|n| node_text(n, source))
}
