use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{brace_body, declared_name, node_text, paren_group, split_parameters};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

/// Return type for constructors and methods whose type cannot be read.
const DEFAULT_RETURN_TYPE: &str = "void";

const CAPTURE_QUERY: &str = r#"
(import_declaration) @import
(package_declaration) @package
(class_declaration) @class
(interface_declaration) @class
(enum_declaration) @class
(record_declaration) @class
(annotation) @annotation
(marker_annotation) @annotation
(field_declaration) @field
(method_declaration) @method
(constructor_declaration) @method
"#;

/// Java language adapter using tree-sitter.
pub struct JavaAdapter {
    language: Language,
    query: Query,
}

impl JavaAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();
        let query =
            Query::new(&language, CAPTURE_QUERY).context("failed to compile Java capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "Java", path, content)
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
        // Raw text, keyword and semicolon included
        "package" => unit.set_package(capture.text),
        "class" => {
            if let Some(name) = declared_name(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        "field" => unit.add_property(capture.text),
        "annotation" => {
            if let Some(index) = pass.last_function {
                unit.annotate(index, capture.text);
            }
        }
        "method" => {
            let mut declaration = method_declaration(capture.node, source);
            declaration.owning_class_names = unit.class_names_joined();
            pass.function_stored(unit.add_function(declaration));
        }
        _ => {}
    }
}

fn method_declaration(node: Node<'_>, source: &str) -> Declaration {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous");
    let return_type = node
        .child_by_field_name("type")
        .map(|t| node_text(t, source))
        .unwrap_or(DEFAULT_RETURN_TYPE);
    let mut declaration = Declaration::new(name, return_type);

    if let Some(params) = node.child_by_field_name("parameters") {
        let text = node_text(params, source);
        declaration.parameters = paren_group(text, 0).map(split_parameters).unwrap_or_default();
    }

    let body = node.child_by_field_name("body");
    if let Some(body) = body {
        declaration.body = brace_body(node_text(body, source));
    }
    declaration.is_abstract = body.is_none() || has_modifier(node, source, "abstract");
    declaration
}

fn has_modifier(node: Node<'_>, source: &str, modifier: &str) -> bool {
    let mut cursor = node.walk();
    let modifiers = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
    modifiers.is_some_and(|m| node_text(m, source).split_whitespace().any(|w| w == modifier))
}
