use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{
    brace_body, declared_name, enclosing_type_names, node_text, paren_group, split_parameters,
};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

/// JavaScript has no declared return types.
const RETURN_TYPE: &str = "n/a";

const CAPTURE_QUERY: &str = r#"
(import_statement) @import
(class_declaration) @class
(function_declaration) @function
(arrow_function) @function
(method_definition) @function
(variable_declarator) @variable
(export_statement) @export
"#;

const TYPE_KINDS: &[&str] = &["class_declaration", "class"];

/// JavaScript language adapter using tree-sitter.
pub struct JavaScriptAdapter {
    language: Language,
    query: Query,
}

impl JavaScriptAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let query = Query::new(&language, CAPTURE_QUERY)
            .context("failed to compile JavaScript capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["js", "jsx"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "JavaScript", path, content)
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
        "class" => {
            if let Some(name) = declared_name(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        "function" => {
            let declaration = function_declaration(capture.node, source);
            pass.function_stored(unit.add_function_by_name(declaration));
        }
        "variable" => unit.add_property(capture.text),
        "export" => {
            for name in exported_names(capture.node, source) {
                unit.add_export(name);
            }
        }
        _ => {}
    }
}

fn function_declaration(node: Node<'_>, source: &str) -> Declaration {
    let mut declaration = Declaration::new(function_name(node, source), RETURN_TYPE);

    if let Some(params) = node.child_by_field_name("parameters") {
        let text = node_text(params, source);
        declaration.parameters = paren_group(text, 0).map(split_parameters).unwrap_or_default();
    } else if let Some(param) = node.child_by_field_name("parameter") {
        // `x => x * 2`
        declaration.parameters = vec![node_text(param, source).to_string()];
    }

    if let Some(body) = node.child_by_field_name("body") {
        let text = node_text(body, source);
        declaration.body = if body.kind() == "statement_block" {
            brace_body(text)
        } else {
            text.trim().to_string()
        };
    }
    declaration.owning_class_names = enclosing_type_names(node, source, TYPE_KINDS).join(" ");
    declaration
}

/// Declared name, or the variable or field an arrow function is assigned to.
fn function_name<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(name, source);
    }
    let assigned = node.parent().and_then(|parent| match parent.kind() {
        "variable_declarator" => parent.child_by_field_name("name"),
        "assignment_expression" => parent.child_by_field_name("left"),
        "field_definition" | "pair" => parent
            .child_by_field_name("property")
            .or_else(|| parent.child_by_field_name("key")),
        _ => None,
    });
    assigned
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous")
}

/// Names made visible by one `export` statement.
fn exported_names(node: Node<'_>, source: &str) -> Vec<String> {
    if let Some(declaration) = node.child_by_field_name("declaration") {
        let names = declaration_names(declaration, source);
        if !names.is_empty() {
            return names;
        }
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();

    if children.iter().any(|c| c.kind() == "default") {
        return vec!["default".to_string()];
    }

    if let Some(clause) = children.iter().find(|c| c.kind() == "export_clause") {
        let mut cursor = clause.walk();
        let names: Vec<String> = clause
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "export_specifier")
            .filter_map(|spec| {
                spec.child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"))
            })
            .map(|n| node_text(n, source).to_string())
            .collect();
        if !names.is_empty() {
            return names;
        }
    }

    // `export * from "./mod"` and other re-exports
    vec![node_text(node, source).trim().to_string()]
}

fn declaration_names(declaration: Node<'_>, source: &str) -> Vec<String> {
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            declaration
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "variable_declarator")
                .filter_map(|d| d.child_by_field_name("name"))
                .map(|n| node_text(n, source).to_string())
                .collect()
        }
        _ => declaration
            .child_by_field_name("name")
            .map(|n| vec![node_text(n, source).to_string()])
            .unwrap_or_default(),
    }
}
