use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{brace_body, node_text, paren_group, split_parameters};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

/// Go declarations carry no inferred return type.
const RETURN_TYPE: &str = "undefined";

const CAPTURE_QUERY: &str = r#"
(import_declaration) @import
(package_clause) @package
(function_declaration) @function
(method_declaration) @method
(type_declaration) @type
(var_declaration) @var
"#;

/// Go language adapter using tree-sitter.
pub struct GoAdapter {
    language: Language,
    query: Query,
}

impl GoAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let query = Query::new(&language, CAPTURE_QUERY).context("failed to compile Go capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "Go", path, content)
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
        "package" => {
            if let Some(name) = package_name(capture.node, source) {
                unit.set_package(name);
            }
        }
        "function" | "method" => {
            let declaration = function_declaration(capture.node, source);
            pass.function_stored(unit.add_function_by_name(declaration));
        }
        "type" => {
            for name in struct_names(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        "var" => unit.add_property(capture.text),
        _ => {}
    }
}

fn package_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "package_identifier");
    found.map(|n| node_text(n, source))
}

/// Build a declaration from a `function_declaration` or `method_declaration`.
fn function_declaration(node: Node<'_>, source: &str) -> Declaration {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous");
    let mut declaration = Declaration::new(name, RETURN_TYPE);

    if let Some(params) = node.child_by_field_name("parameters") {
        let text = node_text(params, source);
        declaration.parameters = paren_group(text, 0).map(split_parameters).unwrap_or_default();
    }
    if let Some(body) = node.child_by_field_name("body") {
        declaration.body = brace_body(node_text(body, source));
    }
    if let Some(receiver) = node.child_by_field_name("receiver") {
        declaration.owning_class_names = receiver_type(receiver, source).unwrap_or_default();
    }
    declaration
}

/// `User` for receivers like `(u *User)` or `(s Stack[T])`.
fn receiver_type(receiver: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = node_text(param.child_by_field_name("type")?, source);
    let ty = ty.trim_start_matches('*').trim();
    let ty = ty.split('[').next().unwrap_or(ty);
    (!ty.is_empty()).then(|| ty.to_string())
}

/// Names of the struct types declared by a `type_declaration`.
fn struct_names<'a>(node: Node<'_>, source: &'a str) -> Vec<&'a str> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|spec| spec.kind() == "type_spec")
        .filter(|spec| {
            spec.child_by_field_name("type")
                .is_some_and(|ty| ty.kind() == "struct_type")
        })
        .filter_map(|spec| spec.child_by_field_name("name"))
        .map(|name| node_text(name, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extract(path: &str, content: &str, trim: QualifiedPathTrim) -> SourceUnit {
        let adapter = GoAdapter::new().unwrap();
        let parsed = adapter.parse_file(&PathBuf::from(path), content).unwrap();
        adapter.extract(&parsed, trim)
    }

    #[test]
    fn test_extract_simple_go_file() {
        let content = r#"
package user

import (
    "fmt"
    "github.com/example/app/internal/store"
)

type User struct {
    ID   string
    Name string
}

type Finder interface {
    Find(id string) (*User, error)
}

var timeout = 30

func NewUser(id string, name string) *User {
    fmt.Println("creating", id)
    return &User{ID: id, Name: name}
}
"#;
        let unit = extract("svc/src/user/user.go", content, QualifiedPathTrim::Exact);

        assert_eq!(unit.file_path, "svc/src/user/user.go");
        assert_eq!(unit.package.as_deref(), Some("user"));
        assert_eq!(unit.imports.len(), 1);
        assert!(unit
            .imports
            .iter()
            .next()
            .unwrap()
            .contains("github.com/example/app/internal/store"));
        assert_eq!(unit.class_names.iter().collect::<Vec<_>>(), vec!["User"]);
        assert!(unit.property_declarations.contains("var timeout = 30"));

        assert_eq!(unit.functions.len(), 1);
        let func = &unit.functions[0];
        assert_eq!(func.name, "NewUser");
        assert_eq!(func.parameters, vec!["id string", "name string"]);
        assert_eq!(func.return_type, "undefined");
        assert!(func.body.starts_with("fmt.Println"));
        assert!(!func.is_abstract);

        assert!(unit.qualified_exports.contains_key("user.User"));
        assert!(unit.qualified_exports.contains_key("user.NewUser"));
        assert!(unit.qualified_exports.contains_key("user.timeout"));
    }

    #[test]
    fn test_method_receiver_becomes_owning_class() {
        let content = r#"
package store

type Repo struct{}

func (r *Repo) Save(key string, value []byte) error {
    return nil
}
"#;
        let unit = extract("svc/src/store/repo.go", content, QualifiedPathTrim::Exact);
        let save = unit.functions.iter().find(|f| f.name == "Save").unwrap();
        assert_eq!(save.owning_class_names, "Repo");
        assert_eq!(save.parameters, vec!["key string", "value []byte"]);
        assert_eq!(save.body, "return nil");
    }

    #[test]
    fn test_functions_deduplicated_by_name() {
        let content = r#"
package shapes

type Circle struct{}
type Square struct{}

func (c Circle) Area() float64 { return 1 }
func (s Square) Area() float64 { return 2 }
"#;
        let unit = extract("geo/src/shapes.go", content, QualifiedPathTrim::Legacy);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].owning_class_names, "Circle");
        assert_eq!(unit.class_names.len(), 2);
    }

    #[test]
    fn test_grouped_type_declaration() {
        let content = r#"
package model

type (
    Order struct{ ID int }
    Status int
    Line  struct{ Qty int }
)
"#;
        let unit = extract("shop/src/model.go", content, QualifiedPathTrim::Exact);
        assert_eq!(
            unit.class_names.iter().collect::<Vec<_>>(),
            vec!["Line", "Order"]
        );
    }

    #[test]
    fn test_legacy_trim_applies_to_go_package() {
        // "page" loses every character: only the dot and name survive trimming.
        let content = "package page\n\nfunc Render() {}\n";
        let unit = extract("web/src/page.go", content, QualifiedPathTrim::Legacy);
        assert!(unit.qualified_exports.contains_key(".Render"));
        let unit = extract("web/src/page.go", content, QualifiedPathTrim::Exact);
        assert!(unit.qualified_exports.contains_key("page.Render"));
    }

    #[test]
    fn test_unit_serializes_dump_shape() {
        let unit = extract(
            "svc/src/main.go",
            "package main\n\nfunc main() {}\n",
            QualifiedPathTrim::Legacy,
        );
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["package"], "main");
        assert_eq!(json["functions"][0]["name"], "main");
        assert_eq!(json["functions"][0]["class_name"], "");
    }
}
