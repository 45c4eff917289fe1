use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{
    brace_body, declared_name, enclosing_type_names, function_declarator, node_text, paren_group,
    split_parameters,
};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

/// Constructors, destructors and anything without a readable type.
const DEFAULT_RETURN_TYPE: &str = "void";

const CAPTURE_QUERY: &str = r#"
(preproc_include) @include
(namespace_definition) @namespace
(struct_specifier) @class
(class_specifier) @class
(function_definition) @function
(declaration) @field
"#;

const TYPE_KINDS: &[&str] = &["class_specifier", "struct_specifier"];

/// C++ language adapter using tree-sitter.
pub struct CppAdapter {
    language: Language,
    query: Query,
}

impl CppAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_cpp::LANGUAGE.into();
        let query =
            Query::new(&language, CAPTURE_QUERY).context("failed to compile C++ capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> &'static str {
        "cpp"
    }

    fn file_extensions(&self) -> &[&str] {
        &["cpp", "cc", "cxx"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "C++", path, content)
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
        // Innermost named namespace wins
        "namespace" => {
            if let Some(name) = capture.node.child_by_field_name("name") {
                unit.set_package(node_text(name, source));
            }
        }
        "class" => {
            if capture.node.child_by_field_name("body").is_some() {
                if let Some(name) = declared_name(capture.node, source) {
                    unit.add_class_name(name);
                }
            }
        }
        "function" => {
            let declaration = function_definition(capture.node, source);
            pass.function_stored(unit.add_function_by_name(declaration));
        }
        "field" => unit.add_property(capture.text),
        _ => {}
    }
}

fn function_definition(node: Node<'_>, source: &str) -> Declaration {
    let declarator = function_declarator(node);
    let qualified = declarator
        .and_then(|d| d.child_by_field_name("declarator"))
        .map(|n| node_text(n, source))
        .unwrap_or("anonymous");
    // `Store::items` is `items` owned by `Store`
    let (scope, name) = match qualified.rsplit_once("::") {
        Some((scope, name)) => (Some(scope), name),
        None => (None, qualified),
    };
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

    let mut owners = enclosing_type_names(node, source, TYPE_KINDS);
    owners.extend(scope.map(str::to_string));
    declaration.owning_class_names = owners.join(" ");
    declaration
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const INVENTORY: &str = r#"
#include <string>
#include "store.hpp"

namespace inventory {

int instances = 0;

class Item {
public:
    Item(std::string name) : name_(name) {}
    virtual ~Item() {}
    std::string label() const {
        return name_;
    }
private:
    std::string name_;
};

struct Point { int x; int y; };

std::vector<Item> Store::items(int limit) {
    std::vector<Item> out;
    return out;
}

}
"#;

    fn extract(content: &str, trim: QualifiedPathTrim) -> SourceUnit {
        let adapter = CppAdapter::new().unwrap();
        let parsed = adapter
            .parse_file(&PathBuf::from("repos/shop/src/inventory.cpp"), content)
            .unwrap();
        adapter.extract(&parsed, trim)
    }

    #[test]
    fn test_namespace_becomes_package() {
        let unit = extract(INVENTORY, QualifiedPathTrim::Exact);
        assert_eq!(unit.package.as_deref(), Some("inventory"));
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(
            unit.class_names.iter().collect::<Vec<_>>(),
            vec!["Item", "Point"]
        );
        assert!(unit.qualified_exports.contains_key("inventory.Item"));
        assert!(unit.qualified_exports.contains_key("inventory.items"));
        assert!(unit.qualified_exports.contains_key("inventory.instances"));
    }

    #[test]
    fn test_members_and_qualified_definitions() {
        let unit = extract(INVENTORY, QualifiedPathTrim::Exact);

        let ctor = unit.functions.iter().find(|f| f.name == "Item").unwrap();
        assert_eq!(ctor.return_type, "void");
        assert_eq!(ctor.parameters, vec!["std::string name"]);
        assert_eq!(ctor.owning_class_names, "Item");

        assert!(unit.functions.iter().any(|f| f.name == "~Item"));

        let label = unit.functions.iter().find(|f| f.name == "label").unwrap();
        assert_eq!(label.return_type, "std::string");
        assert!(label.parameters.is_empty());
        assert_eq!(label.body, "return name_;");

        let items = unit.functions.iter().find(|f| f.name == "items").unwrap();
        assert_eq!(items.return_type, "std::vector<Item>");
        assert_eq!(items.parameters, vec!["int limit"]);
        assert_eq!(items.owning_class_names, "Store");
    }

    #[test]
    fn test_declarations_are_properties() {
        let unit = extract(INVENTORY, QualifiedPathTrim::Exact);
        assert!(unit.property_declarations.contains("int instances = 0;"));
    }

    #[test]
    fn test_return_type_excludes_storage_class() {
        let content = "static unsigned long count() { return 0; }\n";
        let unit = extract(content, QualifiedPathTrim::Exact);
        assert_eq!(unit.functions[0].name, "count");
        assert_eq!(unit.functions[0].return_type, "unsigned long");
        // `virtual ~Item()` has no type
        let unit = extract(INVENTORY, QualifiedPathTrim::Exact);
        let dtor = unit.functions.iter().find(|f| f.name == "~Item").unwrap();
        assert_eq!(dtor.return_type, "void");
    }

    #[test]
    fn test_functions_deduplicated_by_name() {
        let content = "int area(int w) { return w; }\nint area(int w, int h) { return w * h; }\n";
        let unit = extract(content, QualifiedPathTrim::Legacy);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].parameters, vec!["int w"]);
        assert!(unit.package.is_none());
    }
}
