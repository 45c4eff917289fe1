use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tree_sitter::{Language, Node, Query};

use strata_core::analyzer::{LanguageAdapter, ParsedFile};
use strata_core::extract::{
    brace_body, declared_name, enclosing_type_names, node_text, paren_group, split_parameters,
};
use strata_core::traverse::{capture_walk, Capture, PassState};
use strata_core::{path_id, Declaration, QualifiedPathTrim, SourceUnit, UnitBuilder};

const DEFAULT_RETURN_TYPE: &str = "Unit";

const CAPTURE_QUERY: &str = r#"
(import) @import
(package_header) @package
(class_declaration) @class
(object_declaration) @object
(annotation) @annotation
(property_declaration) @property
(function_declaration) @function
"#;

/// Declarations whose names own a nested function.
const TYPE_KINDS: &[&str] = &["class_declaration", "object_declaration", "companion_object"];

/// `fun name`, `fun <T> name`, `fun Recv.name` and `fun List<T>.name`.
static FUN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfun\s+(?:<[^>]*>\s*)?(?:[A-Za-z_][\w<>, ?]*\.)*([A-Za-z_]\w*)").unwrap()
});

/// Kotlin language adapter using tree-sitter.
pub struct KotlinAdapter {
    language: Language,
    query: Query,
}

impl KotlinAdapter {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_kotlin_ng::LANGUAGE.into();
        let query = Query::new(&language, CAPTURE_QUERY)
            .context("failed to compile Kotlin capture query")?;
        Ok(Self { language, query })
    }
}

impl LanguageAdapter for KotlinAdapter {
    fn language(&self) -> &'static str {
        "kotlin"
    }

    fn file_extensions(&self) -> &[&str] {
        &["kt"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        ParsedFile::parse(&self.language, "Kotlin", path, content)
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
        "package" => unit.set_package(capture.text),
        "class" => {
            if let Some(name) = declared_name(capture.node, source) {
                unit.add_class_name(name);
            }
            if has_modifier(capture.node, source, "data") {
                pass.saw_data_class = true;
                for field in constructor_properties(capture.node, source) {
                    unit.add_property(field);
                }
            }
        }
        "object" => {
            if let Some(name) = declared_name(capture.node, source) {
                unit.add_class_name(name);
            }
        }
        "annotation" => {
            if let Some(index) = pass.last_function {
                unit.annotate(index, capture.text);
            }
        }
        "property" => {
            if !pass.saw_data_class {
                unit.add_property(capture.text);
            }
        }
        "function" => {
            let declaration = function_declaration(capture.node, source);
            pass.function_stored(unit.add_function(declaration));
        }
        _ => {}
    }
}

fn has_modifier(node: Node<'_>, source: &str, modifier: &str) -> bool {
    let mut cursor = node.walk();
    let modifiers = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
    modifiers.is_some_and(|m| node_text(m, source).split_whitespace().any(|w| w == modifier))
}

/// `val`/`var` parameters of a class header, as `val name: Type`.
fn constructor_properties(class: Node<'_>, source: &str) -> Vec<String> {
    let mut properties = Vec::new();
    let mut stack = vec![class];
    while let Some(node) = stack.pop() {
        if node.kind() == "class_parameter" {
            if let Some(property) = binding_text(node_text(node, source)) {
                properties.push(property);
            }
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "class_body" && c.kind() != "enum_class_body")
            .collect();
        stack.extend(children.into_iter().rev());
    }
    properties
}

/// Text from the `val`/`var` keyword up to any default value.
fn binding_text(parameter: &str) -> Option<String> {
    let start = parameter
        .match_indices("val ")
        .chain(parameter.match_indices("var "))
        .map(|(idx, _)| idx)
        .filter(|&idx| idx == 0 || parameter[..idx].ends_with(char::is_whitespace))
        .min()?;
    let binding = &parameter[start..];
    let binding = binding.split('=').next().unwrap_or(binding);
    Some(binding.trim().to_string())
}

fn function_declaration(node: Node<'_>, source: &str) -> Declaration {
    let text = node_text(node, source);
    let name = FUN_NAME_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| declared_name(node, source))
        .unwrap_or("anonymous");
    let return_type = return_type(node, source).unwrap_or(DEFAULT_RETURN_TYPE);
    let mut declaration = Declaration::new(name, return_type);

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    if let Some(params) = children.iter().find(|c| c.kind() == "function_value_parameters") {
        let params = node_text(*params, source);
        declaration.parameters = paren_group(params, 0).map(split_parameters).unwrap_or_default();
    }

    let body = children.iter().find(|c| c.kind() == "function_body");
    if let Some(body) = body {
        let body = node_text(*body, source).trim();
        declaration.body = match body.strip_prefix('=') {
            Some(expression) => expression.trim().to_string(),
            None => brace_body(body),
        };
    }
    declaration.is_abstract = body.is_none() || has_modifier(node, source, "abstract");
    declaration.owning_class_names = enclosing_type_names(node, source, TYPE_KINDS).join(" ");
    declaration
}

/// The type after `): ` in a function header.
fn return_type<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    let params = children
        .iter()
        .position(|c| c.kind() == "function_value_parameters")?;
    let rest = &children[params + 1..];
    let colon = rest.iter().position(|c| c.kind() == ":")?;
    rest.get(colon + 1)
        .filter(|c| c.is_named() && c.kind() != "function_body")
        .map(|c| node_text(*c, source))
}
