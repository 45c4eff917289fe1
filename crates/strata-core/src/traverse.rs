//! Capture-driven traversal shared by every adapter.
//!
//! Each visited node gets one capture pass of the adapter's query over
//! its subtree. If the node itself was captured the walk stops there;
//! otherwise its children are visited in document order. Captures are
//! fed to the adapter's callback together with the file's
//! [`UnitBuilder`] and a fresh [`PassState`] for the pass.

use std::cmp::Reverse;
use std::ops::ControlFlow;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use crate::analyzer::ParsedFile;
use crate::unit::UnitBuilder;

/// One captured node with its trimmed source text.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    /// Capture name from the query (`@import` -> "import").
    pub name: &'a str,
    pub node: Node<'a>,
    pub text: &'a str,
}

/// State local to one capture pass.
#[derive(Debug, Default)]
pub struct PassState {
    /// Index of the function most recently stored in this pass.
    pub last_function: Option<usize>,
    /// Set by adapters that need to remember a data class in the pass.
    pub saw_data_class: bool,
}

impl PassState {
    /// Record the outcome of storing a function; `None` means the
    /// declaration was a duplicate and later annotations are dropped.
    pub fn function_stored(&mut self, index: Option<usize>) {
        self.last_function = index;
    }
}

/// Walk `parsed` with `query`, calling `visit` for every capture.
///
/// Every uncaptured node gets its own pass, so a capture is reported
/// once per uncaptured ancestor and the walk runs in O(depth x nodes).
/// Adapters rely on builder dedup to absorb the repeats.
pub fn capture_walk<F>(query: &Query, parsed: &ParsedFile, builder: &mut UnitBuilder, mut visit: F)
where
    F: FnMut(&Capture<'_>, &mut PassState, &mut UnitBuilder),
{
    let source = parsed.content.as_str();
    let mut stack = vec![parsed.tree.root_node()];

    while let Some(node) = stack.pop() {
        if capture_pass(query, node, source, builder, &mut visit).is_break() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn capture_pass<F>(
    query: &Query,
    node: Node<'_>,
    source: &str,
    builder: &mut UnitBuilder,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&Capture<'_>, &mut PassState, &mut UnitBuilder),
{
    let captures = collect_captures(query, node, source);
    let matched_self = captures.iter().any(|c| c.node.id() == node.id());

    let mut pass = PassState::default();
    for capture in &captures {
        visit(capture, &mut pass, builder);
    }

    if matched_self {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

/// All captures of `query` within `node`, outer nodes before the nodes
/// they contain when both start at the same byte.
pub fn collect_captures<'a>(query: &'a Query, node: Node<'a>, source: &'a str) -> Vec<Capture<'a>> {
    let names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut captures = cursor.captures(query, node, source.as_bytes());

    let mut out = Vec::new();
    while let Some((m, idx)) = captures.next() {
        let capture = m.captures[*idx];
        out.push(Capture {
            name: names[capture.index as usize],
            node: capture.node,
            text: source[capture.node.byte_range()].trim(),
        });
    }

    out.sort_by_key(|c| (c.node.start_byte(), Reverse(c.node.end_byte())));
    out.dedup_by(|a, b| a.node.id() == b.node.id() && a.name == b.name);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualify::QualifiedPathTrim;
    use crate::types::Declaration;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const SOURCE: &str = r#"package main

// leading
func outer() {
	// inside outer
	f := func() {}
	_ = f
}

func other() {}
"#;

    fn parse(content: &str) -> ParsedFile {
        ParsedFile::parse(
            &tree_sitter_go::LANGUAGE.into(),
            "Go",
            &PathBuf::from("repos/svc/src/main.go"),
            content,
        )
        .unwrap()
    }

    fn query(source: &str) -> Query {
        Query::new(&tree_sitter_go::LANGUAGE.into(), source).unwrap()
    }

    /// Functions by name with comments attached as annotations.
    fn annotate_walk(parsed: &ParsedFile) -> Vec<Declaration> {
        let query = query("(comment) @annotation (function_declaration) @function");
        let mut builder = UnitBuilder::new();
        capture_walk(&query, parsed, &mut builder, |capture, pass, unit| {
            match capture.name {
                "function" => {
                    let name = capture
                        .node
                        .child_by_field_name("name")
                        .map(|n| &parsed.content[n.byte_range()])
                        .unwrap_or("anonymous");
                    pass.function_stored(
                        unit.add_function_by_name(Declaration::new(name, "undefined")),
                    );
                }
                "annotation" => {
                    if let Some(index) = pass.last_function {
                        unit.annotate(index, capture.text);
                    }
                }
                _ => {}
            }
        });
        builder.finish("main.go", QualifiedPathTrim::Exact).functions
    }

    #[test]
    fn test_captured_node_is_not_descended() {
        let parsed = parse(SOURCE);
        let query = query("(function_declaration) @function (func_literal) @literal");
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut builder = UnitBuilder::new();
        capture_walk(&query, &parsed, &mut builder, |capture, _, _| {
            *seen.entry(capture.name.to_string()).or_default() += 1;
        });

        // Root pass plus one pass per declaration. The literal is only seen
        // from passes over its ancestors.
        assert_eq!(seen["function"], 4);
        assert_eq!(seen["literal"], 2);
    }

    #[test]
    fn test_annotation_before_any_function_is_dropped() {
        let functions = annotate_walk(&parse(SOURCE));
        assert_eq!(functions.len(), 2);
        assert!(functions
            .iter()
            .all(|f| !f.annotations.iter().any(|a| a == "// leading")));
    }

    #[test]
    fn test_repeated_passes_attach_annotations_once() {
        let functions = annotate_walk(&parse(SOURCE));
        let outer = functions.iter().find(|f| f.name == "outer").unwrap();
        assert_eq!(outer.annotations, vec!["// inside outer"]);
        let other = functions.iter().find(|f| f.name == "other").unwrap();
        assert!(other.annotations.is_empty());
    }

    #[test]
    fn test_collect_captures_orders_outer_first() {
        let parsed = parse(SOURCE);
        let query = query("(func_literal) @literal (function_declaration) @function");
        let captures = collect_captures(&query, parsed.tree.root_node(), &parsed.content);
        let names: Vec<&str> = captures.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["function", "literal", "function"]);
        assert!(captures[0].text.starts_with("func outer()"));
    }
}
