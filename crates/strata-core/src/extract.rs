//! Text helpers shared by the language adapters.
//!
//! Adapters select declaration nodes structurally and then recover
//! names, parameters and bodies from the node's source slice with the
//! helpers below.

use tree_sitter::Node;

/// Extract text from a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Text between the first `{` and the last `}`, trimmed.
pub fn brace_body(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => text[open + 1..close].trim().to_string(),
        _ => String::new(),
    }
}

/// Byte offsets of the balanced `(` ... `)` pair opening at or after `from`.
pub fn paren_span(text: &str, from: usize) -> Option<(usize, usize)> {
    let open = from + text.get(from..)?.find('(')?;
    let mut depth = 0usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, open + offset));
                }
            }
            _ => {}
        }
    }
    None
}

/// Contents of the balanced parenthesis group opening at or after `from`.
pub fn paren_group(text: &str, from: usize) -> Option<&str> {
    let (open, close) = paren_span(text, from)?;
    Some(&text[open + 1..close])
}

/// Split a raw parameter list on commas that are not nested in brackets.
pub fn split_parameters(raw: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0u32;
    let mut prev = ' ';
    let mut current = String::new();

    for ch in raw.chars() {
        match ch {
            '(' | '<' | '[' | '{' => depth += 1,
            // `->` and `=>` are arrows, not closing brackets
            '>' if matches!(prev, '-' | '=') => {}
            ')' | '>' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch == ',' && depth == 0 {
            push_param(&mut params, &current);
            current.clear();
        } else {
            current.push(ch);
        }
        prev = ch;
    }
    push_param(&mut params, &current);
    params
}

fn push_param(params: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        params.push(trimmed.to_string());
    }
}

/// The `function_declarator` under a C or C++ definition, looking
/// through pointer and reference declarators.
pub fn function_declarator(definition: Node<'_>) -> Option<Node<'_>> {
    let mut current = definition.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        current = match current.child_by_field_name("declarator") {
            Some(inner) => inner,
            // reference_declarator has no field name on its inner node
            None => current.named_child(0)?,
        };
    }
}

/// Names of the enclosing type declarations of `node`, outermost first.
pub fn enclosing_type_names(node: Node<'_>, source: &str, kinds: &[&str]) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            if let Some(name) = declared_name(parent, source) {
                names.push(name.to_string());
            }
        }
        current = parent.parent();
    }
    names.reverse();
    names
}

/// The `name` field of a declaration, falling back to its first identifier child.
pub fn declared_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, source));
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "identifier" | "type_identifier" | "simple_identifier"));
    found.map(|n| node_text(n, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_body_outermost() {
        assert_eq!(
            brace_body("void f() { if (x) { y(); } }"),
            "if (x) { y(); }"
        );
        assert_eq!(brace_body("void f();"), "");
    }

    #[test]
    fn test_paren_group_balanced() {
        let text = "int apply(int (*cb)(int), int x) { return cb(x); }";
        assert_eq!(paren_group(text, 0), Some("int (*cb)(int), int x"));
        assert_eq!(paren_group("no parens", 0), None);
    }

    #[test]
    fn test_split_parameters_top_level_only() {
        assert_eq!(
            split_parameters("Map<String, Integer> counts, int limit"),
            vec!["Map<String, Integer> counts", "int limit"]
        );
        assert_eq!(
            split_parameters("cb: (Int) -> Unit, m: Map<K, V>"),
            vec!["cb: (Int) -> Unit", "m: Map<K, V>"]
        );
        assert!(split_parameters("  ").is_empty());
    }
}
