//! Built-in tree-sitter parsers and the helpers they share.

pub mod go;
pub mod java;
pub mod python;
pub mod rust;
pub mod typescript;

use crate::registry::LanguageParser;
use crate::symbols::SourceLocation;
use std::sync::Arc;
use tree_sitter::{Node, Parser, Tree};

/// Every parser compiled into this crate.
pub fn builtin_parsers() -> Vec<Arc<dyn LanguageParser>> {
    vec![
        Arc::new(typescript::TypeScriptParser::typescript()),
        Arc::new(typescript::TypeScriptParser::javascript()),
        Arc::new(python::PythonParser),
        Arc::new(go::GoParser),
        Arc::new(rust::RustParser),
        Arc::new(java::JavaParser),
    ]
}

/// Parse `content` with `grammar`. `None` only if the grammar cannot be
/// loaded or tree-sitter gives up; syntax errors still produce a tree.
pub(crate) fn parse_tree(
    grammar: tree_sitter::Language,
    content: &str,
    file_path: &str,
) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar) {
        tracing::warn!("Failed to load grammar for {}: {}", file_path, e);
        return None;
    }

    let tree = parser.parse(content, None);
    if tree.is_none() {
        tracing::debug!("tree-sitter returned no tree for {}", file_path);
    }
    tree
}

pub(crate) fn text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub(crate) fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| text(n, source))
}

pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    children
}

pub(crate) fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// True if `node` has an anonymous child token with the given text,
/// e.g. the `type` in `import type { A } from "./a"`.
pub(crate) fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    found
}

pub(crate) fn location(node: Node, file: &str) -> SourceLocation {
    let start = node.start_position();
    let end = node.end_position();
    SourceLocation {
        file: file.to_string(),
        line: start.row + 1,
        column: start.column + 1,
        end_line: Some(end.row + 1),
        end_column: Some(end.column + 1),
    }
}

/// First line of the declaration, truncated to 200 characters.
pub(crate) fn signature(node: Node, source: &str) -> Option<String> {
    let first_line = text(node, source).lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }

    let sig = if first_line.chars().count() > 200 {
        let truncated: String = first_line.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        first_line.to_string()
    };

    Some(sig)
}

/// Comments directly above `node` (no blank line in between), oldest first.
///
/// `skip` names sibling kinds that may sit between the comment and the
/// declaration (attributes, decorators). `accept` filters comment text, so a
/// language can insist on `///` or `/**` doc markers.
pub(crate) fn doc_comment(
    node: Node,
    source: &str,
    skip: &[&str],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    let mut comments = Vec::new();
    let mut anchor_row = node.start_position().row;
    let mut prev = node.prev_sibling();

    while let Some(sibling) = prev {
        if skip.contains(&sibling.kind()) {
            anchor_row = sibling.start_position().row;
            prev = sibling.prev_sibling();
            continue;
        }
        if !sibling.kind().contains("comment") {
            break;
        }
        if sibling.end_position().row + 1 < anchor_row {
            break;
        }

        let raw = text(sibling, source);
        if !accept(raw) {
            break;
        }
        comments.push(clean_comment(raw));
        anchor_row = sibling.start_position().row;
        prev = sibling.prev_sibling();
    }

    if comments.is_empty() {
        return None;
    }
    comments.reverse();
    let doc = comments.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

/// Strip comment markers (`/** */`, `///`, `//!`, `//`, `#`, leading `*`).
pub(crate) fn clean_comment(raw: &str) -> String {
    let raw = raw.trim();
    let body = if let Some(inner) = raw.strip_prefix("/*") {
        let inner = inner.strip_suffix("*/").unwrap_or(inner);
        let inner = inner.strip_prefix('*').unwrap_or(inner);
        let inner = inner.strip_prefix('!').unwrap_or(inner);
        inner
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix("* ")
                    .or_else(|| line.strip_prefix('*'))
                    .unwrap_or(line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        raw.lines()
            .map(|line| {
                let line = line.trim();
                let line = line
                    .strip_prefix("///")
                    .or_else(|| line.strip_prefix("//!"))
                    .or_else(|| line.strip_prefix("//"))
                    .or_else(|| line.strip_prefix('#'))
                    .unwrap_or(line);
                line.strip_prefix(' ').unwrap_or(line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    body.trim().to_string()
}

/// Remove surrounding quotes from a string literal.
pub(crate) fn unquote(literal: &str) -> String {
    literal
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// Text of a type annotation without its leading `:` or `->`.
pub(crate) fn annotation(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_prefix(':').unwrap_or(raw);
    let raw = raw.strip_prefix("->").unwrap_or(raw);
    raw.trim().to_string()
}
