//! Parsing source text with a loaded grammar and reporting on the result.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;
use tree_sitter::{Node, Tree, TreeCursor};

use crate::loader::LanguageHandle;

/// Node text longer than this is truncated in tree dumps.
const SNIPPET_CHARS: usize = 50;

/// Errors raised while parsing with a loaded grammar.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The runtime refused the grammar when building a parser.
    #[error("cannot build a parser for '{grammar}': {source}")]
    Parser {
        /// Grammar name.
        grammar: String,
        /// Runtime error.
        source: tree_sitter::LanguageError,
    },

    /// The parser gave up without producing a tree.
    #[error("parsing with '{0}' produced no tree")]
    NoTree(String),
}

/// Parse `source` with the grammar behind `handle`.
///
/// # Errors
///
/// Returns [`InspectError`] if no parser can be built or parsing is abandoned.
pub fn parse(handle: &LanguageHandle, source: &[u8]) -> Result<Tree, InspectError> {
    let mut parser = handle.parser().map_err(|source| InspectError::Parser {
        grammar: handle.name().to_owned(),
        source,
    })?;
    parser
        .parse(source, None)
        .ok_or_else(|| InspectError::NoTree(handle.name().to_owned()))
}

/// Headline facts about a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Kind of the root node.
    pub root_kind: String,
    /// Number of direct children of the root.
    pub child_count: usize,
    /// Whether the tree contains syntax errors.
    pub has_error: bool,
    /// How often each named node kind occurs in the whole tree.
    pub kind_counts: BTreeMap<String, usize>,
}

/// Summarize `tree`.
#[must_use]
pub fn summarize(tree: &Tree) -> Summary {
    let root = tree.root_node();
    let mut kind_counts = BTreeMap::new();
    let mut cursor = tree.walk();
    walk(&mut cursor, &mut |node, _depth| {
        if node.is_named() {
            *kind_counts.entry(node.kind().to_owned()).or_insert(0) += 1;
        }
    });

    Summary {
        root_kind: root.kind().to_owned(),
        child_count: root.child_count(),
        has_error: root.has_error(),
        kind_counts,
    }
}

/// Render `tree` as one `kind: "text"` line per node, indented two spaces per level.
///
/// Nodes deeper than `max_depth` (the root is depth 0) are omitted.
#[must_use]
pub fn render_tree(tree: &Tree, source: &[u8], max_depth: usize) -> String {
    let mut out = String::new();
    let mut cursor = tree.walk();
    walk(&mut cursor, &mut |node, depth| {
        if depth < max_depth {
            let _ = writeln!(
                out,
                "{:indent$}{}: {:?}",
                "",
                node.kind(),
                snippet(node, source),
                indent = depth * 2
            );
        }
    });
    out
}

/// Every node of kind `kind` in `tree`, in document order.
#[must_use]
pub fn nodes_of_kind<'t>(tree: &'t Tree, kind: &str) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut cursor = tree.walk();
    walk(&mut cursor, &mut |node, _depth| {
        if node.kind() == kind {
            found.push(node);
        }
    });
    found
}

/// The source text of `node`, cut to a display-friendly length.
///
/// Bytes that are not valid UTF-8 are replaced rather than dropped.
#[must_use]
pub fn snippet(node: Node<'_>, source: &[u8]) -> String {
    let bytes = source.get(node.byte_range()).unwrap_or_default();
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > SNIPPET_CHARS {
        let cut: String = text.chars().take(SNIPPET_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        text.into_owned()
    }
}

/// Pre-order traversal of every node under the cursor, with its depth.
fn walk<'t>(cursor: &mut TreeCursor<'t>, visit: &mut impl FnMut(Node<'t>, usize)) {
    let mut depth = 0;
    loop {
        visit(cursor.node(), depth);
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if depth == 0 || !cursor.goto_parent() {
                return;
            }
            depth -= 1;
        }
    }
}
