//! Tree Query Engine: predicate search and structural path extraction over [`Node`].
//!
//! All traversals use an explicit work list, so arbitrarily deep trees cannot
//! exhaust the call stack. Order is always depth-first pre-order (source order).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// One step of a [`PathQuery`]: a required child type and an optional
/// substring the child's text must contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_match: Option<String>,
}

impl PathStep {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text_match: None,
        }
    }

    pub fn containing(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text_match: Some(text.to_string()),
        }
    }

    fn matches(&self, node: &Node) -> bool {
        if node.kind != self.kind {
            return false;
        }
        match &self.text_match {
            None => true,
            Some(needle) => node.text().is_some_and(|t| t.contains(needle.as_str())),
        }
    }
}

/// Ordered chain of child-matching steps used to pull a value out of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: Vec<PathStep>,
}

impl PathQuery {
    pub fn new(path: Vec<PathStep>) -> Self {
        Self { path }
    }
}

/// Depth-first pre-order iterator over a subtree, root included.
pub struct Preorder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

pub fn preorder(root: &Node) -> Preorder<'_> {
    Preorder { stack: vec![root] }
}

/// Every node (root included) whose type equals `kind`, in source order.
pub fn find_all<'a>(root: &'a Node, kind: &str) -> Vec<&'a Node> {
    preorder(root).filter(|n| n.kind == kind).collect()
}

/// Every node whose type is any of `kinds`, in source order. Each node is
/// returned at most once even if `kinds` repeats a tag.
pub fn find_all_of<'a, S: AsRef<str>>(root: &'a Node, kinds: &[S]) -> Vec<&'a Node> {
    let wanted: HashSet<&str> = kinds.iter().map(|k| k.as_ref()).collect();
    preorder(root)
        .filter(|n| wanted.contains(n.kind.as_str()))
        .collect()
}

/// Maximum number of depth-increasing steps from `root` to any node.
///
/// Entering a child of a node whose type is in `structural` adds one;
/// entering any other child adds nothing. The root has depth 0.
pub fn max_depth<S: AsRef<str>>(root: &Node, structural: &[S]) -> usize {
    let structural: HashSet<&str> = structural.iter().map(|k| k.as_ref()).collect();
    let mut deepest = 0;
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        let child_depth = if structural.contains(node.kind.as_str()) {
            depth + 1
        } else {
            depth
        };
        stack.extend(node.children.iter().map(|c| (c, child_depth)));
    }
    deepest
}

/// Follow `query` through immediate children only and return the final
/// node's text with quote characters removed.
///
/// Fails with `None` as soon as a step has no matching child; a partial
/// walk never yields a value. An empty query returns `node`'s own text.
pub fn resolve_path(node: &Node, query: &PathQuery) -> Option<String> {
    let mut current = node;
    for step in &query.path {
        current = current.children.iter().find(|c| step.matches(c))?;
    }
    current.text().map(strip_quotes)
}

pub fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| *c != '\'' && *c != '"').collect()
}
