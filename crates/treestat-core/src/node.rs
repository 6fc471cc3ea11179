use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TreeReadError;

/// Row/column pair as emitted by the tree producer (both zero-based).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

/// One element of a serialized syntax tree.
///
/// Children are owned, in source order. The serialized form has no
/// back-references, so a deserialized `Node` is always a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub start_position: Option<Position>,
    #[serde(default)]
    pub end_position: Option<Position>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: None,
            start_position: None,
            end_position: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_span(mut self, start_row: usize, end_row: usize) -> Self {
        self.start_position = Some(Position {
            row: start_row,
            column: 0,
        });
        self.end_position = Some(Position {
            row: end_row,
            column: 0,
        });
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Lines spanned by this node, inclusive of both ends. Zero when the
    /// span is unknown.
    pub fn line_count(&self) -> usize {
        match (self.start_position, self.end_position) {
            (Some(start), Some(end)) => end.row.saturating_sub(start.row) + 1,
            _ => 0,
        }
    }
}

// Iterative: dropping a deep tree must not grow the call stack.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Deepest node nesting `parse_tree` accepts when no limit is configured.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 10_000;

/// Parse a serialized tree and check the invariants the query engine relies on.
///
/// Trees nested more than `max_depth` nodes below the root are rejected as
/// malformed before deserialization starts.
pub fn parse_tree(path: &Path, content: &str, max_depth: usize) -> Result<Node, TreeReadError> {
    // Each node level is an object plus its `children` array; positions add one more.
    let json_limit = max_depth.saturating_mul(2).saturating_add(2);
    if exceeds_nesting(content, json_limit) {
        return Err(TreeReadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("tree nests deeper than {max_depth} levels"),
        });
    }

    let mut de = serde_json::Deserializer::from_str(content);
    // Nesting is already bounded above; serde_json's own limit is far lower.
    de.disable_recursion_limit();
    let root = Node::deserialize(&mut de).map_err(|source| TreeReadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    de.end().map_err(|source| TreeReadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&root).map_err(|reason| TreeReadError::Malformed {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(root)
}

/// Whether `{`/`[` nesting in `content` goes past `limit`. Brackets inside
/// string literals are ignored.
fn exceeds_nesting(content: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for b in content.bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn validate(root: &Node) -> Result<(), String> {
    if root.start_position.is_none() || root.end_position.is_none() {
        return Err("root node has no startPosition/endPosition".to_string());
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let (Some(start), Some(end)) = (node.start_position, node.end_position) {
            if end < start {
                return Err(format!(
                    "'{}' node ends ({}:{}) before it starts ({}:{})",
                    node.kind, end.row, end.column, start.row, start.column
                ));
            }
        }
        stack.extend(node.children.iter());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "program",
        "text": "import x from './x';",
        "startPosition": {"row": 0, "column": 0},
        "endPosition": {"row": 9, "column": 0},
        "children": [
            {
                "type": "import_statement",
                "text": "import x from './x';",
                "startPosition": {"row": 0, "column": 0},
                "endPosition": {"row": 0, "column": 20},
                "children": [
                    {"type": "string", "text": "'./x'",
                     "startPosition": {"row": 0, "column": 14},
                     "endPosition": {"row": 0, "column": 19}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_tree_reads_producer_format() {
        let root = parse_tree(Path::new("a.js.json"), SAMPLE, DEFAULT_MAX_TREE_DEPTH).unwrap();
        assert_eq!(root.kind, "program");
        assert_eq!(root.line_count(), 10);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children[0].text(), Some("'./x'"));
        assert!(root.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_missing_text_is_none() {
        let json = r#"{"type": "program",
            "startPosition": {"row": 0, "column": 0},
            "endPosition": {"row": 0, "column": 0}}"#;
        let root = parse_tree(Path::new("a.json"), json, DEFAULT_MAX_TREE_DEPTH).unwrap();
        assert_eq!(root.text(), None);
    }

    #[test]
    fn test_root_without_positions_is_malformed() {
        let json = r#"{"type": "program", "children": []}"#;
        let err = parse_tree(Path::new("a.json"), json, DEFAULT_MAX_TREE_DEPTH).unwrap_err();
        assert!(matches!(err, TreeReadError::Malformed { .. }));
    }

    #[test]
    fn test_inverted_span_is_malformed() {
        let json = r#"{"type": "program",
            "startPosition": {"row": 0, "column": 0},
            "endPosition": {"row": 3, "column": 0},
            "children": [{"type": "x",
                "startPosition": {"row": 2, "column": 4},
                "endPosition": {"row": 1, "column": 0}}]}"#;
        let err = parse_tree(Path::new("a.json"), json, DEFAULT_MAX_TREE_DEPTH).unwrap_err();
        assert!(err.to_string().contains("'x' node ends"));
    }

    #[test]
    fn test_invalid_json_is_tree_read_error() {
        let err = parse_tree(Path::new("a.json"), "{not json", DEFAULT_MAX_TREE_DEPTH).unwrap_err();
        assert!(matches!(err, TreeReadError::Json { .. }));

        let err = parse_tree(Path::new("a.json"), "null", DEFAULT_MAX_TREE_DEPTH).unwrap_err();
        assert!(matches!(err, TreeReadError::Json { .. }));
    }

    #[test]
    fn test_deep_tree_parses_past_default_limit() {
        let depth = 200;
        let mut json = String::new();
        for _ in 0..depth {
            json.push_str(r#"{"type":"n","children":["#);
        }
        json.push_str(r#"{"type":"leaf"}"#);
        for _ in 0..depth {
            json.push_str("]}");
        }
        let wrapped = format!(
            r#"{{"type":"program","startPosition":{{"row":0,"column":0}},"endPosition":{{"row":0,"column":1}},"children":[{json}]}}"#
        );
        let root = parse_tree(Path::new("deep.json"), &wrapped, DEFAULT_MAX_TREE_DEPTH).unwrap();
        assert_eq!(root.children.len(), 1);
    }

    fn nested(depth: usize) -> String {
        let mut json = String::new();
        for _ in 0..depth {
            json.push_str(r#"{"type":"n","children":["#);
        }
        json.push_str(r#"{"type":"leaf","startPosition":{"row":0,"column":0},"endPosition":{"row":0,"column":1}}"#);
        for _ in 0..depth {
            json.push_str("]}");
        }
        format!(
            r#"{{"type":"program","startPosition":{{"row":0,"column":0}},"endPosition":{{"row":0,"column":1}},"children":[{json}]}}"#
        )
    }

    #[test]
    fn test_depth_limit_is_inclusive() {
        // program + 9 wrappers puts the leaf 10 levels below the root.
        assert!(parse_tree(Path::new("d.json"), &nested(9), 10).is_ok());
        let err = parse_tree(Path::new("d.json"), &nested(10), 10).unwrap_err();
        match err {
            TreeReadError::Malformed { reason, .. } => {
                assert!(reason.contains("deeper than 10 levels"))
            }
            other => panic!("expected malformed tree, got {other:?}"),
        }
    }

    #[test]
    fn test_brackets_inside_strings_do_not_count() {
        let json = r#"{"type": "program", "text": "[[[[[[{{{{\"]]]",
            "startPosition": {"row": 0, "column": 0},
            "endPosition": {"row": 0, "column": 1}}"#;
        assert!(parse_tree(Path::new("s.json"), json, 1).is_ok());
    }

    #[test]
    fn test_very_deep_tree_is_rejected_without_overflow() {
        let err = parse_tree(Path::new("deep.json"), &nested(200_000), DEFAULT_MAX_TREE_DEPTH)
            .unwrap_err();
        assert!(matches!(err, TreeReadError::Malformed { .. }));
    }

    #[test]
    fn test_dropping_deep_tree_does_not_recurse() {
        let mut root = Node::new("leaf");
        for _ in 0..500_000 {
            root = Node::new("n").with_children(vec![root]);
        }
        drop(root);
    }

    #[test]
    fn test_line_count_without_span_is_zero() {
        assert_eq!(Node::new("x").line_count(), 0);
        assert_eq!(Node::new("x").with_span(4, 4).line_count(), 1);
    }
}
