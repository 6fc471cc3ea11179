//! Cyclomatic complexity and nesting depth of function-like nodes.
//!
//! Complexity starts at 1 and adds one for each branching node and each
//! short-circuit logical expression. Whether branches inside nested function
//! literals count toward the enclosing function is a [`ComplexityScope`]
//! choice; the default (`Subtree`) counts them.

use std::collections::HashSet;

use crate::node::Node;
use crate::query::{max_depth, preorder};
use crate::selector::Selectors;
use crate::types::ComplexityScope;

pub struct ComplexityRules {
    branching: HashSet<String>,
    logical_kind: String,
    operators: Vec<String>,
    nesting: Vec<String>,
    functions: HashSet<String>,
    scope: ComplexityScope,
}

impl ComplexityRules {
    pub fn new(selectors: &Selectors, scope: ComplexityScope) -> Self {
        let c = &selectors.complexity;
        Self {
            branching: c.branching.iter().cloned().collect(),
            logical_kind: c.logical.kind.clone(),
            operators: c.logical.operators.clone(),
            nesting: c.nesting_types(),
            functions: selectors.function.iter().cloned().collect(),
            scope,
        }
    }

    /// Cyclomatic complexity of one function node. Never below 1.
    pub fn cyclomatic(&self, function: &Node) -> usize {
        let mut complexity = 1;
        for node in self.scoped_nodes(function) {
            if self.branching.contains(&node.kind) {
                complexity += 1;
            }
            if self.is_short_circuit(node) {
                complexity += 1;
            }
        }
        complexity
    }

    /// Maximum number of control-structure ancestors on any path from
    /// `function` down to a leaf.
    pub fn nesting_depth(&self, function: &Node) -> usize {
        max_depth(function, &self.nesting)
    }

    fn scoped_nodes<'a>(&self, function: &'a Node) -> Vec<&'a Node> {
        match self.scope {
            ComplexityScope::Subtree => preorder(function).collect(),
            ComplexityScope::ExcludeNestedFunctions => {
                let mut out = Vec::new();
                let mut stack = vec![function];
                while let Some(node) = stack.pop() {
                    out.push(node);
                    stack.extend(
                        node.children
                            .iter()
                            .rev()
                            .filter(|c| !self.functions.contains(&c.kind)),
                    );
                }
                out
            }
        }
    }

    fn is_short_circuit(&self, node: &Node) -> bool {
        if node.kind != self.logical_kind {
            return false;
        }
        if self.operators.is_empty() {
            return true;
        }
        // Producers that keep anonymous tokens emit the operator as a child.
        if node
            .children
            .iter()
            .any(|c| self.operators.iter().any(|op| *op == c.kind))
        {
            return true;
        }
        // Named-children-only trees: the operator follows the left operand's text.
        let (Some(text), Some(left)) = (node.text(), node.children.first()) else {
            return false;
        };
        let Some(left_text) = left.text() else {
            return false;
        };
        text.strip_prefix(left_text)
            .map(str::trim_start)
            .is_some_and(|rest| self.operators.iter().any(|op| rest.starts_with(op.as_str())))
    }
}
