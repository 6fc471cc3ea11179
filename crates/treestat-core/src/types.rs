use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the project boundary an import points to.
///
/// Decided purely from the import text (prefix convention and configured
/// patterns). No module resolution takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Internal,
    External,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Internal => write!(f, "internal"),
            DependencyKind::External => write!(f, "external"),
        }
    }
}

/// A resolved import source in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub name: String,
    pub kind: DependencyKind,
}

/// Which nodes count toward a function's cyclomatic complexity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplexityScope {
    /// Every branching node in the function's full subtree, including those
    /// inside nested function literals.
    #[default]
    Subtree,
    /// Stop descending at nested function nodes; they are scored on their own.
    ExcludeNestedFunctions,
}

impl fmt::Display for ComplexityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityScope::Subtree => write!(f, "subtree"),
            ComplexityScope::ExcludeNestedFunctions => write!(f, "exclude-nested-functions"),
        }
    }
}
