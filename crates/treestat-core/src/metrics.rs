use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::complexity::ComplexityRules;
use crate::config::Config;
use crate::dependency::DependencyClassifier;
use crate::error::ConfigError;
use crate::layer::PathClassifier;
use crate::node::Node;
use crate::profile::{LanguageProfile, ProfileMetrics};
use crate::query::{find_all_of, preorder, resolve_path};
use crate::selector::{ImportSelector, SelectorConfig};
use crate::types::Import;
use crate::usage::{PatternMatches, UsageDetector};

/// Everything measured for one analyzed file.
///
/// Created once by [`Extractor::extract`] and consumed by the aggregator.
/// Also the unit stored in the incremental cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    /// Analyzed-file identity: tree path relative to the tree directory,
    /// minus the serialization suffix.
    pub path: String,
    pub lines_of_code: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub comment_count: usize,
    pub todo_fixme_count: usize,
    pub try_catch_count: usize,
    pub is_test_file: bool,
    pub module: String,
    pub layer: String,
    pub max_nesting_depth: usize,
    pub total_cyclomatic: usize,
    pub max_function_complexity: usize,
    pub imports: Vec<Import>,
    pub unresolved_imports: usize,
    pub patterns: BTreeMap<String, PatternMatches>,
    pub hardcoded_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "ProfileMetrics::is_empty")]
    pub profile: ProfileMetrics,
}

/// Per-file metric extraction for one analysis run.
///
/// Holds only read-only state, so one extractor is shared by every worker.
pub struct Extractor {
    functions: Vec<String>,
    classes: Vec<String>,
    comments: Vec<String>,
    try_blocks: Vec<String>,
    imports: Vec<ImportSelector>,
    complexity: ComplexityRules,
    dependencies: DependencyClassifier,
    usage: UsageDetector,
    paths: PathClassifier,
    profile: Option<Box<dyn LanguageProfile>>,
}

impl Extractor {
    pub fn new(
        selectors: &SelectorConfig,
        config: &Config,
        profile: Option<Box<dyn LanguageProfile>>,
    ) -> Result<Self, ConfigError> {
        selectors.validate()?;
        let s = &selectors.selectors;
        Ok(Self {
            functions: s.function.clone(),
            classes: s.class.clone(),
            comments: s.comment.clone(),
            try_blocks: s.try_block.clone(),
            imports: s.import.clone(),
            complexity: ComplexityRules::new(s, config.analysis.complexity_scope),
            dependencies: DependencyClassifier::new(selectors)?,
            usage: UsageDetector::new(s)?,
            paths: PathClassifier::new(config)?,
            profile,
        })
    }

    pub fn paths(&self) -> &PathClassifier {
        &self.paths
    }

    pub fn extract(&self, root: &Node, identity: &str) -> FileMetrics {
        let functions = find_all_of(root, &self.functions);
        let comments = find_all_of(root, &self.comments);

        let mut total_cyclomatic = 0;
        let mut max_function_complexity = 0;
        let mut max_nesting_depth = 0;
        for function in &functions {
            let score = self.complexity.cyclomatic(function);
            total_cyclomatic += score;
            max_function_complexity = max_function_complexity.max(score);
            max_nesting_depth = max_nesting_depth.max(self.complexity.nesting_depth(function));
        }

        let todo_fixme_count = comments
            .iter()
            .filter_map(|c| c.text())
            .filter(|t| {
                let lowered = t.to_lowercase();
                lowered.contains("todo") || lowered.contains("fixme")
            })
            .count();

        let (imports, unresolved_imports) = self.extract_imports(root);

        FileMetrics {
            path: identity.to_string(),
            lines_of_code: root.line_count(),
            function_count: functions.len(),
            class_count: find_all_of(root, &self.classes).len(),
            comment_count: comments.len(),
            todo_fixme_count,
            try_catch_count: find_all_of(root, &self.try_blocks).len(),
            is_test_file: self.paths.is_test_file(identity),
            module: self.paths.module(identity),
            layer: self.paths.layer(identity),
            max_nesting_depth,
            total_cyclomatic,
            max_function_complexity,
            imports,
            unresolved_imports,
            patterns: self.usage.detect(root),
            hardcoded_urls: self.usage.hardcoded_urls(root),
            profile: self
                .profile
                .as_ref()
                .map(|p| p.inspect(root, identity))
                .unwrap_or_default(),
        }
    }

    /// Resolved imports in source order, plus the number of import nodes
    /// whose source query found nothing.
    fn extract_imports(&self, root: &Node) -> (Vec<Import>, usize) {
        let mut imports = Vec::new();
        let mut unresolved = 0;
        for node in preorder(root) {
            let mut candidates = self.imports.iter().filter(|s| s.kind == node.kind).peekable();
            if candidates.peek().is_none() {
                continue;
            }
            match candidates
                .find_map(|s| resolve_path(node, &s.source).filter(|name| !name.is_empty()))
            {
                Some(name) => {
                    let kind = self.dependencies.classify(&name);
                    imports.push(Import { name, kind });
                }
                None => unresolved += 1,
            }
        }
        (imports, unresolved)
    }
}
