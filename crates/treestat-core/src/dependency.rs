use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::ConfigError;
use crate::selector::SelectorConfig;
use crate::types::DependencyKind;

/// Internal vs. external import classification.
///
/// A heuristic over the import text only: a name is internal when it starts
/// with one of the configured prefixes (`.` and `@/` by default) or matches
/// one of the configured patterns. Module paths are never resolved.
pub struct DependencyClassifier {
    prefixes: Vec<String>,
    patterns: Vec<Regex>,
}

impl DependencyClassifier {
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .internal_dependency_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::Pattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            prefixes: config.internal_prefixes.clone(),
            patterns,
        })
    }

    pub fn classify(&self, name: &str) -> DependencyKind {
        let by_prefix = self.prefixes.iter().any(|p| name.starts_with(p.as_str()));
        if by_prefix || self.patterns.iter().any(|re| re.is_match(name)) {
            DependencyKind::Internal
        } else {
            DependencyKind::External
        }
    }
}

/// True when `name` is `key` itself or a submodule of it (`key.x`, `key/x`).
fn names_dependency(name: &str, key: &str) -> bool {
    match name.strip_prefix(key) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('/'),
        None => false,
    }
}

/// Resolve `dependencyMaps` against the project's dependency frequency table.
///
/// Returns category -> distinct labels, sorted. Every configured category is
/// present, possibly with an empty list.
pub fn detect_technologies(
    maps: &BTreeMap<String, BTreeMap<String, String>>,
    frequency: &BTreeMap<String, usize>,
) -> BTreeMap<String, Vec<String>> {
    maps.iter()
        .map(|(category, entries)| {
            let labels: BTreeSet<String> = entries
                .iter()
                .filter(|(key, _)| frequency.keys().any(|dep| names_dependency(dep, key)))
                .map(|(_, label)| label.clone())
                .collect();
            (category.clone(), labels.into_iter().collect())
        })
        .collect()
}
