use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::Node;
use crate::query::{find_all, find_all_of, resolve_path, PathQuery};
use crate::selector::Selectors;

/// URLs, then bare dotted-quad IPv4 literals. A URL match consumes any
/// address inside it.
const URL_PATTERN: &str =
    r#"(?i)https?://[^\s/$.?#][^\s'"`]+|\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b"#;

/// Occurrences of one named pattern in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatches {
    pub count: usize,
    pub values: Vec<String>,
}

struct PatternRule {
    name: String,
    kind: String,
    needles: Option<Vec<String>>,
    ignore_case: bool,
    value: Option<PathQuery>,
}

impl PatternRule {
    fn matches(&self, node: &Node) -> bool {
        let Some(text) = node.text() else {
            return false;
        };
        let Some(needles) = &self.needles else {
            return true;
        };
        if self.ignore_case {
            let lowered = text.to_lowercase();
            needles.iter().any(|n| lowered.contains(n.as_str()))
        } else {
            needles.iter().any(|n| text.contains(n.as_str()))
        }
    }
}

/// Text-heuristic usage detection: configured patterns and hardcoded URLs
/// or IP addresses.
pub struct UsageDetector {
    rules: Vec<PatternRule>,
    string_types: Vec<String>,
    url: Regex,
}

impl UsageDetector {
    pub fn new(selectors: &Selectors) -> Result<Self, ConfigError> {
        let rules = selectors
            .patterns
            .iter()
            .map(|(name, p)| PatternRule {
                name: name.clone(),
                kind: p.kind.clone(),
                needles: p.text_match.as_ref().map(|m| {
                    m.needles()
                        .into_iter()
                        .map(|n| {
                            if p.ignore_case {
                                n.to_lowercase()
                            } else {
                                n.to_string()
                            }
                        })
                        .collect()
                }),
                ignore_case: p.ignore_case,
                value: p.value.clone(),
            })
            .collect();

        let url = Regex::new(URL_PATTERN).map_err(|e| ConfigError::Pattern {
            pattern: URL_PATTERN.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            rules,
            string_types: selectors.string.clone(),
            url,
        })
    }

    /// Count every configured pattern (zero counts included) and collect
    /// the values their value queries resolve to.
    pub fn detect(&self, root: &Node) -> BTreeMap<String, PatternMatches> {
        self.rules
            .iter()
            .map(|rule| {
                let mut matches = PatternMatches::default();
                for node in find_all(root, &rule.kind) {
                    if !rule.matches(node) {
                        continue;
                    }
                    matches.count += 1;
                    if let Some(value) = rule.value.as_ref().and_then(|q| resolve_path(node, q)) {
                        if !value.is_empty() {
                            matches.values.push(value);
                        }
                    }
                }
                (rule.name.clone(), matches)
            })
            .collect()
    }

    /// Every URL-shaped or IPv4-shaped substring of every string literal,
    /// verbatim and in source order. Duplicates are kept.
    pub fn hardcoded_urls(&self, root: &Node) -> Vec<String> {
        find_all_of(root, &self.string_types)
            .into_iter()
            .filter_map(|n| n.text())
            .flat_map(|text| self.url.find_iter(text).map(|m| m.as_str().to_string()))
            .collect()
    }
}
