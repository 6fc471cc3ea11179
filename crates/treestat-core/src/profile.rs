use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::Node;
use crate::selector::SelectorConfig;

/// Counters and distinct values collected by a fixed profile for one
/// report section (e.g. `react`, `security`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSection {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, BTreeSet<String>>,
}

/// Section name -> section. Merges by summing counts and unioning values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileMetrics {
    pub sections: BTreeMap<String, ProfileSection>,
}

impl ProfileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn section_mut(&mut self, section: &str) -> &mut ProfileSection {
        self.sections.entry(section.to_string()).or_default()
    }

    /// Add `n` to a counter, creating it at zero first. `add(s, k, 0)`
    /// registers a counter so it shows up even when nothing matched.
    pub fn add(&mut self, section: &str, key: &str, n: usize) {
        *self
            .section_mut(section)
            .counts
            .entry(key.to_string())
            .or_insert(0) += n;
    }

    /// Register a value set without inserting anything.
    pub fn declare_values(&mut self, section: &str, key: &str) {
        self.section_mut(section)
            .values
            .entry(key.to_string())
            .or_default();
    }

    pub fn insert_value(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_mut(section)
            .values
            .entry(key.to_string())
            .or_default()
            .insert(value.into());
    }

    pub fn count(&self, section: &str, key: &str) -> usize {
        self.sections
            .get(section)
            .and_then(|s| s.counts.get(key))
            .copied()
            .unwrap_or(0)
    }

    pub fn values(&self, section: &str, key: &str) -> Option<&BTreeSet<String>> {
        self.sections.get(section)?.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn merge(&mut self, other: ProfileMetrics) {
        for (name, section) in other.sections {
            let target = self.section_mut(&name);
            for (key, n) in section.counts {
                *target.counts.entry(key).or_insert(0) += n;
            }
            for (key, values) in section.values {
                target.values.entry(key).or_default().extend(values);
            }
        }
    }
}

/// A fixed, non-configurable language profile: a built-in selector document
/// plus framework and security checks that go beyond what selectors express.
pub trait LanguageProfile: Send + Sync {
    /// Profile name (e.g., "javascript", "python")
    fn language(&self) -> &'static str;

    /// The built-in selector document, already validated.
    fn selectors(&self) -> Result<SelectorConfig, ConfigError>;

    /// Run the profile's extra checks over one file's tree.
    fn inspect(&self, root: &Node, identity: &str) -> ProfileMetrics;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_count() {
        let mut m = ProfileMetrics::new();
        m.add("react", "useState", 2);
        m.add("react", "useState", 1);
        m.add("react", "useRef", 0);
        assert_eq!(m.count("react", "useState"), 3);
        assert_eq!(m.count("react", "useRef"), 0);
        assert_eq!(m.count("angular", "components"), 0);
        assert!(m.sections["react"].counts.contains_key("useRef"));
    }

    #[test]
    fn test_merge_sums_counts_and_unions_values() {
        let mut a = ProfileMetrics::new();
        a.add("security", "dangerouslySetInnerHTML", 1);
        a.insert_value("infrastructure", "environmentVariables", "process.env.API_KEY");

        let mut b = ProfileMetrics::new();
        b.add("security", "dangerouslySetInnerHTML", 2);
        b.add("security", "anonymousFunctionsInProps", 1);
        b.insert_value("infrastructure", "environmentVariables", "process.env.API_KEY");
        b.insert_value("infrastructure", "environmentVariables", "process.env.PORT");

        a.merge(b);
        assert_eq!(a.count("security", "dangerouslySetInnerHTML"), 3);
        assert_eq!(a.count("security", "anonymousFunctionsInProps"), 1);
        let env: Vec<_> = a
            .values("infrastructure", "environmentVariables")
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(env, vec!["process.env.API_KEY", "process.env.PORT"]);
    }

    #[test]
    fn test_serializes_as_plain_section_map() {
        let mut m = ProfileMetrics::new();
        m.add("modern", "arrowFunctions", 4);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["modern"]["counts"]["arrowFunctions"], 4);
        assert!(json["modern"].get("values").is_none());
    }
}
