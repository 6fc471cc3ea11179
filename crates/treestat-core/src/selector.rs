use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::query::PathQuery;

/// A language profile: which node types represent each semantic category,
/// and how to pull values out of matching nodes.
///
/// Loaded once per run from JSON or TOML and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    pub language: String,
    pub selectors: Selectors,
    #[serde(default = "default_internal_prefixes")]
    pub internal_prefixes: Vec<String>,
    #[serde(default)]
    pub internal_dependency_patterns: Vec<String>,
    /// Detection category -> dependency name -> human label.
    #[serde(default)]
    pub dependency_maps: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    pub function: Vec<String>,
    pub class: Vec<String>,
    pub comment: Vec<String>,
    pub import: Vec<ImportSelector>,
    pub patterns: BTreeMap<String, PatternSelector>,
    #[serde(default, rename = "try")]
    pub try_block: Vec<String>,
    #[serde(default = "default_string_types")]
    pub string: Vec<String>,
    #[serde(default)]
    pub complexity: ComplexitySelectors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSelector {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: PathQuery,
}

/// Substring(s) a node's text must contain; a list matches if any entry does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatch {
    One(String),
    AnyOf(Vec<String>),
}

impl TextMatch {
    pub fn needles(&self) -> Vec<&str> {
        match self {
            TextMatch::One(s) => vec![s.as_str()],
            TextMatch::AnyOf(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSelector {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_match: Option<TextMatch>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_case: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PathQuery>,
}

/// Grammar-specific node types that drive the complexity metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexitySelectors {
    #[serde(default = "default_branching")]
    pub branching: Vec<String>,
    #[serde(default)]
    pub logical: LogicalSelector,
    /// Control structures counted by nesting depth. Defaults to the
    /// branching set plus `switch_statement`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nesting: Option<Vec<String>>,
}

impl Default for ComplexitySelectors {
    fn default() -> Self {
        Self {
            branching: default_branching(),
            logical: LogicalSelector::default(),
            nesting: None,
        }
    }
}

impl ComplexitySelectors {
    pub fn nesting_types(&self) -> Vec<String> {
        match &self.nesting {
            Some(types) => types.clone(),
            None => {
                let mut types = self.branching.clone();
                types.push("switch_statement".to_string());
                types
            }
        }
    }
}

/// Binary expressions whose operator is short-circuiting.
///
/// An empty `operators` list counts every node of `type`, for grammars that
/// give logical operators their own node type (e.g. `boolean_operator`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalSelector {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_logical_operators")]
    pub operators: Vec<String>,
}

impl Default for LogicalSelector {
    fn default() -> Self {
        Self {
            kind: "binary_expression".to_string(),
            operators: default_logical_operators(),
        }
    }
}

fn default_internal_prefixes() -> Vec<String> {
    vec![".".to_string(), "@/".to_string()]
}

fn default_string_types() -> Vec<String> {
    vec!["string".to_string()]
}

fn default_branching() -> Vec<String> {
    [
        "if_statement",
        "for_statement",
        "while_statement",
        "case_statement",
        "catch_clause",
        "ternary_expression",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_logical_operators() -> Vec<String> {
    vec!["&&".to_string(), "||".to_string()]
}

/// Serialization format of a selector document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

impl SelectorConfig {
    /// Load and validate a selector document. The format follows the file
    /// extension (`.toml`, anything else is JSON).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, DocumentFormat::from_path(path), path)
    }

    pub fn parse(content: &str, format: DocumentFormat, origin: &Path) -> Result<Self, ConfigError> {
        let parsed: Result<Self, String> = match format {
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        let config = parsed.map_err(|message| ConfigError::Parse {
            path: origin.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, DocumentFormat::Json, Path::new("<inline>"))
    }

    /// Structural checks only; tags are not checked against any grammar.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.trim().is_empty() {
            return Err(invalid("language must not be empty"));
        }

        let s = &self.selectors;
        require_tags("selectors.function", &s.function)?;
        require_tags("selectors.class", &s.class)?;
        require_tags("selectors.comment", &s.comment)?;
        no_blank_tags("selectors.try", &s.try_block)?;
        no_blank_tags("selectors.string", &s.string)?;
        no_blank_tags("selectors.complexity.branching", &s.complexity.branching)?;
        if let Some(nesting) = &s.complexity.nesting {
            no_blank_tags("selectors.complexity.nesting", nesting)?;
        }
        if s.complexity.logical.kind.trim().is_empty() {
            return Err(invalid("selectors.complexity.logical.type must not be empty"));
        }

        if s.import.is_empty() {
            return Err(invalid("selectors.import must list at least one selector"));
        }
        for (i, import) in s.import.iter().enumerate() {
            let key = format!("selectors.import[{i}]");
            if import.kind.trim().is_empty() {
                return Err(invalid(&format!("{key}.type must not be empty")));
            }
            check_query(&format!("{key}.source"), &import.source)?;
        }

        for (name, pattern) in &s.patterns {
            if name.trim().is_empty() {
                return Err(invalid("selectors.patterns keys must not be empty"));
            }
            let key = format!("selectors.patterns.{name}");
            if pattern.kind.trim().is_empty() {
                return Err(invalid(&format!("{key}.type must not be empty")));
            }
            if let Some(TextMatch::AnyOf(needles)) = &pattern.text_match {
                if needles.is_empty() {
                    return Err(invalid(&format!("{key}.textMatch must not be an empty list")));
                }
            }
            if let Some(value) = &pattern.value {
                check_query(&format!("{key}.value"), value)?;
            }
        }

        for (category, entries) in &self.dependency_maps {
            if entries.keys().any(|k| k.is_empty()) {
                return Err(invalid(&format!(
                    "dependencyMaps.{category} contains an empty dependency name"
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON rendering, used to print built-in profiles.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn require_tags(key: &str, tags: &[String]) -> Result<(), ConfigError> {
    if tags.is_empty() {
        return Err(invalid(&format!("{key} must list at least one node type")));
    }
    no_blank_tags(key, tags)
}

fn no_blank_tags(key: &str, tags: &[String]) -> Result<(), ConfigError> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(invalid(&format!("{key} contains an empty node type")));
    }
    Ok(())
}

fn check_query(key: &str, query: &PathQuery) -> Result<(), ConfigError> {
    for (i, step) in query.path.iter().enumerate() {
        if step.kind.trim().is_empty() {
            return Err(invalid(&format!("{key}.path[{i}].type must not be empty")));
        }
    }
    Ok(())
}
