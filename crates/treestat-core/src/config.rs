use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::node::DEFAULT_MAX_TREE_DEPTH;
use crate::types::ComplexityScope;

pub const CONFIG_FILE: &str = ".treestat.toml";

/// Top-level run configuration from `.treestat.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub structure: StructureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Serialization suffix of tree files, without the dot.
    #[serde(default = "default_tree_extension")]
    pub tree_extension: String,
    /// Globs over analyzed-file identities to leave out of the report.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_tree_extension() -> String {
    "json".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            tree_extension: default_tree_extension(),
            exclude_patterns: vec![
                "node_modules/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/*.min.js".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub complexity_scope: ComplexityScope,
    /// Worker threads for per-file extraction; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
    /// Stack size of each worker, in MiB. Tree files are deserialized
    /// recursively, so very deep trees need more than the platform default.
    #[serde(default = "default_stack_size_mb")]
    pub stack_size_mb: usize,
    /// Trees nested deeper than this are skipped as malformed. Raising it
    /// may also require a larger `stack_size_mb`.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_TREE_DEPTH
}

fn default_stack_size_mb() -> usize {
    64
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            complexity_scope: ComplexityScope::default(),
            threads: 0,
            stack_size_mb: default_stack_size_mb(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

/// A named group of paths for the per-layer size breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Module key = first N path components. Absent: the file's parent
    /// directory name.
    #[serde(default)]
    pub module_depth: Option<usize>,
    #[serde(default = "default_test_patterns")]
    pub test_patterns: Vec<String>,
    /// Checked in order; first match wins.
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
}

fn default_test_patterns() -> Vec<String> {
    vec![
        "**/*.test.*".to_string(),
        "**/*.spec.*".to_string(),
        "**/test_*".to_string(),
        "**/*_test.*".to_string(),
        "**/tests/**".to_string(),
        "**/__tests__/**".to_string(),
    ]
}

fn layer(name: &str, patterns: &[&str]) -> LayerConfig {
    LayerConfig {
        name: name.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
    }
}

fn default_layers() -> Vec<LayerConfig> {
    vec![
        layer("domain", &["**/domain/**", "**/entity/**", "**/model/**", "**/models/**"]),
        layer(
            "application",
            &["**/application/**", "**/usecase/**", "**/service/**", "**/services/**"],
        ),
        layer(
            "infrastructure",
            &["**/infrastructure/**", "**/adapter/**", "**/repository/**", "**/db/**"],
        ),
        layer(
            "presentation",
            &["**/presentation/**", "**/components/**", "**/pages/**", "**/api/**", "**/views/**"],
        ),
    ]
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            module_depth: None,
            test_patterns: default_test_patterns(),
            layers: default_layers(),
        }
    }
}

impl Config {
    /// Load configuration from a `.treestat.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `treestat init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.treestat.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `treestat init`.
    pub fn default_toml() -> String {
        r#"# treestat - syntax tree metrics configuration

[project]
# Suffix of the serialized tree files (app.js.json -> app.js)
tree_extension = "json"
exclude_patterns = ["node_modules/**", "**/node_modules/**", "**/*.min.js"]

[analysis]
# "subtree" counts branches inside nested closures toward the enclosing
# function; "exclude-nested-functions" scores each function on its own body.
complexity_scope = "subtree"
# 0 = one worker per CPU
threads = 0
stack_size_mb = 64
# Deeper trees are skipped as malformed
max_tree_depth = 10000

[structure]
# Group modules by the first N path components instead of the parent directory
# module_depth = 1
test_patterns = ["**/*.test.*", "**/*.spec.*", "**/test_*", "**/*_test.*", "**/tests/**", "**/__tests__/**"]

# Layers for the size breakdown, checked in order (first match wins)
[[structure.layers]]
name = "domain"
patterns = ["**/domain/**", "**/entity/**", "**/model/**", "**/models/**"]

[[structure.layers]]
name = "application"
patterns = ["**/application/**", "**/usecase/**", "**/service/**", "**/services/**"]

[[structure.layers]]
name = "infrastructure"
patterns = ["**/infrastructure/**", "**/adapter/**", "**/repository/**", "**/db/**"]

[[structure.layers]]
name = "presentation"
patterns = ["**/presentation/**", "**/components/**", "**/pages/**", "**/api/**", "**/views/**"]
"#
        .to_string()
    }
}
