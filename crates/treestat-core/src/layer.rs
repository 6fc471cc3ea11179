use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{Config, StructureConfig};
use crate::error::ConfigError;

pub const ROOT_MODULE: &str = "root";
pub const UNCLASSIFIED_LAYER: &str = "unclassified";

/// A compiled named layer.
struct Layer {
    name: String,
    patterns: GlobSet,
}

/// Classifies analyzed-file identities into modules, layers and test files
/// using the structure section of the run configuration.
pub struct PathClassifier {
    module_depth: Option<usize>,
    layers: Vec<Layer>,
    tests: GlobSet,
    excluded: GlobSet,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::Pattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

impl PathClassifier {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let StructureConfig {
            module_depth,
            test_patterns,
            layers,
        } = &config.structure;

        let layers = layers
            .iter()
            .map(|l| {
                Ok(Layer {
                    name: l.name.clone(),
                    patterns: build_globset(&l.patterns)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            module_depth: *module_depth,
            layers,
            tests: build_globset(test_patterns)?,
            excluded: build_globset(&config.project.exclude_patterns)?,
        })
    }

    /// Directory grouping key for the per-module size breakdown.
    pub fn module(&self, path: &str) -> String {
        let normalized = normalize(path);
        let mut dirs: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        dirs.pop();
        if dirs.is_empty() {
            return ROOT_MODULE.to_string();
        }
        match self.module_depth {
            Some(depth) if depth > 0 => dirs[..depth.min(dirs.len())].join("/"),
            _ => dirs[dirs.len() - 1].to_string(),
        }
    }

    /// Name of the first layer whose patterns match, or `unclassified`.
    pub fn layer(&self, path: &str) -> String {
        let normalized = normalize(path);
        self.layers
            .iter()
            .find(|l| l.patterns.is_match(&normalized))
            .map(|l| l.name.clone())
            .unwrap_or_else(|| UNCLASSIFIED_LAYER.to_string())
    }

    pub fn is_test_file(&self, path: &str) -> bool {
        self.tests.is_match(normalize(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.is_match(normalize(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;

    fn classifier(module_depth: Option<usize>) -> PathClassifier {
        let mut config = Config::default();
        config.structure.module_depth = module_depth;
        PathClassifier::new(&config).unwrap()
    }

    #[test]
    fn test_module_is_parent_directory_by_default() {
        let c = classifier(None);
        assert_eq!(c.module("src/components/Button.jsx"), "components");
        assert_eq!(c.module("src/utils.js"), "src");
        assert_eq!(c.module("index.js"), "root");
        assert_eq!(c.module("src\\api\\client.ts"), "api");
    }

    #[test]
    fn test_module_depth_groups_by_prefix() {
        let c = classifier(Some(2));
        assert_eq!(c.module("src/components/forms/Input.jsx"), "src/components");
        assert_eq!(c.module("src/utils.js"), "src");
        assert_eq!(c.module("index.js"), "root");
    }

    #[test]
    fn test_layer_first_match_wins() {
        let c = classifier(None);
        assert_eq!(c.layer("src/domain/user.js"), "domain");
        assert_eq!(c.layer("src/services/domain/user.js"), "domain");
        assert_eq!(c.layer("src/services/billing.js"), "application");
        assert_eq!(c.layer("src/components/App.jsx"), "presentation");
        assert_eq!(c.layer("src/index.js"), "unclassified");
    }

    #[test]
    fn test_custom_layers() {
        let mut config = Config::default();
        config.structure.layers = vec![LayerConfig {
            name: "core".to_string(),
            patterns: vec!["core/**".to_string()],
        }];
        let c = PathClassifier::new(&config).unwrap();
        assert_eq!(c.layer("core/a.py"), "core");
        assert_eq!(c.layer("src/domain/a.py"), "unclassified");
    }

    #[test]
    fn test_test_file_detection() {
        let c = classifier(None);
        assert!(c.is_test_file("src/App.test.js"));
        assert!(c.is_test_file("src/api.spec.ts"));
        assert!(c.is_test_file("pkg/test_models.py"));
        assert!(c.is_test_file("tests/conftest.py"));
        assert!(!c.is_test_file("src/latest.js"));
    }

    #[test]
    fn test_exclusion_patterns() {
        let c = classifier(None);
        assert!(c.is_excluded("node_modules/react/index.js"));
        assert!(c.is_excluded("web/node_modules/x.js"));
        assert!(c.is_excluded("dist/app.min.js"));
        assert!(!c.is_excluded("src/app.js"));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let mut config = Config::default();
        config.structure.test_patterns = vec!["a[".to_string()];
        assert!(matches!(
            PathClassifier::new(&config),
            Err(ConfigError::Pattern { .. })
        ));
    }
}
