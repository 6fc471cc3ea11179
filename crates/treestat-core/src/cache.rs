use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Config;
use crate::metrics::FileMetrics;
use crate::selector::SelectorConfig;

pub const CACHE_DIR: &str = ".treestat";
const CACHE_FILE: &str = "cache.json";

/// Cache entry for a single tree file's extracted metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFile {
    pub hash: String,
    pub metrics: FileMetrics,
}

/// Incremental cache stored in `<tree-dir>/.treestat/cache.json`.
///
/// Only valid for the configuration it was built with; see [`fingerprint`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisCache {
    pub fingerprint: String,
    pub files: BTreeMap<String, CachedFile>,
}

impl AnalysisCache {
    pub fn new(fingerprint: &str) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            files: BTreeMap::new(),
        }
    }

    /// Load the cache for `tree_root`. A missing cache, or one written under
    /// a different fingerprint, yields an empty cache.
    pub fn load(tree_root: &Path, fingerprint: &str) -> Result<Self> {
        let cache_path = tree_root.join(CACHE_DIR).join(CACHE_FILE);
        if !cache_path.exists() {
            return Ok(Self::new(fingerprint));
        }
        let content =
            std::fs::read_to_string(&cache_path).context("failed to read analysis cache")?;
        let cache: Self =
            serde_json::from_str(&content).context("failed to parse analysis cache")?;
        if cache.fingerprint != fingerprint {
            debug!("configuration changed, discarding analysis cache");
            return Ok(Self::new(fingerprint));
        }
        Ok(cache)
    }

    pub fn save(&self, tree_root: &Path) -> Result<()> {
        let cache_dir = tree_root.join(CACHE_DIR);
        std::fs::create_dir_all(&cache_dir).context("failed to create .treestat directory")?;
        let content = serde_json::to_string(self).context("failed to serialize analysis cache")?;
        std::fs::write(cache_dir.join(CACHE_FILE), content)
            .context("failed to write analysis cache")?;
        Ok(())
    }

    /// Cached metrics for a file if its content hash is unchanged.
    pub fn get(&self, identity: &str, hash: &str) -> Option<&FileMetrics> {
        let cached = self.files.get(identity)?;
        (cached.hash == hash).then_some(&cached.metrics)
    }

    pub fn insert(&mut self, identity: String, hash: String, metrics: FileMetrics) {
        self.files.insert(identity, CachedFile { hash, metrics });
    }

    /// Remove entries for files that no longer exist.
    pub fn prune(&mut self, existing: &[String]) {
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
        self.files
            .retain(|identity, _| existing.contains(identity.as_str()));
    }
}

/// Compute SHA-256 hash of file content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash of everything that influences per-file metrics besides the tree
/// content itself: crate version, selector document, run configuration and
/// fixed profile name.
pub fn fingerprint(
    selectors: &SelectorConfig,
    config: &Config,
    profile: Option<&str>,
) -> Result<String> {
    let selectors = serde_json::to_string(selectors).context("failed to serialize selectors")?;
    let config = serde_json::to_string(config).context("failed to serialize run configuration")?;
    Ok(compute_hash(&format!(
        "{}\n{}\n{}\n{}",
        env!("CARGO_PKG_VERSION"),
        profile.unwrap_or(""),
        selectors,
        config
    )))
}
