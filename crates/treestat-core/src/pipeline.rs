use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::aggregate::ProjectTotals;
use crate::cache::{compute_hash, fingerprint, AnalysisCache};
use crate::config::Config;
use crate::error::{ConfigError, TreeReadError};
use crate::metrics::{Extractor, FileMetrics};
use crate::node::parse_tree;
use crate::profile::LanguageProfile;
use crate::report::ProjectReport;
use crate::selector::SelectorConfig;

/// One serialized tree found under the tree directory.
#[derive(Debug, Clone)]
pub struct TreeFile {
    pub path: PathBuf,
    /// Relative path minus the serialization suffix, `/`-separated.
    pub identity: String,
}

/// A tree file that was left out of the report.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Report plus run bookkeeping.
pub struct AnalysisOutcome {
    pub report: ProjectReport,
    /// Files served from the incremental cache.
    pub cached: usize,
    pub skipped: Vec<SkippedFile>,
}

enum FileOutcome {
    Fresh { hash: String, metrics: FileMetrics },
    Cached(FileMetrics),
    Skipped(SkippedFile),
}

/// Discovery, parallel extraction and aggregation over one tree directory.
pub struct AnalysisPipeline {
    selectors: SelectorConfig,
    config: Config,
    extractor: Extractor,
    profile_name: Option<&'static str>,
}

/// Upper bound on the configured worker stack, in MiB.
const MAX_STACK_SIZE_MB: usize = 4096;

fn worker_stack_bytes(mb: usize) -> usize {
    mb.clamp(1, MAX_STACK_SIZE_MB).saturating_mul(1024 * 1024)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

impl AnalysisPipeline {
    pub fn new(
        selectors: SelectorConfig,
        config: Config,
        profile: Option<Box<dyn LanguageProfile>>,
    ) -> Result<Self, ConfigError> {
        let profile_name = profile.as_ref().map(|p| p.language());
        let extractor = Extractor::new(&selectors, &config, profile)?;
        Ok(Self {
            selectors,
            config,
            extractor,
            profile_name,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn selectors(&self) -> &SelectorConfig {
        &self.selectors
    }

    /// Run a full analysis of every tree file under `tree_dir`.
    pub fn analyze(&self, tree_dir: &Path) -> Result<AnalysisOutcome> {
        self.analyze_inner(tree_dir, false)
    }

    /// Run an analysis that reuses cached metrics for unchanged tree files.
    pub fn analyze_incremental(&self, tree_dir: &Path) -> Result<AnalysisOutcome> {
        self.analyze_inner(tree_dir, true)
    }

    /// Eligible tree files, sorted by identity. Hidden directories (including
    /// the cache directory) are not entered.
    pub fn discover(&self, tree_dir: &Path) -> Result<Vec<TreeFile>> {
        if !tree_dir.is_dir() {
            bail!("tree directory '{}' not found", tree_dir.display());
        }
        let suffix = format!(".{}", self.config.project.tree_extension);
        let classifier = self.extractor.paths();

        let mut files = Vec::new();
        for entry in WalkDir::new(tree_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden_dir(e))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("failed to read directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let rel = path
                .strip_prefix(tree_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let Some(identity) = rel.strip_suffix(&suffix).filter(|i| !i.is_empty()) else {
                continue;
            };
            if classifier.is_excluded(identity) {
                debug!("excluded {identity}");
                continue;
            }
            files.push(TreeFile {
                identity: identity.to_string(),
                path,
            });
        }
        files.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(files)
    }

    fn analyze_inner(&self, tree_dir: &Path, incremental: bool) -> Result<AnalysisOutcome> {
        let files = self.discover(tree_dir)?;
        info!("found {} tree files in {}", files.len(), tree_dir.display());

        let fingerprint = fingerprint(&self.selectors, &self.config, self.profile_name)?;
        let mut cache = if incremental {
            AnalysisCache::load(tree_dir, &fingerprint).unwrap_or_else(|e| {
                warn!("ignoring analysis cache: {e:#}");
                AnalysisCache::new(&fingerprint)
            })
        } else {
            AnalysisCache::new(&fingerprint)
        };

        let analysis = &self.config.analysis;
        let mut pool = rayon::ThreadPoolBuilder::new()
            .stack_size(worker_stack_bytes(analysis.stack_size_mb));
        if analysis.threads > 0 {
            pool = pool.num_threads(analysis.threads);
        }
        let pool = pool.build().context("failed to start worker pool")?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| self.process(file, incremental.then_some(&cache)))
                .collect()
        });

        let mut totals = ProjectTotals::new();
        let mut cached = 0;
        let mut skipped = Vec::new();
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Fresh { hash, metrics } => {
                    if incremental {
                        cache.insert(file.identity.clone(), hash, metrics.clone());
                    }
                    totals.add(metrics);
                }
                FileOutcome::Cached(metrics) => {
                    cached += 1;
                    totals.add(metrics);
                }
                FileOutcome::Skipped(s) => skipped.push(s),
            }
        }

        if incremental {
            let existing: Vec<String> = files.iter().map(|f| f.identity.clone()).collect();
            cache.prune(&existing);
            if let Err(e) = cache.save(tree_dir) {
                warn!("failed to save analysis cache: {e:#}");
            }
        }

        info!(
            "analyzed {} files ({} cached, {} skipped)",
            totals.file_count(),
            cached,
            skipped.len()
        );

        let mut report = totals.finalize(&self.selectors, analysis.complexity_scope);
        report.skipped_files = skipped
            .iter()
            .map(|s| {
                s.path
                    .strip_prefix(tree_dir)
                    .unwrap_or(&s.path)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        report.skipped_files.sort();

        Ok(AnalysisOutcome {
            report,
            cached,
            skipped,
        })
    }

    fn process(&self, file: &TreeFile, cache: Option<&AnalysisCache>) -> FileOutcome {
        let content = match std::fs::read_to_string(&file.path) {
            Ok(c) => c,
            Err(source) => {
                return skip(TreeReadError::Io {
                    path: file.path.clone(),
                    source,
                })
            }
        };

        let hash = compute_hash(&content);
        if let Some(metrics) = cache.and_then(|c| c.get(&file.identity, &hash)) {
            debug!("cache hit for {}", file.identity);
            return FileOutcome::Cached(metrics.clone());
        }

        match parse_tree(&file.path, &content, self.config.analysis.max_tree_depth) {
            Ok(root) => FileOutcome::Fresh {
                hash,
                metrics: self.extractor.extract(&root, &file.identity),
            },
            Err(e) => skip(e),
        }
    }
}

fn skip(error: TreeReadError) -> FileOutcome {
    warn!("skipping {}: {error}", error.path().display());
    FileOutcome::Skipped(SkippedFile {
        path: error.path().clone(),
        reason: error.to_string(),
    })
}
