use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::ProfileMetrics;
use crate::types::ComplexityScope;
use crate::usage::PatternMatches;

/// Final project-level report. Immutable once built by
/// [`ProjectTotals::finalize`](crate::aggregate::ProjectTotals::finalize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub language: String,
    pub composition: CompositionReport,
    pub complexity: ComplexityReport,
    pub dependencies: DependencyReport,
    pub usage: UsageReport,
    pub quality: QualityReport,
    pub structure: StructureReport,
    /// Detection category -> distinct labels found through `dependencyMaps`.
    pub frameworks: BTreeMap<String, Vec<String>>,
    /// Fixed-profile sections; empty for custom selector documents.
    pub profile: ProfileMetrics,
    /// Tree files that could not be read or parsed, sorted.
    #[serde(default)]
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionReport {
    pub file_count: usize,
    pub total_lines_of_code: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub total_comments: usize,
    pub comment_to_code_ratio: f64,
    pub lines_of_code_per_file: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub scope: ComplexityScope,
    pub max_nesting_depth: usize,
    pub total_cyclomatic: usize,
    pub average_cyclomatic: f64,
    pub max_function_complexity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Resolved import sources; always `internal_imports + external_imports`.
    pub import_count: usize,
    pub internal_imports: usize,
    pub external_imports: usize,
    pub unresolved_imports: usize,
    pub third_party_ratio: f64,
    pub direct_dependencies: Vec<String>,
    pub import_frequency: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub patterns: BTreeMap<String, PatternMatches>,
    pub hardcoded_urls: HardcodedUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardcodedUrls {
    /// Every occurrence, duplicates included.
    pub count: usize,
    /// Distinct URLs, sorted.
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub todo_fixme_count: usize,
    pub try_catch_count: usize,
    pub test_file_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub module_count: usize,
    /// Module key -> lines of code.
    pub module_size: BTreeMap<String, usize>,
    /// Layer name -> lines of code.
    pub layer_size: BTreeMap<String, usize>,
}
