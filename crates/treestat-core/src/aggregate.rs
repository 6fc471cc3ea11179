//! Folding per-file metrics into project totals.
//!
//! [`ProjectTotals::merge`] is associative and commutative: counters sum,
//! maxima take the max, frequency maps sum per key, set-valued fields union,
//! and list-valued fields are kept per file path and only flattened (in path
//! order) by [`ProjectTotals::finalize`]. Totals can therefore be built in any
//! order and in any grouping without changing the report.

use std::collections::{BTreeMap, BTreeSet};

use crate::dependency::detect_technologies;
use crate::metrics::FileMetrics;
use crate::profile::ProfileMetrics;
use crate::report::{
    ComplexityReport, CompositionReport, DependencyReport, HardcodedUrls, ProjectReport,
    QualityReport, StructureReport, UsageReport,
};
use crate::selector::SelectorConfig;
use crate::types::{ComplexityScope, DependencyKind};
use crate::usage::PatternMatches;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PatternTotals {
    count: usize,
    values: BTreeMap<String, Vec<String>>,
}

/// Running totals over any number of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTotals {
    file_count: usize,
    total_lines_of_code: usize,
    function_count: usize,
    class_count: usize,
    total_comments: usize,
    lines_of_code_per_file: BTreeMap<String, usize>,

    max_nesting_depth: usize,
    total_cyclomatic: usize,
    max_function_complexity: usize,

    internal_imports: usize,
    external_imports: usize,
    unresolved_imports: usize,
    import_frequency: BTreeMap<String, usize>,
    external_dependencies: BTreeSet<String>,

    patterns: BTreeMap<String, PatternTotals>,
    hardcoded_urls: BTreeMap<String, Vec<String>>,

    todo_fixme_count: usize,
    try_catch_count: usize,
    test_file_count: usize,

    module_size: BTreeMap<String, usize>,
    layer_size: BTreeMap<String, usize>,

    profile: ProfileMetrics,
}

fn sum_into(target: &mut BTreeMap<String, usize>, source: BTreeMap<String, usize>) {
    for (key, n) in source {
        *target.entry(key).or_insert(0) += n;
    }
}

fn append_into(target: &mut BTreeMap<String, Vec<String>>, source: BTreeMap<String, Vec<String>>) {
    for (key, values) in source {
        target.entry(key).or_default().extend(values);
    }
}

/// Round to `places` decimals.
fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or 0 when there is nothing to divide by.
fn ratio(numerator: usize, denominator: usize, places: i32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round(numerator as f64 / denominator as f64, places)
    }
}

impl ProjectTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn add(&mut self, file: FileMetrics) {
        self.merge(ProjectTotals::from(file));
    }

    pub fn merge(&mut self, other: ProjectTotals) {
        self.file_count += other.file_count;
        self.total_lines_of_code += other.total_lines_of_code;
        self.function_count += other.function_count;
        self.class_count += other.class_count;
        self.total_comments += other.total_comments;
        sum_into(&mut self.lines_of_code_per_file, other.lines_of_code_per_file);

        self.max_nesting_depth = self.max_nesting_depth.max(other.max_nesting_depth);
        self.total_cyclomatic += other.total_cyclomatic;
        self.max_function_complexity = self
            .max_function_complexity
            .max(other.max_function_complexity);

        self.internal_imports += other.internal_imports;
        self.external_imports += other.external_imports;
        self.unresolved_imports += other.unresolved_imports;
        sum_into(&mut self.import_frequency, other.import_frequency);
        self.external_dependencies.extend(other.external_dependencies);

        for (name, pattern) in other.patterns {
            let target = self.patterns.entry(name).or_default();
            target.count += pattern.count;
            append_into(&mut target.values, pattern.values);
        }
        append_into(&mut self.hardcoded_urls, other.hardcoded_urls);

        self.todo_fixme_count += other.todo_fixme_count;
        self.try_catch_count += other.try_catch_count;
        self.test_file_count += other.test_file_count;

        sum_into(&mut self.module_size, other.module_size);
        sum_into(&mut self.layer_size, other.layer_size);

        self.profile.merge(other.profile);
    }

    /// Compute derived fields. Ratios are never averages of per-file ratios.
    pub fn finalize(self, selectors: &SelectorConfig, scope: ComplexityScope) -> ProjectReport {
        let import_count = self.internal_imports + self.external_imports;
        let frameworks = detect_technologies(&selectors.dependency_maps, &self.import_frequency);

        let url_list: Vec<String> = self.hardcoded_urls.into_values().flatten().collect();
        let distinct_urls: BTreeSet<String> = url_list.iter().cloned().collect();

        let patterns = self
            .patterns
            .into_iter()
            .map(|(name, p)| {
                let values = p.values.into_values().flatten().collect();
                (name, PatternMatches { count: p.count, values })
            })
            .collect();

        ProjectReport {
            language: selectors.language.clone(),
            composition: CompositionReport {
                file_count: self.file_count,
                total_lines_of_code: self.total_lines_of_code,
                function_count: self.function_count,
                class_count: self.class_count,
                total_comments: self.total_comments,
                comment_to_code_ratio: ratio(self.total_comments, self.total_lines_of_code, 3),
                lines_of_code_per_file: self.lines_of_code_per_file,
            },
            complexity: ComplexityReport {
                scope,
                max_nesting_depth: self.max_nesting_depth,
                total_cyclomatic: self.total_cyclomatic,
                average_cyclomatic: ratio(self.total_cyclomatic, self.function_count, 2),
                max_function_complexity: self.max_function_complexity,
            },
            dependencies: DependencyReport {
                import_count,
                internal_imports: self.internal_imports,
                external_imports: self.external_imports,
                unresolved_imports: self.unresolved_imports,
                third_party_ratio: ratio(self.external_imports, import_count, 2),
                direct_dependencies: self.external_dependencies.into_iter().collect(),
                import_frequency: self.import_frequency,
            },
            usage: UsageReport {
                patterns,
                hardcoded_urls: HardcodedUrls {
                    count: url_list.len(),
                    urls: distinct_urls.into_iter().collect(),
                },
            },
            quality: QualityReport {
                todo_fixme_count: self.todo_fixme_count,
                try_catch_count: self.try_catch_count,
                test_file_count: self.test_file_count,
            },
            structure: StructureReport {
                module_count: self.module_size.len(),
                module_size: self.module_size,
                layer_size: self.layer_size,
            },
            frameworks,
            profile: self.profile,
            skipped_files: Vec::new(),
        }
    }
}

impl From<FileMetrics> for ProjectTotals {
    fn from(file: FileMetrics) -> Self {
        let mut totals = ProjectTotals {
            file_count: 1,
            total_lines_of_code: file.lines_of_code,
            function_count: file.function_count,
            class_count: file.class_count,
            total_comments: file.comment_count,
            max_nesting_depth: file.max_nesting_depth,
            total_cyclomatic: file.total_cyclomatic,
            max_function_complexity: file.max_function_complexity,
            unresolved_imports: file.unresolved_imports,
            todo_fixme_count: file.todo_fixme_count,
            try_catch_count: file.try_catch_count,
            test_file_count: usize::from(file.is_test_file),
            profile: file.profile,
            ..ProjectTotals::default()
        };

        for import in file.imports {
            match import.kind {
                DependencyKind::Internal => totals.internal_imports += 1,
                DependencyKind::External => {
                    totals.external_imports += 1;
                    totals.external_dependencies.insert(import.name.clone());
                }
            }
            *totals.import_frequency.entry(import.name).or_insert(0) += 1;
        }

        for (name, matches) in file.patterns {
            let mut values = BTreeMap::new();
            if !matches.values.is_empty() {
                values.insert(file.path.clone(), matches.values);
            }
            totals.patterns.insert(
                name,
                PatternTotals {
                    count: matches.count,
                    values,
                },
            );
        }
        if !file.hardcoded_urls.is_empty() {
            totals
                .hardcoded_urls
                .insert(file.path.clone(), file.hardcoded_urls);
        }

        totals.module_size.insert(file.module, file.lines_of_code);
        totals.layer_size.insert(file.layer, file.lines_of_code);
        totals
            .lines_of_code_per_file
            .insert(file.path, file.lines_of_code);
        totals
    }
}

impl FromIterator<FileMetrics> for ProjectTotals {
    fn from_iter<I: IntoIterator<Item = FileMetrics>>(iter: I) -> Self {
        let mut totals = ProjectTotals::new();
        for file in iter {
            totals.add(file);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Import;
    use proptest::prelude::*;

    fn selectors() -> SelectorConfig {
        SelectorConfig::from_json_str(
            r#"{"language": "javascript",
                "selectors": {"function": ["f"], "class": ["c"], "comment": ["comment"],
                              "import": [{"type": "import_statement", "source": {"path": [{"type": "string"}]}}], "patterns": {}},
                "dependencyMaps": {"cloudSDKs": {"@aws-sdk": "AWS", "firebase": "Firebase"}}}"#,
        )
        .unwrap()
    }

    fn file(path: &str) -> FileMetrics {
        FileMetrics {
            path: path.to_string(),
            lines_of_code: 10,
            function_count: 0,
            class_count: 0,
            comment_count: 0,
            todo_fixme_count: 0,
            try_catch_count: 0,
            is_test_file: false,
            module: "root".to_string(),
            layer: "unclassified".to_string(),
            max_nesting_depth: 0,
            total_cyclomatic: 0,
            max_function_complexity: 0,
            imports: Vec::new(),
            unresolved_imports: 0,
            patterns: BTreeMap::new(),
            hardcoded_urls: Vec::new(),
            profile: ProfileMetrics::default(),
        }
    }

    fn import(name: &str, kind: DependencyKind) -> Import {
        Import {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn test_function_counts_sum_and_average_uses_totals() {
        let mut a = file("a.js");
        a.function_count = 2;
        a.total_cyclomatic = 2;
        let mut b = file("b.js");
        b.function_count = 3;
        b.total_cyclomatic = 9;

        let report = [a, b]
            .into_iter()
            .collect::<ProjectTotals>()
            .finalize(&selectors(), ComplexityScope::Subtree);
        assert_eq!(report.composition.function_count, 5);
        // 11 / 5, not the mean of 1.0 and 3.0
        assert_eq!(report.complexity.average_cyclomatic, 2.2);
    }

    #[test]
    fn test_empty_project_has_zero_ratios() {
        let report = ProjectTotals::new().finalize(&selectors(), ComplexityScope::Subtree);
        assert_eq!(report.composition.file_count, 0);
        assert_eq!(report.composition.comment_to_code_ratio, 0.0);
        assert_eq!(report.complexity.average_cyclomatic, 0.0);
        assert_eq!(report.dependencies.third_party_ratio, 0.0);
        assert_eq!(report.frameworks["cloudSDKs"], Vec::<String>::new());
    }

    #[test]
    fn test_ratios_are_rounded() {
        let mut a = file("a.js");
        a.lines_of_code = 3;
        a.comment_count = 1;
        a.imports = vec![
            import("react", DependencyKind::External),
            import("./a", DependencyKind::Internal),
            import("./b", DependencyKind::Internal),
        ];
        let report = ProjectTotals::from(a).finalize(&selectors(), ComplexityScope::Subtree);
        assert_eq!(report.composition.comment_to_code_ratio, 0.333);
        assert_eq!(report.dependencies.third_party_ratio, 0.33);
    }

    #[test]
    fn test_dependency_classification_is_complete() {
        let mut a = file("a.js");
        a.imports = vec![
            import("react", DependencyKind::External),
            import("./utils", DependencyKind::Internal),
        ];
        a.unresolved_imports = 1;
        let mut b = file("b.js");
        b.imports = vec![
            import("react", DependencyKind::External),
            import("@aws-sdk/client-s3", DependencyKind::External),
        ];

        let report = [a, b]
            .into_iter()
            .collect::<ProjectTotals>()
            .finalize(&selectors(), ComplexityScope::Subtree);
        let d = &report.dependencies;
        assert_eq!(d.import_count, 4);
        assert_eq!(d.internal_imports + d.external_imports, d.import_count);
        assert_eq!(d.unresolved_imports, 1);
        assert_eq!(d.import_frequency["react"], 2);
        assert_eq!(d.direct_dependencies, vec!["@aws-sdk/client-s3", "react"]);
        assert_eq!(report.frameworks["cloudSDKs"], vec!["AWS"]);
    }

    #[test]
    fn test_urls_and_pattern_values_flatten_in_path_order() {
        let mut b = file("b.js");
        b.hardcoded_urls = vec!["https://b.example.com".to_string()];
        b.patterns.insert(
            "endpoints".to_string(),
            PatternMatches {
                count: 1,
                values: vec!["/b".to_string()],
            },
        );
        let mut a = file("a.js");
        a.hardcoded_urls = vec![
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
        ];
        a.patterns.insert(
            "endpoints".to_string(),
            PatternMatches {
                count: 2,
                values: vec!["/a".to_string()],
            },
        );

        let report = [b, a]
            .into_iter()
            .collect::<ProjectTotals>()
            .finalize(&selectors(), ComplexityScope::Subtree);
        assert_eq!(report.usage.hardcoded_urls.count, 3);
        assert_eq!(
            report.usage.hardcoded_urls.urls,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(report.usage.patterns["endpoints"].count, 3);
        assert_eq!(report.usage.patterns["endpoints"].values, vec!["/a", "/b"]);
    }

    #[test]
    fn test_structure_breakdown() {
        let mut a = file("src/components/App.jsx");
        a.module = "components".to_string();
        a.layer = "presentation".to_string();
        a.is_test_file = true;
        let mut b = file("src/components/Nav.jsx");
        b.module = "components".to_string();
        b.layer = "presentation".to_string();
        b.lines_of_code = 5;
        let c = file("index.js");

        let report = [a, b, c]
            .into_iter()
            .collect::<ProjectTotals>()
            .finalize(&selectors(), ComplexityScope::Subtree);
        assert_eq!(report.structure.module_count, 2);
        assert_eq!(report.structure.module_size["components"], 15);
        assert_eq!(report.structure.module_size["root"], 10);
        assert_eq!(report.structure.layer_size["presentation"], 15);
        assert_eq!(report.quality.test_file_count, 1);
        assert_eq!(report.composition.lines_of_code_per_file.len(), 3);
    }

    fn arb_file() -> impl Strategy<Value = FileMetrics> {
        (
            0usize..500,
            0usize..10,
            0usize..20,
            0usize..6,
            prop::collection::vec((0usize..4, any::<bool>()), 0..4),
            prop::collection::vec(0usize..3, 0..3),
            0usize..4,
        )
            .prop_map(|(loc, funcs, cyclo, depth, imports, urls, module)| {
                let mut f = file("placeholder");
                f.lines_of_code = loc;
                f.function_count = funcs;
                f.total_cyclomatic = cyclo + funcs;
                f.max_function_complexity = cyclo;
                f.max_nesting_depth = depth;
                f.module = format!("mod{module}");
                f.imports = imports
                    .into_iter()
                    .map(|(n, internal)| {
                        if internal {
                            import(&format!("./dep{n}"), DependencyKind::Internal)
                        } else {
                            import(&format!("dep{n}"), DependencyKind::External)
                        }
                    })
                    .collect();
                f.hardcoded_urls = urls
                    .into_iter()
                    .map(|u| format!("https://host{u}.example.com"))
                    .collect();
                f.patterns.insert(
                    "calls".to_string(),
                    PatternMatches {
                        count: funcs,
                        values: vec![format!("v{loc}")],
                    },
                );
                f.profile.add("modern", "arrowFunctions", funcs);
                f.profile
                    .insert_value("infrastructure", "env", format!("ENV{module}"));
                f
            })
    }

    fn arb_files() -> impl Strategy<Value = Vec<FileMetrics>> {
        prop::collection::vec(arb_file(), 0..8).prop_map(|mut files| {
            for (i, f) in files.iter_mut().enumerate() {
                f.path = format!("src/file{i}.js");
            }
            files
        })
    }

    proptest! {
        #[test]
        fn prop_merge_of_partition_equals_whole(files in arb_files(), split in 0usize..8) {
            let split = split.min(files.len());
            let whole: ProjectTotals = files.iter().cloned().collect();

            let mut left: ProjectTotals = files[..split].iter().cloned().collect();
            let right: ProjectTotals = files[split..].iter().cloned().collect();
            left.merge(right);

            prop_assert_eq!(left, whole);
        }

        #[test]
        fn prop_merge_is_order_independent(files in arb_files()) {
            let forward: ProjectTotals = files.iter().cloned().collect();
            let backward: ProjectTotals = files.iter().rev().cloned().collect();
            prop_assert_eq!(
                forward.finalize(&selectors(), ComplexityScope::Subtree),
                backward.finalize(&selectors(), ComplexityScope::Subtree)
            );
        }
    }
}
