use std::collections::BTreeMap;

use colored::Colorize;

use treestat_core::report::ProjectReport;
use treestat_core::ProfileMetrics;

/// Format a project report for terminal output.
pub fn format_report(report: &ProjectReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        format!("treestat - {} syntax tree metrics", report.language).bold()
    ));
    out.push_str(&format!("{}\n", "=".repeat(40)));

    let c = &report.composition;
    section(&mut out, "Composition");
    out.push_str(&format!("  Files: {}\n", c.file_count));
    out.push_str(&format!("  Lines of code: {}\n", c.total_lines_of_code));
    out.push_str(&format!("  Functions: {}\n", c.function_count));
    out.push_str(&format!("  Classes: {}\n", c.class_count));
    out.push_str(&format!(
        "  Comments: {} (ratio {})\n",
        c.total_comments, c.comment_to_code_ratio
    ));

    let x = &report.complexity;
    section(&mut out, "Complexity");
    out.push_str(&format!("  Scope: {}\n", x.scope));
    out.push_str(&format!("  Total cyclomatic: {}\n", x.total_cyclomatic));
    out.push_str(&format!(
        "  Average cyclomatic: {}\n",
        colorize_complexity(x.average_cyclomatic)
    ));
    out.push_str(&format!(
        "  Most complex function: {}\n",
        x.max_function_complexity
    ));
    out.push_str(&format!("  Max nesting depth: {}\n", x.max_nesting_depth));

    let d = &report.dependencies;
    section(&mut out, "Dependencies");
    out.push_str(&format!(
        "  Imports: {} ({} internal, {} external",
        d.import_count, d.internal_imports, d.external_imports
    ));
    if d.unresolved_imports > 0 {
        out.push_str(&format!(", {} unresolved", d.unresolved_imports));
    }
    out.push_str(")\n");
    out.push_str(&format!("  Third-party ratio: {}\n", d.third_party_ratio));
    if !d.direct_dependencies.is_empty() {
        out.push_str(&format!(
            "  Direct dependencies: {}\n",
            d.direct_dependencies.join(", ")
        ));
    }
    let detected: Vec<_> = report
        .frameworks
        .iter()
        .filter(|(_, labels)| !labels.is_empty())
        .collect();
    for (category, labels) in detected {
        out.push_str(&format!("  {}: {}\n", category.cyan(), labels.join(", ")));
    }

    let u = &report.usage;
    section(&mut out, "Usage");
    for (name, matches) in &u.patterns {
        out.push_str(&format!("  {name}: {}\n", matches.count));
    }
    out.push_str(&format!(
        "  Hardcoded URLs: {} ({} distinct)\n",
        u.hardcoded_urls.count,
        u.hardcoded_urls.urls.len()
    ));
    for url in &u.hardcoded_urls.urls {
        out.push_str(&format!("    {url}\n"));
    }

    let q = &report.quality;
    section(&mut out, "Quality");
    let todo = q.todo_fixme_count.to_string();
    out.push_str(&format!(
        "  TODO/FIXME comments: {}\n",
        if q.todo_fixme_count > 0 {
            todo.yellow()
        } else {
            todo.normal()
        }
    ));
    out.push_str(&format!("  Exception handlers: {}\n", q.try_catch_count));
    out.push_str(&format!("  Test files: {}\n", q.test_file_count));

    let s = &report.structure;
    section(&mut out, "Structure");
    out.push_str(&format!("  Modules: {}\n", s.module_count));
    push_sizes(&mut out, &s.module_size);
    out.push_str("  Layers:\n");
    push_sizes(&mut out, &s.layer_size);

    if !report.profile.is_empty() {
        format_profile(&mut out, &report.profile);
    }

    if !report.skipped_files.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Skipped files".red().bold(),
            report.skipped_files.len()
        ));
        for path in &report.skipped_files {
            out.push_str(&format!("  {path}\n"));
        }
    }

    out.push('\n');
    out
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n{}\n", title.bold(), "-".repeat(40)));
}

fn push_sizes(out: &mut String, sizes: &BTreeMap<String, usize>) {
    for (name, loc) in sizes {
        out.push_str(&format!("    {name}: {loc} LOC\n"));
    }
}

fn colorize_complexity(value: f64) -> colored::ColoredString {
    let s = format!("{value:.2}");
    if value <= 5.0 {
        s.green()
    } else if value <= 10.0 {
        s.yellow()
    } else {
        s.red()
    }
}

fn format_profile(out: &mut String, profile: &ProfileMetrics) {
    for (name, section_metrics) in &profile.sections {
        section(out, name);
        for (key, n) in &section_metrics.counts {
            out.push_str(&format!("  {key}: {n}\n"));
        }
        for (key, values) in &section_metrics.values {
            out.push_str(&format!("  {key}: {}\n", values.len()));
            for v in values {
                out.push_str(&format!("    {v}\n"));
            }
        }
    }
}
