use std::collections::BTreeMap;

use treestat_core::report::ProjectReport;

fn table_header(out: &mut String, left: &str, right: &str) {
    out.push_str(&format!("| {left} | {right} |\n"));
    out.push_str(&format!(
        "|{}|{}|\n",
        "-".repeat(left.len() + 2),
        "-".repeat(right.len() + 2)
    ));
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("| {label} | {value} |\n"));
}

fn size_table(out: &mut String, title: &str, key: &str, sizes: &BTreeMap<String, usize>) {
    if sizes.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {title}\n\n"));
    table_header(out, key, "Lines of code");
    for (name, loc) in sizes {
        row(out, name, loc);
    }
}

/// Format a project report as Markdown.
pub fn format_report(report: &ProjectReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# treestat - {} syntax tree metrics\n\n",
        report.language
    ));

    let c = &report.composition;
    out.push_str("## Composition\n\n");
    table_header(&mut out, "Metric", "Value");
    row(&mut out, "Files", c.file_count);
    row(&mut out, "Lines of code", c.total_lines_of_code);
    row(&mut out, "Functions", c.function_count);
    row(&mut out, "Classes", c.class_count);
    row(&mut out, "Comments", c.total_comments);
    row(&mut out, "Comment-to-code ratio", c.comment_to_code_ratio);

    let x = &report.complexity;
    out.push_str("\n## Complexity\n\n");
    table_header(&mut out, "Metric", "Value");
    row(&mut out, "Scope", format!("`{}`", x.scope));
    row(&mut out, "Total cyclomatic", x.total_cyclomatic);
    row(&mut out, "Average cyclomatic", x.average_cyclomatic);
    row(&mut out, "Most complex function", x.max_function_complexity);
    row(&mut out, "Max nesting depth", x.max_nesting_depth);

    let d = &report.dependencies;
    out.push_str("\n## Dependencies\n\n");
    table_header(&mut out, "Metric", "Value");
    row(&mut out, "Imports", d.import_count);
    row(&mut out, "Internal", d.internal_imports);
    row(&mut out, "External", d.external_imports);
    row(&mut out, "Unresolved", d.unresolved_imports);
    row(&mut out, "Third-party ratio", d.third_party_ratio);

    if !d.import_frequency.is_empty() {
        out.push_str("\n### Import Frequency\n\n");
        table_header(&mut out, "Module", "Count");
        for (name, n) in &d.import_frequency {
            row(&mut out, &format!("`{name}`"), n);
        }
    }

    if report.frameworks.values().any(|labels| !labels.is_empty()) {
        out.push_str("\n### Detected Technologies\n\n");
        table_header(&mut out, "Category", "Detected");
        for (category, labels) in &report.frameworks {
            if !labels.is_empty() {
                row(&mut out, category, labels.join(", "));
            }
        }
    }

    let u = &report.usage;
    out.push_str("\n## Usage\n\n");
    table_header(&mut out, "Pattern", "Count");
    for (name, matches) in &u.patterns {
        row(&mut out, name, matches.count);
    }
    row(&mut out, "Hardcoded URLs", u.hardcoded_urls.count);
    if !u.hardcoded_urls.urls.is_empty() {
        out.push('\n');
        for url in &u.hardcoded_urls.urls {
            out.push_str(&format!("- `{url}`\n"));
        }
    }

    let q = &report.quality;
    out.push_str("\n## Quality\n\n");
    table_header(&mut out, "Metric", "Value");
    row(&mut out, "TODO/FIXME comments", q.todo_fixme_count);
    row(&mut out, "Exception handlers", q.try_catch_count);
    row(&mut out, "Test files", q.test_file_count);

    let s = &report.structure;
    out.push_str(&format!("\n## Structure\n\n**Modules:** {}\n", s.module_count));
    size_table(&mut out, "Modules", "Module", &s.module_size);
    size_table(&mut out, "Layers", "Layer", &s.layer_size);

    for (name, section) in &report.profile.sections {
        out.push_str(&format!("\n## Profile: {name}\n\n"));
        if !section.counts.is_empty() {
            table_header(&mut out, "Metric", "Count");
            for (key, n) in &section.counts {
                row(&mut out, key, n);
            }
        }
        for (key, values) in &section.values {
            out.push_str(&format!("\n**{key}:** {}\n", values.len()));
            for v in values {
                out.push_str(&format!("- `{v}`\n"));
            }
        }
    }

    if !report.skipped_files.is_empty() {
        out.push_str(&format!(
            "\n## Skipped Files ({})\n\n",
            report.skipped_files.len()
        ));
        for path in &report.skipped_files {
            out.push_str(&format!("- `{path}`\n"));
        }
    }

    out
}
