use treestat_core::ProjectReport;

/// Format a project report as JSON.
pub fn format_report(report: &ProjectReport, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    }
}
