use std::fmt::Write;

use crate::types::MetricRecord;

/// Content type served alongside the rendered document.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render one cycle's records as a text exposition document.
///
/// Each distinct metric name gets one HELP and one TYPE line, in first-seen
/// order, followed by every sample carrying that name.
pub fn render(records: &[MetricRecord]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        if !names.contains(&record.name) {
            names.push(record.name);
        }
    }

    let mut out = String::new();
    for name in names {
        let mut wrote_header = false;
        for record in records.iter().filter(|r| r.name == name) {
            if !wrote_header {
                let _ = writeln!(out, "# HELP {} {}", name, escape_help(record.help));
                let _ = writeln!(out, "# TYPE {} {}", name, record.kind.as_str());
                wrote_header = true;
            }
            let _ = writeln!(
                out,
                "{}{} {} {}",
                name,
                render_labels(&record.labels),
                record.value,
                record.timestamp
            );
        }
    }
    out
}

fn render_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let body: Vec<String> = labels
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, escape_label_value(value)))
        .collect();
    format!("{{{}}}", body.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
