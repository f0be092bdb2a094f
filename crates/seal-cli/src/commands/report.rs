//! Report rendering. key=value lines for humans and shell scripts, or the
//! serialized report as pretty JSON.

use anyhow::{Context, Result};
use seal_reconcile::{DeployGate, DriftFinding, DriftReport, StateNode};
use serde::Serialize;

/// JSON shape: the report's own fields plus the tier's action text.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a DriftReport,
    recommendation_description: &'static str,
}

fn value_or_dash(v: &Option<StateNode>) -> String {
    v.as_ref()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn finding_line(f: &DriftFinding) -> String {
    format!(
        "finding path={} kind={} category={} severity={} declared={} live={}",
        f.path,
        f.kind.as_str(),
        f.category,
        f.severity,
        value_or_dash(&f.declared_value),
        value_or_dash(&f.live_value),
    )
}

pub fn summary_lines(report: &DriftReport) -> Vec<String> {
    vec![
        format!("findings={}", report.findings.len()),
        format!("total_severity={}", report.total_severity),
        format!("recommendation={}", report.recommendation),
        format!("action={}", report.recommendation.description()),
    ]
}

pub fn text_lines(report: &DriftReport) -> Vec<String> {
    let mut out = summary_lines(report);
    out.extend(
        report
            .count_by_category()
            .into_iter()
            .map(|(category, n)| format!("category.{category}={n}")),
    );
    out.extend(report.findings.iter().map(finding_line));
    out
}

pub fn json(report: &DriftReport) -> Result<String> {
    let doc = JsonReport {
        report,
        recommendation_description: report.recommendation.description(),
    };
    serde_json::to_string_pretty(&doc).context("serialize drift report failed")
}

pub fn gate_line(gate: &DeployGate) -> &'static str {
    match gate {
        DeployGate::Permitted => "gate=permitted",
        DeployGate::Blocked { .. } => "gate=blocked",
    }
}
