//! Reporte estructurado (JSON camelCase) construido a partir del resultado sellado.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::review::aggregator::SeverityCounts;
use crate::review::policy::{AggregatedReport, Decision};
use crate::rules::{Category, Severity};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportFinding {
    pub rule_id: String,
    pub severity: Severity,
    pub path: String,
    pub line: usize,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub decision: Decision,
    pub findings_by_category: BTreeMap<Category, Vec<ReportFinding>>,
    pub summary_counts: SeverityCounts,
}

impl Report {
    pub fn from_aggregated(aggregated: &AggregatedReport) -> Self {
        let findings_by_category = aggregated
            .findings_by_category()
            .iter()
            .map(|(category, findings)| {
                let rows = findings
                    .iter()
                    .map(|f| ReportFinding {
                        rule_id: f.rule_id.clone(),
                        severity: f.severity,
                        path: f.path.clone(),
                        line: f.line,
                        message: f.message.clone(),
                    })
                    .collect();
                (*category, rows)
            })
            .collect();

        Self {
            decision: aggregated.decision(),
            findings_by_category,
            summary_counts: aggregated.total_by_severity(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn finding_count(&self) -> usize {
        self.findings_by_category.values().map(Vec::len).sum()
    }
}
