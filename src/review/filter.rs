//! Filtro de reporte: reglas excluidas y severidad mínima por categoría.

use std::collections::{BTreeMap, BTreeSet};

use crate::rules::{Category, Finding, Severity};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    min_severity: BTreeMap<Category, Severity>,
    excluded: BTreeSet<String>,
}

impl ReportFilter {
    pub fn new(min_severity: BTreeMap<Category, Severity>, excluded: BTreeSet<String>) -> Self {
        Self {
            min_severity,
            excluded,
        }
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn min_severity(&self, category: Category) -> Severity {
        self.min_severity
            .get(&category)
            .copied()
            .unwrap_or(Severity::Suggestion)
    }

    pub fn is_excluded(&self, rule_id: &str) -> bool {
        self.excluded.contains(rule_id)
    }

    pub fn keeps(&self, finding: &Finding) -> bool {
        !self.is_excluded(&finding.rule_id) && finding.severity >= self.min_severity(finding.category)
    }
}
