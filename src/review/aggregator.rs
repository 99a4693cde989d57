//! Agregación de hallazgos: deduplicación, agrupación y conteos.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::rules::{Category, Finding, Severity};

/// Conteo por severidad; las tres severidades están siempre presentes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub suggestion: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Suggestion => self.suggestion,
        }
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Suggestion => self.suggestion += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.suggestion
    }
}

/// Hallazgos agrupados, todavía sin decisión.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub findings_by_category: BTreeMap<Category, Vec<Finding>>,
    pub total_by_severity: SeverityCounts,
}

impl Aggregation {
    pub fn count(&self, severity: Severity) -> usize {
        self.total_by_severity.get(severity)
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings_by_category.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.total_by_severity.total() == 0
    }
}

/// Deduplica por `(rule_id, path, line)` conservando la primera aparición y
/// ordena cada categoría por severidad descendente, ruta, línea, regla y mensaje.
pub fn aggregate<I>(findings: I) -> Aggregation
where
    I: IntoIterator<Item = Finding>,
{
    let mut seen = HashSet::new();
    let mut aggregation = Aggregation::default();

    for finding in findings {
        if !seen.insert((finding.rule_id.clone(), finding.path.clone(), finding.line)) {
            continue;
        }
        aggregation.total_by_severity.add(finding.severity);
        aggregation
            .findings_by_category
            .entry(finding.category)
            .or_default()
            .push(finding);
    }

    for group in aggregation.findings_by_category.values_mut() {
        group.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.line.cmp(&b.line))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
                .then_with(|| a.message.cmp(&b.message))
        });
    }
    aggregation
}
