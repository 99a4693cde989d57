//! # Política de decisión
//!
//! Convierte los conteos por severidad en `APPROVE`, `COMMENT` o
//! `REQUEST_CHANGES` usando una tabla de umbrales inyectable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ReviewError, ReviewResult};
use crate::review::aggregator::{Aggregation, SeverityCounts};
use crate::rules::{Category, Finding, Severity};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Comment,
    RequestChanges,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Comment => "COMMENT",
            Decision::RequestChanges => "REQUEST_CHANGES",
        }
    }

    /// Acepta `REQUEST_CHANGES`, `request_changes` o `request-changes`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "APPROVE" => Some(Decision::Approve),
            "COMMENT" => Some(Decision::Comment),
            "REQUEST_CHANGES" => Some(Decision::RequestChanges),
            _ => None,
        }
    }

    /// Código de salida del CLI: solo `REQUEST_CHANGES` falla.
    pub fn exit_code(&self) -> i32 {
        match self {
            Decision::Approve | Decision::Comment => 0,
            Decision::RequestChanges => 1,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fila de la tabla: si hay al menos `at_least` hallazgos de `severity`, aplica `decision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub severity: Severity,
    pub at_least: usize,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyThresholds(Vec<Threshold>);

impl PolicyThresholds {
    pub fn new(rows: Vec<Threshold>) -> ReviewResult<Self> {
        if let Some(row) = rows.iter().find(|row| row.at_least == 0) {
            return Err(ReviewError::InvalidConfiguration(format!(
                "el umbral de '{}' debe ser al menos 1",
                row.severity.name()
            )));
        }
        Ok(Self(rows))
    }

    pub fn rows(&self) -> &[Threshold] {
        &self.0
    }
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self(vec![
            Threshold {
                severity: Severity::Critical,
                at_least: 1,
                decision: Decision::RequestChanges,
            },
            Threshold {
                severity: Severity::Warning,
                at_least: 3,
                decision: Decision::RequestChanges,
            },
            Threshold {
                severity: Severity::Warning,
                at_least: 1,
                decision: Decision::Comment,
            },
            Threshold {
                severity: Severity::Suggestion,
                at_least: 1,
                decision: Decision::Comment,
            },
        ])
    }
}

/// Resultado final de una revisión. Solo [`DecisionPolicy::seal`] lo construye.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedReport {
    findings_by_category: BTreeMap<Category, Vec<Finding>>,
    total_by_severity: SeverityCounts,
    decision: Decision,
}

impl AggregatedReport {
    pub fn findings_by_category(&self) -> &BTreeMap<Category, Vec<Finding>> {
        &self.findings_by_category
    }

    pub fn total_by_severity(&self) -> SeverityCounts {
        self.total_by_severity
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings_by_category.values().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    thresholds: PolicyThresholds,
}

impl DecisionPolicy {
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self { thresholds }
    }

    /// La decisión más severa entre las filas que se cumplen; `Approve` si ninguna.
    pub fn decide(&self, aggregation: &Aggregation) -> Decision {
        self.thresholds
            .rows()
            .iter()
            .filter(|row| aggregation.count(row.severity) >= row.at_least)
            .map(|row| row.decision)
            .max()
            .unwrap_or(Decision::Approve)
    }

    pub fn seal(&self, aggregation: Aggregation) -> AggregatedReport {
        let decision = self.decide(&aggregation);
        AggregatedReport {
            findings_by_category: aggregation.findings_by_category,
            total_by_severity: aggregation.total_by_severity,
            decision,
        }
    }
}
