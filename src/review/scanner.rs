//! # Scanner
//!
//! Aplica las reglas del registro a cada archivo. Un matcher que devuelve
//! error o entra en pánico no detiene el escaneo: se registra con `tracing`
//! y se convierte en un único hallazgo `RULE_FAILURE` por archivo.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;

use crate::errors::{ReviewError, ReviewResult};
use crate::rules::{CommitMetadata, FileContext, Finding, Hit, Rule, RuleRegistry, RULE_FAILURE};

/// Hechos de todo el conjunto de cambios, calculados una vez antes de escanear.
#[derive(Debug, Clone, Default)]
pub struct ScanEnv {
    known_paths: BTreeSet<String>,
    paired_found: BTreeSet<String>,
}

impl ScanEnv {
    /// * `known_paths` - rutas presentes en el conjunto de cambios
    /// * `paired_found` - archivos fuente cuyo test emparejado existe
    pub fn new(known_paths: BTreeSet<String>, paired_found: BTreeSet<String>) -> Self {
        Self {
            known_paths,
            paired_found,
        }
    }

    pub fn known_paths(&self) -> &BTreeSet<String> {
        &self.known_paths
    }

    pub fn has_paired_test(&self, source_path: &str) -> bool {
        self.paired_found.contains(source_path)
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

/// Ejecuta un matcher aislando errores y pánicos.
fn guarded(run: impl FnOnce() -> ReviewResult<Vec<Hit>>) -> Result<Vec<Hit>, String> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(hits)) => Ok(hits),
        Ok(Err(ReviewError::RuleEvaluation { reason, .. })) => Err(reason),
        Ok(Err(other)) => Err(other.to_string()),
        Err(payload) => Err(panic_reason(payload)),
    }
}

pub struct Scanner {
    registry: Arc<RuleRegistry>,
    excluded: BTreeSet<String>,
}

impl Scanner {
    pub fn new(registry: Arc<RuleRegistry>, excluded: BTreeSet<String>) -> Self {
        Self { registry, excluded }
    }

    fn enabled<'a>(&'a self, rules: impl Iterator<Item = &'a Rule> + 'a) -> impl Iterator<Item = &'a Rule> + 'a {
        rules.filter(move |rule| !self.excluded.contains(&rule.id))
    }

    /// Un hallazgo `RULE_FAILURE` que nombra todas las reglas que fallaron.
    fn failure_finding(&self, path: &str, failures: &[(String, String)]) -> Option<Finding> {
        if failures.is_empty() || self.excluded.contains(RULE_FAILURE) {
            return None;
        }
        let rule = self.registry.get(RULE_FAILURE)?;
        let detail = failures
            .iter()
            .map(|(id, reason)| format!("rule `{}` failed: {}", id, reason))
            .collect::<Vec<_>>()
            .join("; ");
        Some(rule.finding(path, Hit::file(detail)))
    }

    /// Hallazgos de un archivo, reglas en orden de registro.
    pub fn scan_file(&self, ctx: &FileContext, env: &ScanEnv) -> Vec<Finding> {
        tracing::debug!(path = %ctx.path, language = %ctx.language, "escaneando archivo");

        let mut findings = Vec::new();
        let mut failures = Vec::new();
        for rule in self.enabled(self.registry.applicable(ctx.language)) {
            match guarded(|| rule.matcher().check_file(ctx, env)) {
                Ok(hits) => findings.extend(hits.into_iter().map(|hit| rule.finding(&ctx.path, hit))),
                Err(reason) => {
                    tracing::warn!(rule_id = %rule.id, path = %ctx.path, %reason, "la regla falló");
                    failures.push((rule.id.clone(), reason));
                }
            }
        }
        findings.extend(self.failure_finding(&ctx.path, &failures));
        findings
    }

    /// Escaneo secuencial y perezoso: el consumidor puede parar en cualquier momento.
    pub fn scan<'a>(&'a self, files: &'a [FileContext], env: &'a ScanEnv) -> impl Iterator<Item = Finding> + 'a {
        files.iter().flat_map(move |ctx| self.scan_file(ctx, env))
    }

    /// Una tarea rayon por archivo; el resultado conserva el orden de `files`.
    pub fn scan_parallel(&self, files: &[FileContext], env: &ScanEnv) -> Vec<Finding> {
        files
            .par_iter()
            .map(|ctx| self.scan_file(ctx, env))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    /// Reglas de alcance commit sobre la rama y los mensajes.
    pub fn scan_commit(&self, meta: &CommitMetadata) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut failures = Vec::new();
        for rule in self.enabled(self.registry.commit_rules()) {
            match guarded(|| rule.matcher().check_commit(meta)) {
                Ok(hits) => findings.extend(hits.into_iter().map(|hit| rule.finding("commit", hit))),
                Err(reason) => {
                    tracing::warn!(rule_id = %rule.id, %reason, "la regla de commit falló");
                    failures.push((rule.id.clone(), reason));
                }
            }
        }
        findings.extend(self.failure_finding("commit", &failures));
        findings
    }
}
