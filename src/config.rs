//! # Configuración del motor de revisión
//!
//! El documento de overrides del proyecto vive en `.sentinel/review.toml`
//! (o `.sentinel/review.yaml`). Se consume como datos: umbrales de severidad
//! por categoría, reglas excluidas, tabla de decisión y parámetros de las
//! reglas. Cualquier referencia desconocida es un error fatal, porque un
//! override ignorado en silencio podría ocultar problemas reales.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ReviewError, ReviewResult};
use crate::review::filter::ReportFilter;
use crate::review::policy::{Decision, PolicyThresholds, Threshold};
use crate::rules::{Category, RuleRegistry, Severity};

/// Versión actual (leída desde Cargo.toml en tiempo de compilación)
pub const SENTINEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directorio de configuración dentro del proyecto.
pub const CONFIG_DIR: &str = ".sentinel";
const CONFIG_FILES: [&str; 3] = ["review.toml", "review.yaml", "review.yml"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReviewConfig {
    pub report: ReportConfig,
    pub policy: PolicyConfig,
    pub rules: RuleSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Categoría → severidad mínima a reportar (ej: `quality = "warning"`).
    pub min_severity: BTreeMap<String, String>,
    /// IDs de reglas que no se evalúan.
    pub exclude_rules: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Filas `{severity, at_least, decision}`. Vacío = tabla por defecto.
    pub thresholds: Vec<ThresholdRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThresholdRow {
    pub severity: String,
    pub at_least: usize,
    pub decision: String,
}

/// Parámetros de las reglas del catálogo.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RuleSettings {
    /// Módulos donde la salida directa a consola está permitida.
    pub logging_modules: Vec<String>,
    /// Módulos de configuración cuyas primeras líneas pueden contener literales.
    pub config_modules: Vec<String>,
    /// Tamaño (en líneas) de la región de carga de configuración.
    pub config_region_lines: usize,
    /// Prefijos válidos para nombres de rama.
    pub branch_prefixes: Vec<String>,
    /// Tipos válidos en `tipo: descripción`.
    pub commit_types: Vec<String>,
    /// Longitud mínima de la descripción del commit.
    pub min_commit_description: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            logging_modules: strings(&["log", "logger", "logging", "bin", "cli", "scripts"]),
            config_modules: strings(&["config", "configuration", "settings", "constants", "env"]),
            config_region_lines: 50,
            branch_prefixes: strings(&[
                "feature/", "feat/", "fix/", "bugfix/", "hotfix/", "chore/", "refactor/",
                "docs/", "test/", "release/",
            ]),
            commit_types: strings(&[
                "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci",
                "chore", "revert",
            ]),
            min_commit_description: 10,
        }
    }
}

/// Verifica si una ruta pertenece a alguno de los módulos indicados.
///
/// Un patrón con `/` se busca como subcadena; uno sin `/` debe coincidir con
/// un segmento de directorio o con el nombre base del archivo.
pub fn path_matches_module(path: &str, patterns: &[String]) -> bool {
    let rooted = format!("/{}", path);
    let mut segments = path.split('/').collect::<Vec<_>>();
    let file_stem = segments
        .pop()
        .map(|name| name.split('.').next().unwrap_or(name))
        .unwrap_or("");

    patterns.iter().any(|pattern| {
        if pattern.contains('/') {
            rooted.contains(pattern.as_str())
        } else {
            segments.contains(&pattern.as_str()) || file_stem == pattern
        }
    })
}

impl ReviewConfig {
    /// Carga la configuración del proyecto. Sin archivo → valores por defecto.
    pub fn load(project_root: &Path) -> ReviewResult<Self> {
        let dir = project_root.join(CONFIG_DIR);
        match CONFIG_FILES.iter().map(|f| dir.join(f)).find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Lee un documento TOML o YAML según su extensión.
    pub fn from_file(path: &Path) -> ReviewResult<Self> {
        let content = fs::read_to_string(path)?;
        let parse_err = |reason: String| ReviewError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))
            }
            _ => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Busca la raíz del proyecto subiendo desde el directorio actual hasta
    /// encontrar `.sentinel/` o `.git/`.
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            if current.join(CONFIG_DIR).is_dir() || current.join(".git").exists() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Valida el documento contra el registro y lo convierte en tipos del motor.
    pub fn validate(&self, registry: &RuleRegistry) -> ReviewResult<(ReportFilter, PolicyThresholds)> {
        let mut min_severity = BTreeMap::new();
        for (raw_category, raw_severity) in &self.report.min_severity {
            let category = Category::parse(raw_category).ok_or_else(|| {
                ReviewError::InvalidConfiguration(format!("categoría desconocida '{}'", raw_category))
            })?;
            let severity = Severity::parse(raw_severity).ok_or_else(|| {
                ReviewError::InvalidConfiguration(format!(
                    "severidad desconocida '{}' para la categoría '{}'",
                    raw_severity, raw_category
                ))
            })?;
            min_severity.insert(category, severity);
        }

        let mut excluded = BTreeSet::new();
        for id in &self.report.exclude_rules {
            if !registry.contains(id) {
                return Err(ReviewError::InvalidConfiguration(format!(
                    "la regla excluida '{}' no existe en el registro",
                    id
                )));
            }
            excluded.insert(id.clone());
        }

        let thresholds = if self.policy.thresholds.is_empty() {
            PolicyThresholds::default()
        } else {
            let rows = self
                .policy
                .thresholds
                .iter()
                .map(|row| {
                    let severity = Severity::parse(&row.severity).ok_or_else(|| {
                        ReviewError::InvalidConfiguration(format!("severidad desconocida '{}'", row.severity))
                    })?;
                    let decision = Decision::parse(&row.decision).ok_or_else(|| {
                        ReviewError::InvalidConfiguration(format!("decisión desconocida '{}'", row.decision))
                    })?;
                    Ok(Threshold {
                        severity,
                        at_least: row.at_least,
                        decision,
                    })
                })
                .collect::<ReviewResult<Vec<_>>>()?;
            PolicyThresholds::new(rows)?
        };

        Ok((ReportFilter::new(min_severity, excluded), thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> RuleRegistry {
        RuleRegistry::builtin(&RuleSettings::default()).unwrap()
    }

    #[test]
    fn test_load_without_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ReviewConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, ReviewConfig::default());
    }

    #[test]
    fn test_load_toml_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("review.toml"),
            r#"
[report]
exclude_rules = ["COMMENTED_OUT_CODE"]

[report.min_severity]
quality = "warning"

[[policy.thresholds]]
severity = "critical"
at_least = 1
decision = "REQUEST_CHANGES"

[rules]
config_region_lines = 20
"#,
        )
        .unwrap();

        let config = ReviewConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.report.exclude_rules, vec!["COMMENTED_OUT_CODE"]);
        assert_eq!(config.rules.config_region_lines, 20);
        // Campos no especificados conservan el valor por defecto
        assert_eq!(config.rules.min_commit_description, 10);

        let (filter, thresholds) = config.validate(&registry()).unwrap();
        assert!(filter.excluded().contains("COMMENTED_OUT_CODE"));
        assert_eq!(thresholds.rows().len(), 1);
    }

    #[test]
    fn test_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("review.yaml"),
            "report:\n  exclude_rules:\n    - DIRECT_OUTPUT\nrules:\n  logging_modules: [\"telemetry\"]\n",
        )
        .unwrap();

        let config = ReviewConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.report.exclude_rules, vec!["DIRECT_OUTPUT"]);
        assert_eq!(config.rules.logging_modules, vec!["telemetry"]);
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("review.toml");
        fs::write(&path, "[report\nexclude_rules = 3").unwrap();
        let err = ReviewConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ReviewError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_rule_id_is_invalid() {
        let mut config = ReviewConfig::default();
        config.report.exclude_rules.push("NO_SUCH_RULE".into());
        let err = config.validate(&registry()).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_category_is_invalid() {
        let mut config = ReviewConfig::default();
        config.report.min_severity.insert("performance".into(), "warning".into());
        assert!(matches!(
            config.validate(&registry()),
            Err(ReviewError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_decision_is_invalid() {
        let mut config = ReviewConfig::default();
        config.policy.thresholds.push(ThresholdRow {
            severity: "warning".into(),
            at_least: 1,
            decision: "BLOCK".into(),
        });
        assert!(matches!(
            config.validate(&registry()),
            Err(ReviewError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_path_matches_module() {
        let logging = strings(&["logger", "bin", "src/tools/"]);
        assert!(path_matches_module("src/utils/logger.ts", &logging));
        assert!(path_matches_module("src/bin/main.rs", &logging));
        assert!(path_matches_module("src/tools/gen.py", &logging));
        assert!(!path_matches_module("src/catalog.ts", &logging));
        assert!(!path_matches_module("src/cabin/app.ts", &logging));
    }
}
