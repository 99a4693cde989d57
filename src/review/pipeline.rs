//! # Pipeline de revisión
//!
//! clasificar → escanear → filtrar → agregar → decidir.
//!
//! La configuración se valida en [`ReviewEngine::new`], antes de escanear
//! nada; a partir de ahí una revisión no falla: los problemas locales a un
//! archivo o a una regla se reportan como hallazgos internos.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ReviewConfig;
use crate::errors::{ReviewError, ReviewResult};
use crate::files::buscar_test_emparejado;
use crate::language::{normalize_path, LanguageClassifier, ProjectMarkers};
use crate::review::aggregator::aggregate;
use crate::review::filter::ReportFilter;
use crate::review::policy::{AggregatedReport, DecisionPolicy};
use crate::review::scanner::{ScanEnv, Scanner};
use crate::rules::{CommitMetadata, FileContext, Finding, Hit, RuleRegistry, Severity, UNREADABLE_FILE};

/// Archivo del conjunto de cambios tal como lo entrega el llamador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub content: Vec<u8>,
    /// `false` = solo contexto (p. ej. un test existente), no se escanea.
    pub is_new_or_modified: bool,
    /// Motivo si el llamador no pudo leer el archivo; se reporta como `UNREADABLE_FILE`.
    pub read_error: Option<String>,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            is_new_or_modified: true,
            read_error: None,
        }
    }

    /// Archivo modificado que no se pudo leer (permisos, borrado a mitad de camino...).
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            read_error: Some(reason.into()),
            ..Self::new(path, Vec::new())
        }
    }

    pub fn context(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            is_new_or_modified: false,
            ..Self::new(path, content)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub files: Vec<ChangedFile>,
    pub commit: Option<CommitMetadata>,
    /// Raíz para comprobar en disco si existen los tests emparejados.
    pub project_root: Option<PathBuf>,
    pub markers: ProjectMarkers,
}

/// Decodifica el contenido; ilegible, binario o UTF-8 inválido no se escanea.
fn decode(path: &str, file: &ChangedFile) -> ReviewResult<String> {
    if let Some(reason) = &file.read_error {
        return Err(ReviewError::UnreadableFile {
            path: path.to_string(),
            reason: reason.clone(),
        });
    }
    let content = &file.content;
    if content.contains(&0) {
        return Err(ReviewError::UnreadableFile {
            path: path.to_string(),
            reason: "binary content".to_string(),
        });
    }
    String::from_utf8(content.to_vec()).map_err(|e| ReviewError::UnreadableFile {
        path: path.to_string(),
        reason: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
    })
}

/// Archivos listos para escanear más los hallazgos previos al escaneo.
struct Prepared {
    contexts: Vec<FileContext>,
    env: ScanEnv,
    unreadable: Vec<Finding>,
}

pub struct ReviewEngine {
    registry: Arc<RuleRegistry>,
    filter: ReportFilter,
    policy: DecisionPolicy,
    scanner: Scanner,
}

impl ReviewEngine {
    /// Construye el registro integrado y valida la configuración contra él.
    pub fn new(config: &ReviewConfig) -> ReviewResult<Self> {
        let registry = Arc::new(RuleRegistry::builtin(&config.rules)?);
        let (filter, thresholds) = config.validate(&registry)?;
        let scanner = Scanner::new(Arc::clone(&registry), filter.excluded().clone());
        Ok(Self {
            registry,
            filter,
            policy: DecisionPolicy::new(thresholds),
            scanner,
        })
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &ReportFilter {
        &self.filter
    }

    fn prepare(&self, changeset: &Changeset) -> Prepared {
        let classifier = LanguageClassifier::new(changeset.markers.clone());
        let known_paths: BTreeSet<String> = changeset.files.iter().map(|f| normalize_path(&f.path)).collect();
        let project_root = changeset.project_root.as_deref();

        let mut contexts = Vec::new();
        let mut paired_found = BTreeSet::new();
        let mut unreadable = Vec::new();

        for file in changeset.files.iter().filter(|f| f.is_new_or_modified) {
            let path = normalize_path(&file.path);
            let content = match decode(&path, file) {
                Ok(content) => content,
                Err(ReviewError::UnreadableFile { path, reason }) => {
                    tracing::warn!(%path, %reason, "archivo ilegible, se omite");
                    if let Some(rule) = self.registry.get(UNREADABLE_FILE) {
                        unreadable.push(rule.finding(&path, Hit::file(format!("file could not be read: {}", reason))));
                    }
                    continue;
                }
                Err(other) => {
                    tracing::warn!(%path, error = %other, "archivo omitido");
                    continue;
                }
            };

            let classification = classifier.classify(&path);
            if buscar_test_emparejado(&classification, &known_paths, project_root).is_some() {
                paired_found.insert(path.clone());
            }
            contexts.push(FileContext {
                path,
                language: classification.language,
                content,
                is_test: classification.is_test,
                paired_test: classification.paired_test,
            });
        }

        Prepared {
            contexts,
            env: ScanEnv::new(known_paths, paired_found),
            unreadable,
        }
    }

    fn seal(&self, findings: Vec<Finding>) -> AggregatedReport {
        let report = self.policy.seal(aggregate(findings));
        let counts = report.total_by_severity();
        tracing::info!(
            decision = %report.decision(),
            critical = counts.critical,
            warning = counts.warning,
            suggestion = counts.suggestion,
            "revisión completada"
        );
        report
    }

    /// Revisión completa; los archivos se escanean en paralelo.
    pub fn review(&self, changeset: &Changeset) -> AggregatedReport {
        let prepared = self.prepare(changeset);
        let mut findings = prepared.unreadable;
        findings.extend(self.scanner.scan_parallel(&prepared.contexts, &prepared.env));
        if let Some(meta) = &changeset.commit {
            findings.extend(self.scanner.scan_commit(meta));
        }
        findings.retain(|f| self.filter.keeps(f));
        self.seal(findings)
    }

    /// Como [`review`](Self::review) pero deja de escanear en el primer hallazgo crítico.
    pub fn review_fail_fast(&self, changeset: &Changeset) -> AggregatedReport {
        let prepared = self.prepare(changeset);
        let mut findings: Vec<Finding> = prepared.unreadable;
        findings.retain(|f| self.filter.keeps(f));

        let mut blocked = false;
        for finding in self
            .scanner
            .scan(&prepared.contexts, &prepared.env)
            .filter(|f| self.filter.keeps(f))
        {
            blocked = finding.severity == Severity::Critical;
            findings.push(finding);
            if blocked {
                tracing::debug!("primer hallazgo crítico, se detiene el escaneo");
                break;
            }
        }

        if !blocked {
            if let Some(meta) = &changeset.commit {
                findings.extend(self.scanner.scan_commit(meta).into_iter().filter(|f| self.filter.keeps(f)));
            }
        }
        self.seal(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::policy::Decision;
    use crate::review::report::Report;
    use crate::rules::{Category, CommitInfo};
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine() -> ReviewEngine {
        ReviewEngine::new(&ReviewConfig::default()).unwrap()
    }

    fn changeset(files: Vec<ChangedFile>) -> Changeset {
        Changeset {
            files,
            ..Changeset::default()
        }
    }

    fn rule_ids(report: &AggregatedReport) -> Vec<&str> {
        report.findings().map(|f| f.rule_id.as_str()).collect()
    }

    const GREET_TS: &str = "export function greet(name: string) {\n  console.log(name);\n}\n";
    const LOAD_TS: &str = "export function load() {\n  try {\n    run();\n  } catch (e) {\n  }\n}\n";
    const MATH_GO: &str = "package math\n\nfunc Add(a int, b int) int {\n\treturn a + b\n}\n";

    #[test]
    fn test_direct_output_yields_comment() {
        let report = engine().review(&changeset(vec![
            ChangedFile::new("src/app.ts", GREET_TS),
            ChangedFile::context("src/app.test.ts", "test('x', () => {});\n"),
        ]));
        assert_eq!(rule_ids(&report), vec!["DIRECT_OUTPUT"]);
        let finding = report.findings().next().unwrap();
        assert_eq!(finding.category, Category::Quality);
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.line, 2);
        assert_eq!(report.decision(), Decision::Comment);
    }

    #[test]
    fn test_read_error_does_not_abort_the_review() {
        let report = engine().review(&changeset(vec![
            ChangedFile::unreadable("src/locked.ts", "permission denied"),
            ChangedFile::new("src/app.ts", "export function f() {\n  console.log(\"x\");\n}\n"),
        ]));
        let unreadable: Vec<&Finding> = report.findings().filter(|f| f.rule_id == UNREADABLE_FILE).collect();
        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].path, "src/locked.ts");
        assert_eq!(unreadable[0].message, "file could not be read: permission denied");
        assert!(report.findings().any(|f| f.rule_id == "DIRECT_OUTPUT" && f.path == "src/app.ts"));
    }

    #[test]
    fn test_weak_assertions_request_changes() {
        let src = "from calc import add\n\n\ndef test_add():\n    result = add(2, 2)\n    assert result != None\n";
        let report = engine().review(&changeset(vec![ChangedFile::new("tests/test_calc.py", src)]));
        assert_eq!(rule_ids(&report), vec!["WEAK_ASSERTIONS"]);
        assert_eq!(report.total_by_severity().critical, 1);
        assert_eq!(report.decision(), Decision::RequestChanges);
    }

    #[test]
    fn test_missing_paired_test_yields_comment() {
        let src = "package payments\n\nfunc Total(a int, b int) int {\n\treturn a + b\n}\n";
        let report = engine().review(&changeset(vec![ChangedFile::new("src/payments.go", src)]));
        assert_eq!(rule_ids(&report), vec!["MISSING_TEST_FILE"]);
        let finding = report.findings().next().unwrap();
        assert_eq!(finding.category, Category::Testing);
        assert!(finding.message.starts_with("no test file found"));
        assert_eq!(report.decision(), Decision::Comment);
    }

    #[test]
    fn test_empty_catch_requests_changes() {
        let report = engine().review(&changeset(vec![
            ChangedFile::new("src/service.ts", LOAD_TS),
            ChangedFile::context("src/service.test.ts", ""),
        ]));
        assert_eq!(rule_ids(&report), vec!["EMPTY_CATCH"]);
        assert_eq!(report.findings().next().unwrap().category, Category::ErrorHandling);
        assert_eq!(report.decision(), Decision::RequestChanges);
    }

    #[test]
    fn test_clean_change_is_approved() {
        let report = engine().review(&changeset(vec![
            ChangedFile::new("src/math.go", MATH_GO),
            ChangedFile::context("src/math_test.go", ""),
        ]));
        assert_eq!(report.decision(), Decision::Approve);
        let json = Report::from_aggregated(&report).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summaryCounts"]["critical"], 0);
        assert_eq!(value["summaryCounts"]["warning"], 0);
        assert_eq!(value["summaryCounts"]["suggestion"], 0);
    }

    #[test]
    fn test_paired_test_found_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/math_test.go"), "package math\n").unwrap();

        let report = engine().review(&Changeset {
            files: vec![ChangedFile::new("src/math.go", MATH_GO)],
            project_root: Some(temp_dir.path().to_path_buf()),
            ..Changeset::default()
        });
        assert_eq!(report.decision(), Decision::Approve);
    }

    #[test]
    fn test_unreadable_file_becomes_internal_finding() {
        let report = engine().review(&changeset(vec![
            ChangedFile::new("assets/logo.ts", vec![0x89u8, 0x50, 0x4e, 0x47, 0x00, 0x01]),
            ChangedFile::new("src/legacy.py", vec![0x66u8, 0xff, 0xfe]),
        ]));
        assert_eq!(rule_ids(&report), vec!["UNREADABLE_FILE", "UNREADABLE_FILE"]);
        let paths: Vec<&str> = report.findings().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["assets/logo.ts", "src/legacy.py"]);
        assert_eq!(report.findings().next().unwrap().category, Category::Internal);
        assert_eq!(report.decision(), Decision::Comment);
    }

    #[test]
    fn test_context_files_are_not_scanned() {
        let report = engine().review(&changeset(vec![ChangedFile::context("src/app.ts", GREET_TS)]));
        assert_eq!(report.decision(), Decision::Approve);
    }

    #[test]
    fn test_exclusions_from_config() {
        let mut config = ReviewConfig::default();
        config.report.exclude_rules = vec!["DIRECT_OUTPUT".to_string()];
        let engine = ReviewEngine::new(&config).unwrap();
        let report = engine.review(&changeset(vec![
            ChangedFile::new("src/app.ts", GREET_TS),
            ChangedFile::context("src/app.test.ts", ""),
        ]));
        assert_eq!(report.decision(), Decision::Approve);
    }

    #[test]
    fn test_invalid_config_fails_before_scanning() {
        let mut config = ReviewConfig::default();
        config.report.exclude_rules = vec!["NO_SUCH_RULE".to_string()];
        assert!(matches!(
            ReviewEngine::new(&config),
            Err(ReviewError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_commit_metadata_is_reviewed() {
        let report = engine().review(&Changeset {
            commit: Some(CommitMetadata {
                branch: Some("my-changes".to_string()),
                commits: vec![CommitInfo {
                    id: "0123456789abcdef".to_string(),
                    message: "feat(api): add pagination to list endpoints".to_string(),
                }],
            }),
            ..Changeset::default()
        });
        assert_eq!(rule_ids(&report), vec!["BRANCH_NAME"]);
        assert_eq!(report.findings().next().unwrap().path, "branch:my-changes");
        assert_eq!(report.decision(), Decision::Comment);
    }

    #[test]
    fn test_fail_fast_stops_at_first_critical() {
        let files = vec![
            ChangedFile::new("src/service.ts", LOAD_TS),
            ChangedFile::context("src/service.test.ts", ""),
            ChangedFile::new("src/other.ts", LOAD_TS),
            ChangedFile::context("src/other.test.ts", ""),
        ];
        let engine = engine();
        let full = engine.review(&changeset(files.clone()));
        let fast = engine.review_fail_fast(&changeset(files));
        assert_eq!(full.total_by_severity().critical, 2);
        assert_eq!(fast.total_by_severity().critical, 1);
        assert_eq!(fast.decision(), Decision::RequestChanges);
    }

    const SNIPPETS: &[(&str, &str)] = &[
        ("src/app.ts", GREET_TS),
        ("src/service.ts", LOAD_TS),
        ("src/math.go", MATH_GO),
        ("app/settings_view.py", "import os\n\n\ndef view():\n    print('ok')\n"),
        ("src/Client.java", "public class Client {\n    String url = \"https://api.example.com/v1\";\n}\n"),
        ("README.md", "# docs\n"),
    ];

    fn files_from(indices: &[usize]) -> Vec<ChangedFile> {
        indices
            .iter()
            .map(|&i| ChangedFile::new(SNIPPETS[i].0, SNIPPETS[i].1))
            .collect()
    }

    proptest! {
        #[test]
        fn identical_inputs_give_identical_reports(indices in prop::collection::vec(0usize..SNIPPETS.len(), 0..6)) {
            let engine = engine();
            let set = changeset(files_from(&indices));
            let first = Report::from_aggregated(&engine.review(&set)).to_json().unwrap();
            let second = Report::from_aggregated(&engine.review(&set)).to_json().unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn adding_a_clean_file_keeps_the_decision(indices in prop::collection::vec(0usize..SNIPPETS.len(), 0..6)) {
            let engine = engine();
            let before = engine.review(&changeset(files_from(&indices))).decision();
            let mut files = files_from(&indices);
            files.push(ChangedFile::new("docs/notes.txt", "nothing to see\n"));
            let after = engine.review(&changeset(files)).decision();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn adding_a_critical_never_lowers_request_changes(indices in prop::collection::vec(0usize..SNIPPETS.len(), 0..6)) {
            let engine = engine();
            let mut files = files_from(&indices);
            files.push(ChangedFile::new("src/extra.ts", LOAD_TS));
            let before = engine.review(&changeset(files.clone())).decision();
            files.push(ChangedFile::new("lib/more.ts", LOAD_TS));
            let after = engine.review(&changeset(files)).decision();
            prop_assert_eq!(before, Decision::RequestChanges);
            prop_assert!(after >= before);
        }
    }
}
