//! Renderizado del reporte: texto en consola y SARIF 2.1.0.

use colored::*;
use sha2::{Digest, Sha256};

use crate::commands::OutputMode;
use crate::config::SENTINEL_VERSION;
use crate::review::report::{Report, ReportFinding};
use crate::review::Decision;
use crate::rules::{RuleRegistry, Severity};

/// Huella estable de un hallazgo para que GitHub deduplique entre ejecuciones.
pub fn fingerprint(rule_id: &str, path: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "error",
        Severity::Warning => "warning",
        Severity::Suggestion => "note",
    }
}

fn sarif_result(category: &str, f: &ReportFinding) -> serde_json::Value {
    let mut physical = serde_json::json!({
        "artifactLocation": {
            "uri": f.path,
            "uriBaseId": "%SRCROOT%"
        }
    });
    if f.line > 0 {
        physical["region"] = serde_json::json!({ "startLine": f.line });
    }
    serde_json::json!({
        "ruleId": f.rule_id,
        "level": sarif_level(f.severity),
        "message": { "text": f.message },
        "locations": [{ "physicalLocation": physical }],
        "partialFingerprints": {
            "primaryLocationLineHash/v1": fingerprint(&f.rule_id, &f.path, &f.message)
        },
        "properties": { "category": category }
    })
}

/// Renders a SARIF 2.1.0 JSON string compatible with the GitHub Security tab.
/// Only rules that produced findings are listed in `driver.rules`.
pub fn render_sarif(report: &Report, registry: &RuleRegistry) -> String {
    let mut seen_rules: Vec<&str> = Vec::new();
    let mut results = Vec::new();
    for (category, findings) in &report.findings_by_category {
        for f in findings {
            if !seen_rules.contains(&f.rule_id.as_str()) {
                seen_rules.push(&f.rule_id);
            }
            results.push(sarif_result(category.name(), f));
        }
    }

    let rules_json: Vec<serde_json::Value> = seen_rules
        .iter()
        .map(|id| {
            let description = registry.get(id).map(|r| r.description.as_str()).unwrap_or(*id);
            serde_json::json!({
                "id": id,
                "shortDescription": { "text": description }
            })
        })
        .collect();

    let sarif = serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "sentinel-review",
                    "version": SENTINEL_VERSION,
                    "rules": rules_json
                }
            },
            "results": results,
            "properties": { "decision": report.decision.name() }
        }]
    });

    serde_json::to_string_pretty(&sarif).unwrap_or_default()
}

fn decision_banner(decision: Decision) -> ColoredString {
    match decision {
        Decision::Approve => format!("✅ {}", decision).green().bold(),
        Decision::Comment => format!("💬 {}", decision).yellow().bold(),
        Decision::RequestChanges => format!("🚫 {}", decision).red().bold(),
    }
}

/// Reporte legible en consola, agrupado por categoría.
pub fn render_text(report: &Report, files_checked: usize, output_mode: OutputMode) -> String {
    let mut out = String::new();

    if output_mode != OutputMode::Quiet {
        for (category, findings) in &report.findings_by_category {
            out.push_str(&format!("\n📂 {}\n", category.name().bold().cyan()));
            for f in findings {
                let icon = match f.severity {
                    Severity::Critical => "❌ CRIT".red(),
                    Severity::Warning => "⚠️  WARN".yellow(),
                    Severity::Suggestion => "ℹ️  SUGG".blue(),
                };
                let location = if f.line > 0 {
                    format!("{}:{}", f.path, f.line)
                } else {
                    f.path.clone()
                };
                out.push_str(&format!("   {} [{}] {}: {}\n", icon, f.rule_id.yellow(), location, f.message));
            }
        }

        let counts = report.summary_counts;
        if report.finding_count() == 0 {
            out.push_str(&format!("\n✅ Sin problemas detectados en {} archivo(s).\n", files_checked));
        } else {
            out.push_str(&format!(
                "\n🚩 {} crítico(s)  ⚠️  {} warning(s)  ℹ️  {} sugerencia(s) en {} archivo(s)\n",
                counts.critical.to_string().red().bold(),
                counts.warning.to_string().yellow(),
                counts.suggestion.to_string().blue(),
                files_checked
            ));
        }
    }

    out.push_str(&format!("\n{}\n", decision_banner(report.decision)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSettings;
    use crate::review::aggregator::aggregate;
    use crate::review::aggregator::tests::finding;
    use crate::review::policy::DecisionPolicy;
    use crate::rules::Category;

    fn sample() -> Report {
        Report::from_aggregated(&DecisionPolicy::default().seal(aggregate(vec![
            finding("EMPTY_CATCH", Category::ErrorHandling, Severity::Critical, "src/a.ts", 23),
            finding("BRANCH_NAME", Category::GitHygiene, Severity::Warning, "branch:wip", 0),
        ])))
    }

    #[test]
    fn test_render_sarif_produces_valid_structure() {
        let registry = RuleRegistry::builtin(&RuleSettings::default()).unwrap();
        let sarif = render_sarif(&sample(), &registry);
        let parsed: serde_json::Value = serde_json::from_str(&sarif).expect("must be valid JSON");

        assert_eq!(parsed["version"], "2.1.0");
        let results = &parsed["runs"][0]["results"];
        assert_eq!(results[0]["ruleId"], "EMPTY_CATCH");
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[0]["locations"][0]["physicalLocation"]["region"]["startLine"], 23);
        assert!(results[1]["locations"][0]["physicalLocation"].get("region").is_none());
        assert_eq!(
            parsed["runs"][0]["tool"]["driver"]["rules"][0]["shortDescription"]["text"],
            registry.get("EMPTY_CATCH").unwrap().description
        );
        assert_eq!(parsed["runs"][0]["properties"]["decision"], "REQUEST_CHANGES");
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = fingerprint("EMPTY_CATCH", "src/a.ts", "m");
        assert_eq!(a, fingerprint("EMPTY_CATCH", "src/a.ts", "m"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint("EMPTY_CATCH", "src/b.ts", "m"));
        // El separador evita colisiones por concatenación
        assert_ne!(fingerprint("AB", "C", ""), fingerprint("A", "BC", ""));
    }

    #[test]
    fn test_render_text_modes() {
        colored::control::set_override(false);
        let report = sample();
        let normal = render_text(&report, 1, OutputMode::Normal);
        assert!(normal.contains("[EMPTY_CATCH] src/a.ts:23"));
        assert!(normal.contains("branch:wip"));
        assert!(normal.contains("REQUEST_CHANGES"));

        let quiet = render_text(&report, 1, OutputMode::Quiet);
        assert!(!quiet.contains("EMPTY_CATCH"));
        assert!(quiet.contains("REQUEST_CHANGES"));
    }
}
