use std::path::Path;

use colored::Colorize;

use crate::commands::review::load_config;
use crate::review::ReviewEngine;
use crate::rules::{RuleRegistry, RuleScope};

/// Una fila por regla: estado, id, categoría/severidad, lenguajes y descripción.
pub fn rule_rows(registry: &RuleRegistry, excluded: &dyn Fn(&str) -> bool) -> Vec<String> {
    registry
        .iter()
        .map(|r| {
            let status = if excluded(&r.id) { "[OFF]" } else { "[ON] " };
            let languages = match r.scope {
                RuleScope::Commit => "commit".to_string(),
                RuleScope::Internal => "interna".to_string(),
                RuleScope::File if r.languages.is_empty() => "todos".to_string(),
                RuleScope::File => r
                    .languages
                    .iter()
                    .map(|l| l.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            format!(
                "  {} {:<22} {:<28} {}  ({})",
                status,
                r.id,
                format!("[{}/{}]", r.category, r.severity),
                r.description,
                languages
            )
        })
        .collect()
}

pub fn handle_rules_command(explicit_config: Option<&Path>, project_root: &Path) -> anyhow::Result<()> {
    let config = load_config(explicit_config, project_root)?;
    let engine = ReviewEngine::new(&config)?;
    let filter = engine.filter();

    println!("\n{}", "Reglas registradas:".bold());
    for row in rule_rows(engine.registry(), &|id| filter.is_excluded(id)) {
        if row.contains("[OFF]") {
            println!("{}", row.dimmed());
        } else {
            println!("{}", row);
        }
    }

    let rules = &config.rules;
    println!();
    println!("   Info: para ajustar las reglas edita .sentinel/review.toml:");
    println!("   [rules]");
    println!("   config_region_lines = {}", rules.config_region_lines);
    println!("   min_commit_description = {}", rules.min_commit_description);
    println!("   logging_modules = {:?}", rules.logging_modules);
    println!("   [report]");
    println!("   exclude_rules = {:?}", config.report.exclude_rules);
    Ok(())
}
