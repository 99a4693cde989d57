//! # Catálogo de reglas integradas
//!
//! Cada submódulo registra una familia de reglas. El orden de registro define
//! el orden de evaluación del scanner, así que los IDs se registran siempre en
//! la misma secuencia.

pub mod architecture;
pub mod configuration;
pub mod error_handling;
pub mod git_hygiene;
pub mod hygiene;
pub mod testing;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RuleSettings;
use crate::errors::ReviewResult;
use crate::language::Language;
use crate::rules::lexical::numbered_lines;
use crate::rules::{FileContext, RegistryBuilder};

/// Registers every built-in rule.
pub fn register_builtin(builder: &mut RegistryBuilder, settings: &RuleSettings) -> ReviewResult<()> {
    hygiene::register(builder, settings)?;
    error_handling::register(builder)?;
    configuration::register(builder, settings)?;
    testing::register(builder)?;
    architecture::register(builder)?;
    git_hygiene::register(builder, settings)?;
    Ok(())
}

static RUST_TEST_MODULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\[cfg\(test\)\]").unwrap());

/// Última línea de código de producción. En Rust los tests viven en un
/// `#[cfg(test)] mod tests` al final del archivo y quedan fuera.
pub(crate) fn production_end(ctx: &FileContext, masked: &str) -> usize {
    if ctx.language != Language::Rust {
        return usize::MAX;
    }
    numbered_lines(masked)
        .find(|(_, line)| RUST_TEST_MODULE_RE.is_match(line))
        .map(|(n, _)| n.saturating_sub(1))
        .unwrap_or(usize::MAX)
}

/// Whether an inline Rust test module is present.
pub(crate) fn has_inline_tests(ctx: &FileContext, masked: &str) -> bool {
    production_end(ctx, masked) != usize::MAX
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::language::{LanguageClassifier, ProjectMarkers};
    use crate::review::scanner::ScanEnv;
    use crate::rules::{FileContext, Hit, Matcher};

    pub fn ctx(path: &str, content: &str) -> FileContext {
        let classification = LanguageClassifier::new(ProjectMarkers::default()).classify(path);
        FileContext {
            path: path.to_string(),
            language: classification.language,
            content: content.to_string(),
            is_test: classification.is_test,
            paired_test: classification.paired_test,
        }
    }

    pub fn run(matcher: &dyn Matcher, path: &str, content: &str) -> Vec<Hit> {
        matcher.check_file(&ctx(path, content), &ScanEnv::default()).unwrap()
    }

    pub fn lines(hits: &[Hit]) -> Vec<usize> {
        hits.iter().map(|h| h.line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::ctx;
    use super::*;

    #[test]
    fn test_production_end_stops_at_rust_test_module() {
        let src = "fn a() {}\n\n#[cfg(test)]\nmod tests {}\n";
        let c = ctx("src/a.rs", src);
        assert_eq!(production_end(&c, &c.masked()), 2);
        assert!(has_inline_tests(&c, &c.masked()));
        let py = ctx("a.py", "#[cfg(test)]\n");
        assert_eq!(production_end(&py, &py.masked()), usize::MAX);
    }
}
