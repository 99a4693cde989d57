//! Registro de reglas (solo se agregan, nunca se quitan).
//!
//! Las reglas se registran con un [`RegistryBuilder`] al arrancar; `build()`
//! consume el builder y devuelve un [`RuleRegistry`] inmutable que todas las
//! tareas de escaneo comparten en solo lectura (detrás de `Arc`).

use std::collections::HashMap;

use crate::config::RuleSettings;
use crate::errors::{ReviewError, ReviewResult};
use crate::language::Language;
use crate::rules::{catalog, Category, Rule, RuleScope};

/// Regla reservada para matchers que fallan o hacen panic.
pub const RULE_FAILURE: &str = "RULE_FAILURE";
/// Regla reservada para contenido que no se pudo leer o decodificar.
pub const UNREADABLE_FILE: &str = "UNREADABLE_FILE";

#[derive(Debug)]
pub struct RegistryBuilder {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Builder que ya contiene las reglas internas reservadas.
    pub fn new() -> Self {
        let mut builder = Self {
            rules: Vec::new(),
            index: HashMap::new(),
        };
        builder.push(Rule::internal(RULE_FAILURE, "A rule failed while matching"));
        builder.push(Rule::internal(UNREADABLE_FILE, "File content could not be read or decoded"));
        builder
    }

    fn push(&mut self, rule: Rule) {
        self.index.insert(rule.id.clone(), self.rules.len());
        self.rules.push(rule);
    }

    pub fn register(&mut self, rule: Rule) -> ReviewResult<&mut Self> {
        if self.index.contains_key(&rule.id) {
            return Err(ReviewError::DuplicateRule { id: rule.id });
        }
        self.push(rule);
        Ok(self)
    }

    pub fn build(self) -> RuleRegistry {
        RuleRegistry {
            rules: self.rules,
            index: self.index,
        }
    }
}

#[derive(Debug)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleRegistry {
    /// Registro con el catálogo integrado, configurado por `settings`.
    pub fn builtin(settings: &RuleSettings) -> ReviewResult<Self> {
        let mut builder = RegistryBuilder::new();
        catalog::register_builtin(&mut builder, settings)?;
        Ok(builder.build())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Reglas de un lenguaje y categoría, en orden de registro.
    pub fn rules_for(&self, language: Language, category: Category) -> impl Iterator<Item = &Rule> {
        self.applicable(language)
            .filter(move |rule| rule.category == category)
    }

    /// Reglas de archivo aplicables a `language`, en orden de registro.
    pub fn applicable(&self, language: Language) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |rule| rule.scope == RuleScope::File && rule.applies_to(language))
    }

    pub fn commit_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|rule| rule.scope == RuleScope::Commit)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Matcher, Severity};

    struct Noop;
    impl Matcher for Noop {}

    fn rule(id: &str, category: Category, languages: &[Language]) -> Rule {
        Rule::file(id, category, Severity::Warning, languages, "test rule", Noop)
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register(rule("A", Category::Quality, &[])).unwrap();
        let err = builder.register(rule("A", Category::Security, &[])).unwrap_err();
        assert!(matches!(err, ReviewError::DuplicateRule { ref id } if id == "A"));
    }

    #[test]
    fn test_reserved_ids_cannot_be_reused() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.register(rule(RULE_FAILURE, Category::Quality, &[])).is_err());
    }

    #[test]
    fn test_rules_for_keeps_registration_order_and_scope() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(rule("GO_ONLY", Category::Quality, &[Language::Go]))
            .unwrap()
            .register(rule("ANY", Category::Quality, &[]))
            .unwrap()
            .register(rule("SEC", Category::Security, &[]))
            .unwrap()
            .register(rule("PY_ONLY", Category::Quality, &[Language::Python]))
            .unwrap();
        let registry = builder.build();

        let go: Vec<&str> = registry
            .rules_for(Language::Go, Category::Quality)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(go, vec!["GO_ONLY", "ANY"]);

        let unknown: Vec<&str> = registry
            .applicable(Language::Unknown)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(unknown, vec!["ANY", "SEC"]);
    }

    #[test]
    fn test_internal_rules_are_never_applicable() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.contains(RULE_FAILURE));
        assert!(registry.contains(UNREADABLE_FILE));
        assert_eq!(registry.applicable(Language::Go).count(), 0);
    }

    #[test]
    fn test_builtin_catalogue_registers_without_conflicts() {
        let registry = RuleRegistry::builtin(&RuleSettings::default()).unwrap();
        for id in [
            "DIRECT_OUTPUT",
            "UNUSED_IMPORT",
            "COMMENTED_OUT_CODE",
            "EMPTY_CATCH",
            "BARE_RETHROW",
            "BROAD_CATCH",
            "HARDCODED_SECRET",
            "HARDCODED_URL",
            "HARDCODED_PORT",
            "MISSING_TEST_FILE",
            "WEAK_ASSERTIONS",
            "PASSTHROUGH_WRAPPER",
            "BRANCH_NAME",
            "COMMIT_MESSAGE",
        ] {
            assert!(registry.contains(id), "falta la regla {}", id);
        }
        assert_eq!(registry.commit_rules().count(), 2);
    }
}
