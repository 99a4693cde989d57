pub mod catalog;
pub mod languages;
pub mod lexical;
pub mod registry;
pub mod static_analysis;

pub use registry::{RegistryBuilder, RuleRegistry, RULE_FAILURE, UNREADABLE_FILE};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Architecture,
    Security,
    Quality,
    ErrorHandling,
    Testing,
    GitHygiene,
    Internal,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Architecture,
        Category::Security,
        Category::Quality,
        Category::ErrorHandling,
        Category::Testing,
        Category::GitHygiene,
        Category::Internal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Architecture => "architecture",
            Category::Security => "security",
            Category::Quality => "quality",
            Category::ErrorHandling => "error-handling",
            Category::Testing => "testing",
            Category::GitHygiene => "git-hygiene",
            Category::Internal => "internal",
        }
    }

    /// Acepta `error-handling`, `error_handling` o `ErrorHandling`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.name().replace('-', "") == key)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared from least to most severe, so the derived order ranks severity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Suggestion,
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Suggestion];

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        Severity::ALL.into_iter().find(|s| s.name() == key)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    File,
    Commit,
    /// Reserved for findings the engine itself emits.
    Internal,
}

/// Everything a file-scope rule may look at. Built once by the pipeline.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub path: String,
    pub language: Language,
    pub content: String,
    pub is_test: bool,
    pub paired_test: Option<String>,
}

impl FileContext {
    /// Content with comments and string literals blanked (see [`lexical::mask`]).
    pub fn masked(&self) -> String {
        lexical::mask(&self.content, self.language)
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub message: String,
}

/// Commit metadata supplied by the caller (branch and commits under review).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMetadata {
    pub branch: Option<String>,
    pub commits: Vec<CommitInfo>,
}

/// Raw match produced by a matcher. Severity and category are not part of
/// it: the scanner stamps them from the producing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub line: usize,
    pub message: String,
    /// Overrides the finding path (commit-scope rules).
    pub location: Option<String>,
}

impl Hit {
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            location: None,
        }
    }

    /// A hit that is not line-addressable.
    pub fn file(message: impl Into<String>) -> Self {
        Self::at(0, message)
    }

    pub fn located(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line: 0,
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

/// A rule's predicate. Implementations must be pure: same input, same hits,
/// no mutation of the context.
pub trait Matcher: Send + Sync {
    fn check_file(&self, _ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        Ok(Vec::new())
    }

    fn check_commit(&self, _meta: &CommitMetadata) -> ReviewResult<Vec<Hit>> {
        Ok(Vec::new())
    }
}

pub struct Rule {
    pub id: String,
    pub category: Category,
    /// Empty means language-agnostic.
    pub languages: BTreeSet<Language>,
    pub severity: Severity,
    pub scope: RuleScope,
    pub description: String,
    matcher: Box<dyn Matcher>,
}

impl Rule {
    pub fn file(
        id: &str,
        category: Category,
        severity: Severity,
        languages: &[Language],
        description: &str,
        matcher: impl Matcher + 'static,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            languages: languages.iter().copied().collect(),
            severity,
            scope: RuleScope::File,
            description: description.to_string(),
            matcher: Box::new(matcher),
        }
    }

    pub fn commit(
        id: &str,
        category: Category,
        severity: Severity,
        description: &str,
        matcher: impl Matcher + 'static,
    ) -> Self {
        Self {
            scope: RuleScope::Commit,
            ..Self::file(id, category, severity, &[], description, matcher)
        }
    }

    pub(crate) fn internal(id: &str, description: &str) -> Self {
        struct Reserved;
        impl Matcher for Reserved {}

        Self {
            scope: RuleScope::Internal,
            ..Self::file(id, Category::Internal, Severity::Warning, &[], description, Reserved)
        }
    }

    pub fn applies_to(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    pub fn matcher(&self) -> &dyn Matcher {
        self.matcher.as_ref()
    }

    /// Builds a finding that inherits this rule's id, category and severity.
    pub fn finding(&self, path: &str, hit: Hit) -> Finding {
        Finding {
            rule_id: self.id.clone(),
            category: self.category,
            severity: self.severity,
            path: hit.location.unwrap_or_else(|| path.to_string()),
            line: hit.line,
            message: hit.message,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("languages", &self.languages)
            .field("severity", &self.severity)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub path: String,
    /// 0 when the finding is not line-addressable.
    pub line: usize,
    pub message: String,
}
