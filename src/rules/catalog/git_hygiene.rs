//! Reglas de higiene git: nombre de rama y formato de mensajes de commit.
//!
//! Trabajan sobre los metadatos del changeset, no sobre archivos; sus
//! hallazgos usan `branch:<nombre>` o `commit:<id corto>` como ubicación.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RuleSettings;
use crate::errors::ReviewResult;
use crate::rules::{Category, CommitMetadata, Hit, Matcher, RegistryBuilder, Rule, Severity};

/// Ramas de integración que no siguen la convención de prefijos.
const LONG_LIVED_BRANCHES: &[&str] = &["main", "master", "develop", "HEAD"];

static CONVENTIONAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)(\([^)]+\))?!?: (.+)$").unwrap());

pub fn register(builder: &mut RegistryBuilder, settings: &RuleSettings) -> ReviewResult<()> {
    builder
        .register(Rule::commit(
            "BRANCH_NAME",
            Category::GitHygiene,
            Severity::Warning,
            "Branch name without a conventional prefix",
            BranchName {
                prefixes: settings.branch_prefixes.clone(),
            },
        ))?
        .register(Rule::commit(
            "COMMIT_MESSAGE",
            Category::GitHygiene,
            Severity::Warning,
            "Commit message not in `type(scope): description` form",
            CommitMessage {
                types: settings.commit_types.clone(),
                min_description: settings.min_commit_description,
            },
        ))?;
    Ok(())
}

pub struct BranchName {
    prefixes: Vec<String>,
}

impl Matcher for BranchName {
    fn check_commit(&self, meta: &CommitMetadata) -> ReviewResult<Vec<Hit>> {
        let Some(branch) = meta.branch.as_deref().map(str::trim).filter(|b| !b.is_empty()) else {
            return Ok(Vec::new());
        };
        if LONG_LIVED_BRANCHES.contains(&branch) {
            return Ok(Vec::new());
        }
        let conforms = self
            .prefixes
            .iter()
            .any(|p| branch.strip_prefix(p.as_str()).is_some_and(|rest| !rest.is_empty()));
        if conforms {
            return Ok(Vec::new());
        }
        Ok(vec![Hit::located(
            format!("branch:{}", branch),
            format!(
                "branch `{}` does not start with an allowed prefix ({})",
                branch,
                self.prefixes.join(", ")
            ),
        )])
    }
}

pub struct CommitMessage {
    types: Vec<String>,
    min_description: usize,
}

impl CommitMessage {
    /// Motivo del rechazo, o `None` si el asunto es válido.
    fn problem(&self, subject: &str) -> Option<String> {
        let Some(caps) = CONVENTIONAL_RE.captures(subject) else {
            return Some(format!(
                "commit message `{}` is not in `type(scope): description` form",
                subject
            ));
        };
        let kind = &caps[1];
        if !self.types.iter().any(|t| t == kind) {
            return Some(format!(
                "commit type `{}` is not one of: {}",
                kind,
                self.types.join(", ")
            ));
        }
        let description = caps[3].trim();
        if description.chars().count() < self.min_description {
            return Some(format!(
                "commit description `{}` is shorter than {} characters",
                description, self.min_description
            ));
        }
        None
    }
}

impl Matcher for CommitMessage {
    fn check_commit(&self, meta: &CommitMetadata) -> ReviewResult<Vec<Hit>> {
        let mut hits = Vec::new();
        for commit in &meta.commits {
            let subject = commit.message.lines().next().unwrap_or("").trim();
            // Merges generados por git no siguen la convención
            if subject.starts_with("Merge ") {
                continue;
            }
            if let Some(problem) = self.problem(subject) {
                let short: String = commit.id.chars().take(7).collect();
                hits.push(Hit::located(format!("commit:{}", short), problem));
            }
        }
        Ok(hits)
    }
}
