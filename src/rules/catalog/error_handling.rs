//! Error-handling rules: swallowed errors, pointless rethrows and broad catches.
//!
//! Handlers are located on the masked source, so a comment inside an empty
//! `catch {}` still counts as empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;
use crate::rules::lexical::{brace_blocks, indent_blocks, LineIndex};
use crate::rules::{Category, FileContext, Hit, Matcher, RegistryBuilder, Rule, Severity};

const BRACE_CATCH: &[Language] = &[
    Language::TypeScript,
    Language::JavaScript,
    Language::Java,
    Language::CSharp,
    Language::Php,
    Language::Cpp,
];

pub fn register(builder: &mut RegistryBuilder) -> ReviewResult<()> {
    let mut empty_catch = BRACE_CATCH.to_vec();
    empty_catch.extend([Language::Python, Language::Go, Language::Rust]);
    let mut rethrow = BRACE_CATCH.to_vec();
    rethrow.push(Language::Python);

    builder
        .register(Rule::file(
            "EMPTY_CATCH",
            Category::ErrorHandling,
            Severity::Critical,
            &empty_catch,
            "Error handler whose body is empty or a no-op",
            EmptyCatch,
        ))?
        .register(Rule::file(
            "BARE_RETHROW",
            Category::ErrorHandling,
            Severity::Warning,
            &rethrow,
            "Handler that only rethrows the caught error",
            BareRethrow,
        ))?
        .register(Rule::file(
            "BROAD_CATCH",
            Category::ErrorHandling,
            Severity::Warning,
            &[Language::Java, Language::CSharp, Language::Php, Language::Python],
            "Catch of the broadest exception type without narrowing",
            BroadCatch,
        ))?;
    Ok(())
}

static CATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcatch\s*(\([^)]*\))?\s*(when\s*\([^)]*\)\s*)?\{").unwrap()
});
static EXCEPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*except\b[^:]*:").unwrap());
static GO_ERR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bif\s+(?:[^{;]*;\s*)?err\s*!=\s*nil\s*\{").unwrap());
static RUST_SWALLOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bErr\s*\([^)]*\)\s*=>\s*(\{\s*\}|\(\s*\))|\bif\s+let\s+Err\s*\([^)]*\)\s*=[^{;]*\{\s*\}")
        .unwrap()
});
static PY_BINDING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bas\s+(\w+)").unwrap());
static CSHARP_IS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bis\s+[A-Za-z_]").unwrap());

/// Un bloque `catch`/`except` ya extraído del texto enmascarado.
#[derive(Debug)]
struct Handler {
    line: usize,
    header: String,
    statements: Vec<String>,
    body: String,
}

impl Handler {
    fn is_empty(&self, language: Language) -> bool {
        if language == Language::Python {
            self.statements.iter().all(|s| s == "pass" || s == "...")
        } else {
            self.statements.is_empty()
        }
    }

    /// Única sentencia: `raise`/`throw` o relanzar el error capturado.
    fn is_bare_rethrow(&self, language: Language) -> bool {
        let keyword = if language == Language::Python { "raise" } else { "throw" };
        let [only] = self.statements.as_slice() else {
            return false;
        };
        only == keyword
            || self
                .binding(language)
                .is_some_and(|name| *only == format!("{} {}", keyword, name))
    }

    /// Tokens inside the header's parentheses (or after `except`).
    fn header_tokens(&self, language: Language) -> Vec<&str> {
        let inner = if language == Language::Python {
            let rest = self.header.trim_start().trim_start_matches("except");
            let rest = rest.split(" as ").next().unwrap_or(rest);
            rest.trim_end_matches(':')
        } else {
            match (self.header.find('('), self.header.find(')')) {
                (Some(open), Some(close)) if open < close => &self.header[open + 1..close],
                _ => "",
            }
        };
        inner
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Name the caught error is bound to, if any.
    fn binding(&self, language: Language) -> Option<String> {
        match language {
            Language::Python => PY_BINDING_RE
                .captures(&self.header)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            // `catch (e)` / `catch (e: unknown)`
            Language::TypeScript | Language::JavaScript => {
                self.header_tokens(language).first().map(|t| t.to_string())
            }
            _ => {
                let tokens = self.header_tokens(language);
                (tokens.len() >= 2).then(|| tokens[tokens.len() - 1].to_string())
            }
        }
    }
}

fn handlers(language: Language, masked: &str) -> Vec<Handler> {
    if language == Language::Python {
        return indent_blocks(masked, &EXCEPT_RE)
            .into_iter()
            .map(|b| {
                let statements = b.statements().iter().map(|s| s.to_string()).collect();
                let body = b.joined();
                Handler {
                    line: b.line,
                    header: b.header,
                    statements,
                    body,
                }
            })
            .collect();
    }
    if !BRACE_CATCH.contains(&language) {
        return Vec::new();
    }
    brace_blocks(masked, &CATCH_RE)
        .into_iter()
        .map(|b| {
            let body = b.joined();
            let statements = body
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Handler {
                line: b.line,
                header: b.header,
                statements,
                body,
            }
        })
        .collect()
}

pub struct EmptyCatch;

impl Matcher for EmptyCatch {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let masked = ctx.masked();
        let hits = match ctx.language {
            Language::Go => brace_blocks(&masked, &GO_ERR_RE)
                .into_iter()
                .filter(|b| b.is_empty())
                .map(|b| Hit::at(b.line, "`if err != nil` block is empty; the error is silently ignored"))
                .collect(),
            Language::Rust => {
                let index = LineIndex::new(&masked);
                RUST_SWALLOW_RE
                    .find_iter(&masked)
                    .map(|m| {
                        Hit::at(
                            index.line_of(m.start()),
                            "`Err` branch does nothing; the error is silently ignored",
                        )
                    })
                    .collect()
            }
            language => handlers(language, &masked)
                .into_iter()
                .filter(|h| h.is_empty(language))
                .map(|h| Hit::at(h.line, "empty error handler; the error is silently swallowed"))
                .collect(),
        };
        Ok(hits)
    }
}

pub struct BareRethrow;

impl Matcher for BareRethrow {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let language = ctx.language;
        let hits = handlers(language, &ctx.masked())
            .into_iter()
            .filter(|h| h.is_bare_rethrow(language))
            .map(|h| {
                Hit::at(
                    h.line,
                    "handler only rethrows the caught error; remove it or add context before rethrowing",
                )
            })
            .collect();
        Ok(hits)
    }
}

fn broad_types(language: Language) -> &'static [&'static str] {
    match language {
        Language::Java => &["Exception", "Throwable"],
        Language::CSharp => &["Exception"],
        Language::Php => &["Exception", "Throwable"],
        Language::Python => &["Exception", "BaseException"],
        _ => &[],
    }
}

pub struct BroadCatch;

impl BroadCatch {
    fn caught_type(handler: &Handler, language: Language) -> Option<String> {
        let tokens = handler.header_tokens(language);
        let binding = handler.binding(language);
        let types: Vec<&str> = tokens
            .into_iter()
            .filter(|t| Some(*t) != binding.as_deref())
            .collect();

        // `except:` y `catch {` capturan todo
        if types.is_empty() {
            return match language {
                Language::Python => Some("everything (bare except)".to_string()),
                Language::CSharp if !handler.header.contains('(') => Some("everything (bare catch)".to_string()),
                _ => None,
            };
        }
        types
            .into_iter()
            .find(|t| broad_types(language).contains(t))
            .map(|t| format!("`{}`", t))
    }

    fn narrows(handler: &Handler, language: Language) -> bool {
        match language {
            Language::Python => handler.body.contains("isinstance"),
            Language::CSharp => handler.header.contains("when") || CSHARP_IS_RE.is_match(&handler.body),
            _ => handler.body.contains("instanceof"),
        }
    }
}

impl Matcher for BroadCatch {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let language = ctx.language;
        let hits = handlers(language, &ctx.masked())
            .into_iter()
            // Vacío y solo-relanzar ya los reportan EMPTY_CATCH y BARE_RETHROW
            .filter(|h| !h.is_empty(language) && !h.is_bare_rethrow(language) && !Self::narrows(h, language))
            .filter_map(|h| {
                let caught = Self::caught_type(&h, language)?;
                Some(Hit::at(
                    h.line,
                    format!(
                        "handler catches {} without narrowing; catch the specific errors you can handle",
                        caught
                    ),
                ))
            })
            .collect();
        Ok(hits)
    }
}
