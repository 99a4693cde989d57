//! Hygiene rules: direct console output, unused imports and commented-out code.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{path_matches_module, RuleSettings};
use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;
use crate::rules::catalog::production_end;
use crate::rules::languages::get_import_analyzer;
use crate::rules::lexical::{comment_body, count_outside, numbered_lines};
use crate::rules::{Category, FileContext, Hit, Matcher, RegistryBuilder, Rule, Severity};

pub fn register(builder: &mut RegistryBuilder, settings: &RuleSettings) -> ReviewResult<()> {
    builder
        .register(Rule::file(
            "DIRECT_OUTPUT",
            Category::Quality,
            Severity::Warning,
            &Language::KNOWN,
            "Raw console/print call outside a logging module",
            DirectOutput {
                logging_modules: settings.logging_modules.clone(),
            },
        ))?
        .register(Rule::file(
            "UNUSED_IMPORT",
            Category::Quality,
            Severity::Warning,
            &[
                Language::TypeScript,
                Language::JavaScript,
                Language::Python,
                Language::Go,
                Language::Java,
                Language::Rust,
                Language::Php,
            ],
            "Import whose bound symbol is never referenced",
            UnusedImport,
        ))?
        .register(Rule::file(
            "COMMENTED_OUT_CODE",
            Category::Quality,
            Severity::Suggestion,
            &Language::KNOWN,
            "Comment block that contains source statements",
            CommentedOutCode,
        ))?;
    Ok(())
}

fn patterns(raw: &[&str]) -> Vec<Regex> {
    raw.iter().map(|p| Regex::new(p).unwrap()).collect()
}

// Catálogo de primitivas de salida por lenguaje, evaluado sobre el texto enmascarado.
static TS_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"\bconsole\.(log|debug|info|warn|error|trace|dir|table)\s*\(",
        r"\bprocess\.(stdout|stderr)\.write\s*\(",
    ])
});
static PY_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(^|[^\w.])print\s*\(",
        r"(^|[^\w.])pprint\s*\(",
        r"\bsys\.(stdout|stderr)\.write\s*\(",
    ])
});
static GO_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"\bfmt\.(Print|Println|Printf)\s*\(",
        r"\bfmt\.Fprint(ln|f)?\s*\(\s*os\.(Stdout|Stderr)",
        r"(^|[^\w.])(print|println)\s*\(",
    ])
});
static RUST_OUTPUT: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"(^|[^\w:])(println|print|eprintln|eprint|dbg)!\s*\("]));
static JAVA_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"\bSystem\.(out|err)\.(print|println|printf|format)\s*\(",
        r"\.printStackTrace\s*\(\s*\)",
    ])
});
static CSHARP_OUTPUT: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"\b(Console|Debug|Trace)\.(Write|WriteLine)\s*\("]));
static PHP_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(^|[^\w$>:])(echo|print)\b",
        r"(^|[^\w$>:])(var_dump|print_r|var_export|printf)\s*\(",
    ])
});
static RUBY_OUTPUT: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"(^|[^\w.:])(puts|print|pp)\b", r"\$std(out|err)\.(puts|write|print)\b"]));
static C_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(^|[^\w.:])(printf|puts|putchar)\s*\(",
        r"\bfprintf\s*\(\s*(stdout|stderr)\b",
    ])
});
static CPP_OUTPUT: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"\bstd::(cout|cerr|clog)\b",
        r"(^|[^\w:])(cout|cerr|clog)\s*<<",
        r"(^|[^\w.:])(printf|puts)\s*\(",
    ])
});

fn output_patterns(language: Language) -> &'static [Regex] {
    match language {
        Language::TypeScript | Language::JavaScript => &TS_OUTPUT,
        Language::Python => &PY_OUTPUT,
        Language::Go => &GO_OUTPUT,
        Language::Rust => &RUST_OUTPUT,
        Language::Java => &JAVA_OUTPUT,
        Language::CSharp => &CSHARP_OUTPUT,
        Language::Php => &PHP_OUTPUT,
        Language::Ruby => &RUBY_OUTPUT,
        Language::C => &C_OUTPUT,
        Language::Cpp => &CPP_OUTPUT,
        Language::Unknown => &[],
    }
}

pub struct DirectOutput {
    logging_modules: Vec<String>,
}

impl Matcher for DirectOutput {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        if ctx.is_test || path_matches_module(&ctx.path, &self.logging_modules) {
            return Ok(Vec::new());
        }
        let masked = ctx.masked();
        let end = production_end(ctx, &masked);
        let catalogue = output_patterns(ctx.language);

        let hits = numbered_lines(&masked)
            .take_while(|(n, _)| *n <= end)
            .filter_map(|(n, line)| {
                let found = catalogue.iter().find_map(|re| re.find(line))?;
                let call = found
                    .as_str()
                    .trim_start_matches(|c: char| !c.is_alphanumeric() && c != '_')
                    .trim_end_matches(|c: char| c == '(' || c.is_whitespace());
                Some(Hit::at(
                    n,
                    format!("direct output call `{}` outside a logging module; use the project logger", call),
                ))
            })
            .collect();
        Ok(hits)
    }
}

pub struct UnusedImport;

impl Matcher for UnusedImport {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        // Los __init__.py re-exportan por diseño del paquete
        if ctx.file_name() == "__init__.py" {
            return Ok(Vec::new());
        }
        let Some(analyzer) = get_import_analyzer(ctx.language, &ctx.path) else {
            return Ok(Vec::new());
        };
        let masked = ctx.masked();
        let bindings = analyzer.imports(&ctx.content, &masked)?;

        let hits = bindings
            .into_iter()
            .filter(|b| count_outside(&ctx.content, b.statement.start, b.statement.end, &b.symbol) == 0)
            .map(|b| Hit::at(b.line, format!("unused import `{}`", b.symbol)))
            .collect();
        Ok(hits)
    }
}

static PROSE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(todo|fixme|note|xxx|hack|safety|eslint|prettier|noqa|type:|pylint|pragma|region|endregion|nolint|@ts-|istanbul|go:|\+build|-\*-|see |e\.g\.|i\.e\.)",
    )
    .unwrap()
});

static CODE_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        // termina en terminador de sentencia o llave
        r"[;{}]\s*$",
        // asignación simple: `x = 1`, `self.total += n`, `v := f()`
        r"^[\w$][\w.$\[\]]*\s*(=|\+=|-=|\*=|/=|:=)\s*[^=\s]",
        // llamada aislada: `run()`, `client.send(msg)`
        r"^[\w$][\w.$]*\([^)]*\)$",
        // cabecera de bloque Python
        r"^(if|elif|else|for|while|with|def|class|try|except|finally)\b[^:]*:$",
        r"^(import\s+[\w.]+(\s+as\s+\w+)?|from\s+[\w.]+\s+import\s+.+)$",
        r"^(const|let|var|fn|func|function|def|public|private|protected|static|return)\s+\w+.*[=({]",
        r#"^#include\s*[<"]"#,
    ])
});

/// Whether the stripped text of a comment reads as a source statement.
fn looks_like_code(body: &str) -> bool {
    if body.len() < 3 || PROSE_MARKER_RE.is_match(body) {
        return false;
    }
    CODE_SHAPES.iter().any(|re| re.is_match(body))
}

pub struct CommentedOutCode;

impl Matcher for CommentedOutCode {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let mut hits = Vec::new();
        let mut block: Option<(usize, usize)> = None;

        let flush = |block: Option<(usize, usize)>, hits: &mut Vec<Hit>| {
            if let Some((start, count)) = block {
                let noun = if count == 1 { "line" } else { "lines" };
                hits.push(Hit::at(
                    start,
                    format!("{} {} of commented-out code; delete it instead", count, noun),
                ));
            }
        };

        let mut previous = 0;
        for (n, line) in numbered_lines(&ctx.content) {
            let code = comment_body(line, ctx.language).is_some_and(looks_like_code);
            block = match (code, block) {
                (true, Some((start, count))) if previous + 1 == n => Some((start, count + 1)),
                (true, open) => {
                    flush(open, &mut hits);
                    Some((n, 1))
                }
                (false, open) => {
                    flush(open, &mut hits);
                    None
                }
            };
            if code {
                previous = n;
            }
        }
        flush(block, &mut hits);
        Ok(hits)
    }
}
