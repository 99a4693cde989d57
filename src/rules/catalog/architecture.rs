//! Architecture rules that look at code structure rather than literals.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;
use crate::rules::lexical::{brace_blocks, indent_blocks, nested_brace_blocks, Block};
use crate::rules::{Category, FileContext, Hit, Matcher, RegistryBuilder, Rule, Severity};

pub fn register(builder: &mut RegistryBuilder) -> ReviewResult<()> {
    builder.register(Rule::file(
        "PASSTHROUGH_WRAPPER",
        Category::Architecture,
        Severity::Suggestion,
        &[
            Language::Python,
            Language::TypeScript,
            Language::JavaScript,
            Language::Java,
            Language::CSharp,
        ],
        "Single-method class that only forwards one call",
        PassthroughWrapper,
    ))?;
    Ok(())
}

static PY_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*class\s+\w+[^:]*:").unwrap());
static BRACE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bclass\s+\w+[^{;]*\{").unwrap());
static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bclass\s+(\w+)").unwrap());
static PY_DEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)").unwrap());
static FORWARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^return\s+(?:await\s+)?[\w$][\w$.]*(?:\s*\.\s*[\w$]+)*\s*\(.*\)$").unwrap());
static CONTROL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(if|for|while|switch|catch|using|lock|foreach|else|do|try)\b").unwrap());

fn class_name(header: &str) -> String {
    CLASS_NAME_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Cuerpo reducido a una sola sentencia, sin espacios redundantes.
fn single_statement(text: &str) -> Option<String> {
    let statements: Vec<String> = text
        .split([';', '\n'])
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect();
    match statements.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn python_forwarding_class(class: &Block) -> bool {
    // Métodos directos de la clase: `def` con la menor indentación del cuerpo
    let defs: Vec<(usize, usize, String)> = class
        .body
        .iter()
        .enumerate()
        .filter_map(|(i, (_, line))| {
            let caps = PY_DEF_RE.captures(line)?;
            Some((i, caps[1].len(), caps[2].to_string()))
        })
        .collect();
    let Some(member_indent) = defs.iter().map(|(_, indent, _)| *indent).min() else {
        return false;
    };
    let methods: Vec<&(usize, usize, String)> = defs
        .iter()
        .filter(|(_, indent, name)| *indent == member_indent && name != "__init__")
        .collect();
    let [(start, indent, _)] = methods.as_slice() else {
        return false;
    };

    // Cuerpo del método: líneas siguientes más indentadas que el `def`
    let body: Vec<&str> = class.body[start + 1..]
        .iter()
        .map(|(_, line)| line.as_str())
        .filter(|line| !line.trim().is_empty())
        .take_while(|line| line.len() - line.trim_start().len() > *indent)
        .collect();
    single_statement(&body.join("\n"))
        .is_some_and(|s| FORWARD_RE.is_match(&s))
}

fn brace_forwarding_class(class: &Block) -> bool {
    let name = class_name(&class.header);
    let text = class
        .body
        .iter()
        .map(|(_, line)| line.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let methods: Vec<(String, String)> = nested_brace_blocks(&text)
        .into_iter()
        .filter(|(header, _)| {
            header.contains('(')
                && !CONTROL_RE.is_match(header)
                && !header.contains("constructor")
                && !header.contains(&format!("{}(", name))
                && !header.contains(&format!("{} (", name))
        })
        .collect();
    let [(_, body)] = methods.as_slice() else {
        return false;
    };
    single_statement(body).is_some_and(|s| FORWARD_RE.is_match(s.trim_end_matches(';')))
}

pub struct PassthroughWrapper;

impl Matcher for PassthroughWrapper {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let masked = ctx.masked();
        let (classes, forwards): (Vec<Block>, fn(&Block) -> bool) = if ctx.language == Language::Python {
            (indent_blocks(&masked, &PY_CLASS_RE), python_forwarding_class)
        } else {
            (brace_blocks(&masked, &BRACE_CLASS_RE), brace_forwarding_class)
        };

        let hits = classes
            .iter()
            .filter(|class| forwards(class))
            .map(|class| {
                Hit::at(
                    class.line,
                    format!(
                        "class `{}` only forwards a single call; consider calling the target directly",
                        class_name(&class.header)
                    ),
                )
            })
            .collect();
        Ok(hits)
    }
}
