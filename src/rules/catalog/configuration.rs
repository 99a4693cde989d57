//! Configuration rules: credentials, URLs and ports written as literals.
//!
//! A literal is exempt when it sits in the configuration-loading region of a
//! config module (its first `config_region_lines` lines) or on a line that
//! reads the environment. URL and port checks also skip test files and
//! comment lines; credential checks do not, since a leaked secret in a comment
//! is still leaked.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{path_matches_module, RuleSettings};
use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;
use crate::rules::catalog::production_end;
use crate::rules::lexical::{comment_body, numbered_lines, string_literals};
use crate::rules::{Category, FileContext, Hit, Matcher, RegistryBuilder, Rule, Severity};

pub fn register(builder: &mut RegistryBuilder, settings: &RuleSettings) -> ReviewResult<()> {
    let region = ConfigRegion {
        modules: settings.config_modules.clone(),
        lines: settings.config_region_lines,
    };
    builder
        .register(Rule::file(
            "HARDCODED_SECRET",
            Category::Security,
            Severity::Critical,
            &[],
            "Credential-shaped literal in source",
            HardcodedSecret {
                region: region.clone(),
            },
        ))?
        .register(Rule::file(
            "HARDCODED_URL",
            Category::Architecture,
            Severity::Warning,
            &Language::KNOWN,
            "URL literal outside the configuration region",
            HardcodedUrl {
                region: region.clone(),
            },
        ))?
        .register(Rule::file(
            "HARDCODED_PORT",
            Category::Architecture,
            Severity::Warning,
            &Language::KNOWN,
            "Port number literal outside the configuration region",
            HardcodedPort { region },
        ))?;
    Ok(())
}

static ENV_READ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"process\.env|import\.meta\.env|os\.environ|os\.getenv|os\.Getenv|os\.LookupEnv|env::var|System\.getenv|Environment\.GetEnvironmentVariable|\bgetenv\s*\(|\$_ENV|\$_SERVER|\bENV\[|\bENV\.fetch",
    )
    .unwrap()
});

#[derive(Debug, Clone)]
struct ConfigRegion {
    modules: Vec<String>,
    lines: usize,
}

impl ConfigRegion {
    fn exempts(&self, ctx: &FileContext, line_no: usize, line: &str) -> bool {
        ENV_READ_RE.is_match(line)
            || (line_no <= self.lines && path_matches_module(&ctx.path, &self.modules))
    }
}

static SECRET_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)([\w.-]*(?:password|passwd|pwd|secret|api[_-]?key|access[_-]?key|auth[_-]?token|access[_-]?token|private[_-]?key|client[_-]?secret|credentials?|token)[\w-]*)["']?\s*(?::=|=>|=|:)\s*[@$]?["'`]([^"'`]{4,})["'`]"#,
    )
    .unwrap()
});

// Formato `.env`: CLAVE=valor sin comillas. Solo para archivos sin lenguaje.
static DOTENV_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?([A-Z0-9_]*(?:PASSWORD|PASSWD|SECRET|API_KEY|APIKEY|ACCESS_KEY|TOKEN|PRIVATE_KEY)[A-Z0-9_]*)\s*=\s*([^\s#]{6,})\s*$",
    )
    .unwrap()
});

static TOKEN_SHAPES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("AWS access key", r"\bAKIA[0-9A-Z]{16}\b"),
        ("GitHub token", r"\bgh[pousr]_[A-Za-z0-9]{36,}"),
        ("Slack token", r"\bxox[baprs]-[A-Za-z0-9-]{10,}"),
        ("Stripe live key", r"\b[sr]k_live_[0-9a-zA-Z]{24,}"),
        ("Google API key", r"\bAIza[0-9A-Za-z_-]{35}"),
        ("private key", r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY"),
        ("JSON Web Token", r"\beyJ[A-Za-z0-9_-]{10,}\.eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}"),
    ]
    .into_iter()
    .map(|(kind, p)| (kind, Regex::new(p).unwrap()))
    .collect()
});

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(changeme|change_me|change-me|example|dummy|placeholder|redacted|none|null|undefined|secret|password|token|test|testing|todo|your[_-].*|<.*>|\$\{.*\}|\{\{.*\}\}|%s|x{3,}.*|\*+|\.+)$",
    )
    .unwrap()
});

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    PLACEHOLDER_RE.is_match(value) || value.chars().all(|c| c == value.chars().next().unwrap_or(c))
}

// Nombres que mencionan la credencial sin contenerla: `passwordLabel`, `tokenizer`, `secretPath`...
static NON_CREDENTIAL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(label|hint|placeholder|prompt|message|msg|text|title|caption|description|type|kind|izer|url|uri|endpoint|path|file|dir|field|name|header|param|regex|pattern|length|len|count|min|max)$",
    )
    .unwrap()
});

/// Sin espacios y con forma de credencial: al menos 8 caracteres o mezcla de
/// clases (letras, dígitos, símbolos).
fn credential_like(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let classes = [
        value.chars().any(|c| c.is_ascii_alphabetic()),
        value.chars().any(|c| c.is_ascii_digit()),
        value.chars().any(|c| !c.is_ascii_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count();
    value.chars().count() >= 8 || classes >= 2
}

pub struct HardcodedSecret {
    region: ConfigRegion,
}

impl HardcodedSecret {
    fn check_line(&self, ctx: &FileContext, line: &str) -> Option<String> {
        if let Some((kind, _)) = TOKEN_SHAPES.iter().find(|(_, re)| re.is_match(line)) {
            return Some(format!("string matches the shape of a {}; revoke it and load it from a secret store", kind));
        }
        let assigned = SECRET_ASSIGN_RE
            .captures(line)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .or_else(|| {
                (ctx.language == Language::Unknown)
                    .then(|| DOTENV_SECRET_RE.captures(line))
                    .flatten()
                    .map(|c| (c[1].to_string(), c[2].to_string()))
            });
        let (name, value) = assigned?;
        if NON_CREDENTIAL_NAME_RE.is_match(&name) || !credential_like(&value) || is_placeholder(&value) {
            return None;
        }
        Some(format!(
            "possible hardcoded secret assigned to `{}`; load it from the environment or a secret store",
            name
        ))
    }
}

impl Matcher for HardcodedSecret {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let hits = numbered_lines(&ctx.content)
            .filter(|(n, line)| !self.region.exempts(ctx, *n, line))
            .filter_map(|(n, line)| self.check_line(ctx, line).map(|msg| Hit::at(n, msg)))
            .collect();
        Ok(hits)
    }
}

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:https?|wss?|ftp|postgres(?:ql)?|mysql|mongodb(?:\+srv)?|redis|amqps?)://[^\s/?#]+[^\s]*").unwrap()
});
static SCHEMA_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"://(?:www\.)?(?:w3\.org|json-schema\.org|schemas\.[\w.-]+|xmlns\.[\w.-]+|purl\.org|example\.(?:com|org|net))").unwrap()
});
static IMPORT_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(import|from|require|using|#include|@import)\b").unwrap());

/// Lines of production code where a configuration literal would be a finding.
fn literal_lines<'a>(
    ctx: &'a FileContext,
    region: &'a ConfigRegion,
    masked: &str,
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    let end = production_end(ctx, masked);
    numbered_lines(&ctx.content)
        .take_while(move |(n, _)| *n <= end)
        .filter(move |(n, line)| {
            comment_body(line, ctx.language).is_none()
                && !IMPORT_LINE_RE.is_match(line)
                && !region.exempts(ctx, *n, line)
        })
}

pub struct HardcodedUrl {
    region: ConfigRegion,
}

impl Matcher for HardcodedUrl {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        if ctx.is_test {
            return Ok(Vec::new());
        }
        let masked = ctx.masked();
        let hits = literal_lines(ctx, &self.region, &masked)
            .filter_map(|(n, line)| {
                let url = string_literals(line)
                    .into_iter()
                    .filter_map(|lit| URL_RE.find(lit))
                    .map(|m| m.as_str())
                    .find(|url| !SCHEMA_HOST_RE.is_match(url))?;
                Some(Hit::at(n, format!("hardcoded URL `{}`; move it to configuration", url)))
            })
            .collect();
        Ok(hits)
    }
}

static PORT_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b([A-Za-z_][\w]*)["']?\s*(?::=|=>|=|:)\s*["']?(\d{2,5})\b"#).unwrap()
});
static HOST_PORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|//|@)(localhost|\d{1,3}(?:\.\d{1,3}){3}|[A-Za-z][\w-]*(?:\.[\w-]+)*):(\d{2,5})\b").unwrap()
});

/// `port`, `PORT`, `db_port`, `DB_PORT`, `serverPort`, `portNumber`.
fn is_port_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "port"
        || lower.ends_with("_port")
        || lower.starts_with("port_")
        || name.ends_with("Port")
        || (lower.starts_with("port") && name[4..].starts_with(|c: char| c.is_ascii_uppercase()))
}

fn valid_port(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|p| (1..=65535).contains(p))
}

pub struct HardcodedPort {
    region: ConfigRegion,
}

impl HardcodedPort {
    fn port_in(line: &str) -> Option<u32> {
        let assigned = PORT_ASSIGN_RE
            .captures_iter(line)
            .filter(|c| is_port_name(&c[1]))
            .find_map(|c| valid_port(&c[2]));
        assigned.or_else(|| {
            string_literals(line)
                .into_iter()
                .filter_map(|lit| HOST_PORT_RE.captures(lit))
                .find_map(|c| valid_port(&c[2]))
        })
    }
}

impl Matcher for HardcodedPort {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        if ctx.is_test {
            return Ok(Vec::new());
        }
        let masked = ctx.masked();
        let hits = literal_lines(ctx, &self.region, &masked)
            .filter_map(|(n, line)| {
                let port = Self::port_in(line)?;
                Some(Hit::at(n, format!("hardcoded port {}; read it from configuration", port)))
            })
            .collect();
        Ok(hits)
    }
}
