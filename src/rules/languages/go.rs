use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use crate::rules::static_analysis::{StaticAnalyzer, TreeSitterImports};

static MAJOR_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v[0-9]+$").unwrap());
static GOPKG_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.v[0-9]+$").unwrap());

/// Nombre de paquete por defecto a partir de la ruta de import.
///
/// `github.com/go-chi/chi/v5` -> `chi`, `gopkg.in/yaml.v3` -> `yaml`,
/// `github.com/mattn/go-sqlite3` -> `sqlite3`.
fn default_package_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let name = if MAJOR_VERSION_RE.is_match(last) {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    let name = GOPKG_SUFFIX_RE.replace(name, "");
    let name = name.strip_prefix("go-").unwrap_or(&name);
    name.replace('-', "_")
}

/// The capture is the whole `import_spec`; an explicit alias wins over the path.
fn package_name(spec: Node<'_>, source_code: &str) -> Option<String> {
    let bytes = source_code.as_bytes();
    if let Some(alias) = spec.child_by_field_name("name") {
        let alias = alias.utf8_text(bytes).ok()?;
        // `_` y `.` no ligan un nombre utilizable
        return (alias != "_" && alias != ".").then(|| alias.to_string());
    }
    let raw = spec.child_by_field_name("path")?.utf8_text(bytes).ok()?;
    let path = raw.trim_matches(|c| c == '"' || c == '`');
    Some(default_package_name(path))
}

/// Returns the import extractor for Go files.
pub fn import_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(
        TreeSitterImports::new(
            || tree_sitter_go::LANGUAGE.into(),
            "(import_spec) @symbol",
            &["import_spec"],
        )
        .with_resolver(package_name),
    )
}
