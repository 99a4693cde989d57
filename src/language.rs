//! # Clasificador de lenguajes
//!
//! Asocia cada ruta modificada a un lenguaje y decide, con la convención de
//! tests propia de ese lenguaje, si el archivo es un test y dónde debería
//! vivir su test emparejado.
//!
//! La clasificación se hace una sola vez por archivo; el resultado viaja dentro
//! del `FileContext` y ninguna regla lo vuelve a calcular.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    Java,
    CSharp,
    Php,
    Ruby,
    C,
    Cpp,
    Unknown,
}

impl Language {
    /// Todos los lenguajes con soporte real (excluye `Unknown`).
    pub const KNOWN: [Language; 11] = [
        Language::TypeScript,
        Language::JavaScript,
        Language::Python,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::CSharp,
        Language::Php,
        Language::Ruby,
        Language::C,
        Language::Cpp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Unknown => "unknown",
        }
    }

    fn from_extension(ext: &str) -> Option<Language> {
        let lang = match ext {
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyi" => Language::Python,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "cs" => Language::CSharp,
            "php" => Language::Php,
            "rb" => Language::Ruby,
            "c" => Language::C,
            "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            _ => return None,
        };
        Some(lang)
    }

    /// Lenguajes con sintaxis de llaves y comentarios `//`.
    pub fn is_brace_family(&self) -> bool {
        matches!(
            self,
            Language::TypeScript
                | Language::JavaScript
                | Language::Go
                | Language::Rust
                | Language::Java
                | Language::CSharp
                | Language::Php
                | Language::C
                | Language::Cpp
        )
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Archivos de la raíz que indican el tipo de proyecto.
const CPP_MARKERS: &[&str] = &["CMakeLists.txt", "conanfile.txt", "conanfile.py", "vcpkg.json"];

/// Tabla de archivos marcadores presentes en la raíz del proyecto.
#[derive(Debug, Clone, Default)]
pub struct ProjectMarkers(BTreeSet<String>);

impl ProjectMarkers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Lee los nombres de archivo de la raíz del proyecto.
    pub fn from_root(root: &Path) -> Self {
        let mut names = BTreeSet::new();
        if let Ok(entries) = fs::read_dir(root) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    if let Ok(name) = entry.file_name().into_string() {
                        names.insert(name);
                    }
                }
            }
        }
        Self(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    fn any_of(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.contains(n))
    }
}

/// Resultado de clasificar una ruta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub language: Language,
    pub is_test: bool,
    /// Ruta canónica del test emparejado (solo para archivos fuente).
    pub paired_test: Option<String>,
    /// Ubicaciones alternativas que la misma convención acepta.
    pub alternate_tests: Vec<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            language: Language::Unknown,
            is_test: false,
            paired_test: None,
            alternate_tests: Vec::new(),
        }
    }
}

/// Normaliza una ruta a separadores `/` y sin prefijo `./`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified.trim_start_matches("./").to_string()
}

struct PathParts<'a> {
    dir: &'a str,
    file_name: &'a str,
    stem: &'a str,
    ext: &'a str,
}

impl<'a> PathParts<'a> {
    fn split(path: &'a str) -> Self {
        let (dir, file_name) = match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };
        let (stem, ext) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx + 1..]),
            _ => (file_name, ""),
        };
        Self { dir, file_name, stem, ext }
    }

    fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.dir.split('/').filter(|s| !s.is_empty())
    }

    fn in_dir(&self, names: &[&str]) -> bool {
        self.segments().any(|s| names.contains(&s))
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Módulos de infraestructura que no requieren un test propio.
fn is_boilerplate(language: Language, parts: &PathParts<'_>) -> bool {
    match language {
        Language::Python => matches!(
            parts.file_name,
            "__init__.py" | "__main__.py" | "conftest.py" | "setup.py" | "manage.py"
        ) || parts.ext == "pyi",
        Language::Rust => matches!(parts.file_name, "main.rs" | "lib.rs" | "mod.rs" | "build.rs"),
        Language::TypeScript | Language::JavaScript => {
            parts.stem == "index" || parts.stem.ends_with(".d") || parts.stem.ends_with(".config")
        }
        Language::Go => parts.file_name == "doc.go",
        Language::C | Language::Cpp => matches!(parts.ext, "h" | "hpp" | "hh" | "hxx"),
        _ => false,
    }
}

pub struct LanguageClassifier {
    markers: ProjectMarkers,
}

impl LanguageClassifier {
    pub fn new(markers: ProjectMarkers) -> Self {
        Self { markers }
    }

    pub fn language_of(&self, path: &str) -> Language {
        let normalized = normalize_path(path);
        let parts = PathParts::split(&normalized);
        let ext = parts.ext.to_ascii_lowercase();
        if ext == "h" {
            return if self.markers.any_of(CPP_MARKERS) {
                Language::Cpp
            } else {
                Language::C
            };
        }
        Language::from_extension(&ext).unwrap_or(Language::Unknown)
    }

    pub fn classify(&self, path: &str) -> Classification {
        let normalized = normalize_path(path);
        let language = self.language_of(&normalized);
        if language == Language::Unknown {
            return Classification::unknown();
        }

        let parts = PathParts::split(&normalized);
        let is_test = is_test_path(language, &parts);
        let (paired_test, alternate_tests) = if is_test || is_boilerplate(language, &parts) {
            (None, Vec::new())
        } else {
            let (canonical, alternates) = paired_test_paths(language, &parts);
            (Some(canonical), alternates)
        };

        Classification {
            language,
            is_test,
            paired_test,
            alternate_tests,
        }
    }
}

fn is_test_path(language: Language, parts: &PathParts<'_>) -> bool {
    let stem = parts.stem;
    match language {
        Language::TypeScript | Language::JavaScript => {
            stem.ends_with(".test") || stem.ends_with(".spec") || parts.in_dir(&["__tests__"])
        }
        Language::Python => {
            parts.file_name.starts_with("test_")
                || stem.ends_with("_test")
                || parts.file_name == "conftest.py"
                || parts.in_dir(&["tests", "test"])
        }
        Language::Go => stem.ends_with("_test"),
        Language::Rust => parts.in_dir(&["tests", "benches"]),
        Language::Java => {
            parts.dir.contains("src/test")
                || stem.ends_with("Test")
                || stem.ends_with("Tests")
                || stem.ends_with("IT")
        }
        Language::CSharp => {
            stem.ends_with("Tests")
                || stem.ends_with("Test")
                || parts.segments().any(|s| s.ends_with(".Tests") || s == "tests")
        }
        Language::Php => stem.ends_with("Test") || parts.in_dir(&["tests"]),
        Language::Ruby => {
            stem.ends_with("_spec") || stem.ends_with("_test") || parts.in_dir(&["spec", "test"])
        }
        Language::C | Language::Cpp => {
            parts.file_name.starts_with("test_") || parts.in_dir(&["tests", "test"])
        }
        Language::Unknown => false,
    }
}

fn paired_test_paths(language: Language, parts: &PathParts<'_>) -> (String, Vec<String>) {
    let (dir, stem, ext) = (parts.dir, parts.stem, parts.ext);
    match language {
        Language::TypeScript | Language::JavaScript => (
            join(dir, &format!("{}.test.{}", stem, ext)),
            vec![
                join(dir, &format!("{}.spec.{}", stem, ext)),
                join(dir, &format!("__tests__/{}.test.{}", stem, ext)),
            ],
        ),
        Language::Python => (
            format!("tests/test_{}.py", stem),
            vec![
                join(dir, &format!("test_{}.py", stem)),
                join(dir, &format!("tests/test_{}.py", stem)),
            ],
        ),
        Language::Go => (join(dir, &format!("{}_test.go", stem)), Vec::new()),
        Language::Rust => {
            let crate_root = match dir.find("src") {
                Some(0) => "",
                Some(idx) if dir[..idx].ends_with('/') => &dir[..idx - 1],
                _ => "",
            };
            (join(crate_root, &format!("tests/{}.rs", stem)), Vec::new())
        }
        Language::Java => {
            let name = format!("{}Test.java", capitalize(stem));
            let canonical = if dir.contains("src/main/java") {
                join(&dir.replacen("src/main/java", "src/test/java", 1), &name)
            } else {
                join(dir, &name)
            };
            (canonical, Vec::new())
        }
        Language::CSharp => (format!("tests/{}Tests.cs", capitalize(stem)), Vec::new()),
        Language::Php => {
            let name = capitalize(stem);
            (
                format!("tests/Unit/{}Test.php", name),
                vec![format!("tests/Feature/{}Test.php", name)],
            )
        }
        Language::Ruby => (
            format!("spec/{}_spec.rb", stem),
            vec![format!("test/{}_test.rb", stem)],
        ),
        Language::C | Language::Cpp => (format!("tests/test_{}.{}", stem, ext), Vec::new()),
        Language::Unknown => (String::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LanguageClassifier {
        LanguageClassifier::new(ProjectMarkers::default())
    }

    #[test]
    fn test_typescript_source_pairs_with_sibling_test() {
        let c = classifier().classify("src/users/user.service.ts");
        assert_eq!(c.language, Language::TypeScript);
        assert!(!c.is_test);
        assert_eq!(c.paired_test.as_deref(), Some("src/users/user.service.test.ts"));
        assert!(c.alternate_tests.contains(&"src/users/user.service.spec.ts".to_string()));
    }

    #[test]
    fn test_spec_and_test_suffixes_are_tests() {
        let cl = classifier();
        assert!(cl.classify("src/user.spec.ts").is_test);
        assert!(cl.classify("src/user.test.js").is_test);
        assert!(cl.classify("src/__tests__/user.js").is_test);
        assert_eq!(cl.classify("src/user.spec.ts").paired_test, None);
    }

    #[test]
    fn test_python_conventions() {
        let cl = classifier();
        let src = cl.classify("calculator.py");
        assert_eq!(src.language, Language::Python);
        assert_eq!(src.paired_test.as_deref(), Some("tests/test_calculator.py"));
        assert!(cl.classify("tests/test_calculator.py").is_test);
        assert!(cl.classify("pkg/payments_test.py").is_test);
        assert_eq!(cl.classify("pkg/__init__.py").paired_test, None);
    }

    #[test]
    fn test_go_sibling_convention() {
        let c = classifier().classify("internal/payments/payments.go");
        assert_eq!(c.paired_test.as_deref(), Some("internal/payments/payments_test.go"));
        assert!(classifier().classify("internal/payments/payments_test.go").is_test);
    }

    #[test]
    fn test_rust_pairs_with_crate_tests_dir() {
        let c = classifier().classify("crates/billing/src/invoice.rs");
        assert_eq!(c.paired_test.as_deref(), Some("crates/billing/tests/invoice.rs"));
        let root = classifier().classify("src/invoice.rs");
        assert_eq!(root.paired_test.as_deref(), Some("tests/invoice.rs"));
        assert_eq!(classifier().classify("src/main.rs").paired_test, None);
        assert!(classifier().classify("tests/invoice.rs").is_test);
    }

    #[test]
    fn test_java_maven_layout() {
        let c = classifier().classify("src/main/java/com/acme/Payments.java");
        assert_eq!(
            c.paired_test.as_deref(),
            Some("src/test/java/com/acme/PaymentsTest.java")
        );
        assert!(classifier().classify("src/test/java/com/acme/PaymentsTest.java").is_test);
    }

    #[test]
    fn test_php_uses_capitalized_name() {
        let c = classifier().classify("app/Services/user.php");
        assert_eq!(c.paired_test.as_deref(), Some("tests/Unit/UserTest.php"));
    }

    #[test]
    fn test_unknown_extension() {
        let c = classifier().classify("docs/README.md");
        assert_eq!(c.language, Language::Unknown);
        assert!(!c.is_test);
        assert!(c.paired_test.is_none());
    }

    #[test]
    fn test_header_resolves_with_markers() {
        let plain = classifier().language_of("include/util.h");
        assert_eq!(plain, Language::C);
        let cpp = LanguageClassifier::new(ProjectMarkers::new(["CMakeLists.txt"]));
        assert_eq!(cpp.language_of("include/util.h"), Language::Cpp);
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        let c = classifier().classify(".\\src\\payments.go");
        assert_eq!(c.paired_test.as_deref(), Some("src/payments_test.go"));
    }
}
