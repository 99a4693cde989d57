pub mod go;
pub mod java;
pub mod php;
pub mod python;
pub mod rust;
pub mod typescript;

use crate::language::Language;
use crate::rules::static_analysis::StaticAnalyzer;

/// Returns the import extractor for the given language.
/// Returns None for languages without import analysis.
pub fn get_import_analyzer(language: Language, path: &str) -> Option<Box<dyn StaticAnalyzer>> {
    match language {
        Language::TypeScript => Some(typescript::import_analyzer(path.ends_with(".tsx"))),
        Language::JavaScript => Some(typescript::javascript_analyzer()),
        Language::Python => Some(python::import_analyzer()),
        Language::Go => Some(go::import_analyzer()),
        Language::Java => Some(java::import_analyzer()),
        Language::Rust => Some(rust::import_analyzer()),
        Language::Php => Some(php::import_analyzer()),
        _ => None,
    }
}
