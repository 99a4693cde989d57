use tree_sitter::Node;

use crate::rules::static_analysis::{StaticAnalyzer, TreeSitterImports};

// `import a.b` binds `a`; `from m import x.y` is not valid Python, so the last
// identifier is the bound name.
const IMPORT_QUERY: &str = r#"
    (import_statement name: (dotted_name . (identifier) @symbol))
    (import_statement name: (aliased_import alias: (identifier) @symbol))
    (import_from_statement name: (dotted_name (identifier) @symbol .))
    (import_from_statement name: (aliased_import alias: (identifier) @symbol))
"#;

/// `from __future__ import x` activa una característica del compilador; nunca se "usa".
fn bound_name(node: Node<'_>, source_code: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "import_from_statement" {
            let module = n
                .child_by_field_name("module_name")
                .and_then(|m| m.utf8_text(source_code.as_bytes()).ok());
            if module == Some("__future__") {
                return None;
            }
            break;
        }
        current = n.parent();
    }
    node.utf8_text(source_code.as_bytes()).ok().map(str::to_string)
}

/// Returns the import extractor for Python files.
pub fn import_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(
        TreeSitterImports::new(
            || tree_sitter_python::LANGUAGE.into(),
            IMPORT_QUERY,
            &["import_statement", "import_from_statement"],
        )
        .with_resolver(bound_name),
    )
}
