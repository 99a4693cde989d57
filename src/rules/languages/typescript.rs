use crate::rules::static_analysis::{StaticAnalyzer, TreeSitterImports};

/// Named, aliased, default and namespace imports. `export ... from` re-exports
/// bind nothing and are not captured.
const IMPORT_QUERY: &str = r#"
    (import_specifier name: (identifier) @symbol !alias)
    (import_specifier alias: (identifier) @symbol)
    (import_clause (identifier) @symbol)
    (namespace_import (identifier) @symbol)
"#;

const STATEMENT_KINDS: &[&str] = &["import_statement"];

/// Returns the import extractor for TypeScript/TSX files.
pub fn import_analyzer(tsx: bool) -> Box<dyn StaticAnalyzer> {
    let analyzer = if tsx {
        TreeSitterImports::new(
            || tree_sitter_typescript::LANGUAGE_TSX.into(),
            IMPORT_QUERY,
            STATEMENT_KINDS,
        )
    } else {
        TreeSitterImports::new(
            || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            IMPORT_QUERY,
            STATEMENT_KINDS,
        )
    };
    Box::new(analyzer)
}

/// Returns the import extractor for JavaScript/JSX files.
pub fn javascript_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(TreeSitterImports::new(
        || tree_sitter_javascript::LANGUAGE.into(),
        IMPORT_QUERY,
        STATEMENT_KINDS,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(analyzer: Box<dyn StaticAnalyzer>, src: &str) -> Vec<String> {
        analyzer
            .imports(src, src)
            .unwrap()
            .into_iter()
            .map(|b| b.symbol)
            .collect()
    }

    #[test]
    fn test_ts_named_default_and_namespace_imports() {
        let src = r#"import React from 'react';
import { useState, useEffect as effect } from 'react';
import * as path from 'path';
"#;
        let found = symbols(import_analyzer(false), src);
        assert_eq!(found, vec!["React", "useState", "effect", "path"]);
    }

    #[test]
    fn test_tsx_grammar_parses_jsx() {
        let src = "import { Button } from './button';\nexport const App = () => <Button />;\n";
        assert_eq!(symbols(import_analyzer(true), src), vec!["Button"]);
    }

    #[test]
    fn test_js_reexport_binds_nothing() {
        let src = "export { helper } from './helper';\n";
        assert!(symbols(javascript_analyzer(), src).is_empty());
    }
}
