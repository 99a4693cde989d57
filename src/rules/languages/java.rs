use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::lexical::LineIndex;
use crate::rules::static_analysis::{ImportBinding, LexicalImports, StaticAnalyzer};

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]*?)(\w+|\*)[ \t]*;").unwrap()
});

fn extract(masked: &str) -> Vec<ImportBinding> {
    let index = LineIndex::new(masked);
    IMPORT_RE
        .captures_iter(masked)
        .filter_map(|caps| {
            let statement = caps.get(0)?;
            let symbol = caps.get(2)?;
            // `import a.b.*` no liga un nombre concreto
            if symbol.as_str() == "*" {
                return None;
            }
            Some(ImportBinding {
                symbol: symbol.as_str().to_string(),
                line: index.line_of(symbol.start()),
                statement: statement.range(),
            })
        })
        .collect()
}

/// Returns the import extractor for Java files.
pub fn import_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(LexicalImports::new(extract))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_imports() {
        let src = "package a;\n\nimport java.util.List;\nimport static org.junit.Assert.assertEquals;\nimport java.io.*;\n";
        let bindings = extract(src);
        let names: Vec<&str> = bindings.iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(names, vec!["List", "assertEquals"]);
        assert_eq!(bindings[0].line, 3);
    }
}
