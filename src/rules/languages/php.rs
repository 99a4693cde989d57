use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::lexical::LineIndex;
use crate::rules::static_analysis::{grouped_leaf_names, ImportBinding, LexicalImports, StaticAnalyzer};

// Solo `use` en columna 0: dentro de una clase, `use Trait;` aplica un trait.
static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^use[ \t]+(?:function[ \t]+|const[ \t]+)?([^;]+);").unwrap()
});

fn extract(masked: &str) -> Vec<ImportBinding> {
    let index = LineIndex::new(masked);
    let mut bindings = Vec::new();
    for caps in USE_RE.captures_iter(masked) {
        let (Some(statement), Some(tree)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let line = index.line_of(tree.start());
        for symbol in grouped_leaf_names(tree.as_str(), "\\") {
            bindings.push(ImportBinding {
                symbol,
                line,
                statement: statement.range(),
            });
        }
    }
    bindings
}

/// Returns the import extractor for PHP files.
pub fn import_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(LexicalImports::new(extract))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_use_statements() {
        let src = "<?php\nnamespace App;\n\nuse App\\Models\\User;\nuse App\\Services\\{Mailer, Billing as Bill};\n\nclass A {\n    use Notifiable;\n}\n";
        let names: Vec<String> = extract(src).into_iter().map(|b| b.symbol).collect();
        assert_eq!(names, vec!["User", "Mailer", "Bill"]);
    }
}
