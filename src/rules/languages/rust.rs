use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::lexical::LineIndex;
use crate::rules::static_analysis::{grouped_leaf_names, ImportBinding, LexicalImports, StaticAnalyzer};

static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(pub(?:\([^)]*\))?[ \t]+)?use[ \t]+([^;]+);").unwrap()
});

/// Traits que se importan solo para habilitar métodos; su nombre no vuelve a
/// aparecer en el código, así que un conteo léxico los daría por no usados.
const METHOD_TRAITS: &[&str] = &[
    "Read", "Write", "BufRead", "Seek", "FromStr", "Hash", "Hasher", "Iterator",
    "IntoIterator", "FromIterator", "DoubleEndedIterator", "ExactSizeIterator", "Deref",
    "DerefMut", "AsRef", "Borrow", "TryFrom", "TryInto", "Context", "StreamingIterator",
    "ParallelIterator", "IndexedParallelIterator", "IntoParallelIterator",
    "IntoParallelRefIterator", "ParallelBridge", "Parser", "Digest", "Rng", "Future",
    "FutureExt", "StreamExt", "AsyncReadExt", "AsyncWriteExt", "Itertools", "Error",
];

fn extract(masked: &str) -> Vec<ImportBinding> {
    let index = LineIndex::new(masked);
    let mut bindings = Vec::new();
    for caps in USE_RE.captures_iter(masked) {
        // `pub use` es una re-exportación
        if caps.get(1).is_some() {
            continue;
        }
        let (Some(statement), Some(tree)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let line = index.line_of(tree.start());
        for symbol in grouped_leaf_names(tree.as_str(), "::") {
            if METHOD_TRAITS.contains(&symbol.as_str()) {
                continue;
            }
            bindings.push(ImportBinding {
                symbol,
                line,
                statement: statement.range(),
            });
        }
    }
    bindings
}

/// Returns the import extractor for Rust files.
pub fn import_analyzer() -> Box<dyn StaticAnalyzer> {
    Box::new(LexicalImports::new(extract))
}
