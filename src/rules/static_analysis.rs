use std::collections::BTreeSet;
use std::ops::Range;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use crate::errors::{ReviewError, ReviewResult};

/// Símbolo ligado por una sentencia de import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Nombre con el que el símbolo queda disponible en el archivo.
    pub symbol: String,
    /// Línea (1-based) donde aparece el símbolo.
    pub line: usize,
    /// Rango en bytes de la sentencia completa; las apariciones dentro no cuentan como uso.
    pub statement: Range<usize>,
}

/// Extrae los imports de un archivo. Recibe el código original y su versión
/// enmascarada (mismos offsets); cada extractor usa la que necesita.
pub trait StaticAnalyzer: Send + Sync {
    fn imports(&self, source_code: &str, masked: &str) -> ReviewResult<Vec<ImportBinding>>;
}

fn analysis_error(reason: impl Into<String>) -> ReviewError {
    ReviewError::RuleEvaluation {
        rule_id: "UNUSED_IMPORT".to_string(),
        reason: reason.into(),
    }
}

/// Extractor de imports basado en una query de tree-sitter.
///
/// La query debe capturar `@symbol`. El nodo capturado se traduce a nombre con
/// `resolve` (por defecto, su texto) y la sentencia se localiza subiendo por los
/// ancestros hasta el primer nodo cuyo `kind` esté en `statement_kinds`.
pub struct TreeSitterImports {
    grammar: fn() -> Language,
    query: &'static str,
    statement_kinds: &'static [&'static str],
    resolve: fn(Node<'_>, &str) -> Option<String>,
}

fn node_text(node: Node<'_>, source_code: &str) -> Option<String> {
    node.utf8_text(source_code.as_bytes())
        .ok()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl TreeSitterImports {
    pub fn new(
        grammar: fn() -> Language,
        query: &'static str,
        statement_kinds: &'static [&'static str],
    ) -> Self {
        Self {
            grammar,
            query,
            statement_kinds,
            resolve: node_text,
        }
    }

    pub fn with_resolver(mut self, resolve: fn(Node<'_>, &str) -> Option<String>) -> Self {
        self.resolve = resolve;
        self
    }

    fn enclosing_statement<'t>(&self, node: Node<'t>) -> Node<'t> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.statement_kinds.contains(&n.kind()) {
                return n;
            }
            current = n.parent();
        }
        node
    }
}

impl StaticAnalyzer for TreeSitterImports {
    fn imports(&self, source_code: &str, _masked: &str) -> ReviewResult<Vec<ImportBinding>> {
        let grammar = (self.grammar)();
        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| analysis_error(format!("no se pudo cargar la gramática: {}", e)))?;
        let tree = parser
            .parse(source_code, None)
            .ok_or_else(|| analysis_error("el parser no devolvió un árbol"))?;
        let query = Query::new(&grammar, self.query)
            .map_err(|e| analysis_error(format!("query inválida: {}", e)))?;

        let mut bindings = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&query, tree.root_node(), source_code.as_bytes());

        while let Some((m, idx)) = captures.next() {
            let node = m.captures[*idx].node;
            if !seen.insert(node.start_byte()) {
                continue;
            }
            let Some(symbol) = (self.resolve)(node, source_code) else {
                continue;
            };
            let statement = self.enclosing_statement(node);
            bindings.push(ImportBinding {
                symbol,
                line: node.start_position().row + 1,
                statement: statement.start_byte()..statement.end_byte(),
            });
        }
        Ok(bindings)
    }
}

/// Extractor léxico para lenguajes sin gramática en el stack. Trabaja sobre el
/// texto enmascarado y devuelve los mismos `ImportBinding`.
pub struct LexicalImports {
    extract: fn(&str) -> Vec<ImportBinding>,
}

impl LexicalImports {
    pub fn new(extract: fn(&str) -> Vec<ImportBinding>) -> Self {
        Self { extract }
    }
}

impl StaticAnalyzer for LexicalImports {
    fn imports(&self, _source_code: &str, masked: &str) -> ReviewResult<Vec<ImportBinding>> {
        Ok((self.extract)(masked))
    }
}

/// Nombres ligados por un árbol de imports con llaves (`a::{b, c as d}`,
/// `A\{B, C}`): el último segmento de cada hoja o su alias.
pub fn grouped_leaf_names(tree: &str, separator: &str) -> Vec<String> {
    tree.replace(['{', '}'], ",")
        .split(',')
        .filter_map(|leaf| {
            let leaf = leaf.trim();
            if leaf.is_empty() {
                return None;
            }
            let mut words = leaf.split_whitespace();
            let path = words.next()?;
            let name = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => alias,
                _ => path.rsplit(separator).next().unwrap_or(path),
            };
            Some(name.to_string())
        })
        .filter(|name| !name.is_empty() && !matches!(name.as_str(), "*" | "_" | "self" | "super" | "crate"))
        .collect()
}
