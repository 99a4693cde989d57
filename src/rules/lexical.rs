//! Lexical helpers shared by the rule catalogue.
//!
//! Rules never build a full AST. They work on a *masked* copy of the source in
//! which comments and string-literal contents are blanked out with spaces.
//! Masking preserves byte length and line breaks, so offsets and line numbers
//! computed on the masked text are valid on the original text too.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSyntax {
    /// `//` line comments and `/* */` blocks.
    Slash,
    /// `#` line comments.
    Hash,
    /// PHP accepts both.
    SlashAndHash,
    None,
}

impl CommentSyntax {
    pub fn of(language: Language) -> Self {
        match language {
            Language::Python | Language::Ruby => CommentSyntax::Hash,
            Language::Php => CommentSyntax::SlashAndHash,
            Language::Unknown => CommentSyntax::None,
            _ => CommentSyntax::Slash,
        }
    }

    fn line_marker_at(&self, chars: &[char], i: usize) -> bool {
        let slash = chars[i] == '/' && chars.get(i + 1) == Some(&'/');
        let hash = chars[i] == '#';
        match self {
            CommentSyntax::Slash => slash,
            CommentSyntax::Hash => hash,
            CommentSyntax::SlashAndHash => slash || hash,
            CommentSyntax::None => false,
        }
    }

    fn has_block_comments(&self) -> bool {
        matches!(self, CommentSyntax::Slash | CommentSyntax::SlashAndHash)
    }
}

struct Literal {
    open_len: usize,
    close: Vec<char>,
    escapes: bool,
    multiline: bool,
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_with_at(chars: &[char], i: usize, pat: &str) -> bool {
    pat.chars().enumerate().all(|(k, p)| chars.get(i + k) == Some(&p))
}

fn literal_start(chars: &[char], i: usize, language: Language) -> Option<Literal> {
    let c = chars[i];
    let single = |q: char, multiline: bool| Literal {
        open_len: 1,
        close: vec![q],
        escapes: true,
        multiline,
    };

    match language {
        Language::Unknown => None,
        Language::Python | Language::Java | Language::CSharp
            if starts_with_at(chars, i, "\"\"\"") || starts_with_at(chars, i, "'''") =>
        {
            Some(Literal {
                open_len: 3,
                close: vec![c, c, c],
                escapes: true,
                multiline: true,
            })
        }
        Language::Rust if c == 'r' => {
            let prev_ok = i == 0
                || !is_ident(chars[i - 1])
                || (chars[i - 1] == 'b' && (i < 2 || !is_ident(chars[i - 2])));
            if !prev_ok {
                return None;
            }
            let hashes = chars[i + 1..].iter().take_while(|&&h| h == '#').count();
            if chars.get(i + 1 + hashes) != Some(&'"') {
                return None;
            }
            let mut close = vec!['"'];
            close.extend(std::iter::repeat('#').take(hashes));
            Some(Literal {
                open_len: hashes + 2,
                close,
                escapes: false,
                multiline: true,
            })
        }
        Language::Rust if c == '\'' => {
            // Lifetimes (`'a`) are not literals; char literals close within two chars.
            let escaped = chars.get(i + 1) == Some(&'\\');
            let short = chars.get(i + 2) == Some(&'\'');
            (escaped || short).then(|| single('\'', false))
        }
        Language::Rust if c == '"' => Some(single('"', true)),
        Language::Go if c == '`' => Some(Literal {
            open_len: 1,
            close: vec!['`'],
            escapes: false,
            multiline: true,
        }),
        Language::TypeScript | Language::JavaScript if c == '`' => Some(single('`', true)),
        Language::Php | Language::Ruby if c == '"' || c == '\'' => Some(single(c, true)),
        _ if c == '"' || c == '\'' => Some(single(c, false)),
        _ => None,
    }
}

fn push_blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }
}

fn consume_literal(chars: &[char], mut i: usize, lit: &Literal, out: &mut String) -> usize {
    for k in 0..lit.open_len {
        out.push(chars[i + k]);
    }
    i += lit.open_len;

    while i < chars.len() {
        let c = chars[i];
        if lit.escapes && c == '\\' {
            push_blank(out, c);
            if let Some(&next) = chars.get(i + 1) {
                push_blank(out, next);
            }
            i += 2;
            continue;
        }
        if lit.close.iter().enumerate().all(|(k, q)| chars.get(i + k) == Some(q)) {
            for q in &lit.close {
                out.push(*q);
            }
            return i + lit.close.len();
        }
        if c == '\n' && !lit.multiline {
            return i;
        }
        push_blank(out, c);
        i += 1;
    }
    i
}

/// Returns `content` with comments and string-literal contents replaced by spaces.
pub fn mask(content: &str, language: Language) -> String {
    let syntax = CommentSyntax::of(language);
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if syntax.line_marker_at(&chars, i) {
            while i < chars.len() && chars[i] != '\n' {
                push_blank(&mut out, chars[i]);
                i += 1;
            }
            continue;
        }
        if syntax.has_block_comments() && c == '/' && chars.get(i + 1) == Some(&'*') {
            out.push_str("  ");
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                push_blank(&mut out, chars[i]);
                i += 1;
            }
            if i < chars.len() {
                out.push_str("  ");
                i += 2;
            }
            continue;
        }
        if let Some(lit) = literal_start(&chars, i, language) {
            i = consume_literal(&chars, i, &lit, &mut out);
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Text of a whole-line comment, without its marker. Doc comments and
/// shebangs are not considered.
pub fn comment_body(line: &str, language: Language) -> Option<&str> {
    let t = line.trim_start();
    let slash = || {
        t.strip_prefix("//")
            .filter(|rest| !rest.starts_with('/') && !rest.starts_with('!'))
    };
    let hash = || t.strip_prefix('#').filter(|rest| !rest.starts_with('!'));
    let body = match CommentSyntax::of(language) {
        CommentSyntax::Slash => slash(),
        CommentSyntax::Hash => hash(),
        CommentSyntax::SlashAndHash => slash().or_else(hash),
        CommentSyntax::None => None,
    };
    body.map(str::trim)
}

/// Lines of a text, 1-based, with trailing `\r` removed.
pub fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(i, l)| (i + 1, l.strip_suffix('\r').unwrap_or(l)))
}

/// Byte offset → 1-based line number.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

/// A handler/class/function body found in the masked source.
#[derive(Debug, Clone)]
pub struct Block {
    /// 1-based line of the header.
    pub line: usize,
    /// Masked header text, trimmed.
    pub header: String,
    /// Masked body lines (1-based line, untrimmed text).
    pub body: Vec<(usize, String)>,
}

impl Block {
    pub fn statements(&self) -> Vec<&str> {
        self.body
            .iter()
            .map(|(_, l)| l.trim())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.statements().is_empty()
    }

    /// Body statements collapsed into a single whitespace-normalized string.
    pub fn joined(&self) -> String {
        self.statements()
            .iter()
            .flat_map(|s| s.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_body(text: &str, first_line: usize) -> Vec<(usize, String)> {
    text.split('\n')
        .enumerate()
        .map(|(i, l)| (first_line + i, l.trim_end_matches('\r').to_string()))
        .collect()
}

/// Brace-delimited blocks whose header matches `header`. The regex must end
/// with the opening `{`.
pub fn brace_blocks(masked: &str, header: &Regex) -> Vec<Block> {
    let bytes = masked.as_bytes();
    let index = LineIndex::new(masked);
    let mut blocks = Vec::new();

    for m in header.find_iter(masked) {
        let open = m.end() - 1;
        if bytes.get(open) != Some(&b'{') {
            continue;
        }
        let Some(close) = matching_brace(bytes, open) else {
            continue;
        };
        blocks.push(Block {
            line: index.line_of(m.start()),
            header: m.as_str().trim().to_string(),
            body: split_body(&masked[open + 1..close], index.line_of(open)),
        });
    }
    blocks
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Indentation-delimited blocks (Python). The regex is matched per line and
/// must end with the header's `:`; text after it is an inline body.
pub fn indent_blocks(masked: &str, header: &Regex) -> Vec<Block> {
    let lines: Vec<(usize, &str)> = numbered_lines(masked).collect();
    let mut blocks = Vec::new();

    for (pos, (line_no, line)) in lines.iter().enumerate() {
        let Some(m) = header.find(line) else {
            continue;
        };
        let indent = indentation(line);
        let inline = line[m.end()..].trim();
        let mut body = Vec::new();
        if !inline.is_empty() {
            body.push((*line_no, inline.to_string()));
        } else {
            for (next_no, next) in lines.iter().skip(pos + 1) {
                if next.trim().is_empty() {
                    continue;
                }
                if indentation(next) <= indent {
                    break;
                }
                body.push((*next_no, next.to_string()));
            }
        }
        blocks.push(Block {
            line: *line_no,
            header: m.as_str().trim().to_string(),
            body,
        });
    }
    blocks
}

/// Top-level `{}` blocks inside a brace body: `(header segment, inner text)`.
pub fn nested_brace_blocks(text: &str) -> Vec<(String, String)> {
    let bytes = text.as_bytes();
    let mut result = Vec::new();
    let mut segment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let Some(close) = matching_brace(bytes, i) else {
                    break;
                };
                let header = text[segment_start..i].trim().to_string();
                result.push((header, text[i + 1..close].to_string()));
                i = close + 1;
                segment_start = i;
            }
            b';' => {
                i += 1;
                segment_start = i;
            }
            _ => i += 1,
        }
    }
    result
}

static STRING_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|`([^`]*)`"#).unwrap()
});

/// Contents of the string literals on one (unmasked) line.
pub fn string_literals(line: &str) -> Vec<&str> {
    STRING_LITERAL_RE
        .captures_iter(line)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str())
        .collect()
}

/// Whole-word occurrences of `word` in `text`.
pub fn count_word_occurrences(text: &str, word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let pattern = format!(r"(?:^|[^\w$])({})(?:$|[^\w$])", regex::escape(word));
    let Ok(re) = Regex::new(&pattern) else {
        return 2;
    };
    // Resume right after the word so adjacent matches may share a delimiter.
    let mut count = 0;
    let mut start = 0;
    while start <= text.len() {
        let Some(found) = re.captures_at(text, start).and_then(|c| c.get(1)) else {
            break;
        };
        count += 1;
        start = found.end();
    }
    count
}

/// Occurrences of `word` in `text` outside the byte range `[start, end)`.
pub fn count_outside(text: &str, start: usize, end: usize, word: &str) -> usize {
    let end = end.min(text.len());
    let start = start.min(end);
    count_word_occurrences(&text[..start], word) + count_word_occurrences(&text[end..], word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_blanks_comments_and_strings() {
        let src = "let a = \"console.log(1)\"; // console.log(2)\nconsole.log(3);";
        let masked = mask(src, Language::TypeScript);
        assert_eq!(masked.len(), src.len());
        assert_eq!(masked.matches("console.log").count(), 1);
        assert!(masked.lines().nth(1).unwrap().starts_with("console.log(3)"));
    }

    #[test]
    fn test_mask_python_hash_inside_string() {
        let src = "x = \"# not a comment\"  # real comment\nprint(x)";
        let masked = mask(src, Language::Python);
        assert!(!masked.contains("real comment"));
        assert!(!masked.contains("not a comment"));
        assert!(masked.contains("print(x)"));
    }

    #[test]
    fn test_mask_python_docstring() {
        let src = "def f():\n    \"\"\"Calls print(x) internally.\"\"\"\n    return 1\n";
        let masked = mask(src, Language::Python);
        assert!(!masked.contains("print"));
        assert_eq!(masked.lines().count(), src.lines().count());
    }

    #[test]
    fn test_mask_rust_lifetimes_are_code() {
        let src = "fn f<'a>(x: &'a str) -> &'a str { println!(\"{}\", x); x }";
        let masked = mask(src, Language::Rust);
        assert!(masked.contains("println!"));
        assert!(masked.contains("&'a str"));
    }

    #[test]
    fn test_mask_preserves_multibyte_offsets() {
        let src = "// añadir\nlet ñ = 1;";
        let masked = mask(src, Language::JavaScript);
        assert_eq!(masked.len(), src.len());
        assert!(masked.ends_with("let ñ = 1;"));
    }

    #[test]
    fn test_comment_body_skips_doc_comments() {
        assert_eq!(comment_body("  // x = 1;", Language::Go), Some("x = 1;"));
        assert_eq!(comment_body("/// docs", Language::Rust), None);
        assert_eq!(comment_body("#!/usr/bin/env python", Language::Python), None);
        assert_eq!(comment_body("# total = 0", Language::Python), Some("total = 0"));
        assert_eq!(comment_body("x = 1", Language::Python), None);
    }

    #[test]
    fn test_brace_blocks_extract_bodies() {
        let src = "try {\n  run();\n} catch (e) {\n}\n";
        let re = Regex::new(r"\bcatch\s*(\([^)]*\))?\s*\{").unwrap();
        let blocks = brace_blocks(&mask(src, Language::JavaScript), &re);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].line, 3);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn test_indent_blocks_inline_and_nested() {
        let src = "try:\n    run()\nexcept ValueError:\n    # ignored\n    pass\nexcept KeyError: raise\nprint(1)\n";
        let re = Regex::new(r"^\s*except\b[^:]*:").unwrap();
        let blocks = indent_blocks(&mask(src, Language::Python), &re);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].statements(), vec!["pass"]);
        assert_eq!(blocks[1].statements(), vec!["raise"]);
    }

    #[test]
    fn test_nested_brace_blocks_top_level_only() {
        let body = " int x; int get() { if (a) { b(); } return x; } void set() { } ";
        let blocks = nested_brace_blocks(body);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "int get()");
        assert_eq!(blocks[1].0, "void set()");
    }

    #[test]
    fn test_count_word_occurrences_whole_words() {
        assert_eq!(count_word_occurrences("os osx os.path", "os"), 2);
        assert_eq!(count_word_occurrences("a,a", "a"), 2);
        assert_eq!(count_word_occurrences("$e $ex", "$e"), 1);
    }

    #[test]
    fn test_string_literals() {
        let lits = string_literals(r#"url = "http://x" + 'y' + `z`"#);
        assert_eq!(lits, vec!["http://x", "y", "z"]);
    }

    #[test]
    fn test_line_index() {
        let idx = LineIndex::new("a\nbb\nccc");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(5), 3);
    }
}
