//! Testing rules: missing paired tests and test files with only weak assertions.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ReviewResult;
use crate::language::Language;
use crate::review::scanner::ScanEnv;
use crate::rules::catalog::{has_inline_tests, production_end};
use crate::rules::lexical::numbered_lines;
use crate::rules::{Category, FileContext, Hit, Matcher, RegistryBuilder, Rule, Severity};

pub fn register(builder: &mut RegistryBuilder) -> ReviewResult<()> {
    builder
        .register(Rule::file(
            "MISSING_TEST_FILE",
            Category::Testing,
            Severity::Warning,
            &Language::KNOWN,
            "Source file without its paired test",
            MissingTestFile,
        ))?
        .register(Rule::file(
            "WEAK_ASSERTIONS",
            Category::Testing,
            Severity::Critical,
            &Language::KNOWN,
            "Test file whose assertions never check a concrete value",
            WeakAssertions,
        ))?;
    Ok(())
}

pub struct MissingTestFile;

impl Matcher for MissingTestFile {
    fn check_file(&self, ctx: &FileContext, env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let Some(expected) = ctx.paired_test.as_deref() else {
            return Ok(Vec::new());
        };
        if ctx.is_test || env.has_paired_test(&ctx.path) {
            return Ok(Vec::new());
        }
        if ctx.language == Language::Rust && has_inline_tests(ctx, &ctx.masked()) {
            return Ok(Vec::new());
        }
        Ok(vec![Hit::file(format!("no test file found: expected {}", expected))])
    }
}

// Formas débiles que se parecen a las fuertes: existencia, verdad o longitud
// comparada contra 0/1. Se evalúan antes que el catálogo fuerte.
static WEAK_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // AssertJ / Hamcrest / NUnit
        r"\.(isNotNull|isNotEmpty|isNotBlank|isTrue|isFalse|isPresent|isNotPresent|isPositive)\s*\(\s*\)",
        r"\.(isGreaterThan|hasSizeGreaterThan)\s*\(\s*0\s*\)|\.isGreaterThanOrEqualTo\s*\(\s*1\s*\)",
        r"(notNullValue|not\s*\(\s*nullValue|not\s*\(\s*empty)\w*\s*\(",
        r"Is\.(Not\.(Null|Empty)|True|False)|Has\.Some",
        // Jest / Vitest
        r"\.not\.(toBe|toEqual|toStrictEqual)\s*\(\s*(null|undefined)\s*\)",
        r"\.not\.toHaveLength\s*\(\s*0\s*\)",
        r"\.toBeGreaterThan\s*\(\s*0\s*\)|\.toBeGreaterThanOrEqual\s*\(\s*1\s*\)",
        // Go testify
        r"(assert|require)\.(Greater|Greaterf)\s*\(.*,\s*0\s*\)|(assert|require)\.(GreaterOrEqual|GreaterOrEqualf)\s*\(.*,\s*1\s*\)",
        // Cota inferior sobre una longitud: len(x) > 0, items.length >= 1, list.size() != 0
        r"(len\s*\(.*\)|\.(length|size\s*\(\s*\)|len\s*\(\s*\)|count\s*\(\s*\)|Count|Length))\s*(>\s*0|>=\s*1|!=\s*0)\s*(?:[),;]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// Aserciones fuertes: igualdad u orden contra un valor concreto, o expectativas de excepción.
static STRONG_ASSERTION: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Rust
        r"\bassert_eq!\s*\(",
        r"\bassert!\s*\(\s*matches!",
        r"\bassert!\s*\(.*[^!=<>]==[^=]",
        r"#\[should_panic",
        // JS / TS
        r"\.(toBe|toEqual|toStrictEqual|toMatch|toMatchObject|toContain|toContainEqual|toHaveLength|toHaveBeenCalledWith|toHaveBeenCalledTimes|toHaveProperty|toThrow|toThrowError|toBeGreaterThan|toBeGreaterThanOrEqual|toBeLessThan|toBeLessThanOrEqual|toBeCloseTo|toMatchSnapshot|toMatchInlineSnapshot)\s*\(",
        r"\bassert\.(equal|strictEqual|deepEqual|deepStrictEqual|notEqual|throws|rejects|match)\s*\(",
        r"\.(eql|equal|equals|lengthOf|throw)\s*\(",
        r"\bassert\s*\(.*[^!=]===?[^=]",
        // Python
        r"\bassert\s+.*[^!=<>]==[^=]",
        r"\bassert\s+.*\s(<=?|>=?)\s*(?:[1-9]|[A-Za-z_\x22'(\[])",
        r"\bassert\s+.*\s(not\s+)?in\s",
        r"\bpytest\.raises\b",
        r"\bassert(Equal|Equals|NotEqual|In|NotIn|Raises|RaisesRegex|AlmostEqual|Greater|GreaterEqual|Less|LessEqual|CountEqual|DictEqual|ListEqual|Regex|Is)\s*\(",
        // Java / C# / PHP
        r"\bassert(Equals|NotEquals|Same|NotSame|ArrayEquals|Throws|That|Contains|Count|Matches|StringContainsString|InstanceOf)\w*\s*\(",
        r"\bAssert\.(AreEqual|AreNotEqual|AreSame|Throws|ThrowsAsync|ThrowsException|Equal|NotEqual|Contains|Matches|Single|Same|That)\s*\(",
        r"\bexpectException\w*\s*\(",
        // Go
        r"\b(assert|require)\.(Equal|Equalf|EqualValues|Exactly|ErrorIs|ErrorAs|ErrorContains|Contains|Len|Panics|JSONEq|Greater|Less|ElementsMatch)\s*\(",
        r"\bif\s+.*(!=|==)\s*(want|expected|exp)\w*\b",
        r"\breflect\.DeepEqual\b|\bcmp\.(Diff|Equal)\b",
        // Ruby
        r"\.(to|not_to|to_not)\s+(eq|eql|equal|be\s*[<>=]|match|include|raise_error|contain_exactly|have_attributes|have_key)\b",
        r"\bassert_(equal|raises|match|includes|in_delta)\b",
        // C / C++
        r"\b(ASSERT|EXPECT)_(EQ|NE|LT|LE|GT|GE|STREQ|STRNE|THROW|ANY_THROW|FLOAT_EQ|DOUBLE_EQ|NEAR)\s*\(",
        r"\b(REQUIRE|CHECK)\s*\(.*[^!=]==[^=]",
        r"\bCHECK_(EQUAL|THROW|CLOSE)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// Cualquier otra aserción cuenta como débil: no-nulo, truthy, no-vacío, len > 0.
static ANY_ASSERTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^\w.>]|self\.|this\.|this->)(assert\w*!?|Assert\.\w+|expect\w*|should\w*|refute\w*|ASSERT_\w+|EXPECT_\w+|REQUIRE\w*|CHECK\w*|require\.\w+)\s*[(.!{]|\bassert\s",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strength {
    Strong,
    Weak,
}

/// Clasifica una línea enmascarada: formas débiles, luego fuertes, luego cualquier aserción.
fn classify_assertion(line: &str) -> Option<Strength> {
    if WEAK_SHAPES.iter().any(|re| re.is_match(line)) {
        Some(Strength::Weak)
    } else if STRONG_ASSERTION.iter().any(|re| re.is_match(line)) {
        Some(Strength::Strong)
    } else if ANY_ASSERTION.is_match(line) {
        Some(Strength::Weak)
    } else {
        None
    }
}

pub struct WeakAssertions;

impl Matcher for WeakAssertions {
    fn check_file(&self, ctx: &FileContext, _env: &ScanEnv) -> ReviewResult<Vec<Hit>> {
        let masked = ctx.masked();
        // En Rust el módulo `#[cfg(test)]` de un archivo fuente también se revisa
        let first_test_line = if ctx.is_test {
            0
        } else if ctx.language == Language::Rust && has_inline_tests(ctx, &masked) {
            production_end(ctx, &masked) + 1
        } else {
            return Ok(Vec::new());
        };
        let mut first_weak = None;
        let mut weak = 0usize;
        for (n, line) in numbered_lines(&masked).filter(|(n, _)| *n >= first_test_line) {
            match classify_assertion(line) {
                Some(Strength::Strong) => return Ok(Vec::new()),
                Some(Strength::Weak) => {
                    weak += 1;
                    first_weak.get_or_insert(n);
                }
                None => {}
            }
        }
        let Some(line) = first_weak else {
            return Ok(Vec::new());
        };
        Ok(vec![Hit::at(
            line,
            format!(
                "test file has {} assertion(s) and none checks a concrete value; assert on expected results",
                weak
            ),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::catalog::fixtures::{ctx, lines, run};
    use std::collections::BTreeSet;

    #[test]
    fn test_missing_test_file() {
        let hits = run(&MissingTestFile, "src/payments.ts", "export const pay = () => 1;\n");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 0);
        assert_eq!(hits[0].message, "no test file found: expected src/payments.test.ts");
    }

    #[test]
    fn test_missing_test_file_satisfied_by_env() {
        let c = ctx("src/payments.ts", "export const pay = () => 1;\n");
        let env = ScanEnv::new(BTreeSet::new(), ["src/payments.ts".to_string()].into_iter().collect());
        assert!(MissingTestFile.check_file(&c, &env).unwrap().is_empty());
    }

    #[test]
    fn test_missing_test_file_skips_tests_boilerplate_and_inline_rust() {
        assert!(run(&MissingTestFile, "src/payments.test.ts", "").is_empty());
        assert!(run(&MissingTestFile, "pkg/__init__.py", "").is_empty());
        let rs = "pub fn pay() {}\n\n#[cfg(test)]\nmod tests {\n    #[test]\n    fn t() {}\n}\n";
        assert!(run(&MissingTestFile, "src/payments.rs", rs).is_empty());
        assert!(run(&MissingTestFile, "README.md", "").is_empty());
    }

    #[test]
    fn test_classify_assertion() {
        assert_eq!(classify_assertion("assert result == 4"), Some(Strength::Strong));
        assert_eq!(classify_assertion("    assert_eq!(total, 10);"), Some(Strength::Strong));
        assert_eq!(classify_assertion("expect(sum(1, 2)).toBe(3);"), Some(Strength::Strong));
        assert_eq!(classify_assertion("self.assertEqual(a, b)"), Some(Strength::Strong));
        assert_eq!(classify_assertion("with pytest.raises(ValueError):"), Some(Strength::Strong));
        assert_eq!(classify_assertion("assert result != None"), Some(Strength::Weak));
        assert_eq!(classify_assertion("assert len(items) > 0"), Some(Strength::Weak));
        assert_eq!(classify_assertion("expect(user).toBeDefined();"), Some(Strength::Weak));
        assert_eq!(classify_assertion("assert!(value.is_some());"), Some(Strength::Weak));
        assert_eq!(classify_assertion("assertNotNull(user);"), Some(Strength::Weak));
        assert_eq!(classify_assertion("let v = cfg.expect(\"x\");"), None);
        assert_eq!(classify_assertion("result = calculate(2, 2)"), None);
    }

    #[test]
    fn test_weak_assertions_only() {
        let src = "def test_add():\n    result = add(2, 2)\n    assert result != None\n    assert result\n";
        let hits = run(&WeakAssertions, "tests/test_calc.py", src);
        assert_eq!(lines(&hits), vec![3]);
        assert!(hits[0].message.starts_with("test file has 2 assertion(s)"));
    }

    #[test]
    fn test_one_strong_assertion_is_enough() {
        let src = "test('add', () => {\n  expect(add(1, 1)).toBeDefined();\n  expect(add(1, 1)).toEqual(2);\n});\n";
        assert!(run(&WeakAssertions, "src/add.test.ts", src).is_empty());
    }

    #[test]
    fn test_weak_shapes_that_look_like_comparisons() {
        let weak = [
            "assertThat(user).isNotNull();",
            "assertThat(items).isNotEmpty();",
            "assertThat(order.getLines().size()).isGreaterThan(0);",
            "assertThat(user, is(notNullValue()));",
            "Assert.That(user, Is.Not.Null);",
            "expect(items.length).toBeGreaterThan(0);",
            "expect(x).not.toBe(null);",
            "expect(x).not.toEqual(undefined);",
            "expect(list).not.toHaveLength(0);",
            "assert len(items) >= 1",
            "assert len(items) > 0, \"empty\"",
            "assert(items.length > 0);",
            "assert!(v.len() > 0);",
            "assert.Greater(t, len(users), 0)",
        ];
        for line in weak {
            assert_eq!(classify_assertion(line), Some(Strength::Weak), "{}", line);
        }
        let strong = [
            "assertThat(user.getName()).isEqualTo(\"ana\");",
            "Assert.That(total, Is.EqualTo(10));",
            "expect(items.length).toBeGreaterThan(2);",
            "expect(x).not.toBe(3);",
            "assert len(items) == 3",
            "assert len(items) >= 2",
            "assert.Equal(t, 3, len(users))",
        ];
        for line in strong {
            assert_eq!(classify_assertion(line), Some(Strength::Strong), "{}", line);
        }
    }

    #[test]
    fn test_weak_only_test_files_per_language() {
        let cases = [
            ("src/test/java/app/UserTest.java", "@Test\nvoid loads() {\n    assertThat(user).isNotNull();\n}\n"),
            ("tests/UserServiceTests.cs", "[Test]\npublic void Loads() {\n    Assert.That(user, Is.Not.Null);\n    Assert.IsNotNull(user.Id);\n}\n"),
            ("src/a.test.ts", "it('lists', () => {\n  expect(items.length).toBeGreaterThan(0);\n});\n"),
            ("src/b.test.js", "it('loads', () => {\n  expect(x).not.toBe(null);\n});\n"),
            ("tests/test_c.py", "def test_items():\n    assert len(items) >= 1\n"),
            ("store/user_test.go", "func TestLoad(t *testing.T) {\n\tassert.NotNil(t, user)\n}\n"),
        ];
        for (path, src) in cases {
            let hits = run(&WeakAssertions, path, src);
            assert_eq!(hits.len(), 1, "{}", path);
        }
    }

    #[test]
    fn test_inline_rust_test_module_is_checked() {
        let weak = "pub fn load() -> Option<u8> { Some(1) }\n\n#[cfg(test)]\nmod tests {\n    #[test]\n    fn t() {\n        assert!(load().is_some());\n    }\n}\n";
        assert_eq!(lines(&run(&WeakAssertions, "src/store.rs", weak)), vec![7]);

        let strong = weak.replace("assert!(load().is_some());", "assert_eq!(load(), Some(1));");
        assert!(run(&WeakAssertions, "src/store.rs", &strong).is_empty());
        // Sin módulo de tests no hay nada que revisar
        assert!(run(&WeakAssertions, "src/store.rs", "fn f() { assert!(ok()); }\n").is_empty());
    }

    #[test]
    fn test_weak_assertions_ignores_sources_and_assertion_free_tests() {
        assert!(run(&WeakAssertions, "src/add.ts", "assert(x);\n").is_empty());
        assert!(run(&WeakAssertions, "tests/test_smoke.py", "def test_runs():\n    main()\n").is_empty());
        // Una aserción comentada no cuenta
        assert!(run(&WeakAssertions, "tests/test_calc.py", "# assert x\nassert y == 1\n").is_empty());
    }
}
