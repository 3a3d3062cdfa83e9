//! `source` turns the text of a Python function definition into something that can be
//! embedded in a PL/Python routine.
//!
//! The parse tree is only used to find line numbers. Output is always a slice of the
//! original text, so indentation and formatting inside the body survive unchanged.

use crate::py_parser::{PyParser, Rule};
use crate::pest::Parser;
use pest::iterators::Pair;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to parse function definition: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error("Unsupported function definition: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyParameter {
    pub name: String,
    pub kind: ParamKind,
    /// Annotation text as written, if any.
    pub annotation: Option<String>,
    /// Default value text as written, if any.
    pub default: Option<String>,
}

/// A parsed Python function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyFunction {
    name: String,
    parameters: Vec<PyParameter>,
    is_async: bool,
    decorator_lines: Vec<usize>,
    def_line: usize,
    source: String,
}

impl PyFunction {
    /// Parses the source of one function definition, as `inspect.getsource` would return it.
    /// Extra indentation (e.g. a method body) is removed first.
    pub fn parse(text: &str) -> Result<PyFunction, Error> {
        let source = dedent(text);
        let definition = PyParser::parse(Rule::source, &source)
            .map_err(Box::new)?
            .next()
            .ok_or_else(|| Error::Unsupported(String::from("no function definition found")))?;

        let mut func = PyFunction {
            name: String::new(),
            parameters: vec![],
            is_async: false,
            decorator_lines: vec![],
            def_line: 1,
            source: String::new(),
        };
        for part in definition.into_inner() {
            match part.as_rule() {
                Rule::decorator => {
                    let first = part.as_span().start_pos().line_col().0;
                    let last = first + part.as_str().trim_end().matches('\n').count();
                    func.decorator_lines.extend(first..=last);
                }
                Rule::def_header => {
                    func.def_line = part.as_span().start_pos().line_col().0;
                    parse_def_header(part, &mut func);
                }
                Rule::body | Rule::EOI => (),
                rule => unreachable!("PyFunction::parse found unexpected {:?}", rule),
            }
        }
        func.source = source;
        Ok(func)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[PyParameter] {
        &self.parameters
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// 1-based line numbers of every line that belongs to a decorator.
    pub fn decorator_lines(&self) -> &[usize] {
        &self.decorator_lines
    }

    /// 1-based line number of the `def` keyword.
    pub fn def_line(&self) -> usize {
        self.def_line
    }

    /// The dedented source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source from the `def` line onward.
    pub fn without_decorators(&self) -> String {
        if self.decorator_lines.is_empty() {
            return self.source.clone();
        }
        lines_from(&self.source, self.def_line)
    }
}

fn parse_def_header(header: Pair<Rule>, func: &mut PyFunction) {
    for h in header.into_inner() {
        match h.as_rule() {
            Rule::async_kw => func.is_async = true,
            Rule::function_name => func.name = String::from(h.as_str()),
            Rule::parameters => func.parameters = parse_parameters(h),
            Rule::return_annotation => (),
            rule => unreachable!("parse_def_header found unexpected {:?}", rule),
        }
    }
}

fn parse_parameters(params: Pair<Rule>) -> Vec<PyParameter> {
    let mut ret: Vec<PyParameter> = vec![];
    let mut kind = ParamKind::PositionalOrKeyword;
    for p in params.into_inner() {
        match p.as_rule() {
            // Everything written so far was positional-only.
            Rule::positional_marker => {
                for earlier in ret.iter_mut() {
                    earlier.kind = ParamKind::PositionalOnly;
                }
            }
            Rule::keyword_marker => kind = ParamKind::KeywordOnly,
            Rule::parameter => ret.push(parse_parameter(p, kind)),
            Rule::var_positional => {
                ret.push(parse_parameter(p, ParamKind::VarPositional));
                kind = ParamKind::KeywordOnly;
            }
            Rule::var_keyword => ret.push(parse_parameter(p, ParamKind::VarKeyword)),
            rule => unreachable!("parse_parameters found unexpected {:?}", rule),
        }
    }
    ret
}

fn parse_parameter(param: Pair<Rule>, kind: ParamKind) -> PyParameter {
    let mut ret = PyParameter {
        name: String::new(),
        kind,
        annotation: None,
        default: None,
    };
    for part in param.into_inner() {
        match part.as_rule() {
            Rule::identifier => ret.name = String::from(part.as_str()),
            Rule::annotation_expr => ret.annotation = Some(String::from(part.as_str().trim())),
            Rule::default_expr => ret.default = Some(String::from(part.as_str().trim())),
            rule => unreachable!("parse_parameter found unexpected {:?}", rule),
        }
    }
    ret
}

/// Strips every decorator line from `funcdef_source` and returns the rest.
/// Source without decorators comes back unchanged.
pub fn strip_decorators(funcdef_source: &str) -> Result<String, Error> {
    let definition = PyParser::parse(Rule::source, funcdef_source)
        .map_err(Box::new)?
        .next()
        .ok_or_else(|| Error::Unsupported(String::from("no function definition found")))?;
    let mut has_decorators = false;
    let mut first_non_decorator_line = None;
    for part in definition.into_inner() {
        match part.as_rule() {
            Rule::decorator => has_decorators = true,
            Rule::def_header => {
                first_non_decorator_line = Some(part.as_span().start_pos().line_col().0);
                break;
            }
            _ => (),
        }
    }
    let first_line = match (has_decorators, first_non_decorator_line) {
        (true, Some(line)) => line,
        _ => return Ok(String::from(funcdef_source)),
    };
    Ok(lines_from(funcdef_source, first_line))
}

/// The text from 1-based `line` to the end, with original line endings.
fn lines_from(text: &str, line: usize) -> String {
    text.split_inclusive('\n').skip(line - 1).collect()
}

/// Removes any common leading whitespace from every line, like Python's `textwrap.dedent`.
/// Lines that consist solely of whitespace are normalized to their line ending.
pub fn dedent(text: &str) -> String {
    let is_indent = |c: char| c == ' ' || c == '\t';
    // Only spaces and tabs make a line blank; other Unicode whitespace is content.
    let is_blank = |line: &str| {
        line.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'))
            .is_empty()
    };
    let margin = text
        .split_inclusive('\n')
        .filter(|line| !is_blank(line))
        .map(|line| &line[..line.len() - line.trim_start_matches(is_indent).len()])
        .reduce(common_prefix)
        .unwrap_or("");
    text.split_inclusive('\n')
        .map(|line| {
            if is_blank(line) {
                &line[line.trim_end_matches(|c: char| c == '\r' || c == '\n').len()..]
            } else {
                &line[margin.len()..]
            }
        })
        .collect()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let n = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..n]
}

#[test]
fn test_remove_decorators() {
    let input = "\
@mydeco1(1, 3)
@mydeco2
@mydeco3(
    'dummy',
    5,
    None
)
def orig_func(x, y, z):
    return x * y + z
";
    let expected = "\
def orig_func(x, y, z):
    return x * y + z
";
    assert_eq!(strip_decorators(input).unwrap(), expected);
}

#[test]
fn test_remove_decorators_when_none_exist() {
    let cases = vec![
        "def orig_func(x, y, z):\n    return x * y + z\n",
        "\n\n# comment first\ndef f(x):\n    return x",
        "def f(x):\r\n    return x\r\n",
    ];
    for case in cases {
        println!("Case: {:?}", case);
        assert_eq!(strip_decorators(case).unwrap(), case);
    }
}

#[test]
fn test_remove_decorators_preserves_body_and_line_endings() {
    let cases = vec![
        (
            "@a\r\n@b\r\ndef f(x):\r\n\r\n    # keep me\r\n    return x\r\n",
            "def f(x):\r\n\r\n    # keep me\r\n    return x\r\n",
        ),
        (
            "@outer\ndef f(x):\n    @inner\n    def g(y):\n        return y\n    return g(x)",
            "def f(x):\n    @inner\n    def g(y):\n        return y\n    return g(x)",
        ),
        (
            "@a\ndef f(x):\n    return x\n\n@b\ndef g(y):\n    return y\n",
            "def f(x):\n    return x\n\n@b\ndef g(y):\n    return y\n",
        ),
        (
            "@a  # note\n\n@b('(', \"@\")\nasync def f():\n    pass\n",
            "async def f():\n    pass\n",
        ),
    ];
    for case in cases {
        println!("Case: {:?}", case.0);
        assert_eq!(strip_decorators(case.0).unwrap(), case.1);
    }
}

#[test]
fn test_remove_decorators_rejects_unparseable_source() {
    let cases = vec!["", "return x\n", "@deco\n", "@deco(\ndef f(x): pass\n"];
    for case in cases {
        println!("Case: {:?}", case);
        assert!(matches!(strip_decorators(case), Err(Error::Parse(_))));
    }
}

#[test]
fn test_dedent() {
    let cases = vec![
        ("def f():\n    pass\n", "def f():\n    pass\n"),
        ("    def f():\n        pass\n", "def f():\n    pass\n"),
        ("    @d\n    def f():\n\n        pass", "@d\ndef f():\n\n    pass"),
        ("  a\n    \n  b\n", "a\n\nb\n"),
        ("\ta\n\t\tb\n", "a\n\tb\n"),
        ("  a\n\tb\n", "  a\n\tb\n"),
        // A line holding a non-ASCII space is content and keeps its own margin.
        ("  a\n \u{3000}\n  b\n", " a\n\u{3000}\n b\n"),
        ("    a\n\u{a0}\n    b\n", "    a\n\u{a0}\n    b\n"),
        ("", ""),
    ];
    for case in cases {
        println!("Case: {:?}", case.0);
        assert_eq!(dedent(case.0), case.1);
    }
}

#[test]
fn test_parse_function() {
    let input = "    @udf\n    def mult_a_b(a, b: int = 2):\n        return a * b\n";
    let func = PyFunction::parse(input).unwrap();
    assert_eq!(func.name(), "mult_a_b");
    assert!(!func.is_async());
    assert_eq!(func.decorator_lines(), &[1]);
    assert_eq!(func.def_line(), 2);
    assert_eq!(
        func.parameters(),
        &[
            PyParameter {
                name: String::from("a"),
                kind: ParamKind::PositionalOrKeyword,
                annotation: None,
                default: None,
            },
            PyParameter {
                name: String::from("b"),
                kind: ParamKind::PositionalOrKeyword,
                annotation: Some(String::from("int")),
                default: Some(String::from("2")),
            },
        ]
    );
    assert_eq!(func.source(), "@udf\ndef mult_a_b(a, b: int = 2):\n    return a * b\n");
    assert_eq!(
        func.without_decorators(),
        "def mult_a_b(a, b: int = 2):\n    return a * b\n"
    );
}

#[test]
fn test_parse_parameter_kinds() {
    let func = PyFunction::parse("def f(a, /, b, *args, c, d=1, **kw): pass").unwrap();
    let kinds: Vec<(&str, ParamKind)> = func
        .parameters()
        .iter()
        .map(|p| (p.name.as_str(), p.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("a", ParamKind::PositionalOnly),
            ("b", ParamKind::PositionalOrKeyword),
            ("args", ParamKind::VarPositional),
            ("c", ParamKind::KeywordOnly),
            ("d", ParamKind::KeywordOnly),
            ("kw", ParamKind::VarKeyword),
        ]
    );
}

#[test]
fn test_parse_multiline_decorator_lines() {
    let func = PyFunction::parse("@a\n@b(\n  1,\n)\n\nasync def f(): pass").unwrap();
    assert_eq!(func.decorator_lines(), &[1, 2, 3, 4]);
    assert_eq!(func.def_line(), 6);
    assert!(func.is_async());
}

#[test]
fn test_remove_decorators_with_line_continuation() {
    let input = "@deco \\\n    (1)\ndef f(x):\n    return x\n";
    assert_eq!(strip_decorators(input).unwrap(), "def f(x):\n    return x\n");
    let func = PyFunction::parse(input).unwrap();
    assert_eq!(func.decorator_lines(), &[1, 2]);
    assert_eq!(func.def_line(), 3);
}
