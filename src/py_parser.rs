//! `py_parser` contains generated parsing routines for Python function definitions and tests on them.

#[allow(unused_imports)]
use pest::Parser; // This needs to be in scope for the next statements to work.
#[derive(Parser)]
#[grammar = "python.pest"]
pub struct PyParser;

#[test]
fn test_parse_identifiers() {
    let cases = vec!["x", "_private", "mult_a_b", "CamelCase", "naïve", "v0"];
    for case in cases {
        println!("Case: {}", case);
        let parsed = PyParser::parse(Rule::identifier, case)
            .expect("should parse")
            .next()
            .unwrap();
        assert_eq!(parsed.as_str(), case);
    }
}

#[test]
fn test_parse_def_headers() {
    let cases = vec![
        "def f():",
        "def f(x):",
        "def orig_func(x, y, z):",
        "def f(x, y,):",
        "def f(x: int, y: str = 'a, b') -> int:",
        "def f(a, /, b, *, c):",
        "def f(*args, **kwargs):",
        "def f(x: Dict[str, int] = {'a': (1, 2)}):",
        "async def f(x):",
        "def f(\n    a,  # first\n    b,\n):",
        "def f(x=lambda: 1, y=\"#notacomment\"):",
    ];
    for case in cases {
        println!("Case: {}", case);
        match PyParser::parse(Rule::def_header, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_def_headers() {
    let cases = vec![
        "def (x):",
        "define f(x):",
        "deff(x):",
        "def f(x",
        "def f(x, 'y'):",
        "def f(,):",
        "class F:",
    ];
    for case in cases {
        println!("Case: {}", case);
        assert!(PyParser::parse(Rule::def_header, case).is_err());
    }
}

#[test]
fn test_parse_decorators() {
    let cases = vec![
        "@mydeco\n",
        "@mydeco1(1, 3)\n",
        "@ns.deco(x=1)  # trailing\n",
        "@mydeco3(\n    'dummy',\n    5,\n    None\n)\n",
        "@deco[0].attr\n",
        "@deco(')')\n",
        "@deco \\\n(1)\n",
    ];
    for case in cases {
        println!("Case: {:?}", case);
        let parsed = PyParser::parse(Rule::decorator, case)
            .expect("should parse")
            .next()
            .unwrap();
        assert_eq!(parsed.as_str(), case);
    }
}

#[test]
fn test_parse_sources() {
    let cases = vec![
        "def f(x):\n    return x\n",
        "@deco\ndef f(x):\n    return x\n",
        "\n# leading comment\n@a\n\n@b(1)\ndef f(x): return x",
        "@a\nasync def f():\n    pass\n",
        "def f(x):\n    def g(y):\n        return y\n    return g(x)\n",
    ];
    for case in cases {
        println!("Case: {:?}", case);
        match PyParser::parse(Rule::source, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_sources() {
    let cases = vec![
        "",
        "x = 1\n",
        "import math\ndef f(x):\n    return x\n",
        "@deco\n",
        "@deco(\ndef f(x):\n    return x\n",
    ];
    for case in cases {
        println!("Case: {:?}", case);
        assert!(PyParser::parse(Rule::source, case).is_err());
    }
}
