//! Property tests for placeholder accounting and the capture rewrite.

use proptest::prelude::*;
use serde_json::json;
use sqltpl::{Compiler, Dialect, Value, capture, parser};

/// Template fragments paired with the number of arguments each binds for
/// the data in [`data`].
const FRAGMENTS: &[(&str, usize)] = &[
    ("select * from t where", 0),
    ("a = {{.A}}", 1),
    ("b = {{.B}}", 1),
    ("'??'", 0),
    ("{{if .A}} and x = {{.B}} {{end}}", 1),
    ("{{if .Missing}} and never = {{.Missing}} {{end}}", 0),
    ("in ({{range $i, $v := .L}}{{if $i}}, {{end}}{{.}}{{end}})", 3),
    ("{{range $v := .L}}{{$v}}{{end}}", 0),
    ("{{with .M}} m = {{.K}} {{end}}", 1),
    ("{{template \"sub\" .}}", 1),
    ("{{len .L}}", 1),
    ("{{$d := .A}}", 0),
    ("and", 0),
];

const SUB: &str = r#"{{define "sub"}}sub = {{.B}}{{end}}"#;

fn data() -> Value {
    Value::from(json!({
        "A": 4,
        "B": "b",
        "L": [1, 2, 3],
        "M": {"K": true},
    }))
}

fn dialects() -> impl Strategy<Value = Dialect> {
    prop_oneof![
        Just(Dialect::Question),
        Just(Dialect::Dollar),
        Just(Dialect::Colon),
        Just(Dialect::AtP),
    ]
}

fn templates() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(0..FRAGMENTS.len(), 0..12).prop_map(|picks| {
        let mut text = String::from(SUB);
        let mut expected = 0;
        for i in picks {
            let (fragment, args) = FRAGMENTS[i];
            text.push(' ');
            text.push_str(fragment);
            expected += args;
        }
        (text, expected)
    })
}

fn count_markers(sql: &str, dialect: Dialect) -> usize {
    match dialect {
        Dialect::Question => sql.replace("'?'", "").matches('?').count(),
        _ => sql.matches(dialect.prefix()).count(),
    }
}

proptest! {
    #[test]
    fn prop_placeholders_match_arguments((text, expected) in templates(), dialect in dialects()) {
        let compiler = Compiler::builder().dialect(dialect).build().unwrap();
        let out = compiler.compile_value(&text, &data()).unwrap();
        prop_assert_eq!(out.args.len(), expected);
        prop_assert_eq!(count_markers(&out.sql, dialect), expected);
    }

    #[test]
    fn prop_numbered_placeholders_are_sequential((text, _) in templates()) {
        let compiler = Compiler::builder().dialect(Dialect::Dollar).build().unwrap();
        let out = compiler.compile_value(&text, &data()).unwrap();
        for n in 1..=out.args.len() {
            prop_assert!(out.sql.contains(&format!("${n}")), "missing ${} in {}", n, out.sql);
        }
        let next = format!("${}", out.args.len() + 1);
        prop_assert!(!out.sql.contains(&next));
    }

    #[test]
    fn prop_escape_is_one_literal(pieces in prop::collection::vec("[a-z ,=']{0,8}", 1..6)) {
        let text = pieces.join("??");
        let compiler = Compiler::builder()
            .dialect(Dialect::Dollar)
            .normalize_whitespace(false)
            .build()
            .unwrap();
        let out = compiler.compile_value(&text, &Value::Null).unwrap();
        prop_assert_eq!(out.sql, pieces.join("?"));
        prop_assert!(out.args.is_empty());
    }

    #[test]
    fn prop_rewrite_is_idempotent((text, _) in templates()) {
        let mut once = parser::parse(&text).unwrap();
        capture::rewrite(&mut once);
        let mut twice = once.clone();
        capture::rewrite(&mut twice);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.to_string(), twice.to_string());
    }
}
