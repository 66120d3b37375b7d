use crate::parser::tokens::*;

#[test]
fn test_identifier() {
    assert_eq!(parse_identifier("len .X").unwrap(), (" .X", "len"));
    assert_eq!(parse_identifier("_sql_arg_}}").unwrap(), ("}}", "_sql_arg_"));
    assert!(parse_identifier("9lives").is_err());
}

#[test]
fn test_keyword_boundary() {
    assert!(keyword("if")("if .A").is_ok());
    assert!(keyword("if")("iffy").is_err());
    assert!(keyword("end")("end").is_ok());
}

#[test]
fn test_fields() {
    assert_eq!(parse_field(".Name rest").unwrap(), (" rest", "Name".to_string()));
    assert_eq!(
        parse_fields(".A.B_c .D").unwrap(),
        (" .D", vec!["A".to_string(), "B_c".to_string()])
    );
    assert_eq!(parse_fields("x").unwrap(), ("x", vec![]));
}

#[test]
fn test_variable_name() {
    assert_eq!(parse_variable_name("$ ").unwrap(), (" ", "$"));
    assert_eq!(parse_variable_name("$row.Id").unwrap(), (".Id", "$row"));
    assert!(parse_variable_name("row").is_err());
}

#[test]
fn test_whitespace() {
    assert_eq!(ws("  \t\nx").unwrap(), ("x", "  \t\n"));
    assert_eq!(ws("x").unwrap(), ("x", ""));
    assert!(ws1("x").is_err());
}

#[test]
fn test_strings() {
    assert_eq!(parse_string(r#""a\nb" x"#).unwrap(), (" x", "a\nb".to_string()));
    assert_eq!(parse_string("`a\\nb` x").unwrap(), (" x", "a\\nb".to_string()));
    assert_eq!(parse_string(r#""\x41é""#).unwrap().1, "Aé");
    assert!(matches!(parse_string(r#""\q""#), Err(nom::Err::Failure(_))));
    assert!(matches!(parse_string("`open"), Err(nom::Err::Failure(_))));
}
