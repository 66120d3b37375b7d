use pretty_assertions::assert_eq;

use crate::ast::*;
use crate::parser::parse;

fn only_action(src: &str) -> Pipeline {
    let tpl = parse(src).unwrap();
    match tpl.root.nodes.as_slice() {
        [Node::Action(pipe)] => pipe.clone(),
        other => panic!("expected a single action, got {:?}", other),
    }
}

#[test]
fn test_field_chain() {
    let pipe = only_action("{{.User.Name}}");
    assert_eq!(pipe.cmds.len(), 1);
    assert_eq!(
        pipe.cmds[0].args,
        vec![Operand::Field(vec!["User".to_string(), "Name".to_string()])]
    );
    assert_eq!(pipe.pos, Pos::new(1, 3));
}

#[test]
fn test_dot_and_literals() {
    let pipe = only_action(r#"{{print . "a" 1 2.5 true nil}}"#);
    assert_eq!(
        pipe.cmds[0].args,
        vec![
            Operand::Identifier("print".to_string()),
            Operand::Dot,
            Operand::String("a".to_string()),
            Operand::Number(Number::Int(1)),
            Operand::Number(Number::Float(2.5)),
            Operand::Bool(true),
            Operand::Nil,
        ]
    );
}

#[test]
fn test_pipe_stages() {
    let pipe = only_action("{{ .Value | len | printf \"%d\" }}");
    assert_eq!(pipe.cmds.len(), 3);
    assert_eq!(pipe.cmds[1].func_name(), Some("len"));
    assert_eq!(pipe.cmds[2].func_name(), Some("printf"));
    assert_eq!(pipe.to_string(), r#".Value | len | printf "%d""#);
}

#[test]
fn test_declaration_and_assignment() {
    let tpl = parse("{{$x := .A}}{{$x = 2}}{{$x}}").unwrap();
    let Node::Action(decl) = &tpl.root.nodes[0] else {
        panic!("expected action");
    };
    assert_eq!(decl.decl, vec!["$x".to_string()]);
    assert!(!decl.is_assign);
    assert!(decl.is_declaration());

    let Node::Action(assign) = &tpl.root.nodes[1] else {
        panic!("expected action");
    };
    assert!(assign.is_assign);
    assert_eq!(assign.to_string(), "$x = 2");

    let Node::Action(read) = &tpl.root.nodes[2] else {
        panic!("expected action");
    };
    assert!(!read.is_declaration());
}

#[test]
fn test_variable_with_fields() {
    let pipe = only_action("{{$.Filter.Id}}");
    assert_eq!(
        pipe.cmds[0].args,
        vec![Operand::Variable {
            name: "$".to_string(),
            fields: vec!["Filter".to_string(), "Id".to_string()],
        }]
    );
}

#[test]
fn test_parenthesized_chain() {
    let pipe = only_action("{{(index .Rows 0).Name}}");
    let [Operand::Chain { node, fields }] = pipe.cmds[0].args.as_slice() else {
        panic!("expected chain, got {:?}", pipe.cmds[0].args);
    };
    assert_eq!(fields, &vec!["Name".to_string()]);
    assert!(matches!(**node, Operand::Pipe(_)));
    assert_eq!(pipe.to_string(), "(index .Rows 0).Name");
}

#[test]
fn test_nested_parens_as_argument() {
    let pipe = only_action("{{eq (len .Ids) 0}}");
    assert_eq!(pipe.cmds[0].args.len(), 3);
    let Operand::Pipe(inner) = &pipe.cmds[0].args[1] else {
        panic!("expected pipe");
    };
    assert_eq!(inner.cmds[0].func_name(), Some("len"));
}

#[test]
fn test_negative_number_is_not_trim() {
    let pipe = only_action("{{-3}}");
    assert_eq!(pipe.cmds[0].args, vec![Operand::Number(Number::Int(-3))]);
}

#[test]
fn test_positions_across_lines() {
    let tpl = parse("select *\nfrom t\nwhere a = {{ .A }}").unwrap();
    let Node::Action(pipe) = &tpl.root.nodes[1] else {
        panic!("expected action");
    };
    assert_eq!(pipe.pos, Pos::new(3, 14));
}
