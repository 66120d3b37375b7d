//! Capture rewriting.
//!
//! Every `Action` whose pipeline produces a value gets a trailing call to
//! [`CAPTURE_FUNC`]. At execution time that call moves the value into the
//! argument list and prints the `?` sentinel in its place, so no data value
//! ever reaches the SQL text.
//!
//! ```
//! use sqltpl::{capture, parser};
//!
//! let mut tpl = parser::parse("where id = {{.Id}}").unwrap();
//! capture::rewrite(&mut tpl);
//! assert_eq!(tpl.to_string(), "where id = {{.Id | _sql_arg_}}");
//! ```

use tracing::trace;

use crate::ast::{Command, List, Node, Operand, Pipeline, Template};

/// Reserved name of the capture function.
pub const CAPTURE_FUNC: &str = "_sql_arg_";

/// Append the capture command to every value-producing action.
///
/// Rewriting an already rewritten template changes nothing.
pub fn rewrite(tpl: &mut Template) {
    rewrite_list(&mut tpl.root, &[]);
    for (name, list) in tpl.defines.iter_mut() {
        trace!(template = %name, "rewriting sub-template");
        rewrite_list(list, &[]);
    }
}

/// `loop_vars` holds the canonical form of loop bindings visible here.
/// Local declarations are collected as the list is walked and only shadow
/// later siblings.
fn rewrite_list(list: &mut List, loop_vars: &[String]) {
    let mut locals: Vec<String> = Vec::new();

    for node in &mut list.nodes {
        match node {
            Node::Action(pipe) => {
                if pipe.is_declaration() {
                    locals.extend(pipe.decl.iter().cloned());
                    continue;
                }
                let declared = |cmd: &str| loop_vars.iter().chain(&locals).any(|v| v == cmd);
                if wrap(pipe, declared) {
                    trace!(pos = %pipe.pos, pipeline = %pipe, "captured");
                }
            }
            Node::If(branch) | Node::With(branch) => {
                rewrite_list(&mut branch.list, loop_vars);
                if let Some(else_list) = &mut branch.else_list {
                    rewrite_list(else_list, loop_vars);
                }
            }
            Node::Range(branch) => {
                let mut inner = loop_vars.to_vec();
                inner.extend(branch.pipe.decl.iter().cloned());
                rewrite_list(&mut branch.list, &inner);
                if let Some(else_list) = &mut branch.else_list {
                    rewrite_list(else_list, loop_vars);
                }
            }
            Node::Text(_) | Node::Template(_) | Node::Break(_) | Node::Continue(_) => {}
        }
    }
}

/// Append the capture command unless the pipeline already ends in it or
/// ends in a bare reference to a declared variable.
fn wrap(pipe: &mut Pipeline, declared: impl Fn(&str) -> bool) -> bool {
    let Some(last) = pipe.cmds.last() else {
        return false;
    };
    if is_capture(last) || declared(&last.to_string()) {
        return false;
    }

    let pos = last.pos;
    pipe.cmds.push(Command::new(
        pos,
        vec![Operand::Identifier(CAPTURE_FUNC.to_string())],
    ));
    true
}

pub(crate) fn is_capture(cmd: &Command) -> bool {
    matches!(cmd.args.as_slice(), [Operand::Identifier(name)] if name == CAPTURE_FUNC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn rewritten(src: &str) -> String {
        let mut tpl = parse(src).unwrap();
        rewrite(&mut tpl);
        tpl.to_string()
    }

    #[test]
    fn test_value_actions_are_captured() {
        assert_eq!(
            rewritten("a = {{.A}} and b = {{len .B}}"),
            "a = {{.A | _sql_arg_}} and b = {{len .B | _sql_arg_}}"
        );
    }

    #[test]
    fn test_control_pipelines_untouched() {
        assert_eq!(
            rewritten("{{if .A}}x{{end}}{{range .B}}{{.}}{{end}}{{with .C}}y{{end}}"),
            "{{if .A}}x{{end}}{{range .B}}{{. | _sql_arg_}}{{end}}{{with .C}}y{{end}}"
        );
    }

    #[test]
    fn test_declarations_are_not_captured() {
        assert_eq!(
            rewritten("{{$x := .A}}{{$x = 2}}"),
            "{{$x := .A}}{{$x = 2}}"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let src = r#"{{define "d"}}{{.X}}{{end}}{{$c := 1}}{{.A}}{{if .B}}{{$c}}{{end}}{{range $i, $v := .L}}{{$i}}{{end}}"#;
        let mut once = parse(src).unwrap();
        rewrite(&mut once);
        let mut twice = once.clone();
        rewrite(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_explicit_capture_is_kept_once() {
        assert_eq!(rewritten("{{.A | _sql_arg_}}"), "{{.A | _sql_arg_}}");
    }

    #[test]
    fn test_loop_variables_are_not_captured() {
        assert_eq!(
            rewritten("{{range $i, $v := .L}}{{$i}}{{if .}}{{$v}}{{end}}{{end}}"),
            "{{range $i, $v := .L}}{{$i}}{{if .}}{{$v}}{{end}}{{end}}"
        );
    }

    #[test]
    fn test_local_declaration_scope() {
        // A sibling reference stays raw, a reference from a nested list is
        // captured.
        assert_eq!(
            rewritten("{{$c := true}}{{$c}}{{if $c}}{{$c}}{{end}}"),
            "{{$c := true}}{{$c}}{{if $c}}{{$c | _sql_arg_}}{{end}}"
        );
    }

    #[test]
    fn test_field_of_declared_variable_is_captured() {
        assert_eq!(
            rewritten("{{range $v := .L}}{{$v.Id}}{{end}}"),
            "{{range $v := .L}}{{$v.Id | _sql_arg_}}{{end}}"
        );
    }

    #[test]
    fn test_sub_templates_rewritten_independently() {
        let mut tpl = parse(r#"{{define "d"}}{{.X}}{{end}}{{template "d" .}}"#).unwrap();
        rewrite(&mut tpl);
        assert_eq!(tpl.lookup("d").unwrap().to_string(), "{{.X | _sql_arg_}}");
        assert_eq!(tpl.root.to_string(), r#"{{template "d" .}}"#);
    }
}
