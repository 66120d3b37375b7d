//! Template parser.
//!
//! Parsing runs in two layers: [`lexer`] splits the source into literal text
//! and action bodies, then each action body is parsed with the nom grammar
//! in [`actions`] and the block builder below assembles control structures,
//! tracks variable scope and validates pipelines.
//!
//! ```
//! use sqltpl::parser::parse;
//!
//! let tpl = parse("select * from t where id = {{.Id}}").unwrap();
//! assert_eq!(tpl.root.nodes.len(), 2);
//! ```

pub mod actions;
pub mod lexer;
pub mod tokens;

use std::collections::BTreeMap;

use tracing::trace;

use self::actions::{ActionKind, parse_action};
use self::lexer::Item;
use crate::ast::{BranchNode, Command, List, Node, Operand, Pipeline, Pos, Template, TemplateNode};
use crate::capture::CAPTURE_FUNC;
use crate::error::SyntaxError;
use crate::funcs::FuncMap;

/// Template source with a line index for position reporting.
pub struct Source<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Position of `at`, which must be a slice of this source.
    pub fn pos(&self, at: &str) -> Pos {
        let offset = (at.as_ptr() as usize).saturating_sub(self.text.as_ptr() as usize);
        self.pos_at(offset.min(self.text.len()))
    }

    /// Position of a byte offset.
    pub fn pos_at(&self, offset: usize) -> Pos {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line.saturating_sub(1)];
        let column = self.text.get(start..offset).map_or(0, |s| s.chars().count()) + 1;
        Pos::new(line, column)
    }

    fn end(&self) -> Pos {
        self.pos_at(self.text.len())
    }
}

/// Parse `text` allowing only builtin functions.
pub fn parse(text: &str) -> Result<Template, SyntaxError> {
    parse_with_funcs(text, &FuncMap::new())
}

/// Parse `text`; function identifiers must be builtins or registered in `funcs`.
pub fn parse_with_funcs(text: &str, funcs: &FuncMap) -> Result<Template, SyntaxError> {
    let src = Source::new(text);
    let items = lexer::lex(text)
        .map_err(|(offset, message)| SyntaxError::new(src.pos_at(offset), message))?;

    let mut builder = Builder {
        src: &src,
        funcs,
        items: items.into_iter(),
        vars: vec!["$".to_string()],
        depth: 0,
        range_depth: 0,
        defines: BTreeMap::new(),
    };

    let (root, stop) = builder.list()?;
    match stop {
        Stop::Eof => {}
        Stop::End(pos) => return Err(SyntaxError::new(pos, "unexpected {{end}}")),
        Stop::Else(pos) | Stop::ElseIf(pos, _) | Stop::ElseWith(pos, _) => {
            return Err(SyntaxError::new(pos, "unexpected {{else}}"));
        }
    }

    Ok(Template {
        root,
        defines: builder.defines,
    })
}

/// What ended a node list.
enum Stop {
    Eof,
    End(Pos),
    Else(Pos),
    ElseIf(Pos, Pipeline),
    ElseWith(Pos, Pipeline),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    Range,
    With,
}

impl Control {
    fn name(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::Range => "range",
            Control::With => "with",
        }
    }

    fn max_decl(self) -> usize {
        match self {
            Control::Range => 2,
            _ => 1,
        }
    }
}

struct Builder<'s, 'a> {
    src: &'s Source<'a>,
    funcs: &'s FuncMap,
    items: std::vec::IntoIter<Item<'a>>,
    /// Variables in scope, innermost last.
    vars: Vec<String>,
    depth: usize,
    range_depth: usize,
    defines: BTreeMap<String, List>,
}

impl<'s, 'a> Builder<'s, 'a> {
    fn list(&mut self) -> Result<(List, Stop), SyntaxError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let body = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Item::Action { body, .. } => body,
            };

            let action = parse_action(self.src, body)?;
            let pos = action.pos;
            let node = match action.kind {
                ActionKind::End => return Ok((List::new(nodes), Stop::End(pos))),
                ActionKind::Else => return Ok((List::new(nodes), Stop::Else(pos))),
                ActionKind::ElseIf(pipe) => return Ok((List::new(nodes), Stop::ElseIf(pos, pipe))),
                ActionKind::ElseWith(pipe) => {
                    return Ok((List::new(nodes), Stop::ElseWith(pos, pipe)));
                }
                ActionKind::Pipeline(pipe) => {
                    self.check_pipeline(&pipe, 1, "command")?;
                    self.declare(&pipe);
                    Node::Action(pipe)
                }
                ActionKind::If(pipe) => Node::If(self.branch(Control::If, pos, pipe)?),
                ActionKind::Range(pipe) => Node::Range(self.branch(Control::Range, pos, pipe)?),
                ActionKind::With(pipe) => Node::With(self.branch(Control::With, pos, pipe)?),
                ActionKind::Define(name) => {
                    if self.depth > 0 {
                        return Err(SyntaxError::new(pos, "define clause not at top level"));
                    }
                    let body = self.definition(pos)?;
                    self.defines.insert(name, body);
                    continue;
                }
                ActionKind::Template(name, pipe) => {
                    if let Some(pipe) = &pipe {
                        self.check_pipeline(pipe, 0, "template clause")?;
                    }
                    Node::Template(TemplateNode { pos, name, pipe })
                }
                ActionKind::Block(name, pipe) => {
                    self.check_pipeline(&pipe, 0, "block clause")?;
                    let body = self.definition(pos)?;
                    self.defines.insert(name.clone(), body);
                    Node::Template(TemplateNode {
                        pos,
                        name,
                        pipe: Some(pipe),
                    })
                }
                ActionKind::Break => self.loop_control(pos, "break", Node::Break(pos))?,
                ActionKind::Continue => self.loop_control(pos, "continue", Node::Continue(pos))?,
            };
            nodes.push(node);
        }
        Ok((List::new(nodes), Stop::Eof))
    }

    fn branch(
        &mut self,
        kind: Control,
        pos: Pos,
        pipe: Pipeline,
    ) -> Result<BranchNode, SyntaxError> {
        let mark = self.vars.len();
        self.check_pipeline(&pipe, kind.max_decl(), kind.name())?;
        self.declare(&pipe);

        self.depth += 1;
        let (list, else_list) = self.branch_lists(kind)?;
        self.depth -= 1;
        self.vars.truncate(mark);

        Ok(BranchNode {
            pos,
            pipe,
            list,
            else_list,
        })
    }

    fn branch_lists(&mut self, kind: Control) -> Result<(List, Option<List>), SyntaxError> {
        if kind == Control::Range {
            self.range_depth += 1;
        }
        let (list, stop) = self.list()?;
        if kind == Control::Range {
            self.range_depth -= 1;
        }

        let else_list = match stop {
            Stop::End(_) => None,
            Stop::Eof => return Err(self.unexpected_eof()),
            Stop::Else(_) => match self.list()? {
                (else_list, Stop::End(_)) => Some(else_list),
                (_, Stop::Eof) => return Err(self.unexpected_eof()),
                (_, Stop::Else(pos) | Stop::ElseIf(pos, _) | Stop::ElseWith(pos, _)) => {
                    return Err(SyntaxError::new(pos, "expected end; found {{else}}"));
                }
            },
            Stop::ElseIf(pos, pipe) if kind == Control::If => {
                let nested = self.branch(Control::If, pos, pipe)?;
                Some(List::new(vec![Node::If(nested)]))
            }
            Stop::ElseWith(pos, pipe) if kind == Control::With => {
                let nested = self.branch(Control::With, pos, pipe)?;
                Some(List::new(vec![Node::With(nested)]))
            }
            Stop::ElseIf(pos, _) | Stop::ElseWith(pos, _) => {
                return Err(SyntaxError::new(
                    pos,
                    format!("unexpected {{{{else}}}} clause in {}", kind.name()),
                ));
            }
        };
        Ok((list, else_list))
    }

    /// Body of `define` or `block`: a fresh variable scope outside any loop.
    fn definition(&mut self, pos: Pos) -> Result<List, SyntaxError> {
        let vars = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let range_depth = std::mem::replace(&mut self.range_depth, 0);
        self.depth += 1;

        let (body, stop) = self.list()?;
        match stop {
            Stop::End(_) => {}
            Stop::Eof => return Err(self.unexpected_eof()),
            Stop::Else(at) | Stop::ElseIf(at, _) | Stop::ElseWith(at, _) => {
                return Err(SyntaxError::new(at, "unexpected {{else}}"));
            }
        }

        trace!(%pos, nodes = body.nodes.len(), "parsed sub-template");
        self.depth -= 1;
        self.vars = vars;
        self.range_depth = range_depth;
        Ok(body)
    }

    fn loop_control(&self, pos: Pos, keyword: &str, node: Node) -> Result<Node, SyntaxError> {
        if self.range_depth == 0 {
            return Err(SyntaxError::new(
                pos,
                format!("{{{{{}}}}} outside {{{{range}}}}", keyword),
            ));
        }
        Ok(node)
    }

    fn unexpected_eof(&self) -> SyntaxError {
        SyntaxError::new(self.src.end(), "unexpected EOF")
    }

    fn declare(&mut self, pipe: &Pipeline) {
        if !pipe.is_assign {
            self.vars.extend(pipe.decl.iter().cloned());
        }
    }

    fn check_pipeline(
        &self,
        pipe: &Pipeline,
        max_decl: usize,
        context: &str,
    ) -> Result<(), SyntaxError> {
        if pipe.decl.len() > max_decl {
            return Err(SyntaxError::new(
                pipe.pos,
                format!("too many declarations in {}", context),
            ));
        }
        if pipe.is_assign {
            for name in &pipe.decl {
                self.check_variable(pipe.pos, name)?;
            }
        }

        for (stage, cmd) in pipe.cmds.iter().enumerate() {
            self.check_command(cmd, stage)?;
        }
        Ok(())
    }

    fn check_command(&self, cmd: &Command, stage: usize) -> Result<(), SyntaxError> {
        let Some(first) = cmd.args.first() else {
            return Err(SyntaxError::new(cmd.pos, "missing value for command"));
        };

        match first {
            Operand::Nil => return Err(SyntaxError::new(cmd.pos, "nil is not a command")),
            Operand::Identifier(_)
            | Operand::Field(_)
            | Operand::Chain { .. }
            | Operand::Variable { .. } => {}
            _ if stage > 0 => {
                return Err(SyntaxError::new(
                    cmd.pos,
                    format!("non executable command in pipeline stage {}", stage + 1),
                ));
            }
            _ if cmd.args.len() > 1 => {
                return Err(SyntaxError::new(
                    cmd.pos,
                    format!("can't give argument to non-function {}", first),
                ));
            }
            _ => {}
        }

        for arg in &cmd.args {
            self.check_operand(cmd.pos, arg)?;
        }
        Ok(())
    }

    fn check_operand(&self, pos: Pos, operand: &Operand) -> Result<(), SyntaxError> {
        match operand {
            Operand::Identifier(name) => {
                if name != CAPTURE_FUNC && !self.funcs.resolves(name) {
                    return Err(SyntaxError::new(
                        pos,
                        format!("function {:?} not defined", name),
                    ));
                }
            }
            Operand::Variable { name, .. } => self.check_variable(pos, name)?,
            Operand::Pipe(pipe) => self.check_pipeline(pipe, 0, "parenthesized pipeline")?,
            Operand::Chain { node, .. } => self.check_operand(pos, node)?,
            _ => {}
        }
        Ok(())
    }

    fn check_variable(&self, pos: Pos, name: &str) -> Result<(), SyntaxError> {
        if self.vars.iter().rev().any(|v| v == name) {
            return Ok(());
        }
        Err(SyntaxError::new(pos, format!("undefined variable {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    mod actions;
    mod blocks;
    mod errors;
    mod tokens;
}
