//! Template execution.
//!
//! [`execute`] walks a rewritten [`Template`] against a data [`Value`] and
//! returns the raw statement text. Values routed through the capture
//! function land in the [`EvalContext`] sink in output order, each leaving a
//! `?` sentinel in the text.

mod eval;

use crate::ast::{BranchNode, List, Node, Pipeline, Pos, Template, TemplateNode};
use crate::capture::is_capture;
use crate::error::EvalError;
use crate::funcs::FuncMap;
use crate::value::Value;

/// Nesting limit for `{{template}}` invocations.
pub const MAX_TEMPLATE_DEPTH: usize = 256;

/// Per-run state shared by every recursive call: the function registry and
/// the captured arguments.
#[derive(Debug)]
pub struct EvalContext<'f> {
    funcs: &'f FuncMap,
    args: Vec<Value>,
}

impl<'f> EvalContext<'f> {
    pub fn new(funcs: &'f FuncMap) -> Self {
        Self {
            funcs,
            args: Vec::new(),
        }
    }

    pub fn funcs(&self) -> &'f FuncMap {
        self.funcs
    }

    /// Arguments captured so far, in output order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Value> {
        self.args
    }

    /// Record `value` as the next bound argument and return the sentinel.
    fn capture(&mut self, value: Value) -> Value {
        self.args.push(value);
        Value::String("?".to_string())
    }
}

/// Execute `tpl` with `data` as both dot and `$`.
pub fn execute(
    tpl: &Template,
    data: &Value,
    ctx: &mut EvalContext<'_>,
) -> Result<String, EvalError> {
    let mut state = State {
        tpl,
        ctx,
        vars: vec![("$".to_string(), data.clone())],
        depth: 0,
        out: String::new(),
        last_capture: None,
    };
    state.walk_list(&tpl.root, data)?;
    Ok(state.out)
}

/// How a list finished; `break` and `continue` unwind to the nearest range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

struct State<'t, 'c, 'f> {
    tpl: &'t Template,
    ctx: &'c mut EvalContext<'f>,
    /// Variable stack, innermost last.
    vars: Vec<(String, Value)>,
    depth: usize,
    out: String,
    /// Output offset just past the most recent sentinel, and its action.
    last_capture: Option<(usize, Pos)>,
}

impl State<'_, '_, '_> {
    fn walk_list(&mut self, list: &List, dot: &Value) -> Result<Flow, EvalError> {
        for node in &list.nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.emit(text)?;
                    Flow::Normal
                }
                Node::Action(pipe) => {
                    self.walk_action(pipe, dot)?;
                    Flow::Normal
                }
                Node::If(branch) => self.walk_if_or_with(branch, dot, false)?,
                Node::With(branch) => self.walk_if_or_with(branch, dot, true)?,
                Node::Range(branch) => self.walk_range(branch, dot)?,
                Node::Template(node) => self.walk_template(node, dot)?,
                Node::Break(_) => Flow::Break,
                Node::Continue(_) => Flow::Continue,
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn walk_action(&mut self, pipe: &Pipeline, dot: &Value) -> Result<(), EvalError> {
        let value = self.eval_pipeline(pipe, dot, false)?;
        if pipe.is_declaration() {
            return Ok(());
        }
        let text = value.to_string();
        if pipe.cmds.last().is_some_and(is_capture) {
            self.emit(&text)?;
            self.last_capture = Some((self.out.len(), pipe.pos));
        } else {
            // Uncaptured output must not be mistaken for a placeholder.
            self.emit(&text.replace('?', "??"))?;
        }
        Ok(())
    }

    /// Append to the output. A `?` right after a sentinel would merge with
    /// it into an escape, so that is refused.
    fn emit(&mut self, text: &str) -> Result<(), EvalError> {
        match self.last_capture {
            Some((end, pos)) if end == self.out.len() && text.starts_with('?') => {
                Err(EvalError::AdjacentPlaceholder { pos })
            }
            _ => {
                self.out.push_str(text);
                Ok(())
            }
        }
    }

    fn walk_if_or_with(
        &mut self,
        branch: &BranchNode,
        dot: &Value,
        with: bool,
    ) -> Result<Flow, EvalError> {
        let mark = self.vars.len();
        let cond = self.eval_pipeline(&branch.pipe, dot, true)?;
        let flow = if cond.is_truthy() {
            let inner = if with { &cond } else { dot };
            self.walk_list(&branch.list, inner)?
        } else if let Some(else_list) = &branch.else_list {
            self.walk_list(else_list, dot)?
        } else {
            Flow::Normal
        };
        self.vars.truncate(mark);
        Ok(flow)
    }

    fn walk_range(&mut self, branch: &BranchNode, dot: &Value) -> Result<Flow, EvalError> {
        let pipe = &branch.pipe;
        let source = self.eval_cmds(pipe, dot, true)?;
        let items: Vec<(Value, Value)> = match source {
            Value::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect(),
            Value::Map(map) => map
                .into_iter()
                .map(|(key, item)| (Value::String(key), item))
                .collect(),
            Value::Int(n) => (0..n.max(0)).map(|i| (Value::Int(i), Value::Int(i))).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(EvalError::CannotRange {
                    pos: branch.pos,
                    kind: other.kind(),
                });
            }
        };

        if items.is_empty() {
            return match &branch.else_list {
                Some(else_list) => self.walk_list(else_list, dot),
                None => Ok(Flow::Normal),
            };
        }

        let mark = self.vars.len();
        for (key, item) in items {
            self.vars.truncate(mark);
            match pipe.decl.as_slice() {
                [elem] => self.bind(pipe, elem, item.clone())?,
                [index, elem] => {
                    self.bind(pipe, index, key)?;
                    self.bind(pipe, elem, item.clone())?;
                }
                _ => {}
            }
            if self.walk_list(&branch.list, &item)? == Flow::Break {
                break;
            }
        }
        self.vars.truncate(mark);
        Ok(Flow::Normal)
    }

    fn walk_template(&mut self, node: &TemplateNode, dot: &Value) -> Result<Flow, EvalError> {
        let tpl = self.tpl;
        let list = tpl.lookup(&node.name).ok_or_else(|| EvalError::UndefinedTemplate {
            pos: node.pos,
            name: node.name.clone(),
        })?;
        if self.depth >= MAX_TEMPLATE_DEPTH {
            return Err(EvalError::DepthExceeded {
                pos: node.pos,
                max: MAX_TEMPLATE_DEPTH,
            });
        }

        let data = match &node.pipe {
            Some(pipe) => self.eval_cmds(pipe, dot, false)?,
            None => Value::Null,
        };
        let scope = vec![("$".to_string(), data.clone())];
        let outer = std::mem::replace(&mut self.vars, scope);
        self.depth += 1;
        let result = self.walk_list(list, &data);
        self.depth -= 1;
        self.vars = outer;
        result.map(|_| Flow::Normal)
    }

    /// Evaluate the commands and apply the declaration or assignment.
    fn eval_pipeline(
        &mut self,
        pipe: &Pipeline,
        dot: &Value,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let value = self.eval_cmds(pipe, dot, lenient)?;
        for name in &pipe.decl {
            self.bind(pipe, name, value.clone())?;
        }
        Ok(value)
    }

    fn bind(&mut self, pipe: &Pipeline, name: &str, value: Value) -> Result<(), EvalError> {
        if !pipe.is_assign {
            self.vars.push((name.to_string(), value));
            return Ok(());
        }
        match self.vars.iter_mut().rev().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(EvalError::UndefinedVariable {
                pos: pipe.pos,
                name: name.to_string(),
            }),
        }
    }
}
