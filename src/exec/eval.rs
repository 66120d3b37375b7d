//! Pipeline, command and operand evaluation.

use super::State;
use crate::ast::{Command, Number, Operand, Pipeline, Pos};
use crate::capture::CAPTURE_FUNC;
use crate::error::EvalError;
use crate::funcs::{self, FuncError};
use crate::value::Value;

impl State<'_, '_, '_> {
    /// Run every command, feeding each result to the next as its final
    /// argument. Declarations are left to the caller.
    pub(super) fn eval_cmds(
        &mut self,
        pipe: &Pipeline,
        dot: &Value,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let mut piped: Option<Value> = None;
        for cmd in &pipe.cmds {
            piped = Some(self.eval_command(cmd, dot, piped, lenient)?);
        }
        Ok(piped.unwrap_or_default())
    }

    fn eval_command(
        &mut self,
        cmd: &Command,
        dot: &Value,
        piped: Option<Value>,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Ok(piped.unwrap_or_default());
        };
        if let Operand::Identifier(name) = first {
            return self.call(cmd.pos, name, rest, dot, piped, lenient);
        }
        if !rest.is_empty() || piped.is_some() {
            return Err(EvalError::NotAFunction {
                pos: cmd.pos,
                operand: first.to_string(),
            });
        }
        self.eval_arg(cmd.pos, first, dot, lenient)
    }

    fn call(
        &mut self,
        pos: Pos,
        name: &str,
        operands: &[Operand],
        dot: &Value,
        piped: Option<Value>,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let funcs = self.ctx.funcs;
        let user = funcs.get(name);

        if user.is_none() && matches!(name, "and" | "or") {
            return self.short_circuit(pos, name == "and", operands, dot, piped, lenient);
        }

        let mut args = Vec::with_capacity(operands.len() + 1);
        for operand in operands {
            args.push(self.eval_arg(pos, operand, dot, lenient)?);
        }
        args.extend(piped);

        if name == CAPTURE_FUNC {
            let [value] = <[Value; 1]>::try_from(args)
                .map_err(|args| call_error(pos, name, wrong_args(args.len(), 1)))?;
            return Ok(self.ctx.capture(value));
        }

        if let Some(f) = user {
            return f(&args).map_err(|e| call_error(pos, name, e));
        }
        if name == "index" {
            return index(pos, args, lenient);
        }
        match funcs::builtin(name) {
            Some(f) => f(&args).map_err(|e| call_error(pos, name, e)),
            None => Err(EvalError::UndefinedFunction {
                pos,
                name: name.to_string(),
            }),
        }
    }

    /// `and` / `or`: stop at the first operand that decides the result.
    fn short_circuit(
        &mut self,
        pos: Pos,
        is_and: bool,
        operands: &[Operand],
        dot: &Value,
        piped: Option<Value>,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let name = if is_and { "and" } else { "or" };
        if operands.is_empty() && piped.is_none() {
            return Err(call_error(pos, name, wrong_args(0, 1)));
        }

        let mut last = Value::Null;
        for operand in operands {
            last = self.eval_arg(pos, operand, dot, lenient)?;
            if last.is_truthy() != is_and {
                return Ok(last);
            }
        }
        Ok(piped.unwrap_or(last))
    }

    fn eval_arg(
        &mut self,
        pos: Pos,
        operand: &Operand,
        dot: &Value,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(fields) => resolve(pos, dot, fields, lenient),
            Operand::Variable { name, fields } => {
                let base = self.variable(pos, name)?;
                resolve(pos, base, fields, lenient)
            }
            Operand::Identifier(name) => self.call(pos, name, &[], dot, None, lenient),
            Operand::Chain { node, fields } => {
                let base = self.eval_arg(pos, node, dot, lenient)?;
                resolve(pos, &base, fields, lenient)
            }
            Operand::Pipe(pipe) => self.eval_cmds(pipe, dot, lenient),
            Operand::String(s) => Ok(Value::String(s.clone())),
            Operand::Number(Number::Int(i)) => Ok(Value::Int(*i)),
            Operand::Number(Number::Float(x)) => Ok(Value::Float(*x)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Null),
        }
    }

    fn variable(&self, pos: Pos, name: &str) -> Result<&Value, EvalError> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| EvalError::UndefinedVariable {
                pos,
                name: name.to_string(),
            })
    }
}

/// Follow `.A.B` from `base`. When `lenient`, missing keys and nil
/// parents resolve to `Null` instead of failing.
fn resolve(pos: Pos, base: &Value, fields: &[String], lenient: bool) -> Result<Value, EvalError> {
    let mut current = base;
    for (i, field) in fields.iter().enumerate() {
        current = match current {
            Value::Map(map) => match map.get(field) {
                Some(value) => value,
                None if lenient => return Ok(Value::Null),
                None => {
                    return Err(EvalError::MissingField {
                        pos,
                        field: field.clone(),
                    });
                }
            },
            Value::Null if lenient => return Ok(Value::Null),
            Value::Null => {
                return Err(EvalError::NilPointer {
                    pos,
                    path: format!(".{}", fields[..=i].join(".")),
                });
            }
            other => {
                return Err(EvalError::NotAMap {
                    pos,
                    field: field.clone(),
                    kind: other.kind(),
                });
            }
        };
    }
    Ok(current.clone())
}

/// `index` with positioned out-of-range errors; other failures come from
/// the builtin.
fn index(pos: Pos, args: Vec<Value>, lenient: bool) -> Result<Value, EvalError> {
    let builtin = |args: &[Value]| -> Result<Value, EvalError> {
        match funcs::builtin("index") {
            Some(f) => f(args).map_err(|e| call_error(pos, "index", e)),
            None => Err(EvalError::UndefinedFunction {
                pos,
                name: "index".to_string(),
            }),
        }
    };

    let mut iter = args.into_iter();
    let Some(mut item) = iter.next() else {
        return builtin(&[]);
    };
    for key in iter {
        if lenient && item.is_null() {
            return Ok(Value::Null);
        }
        let found = match (&item, &key) {
            (Value::Seq(items), Value::Int(i)) => Some(
                usize::try_from(*i)
                    .ok()
                    .and_then(|n| items.get(n))
                    .cloned()
                    .ok_or((*i, items.len())),
            ),
            _ => None,
        };
        item = match found {
            Some(Ok(value)) => value,
            Some(Err(_)) if lenient => return Ok(Value::Null),
            Some(Err((index, len))) => return Err(EvalError::IndexOutOfRange { pos, index, len }),
            None => builtin(&[item, key])?,
        };
    }
    Ok(item)
}

fn wrong_args(got: usize, want: usize) -> FuncError {
    FuncError::new(format!("wrong number of args: got {} want {}", got, want))
}

fn call_error(pos: Pos, name: &str, err: FuncError) -> EvalError {
    EvalError::Call {
        pos,
        name: name.to_string(),
        message: err.0,
    }
}
