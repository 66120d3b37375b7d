use std::fmt;

use super::Pos;

/// A chain of commands, optionally declaring or assigning variables.
///
/// `$x := .A | f` declares `$x`; `$x = .A` reassigns it. A pipeline with a
/// declaration or assignment sets state and prints nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub pos: Pos,
    /// True for `=`, false for `:=` (only meaningful when `decl` is set).
    pub is_assign: bool,
    /// Declared variable names, including the leading `$`.
    pub decl: Vec<String>,
    pub cmds: Vec<Command>,
}

impl Pipeline {
    pub fn new(pos: Pos, cmds: Vec<Command>) -> Self {
        Self {
            pos,
            is_assign: false,
            decl: Vec::new(),
            cmds,
        }
    }

    /// Whether the pipeline sets variables rather than producing output.
    pub fn is_declaration(&self) -> bool {
        !self.decl.is_empty()
    }
}

/// One command of a pipeline: an operand followed by its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub pos: Pos,
    pub args: Vec<Operand>,
}

impl Command {
    pub fn new(pos: Pos, args: Vec<Operand>) -> Self {
        Self { pos, args }
    }

    /// The function name if this command is a bare identifier call.
    pub fn func_name(&self) -> Option<&str> {
        match self.args.first() {
            Some(Operand::Identifier(name)) => Some(name),
            _ => None,
        }
    }
}

/// A single term inside a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot,
    /// `.A.B`
    Field(Vec<String>),
    /// `$x` or `$x.A.B`
    Variable { name: String, fields: Vec<String> },
    /// Function name.
    Identifier(String),
    /// `(pipeline).A.B`
    Chain {
        node: Box<Operand>,
        fields: Vec<String>,
    },
    /// Parenthesized pipeline.
    Pipe(Pipeline),
    String(String),
    Number(Number),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            write!(f, "{}", self.decl.join(", "))?;
            write!(f, " {} ", if self.is_assign { "=" } else { ":=" })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[String]) -> fmt::Result {
    for field in fields {
        write!(f, ".{}", field)?;
    }
    Ok(())
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dot => write!(f, "."),
            Operand::Field(fields) => write_fields(f, fields),
            Operand::Variable { name, fields } => {
                write!(f, "{}", name)?;
                write_fields(f, fields)
            }
            Operand::Identifier(name) => write!(f, "{}", name),
            Operand::Chain { node, fields } => {
                write!(f, "{}", node)?;
                write_fields(f, fields)
            }
            Operand::Pipe(pipe) => write!(f, "({})", pipe),
            Operand::String(s) => write!(f, "{:?}", s),
            Operand::Number(Number::Int(i)) => write!(f, "{}", i),
            Operand::Number(Number::Float(x)) => write!(f, "{:?}", x),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Nil => write!(f, "nil"),
        }
    }
}
