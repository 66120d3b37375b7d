//! Template syntax tree.
//!
//! The tree is strictly owned: every node owns its children and every
//! [`Template`] owns its sub-template registry. `Display` renders nodes back
//! to canonical template source, which the capture rewriter uses to compare
//! commands structurally.

pub mod node;
pub mod pipe;

pub use self::node::{BranchNode, List, Node, Template, TemplateNode};
pub use self::pipe::{Command, Number, Operand, Pipeline};

use std::fmt;

/// Source position (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
