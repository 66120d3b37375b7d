use std::collections::BTreeMap;
use std::fmt;

use super::{Pipeline, Pos};

/// A parsed template: the main body plus every `define`d sub-template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub root: List,
    /// Sub-template registry. A later definition replaces an earlier one.
    pub defines: BTreeMap<String, List>,
}

impl Template {
    pub fn lookup(&self, name: &str) -> Option<&List> {
        self.defines.get(name)
    }
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub nodes: Vec<Node>,
}

impl List {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal output.
    Text(String),
    /// `{{pipeline}}`
    Action(Pipeline),
    /// `{{if}}`
    If(BranchNode),
    /// `{{range}}`; declarations live in the pipeline.
    Range(BranchNode),
    /// `{{with}}`
    With(BranchNode),
    /// `{{template "name" pipeline}}`
    Template(TemplateNode),
    Break(Pos),
    Continue(Pos),
}

/// Shared shape of `if`, `range` and `with`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub pos: Pos,
    pub pipe: Pipeline,
    pub list: List,
    pub else_list: Option<List>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub pos: Pos,
    pub name: String,
    pub pipe: Option<Pipeline>,
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl BranchNode {
    fn write(&self, f: &mut fmt::Formatter<'_>, keyword: &str) -> fmt::Result {
        write!(f, "{{{{{} {}}}}}{}", keyword, self.pipe, self.list)?;
        if let Some(else_list) = &self.else_list {
            write!(f, "{{{{else}}}}{}", else_list)?;
        }
        write!(f, "{{{{end}}}}")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "{}", text),
            Node::Action(pipe) => write!(f, "{{{{{}}}}}", pipe),
            Node::If(branch) => branch.write(f, "if"),
            Node::Range(branch) => branch.write(f, "range"),
            Node::With(branch) => branch.write(f, "with"),
            Node::Template(t) => match &t.pipe {
                Some(pipe) => write!(f, "{{{{template {:?} {}}}}}", t.name, pipe),
                None => write!(f, "{{{{template {:?}}}}}", t.name),
            },
            Node::Break(_) => write!(f, "{{{{break}}}}"),
            Node::Continue(_) => write!(f, "{{{{continue}}}}"),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, list) in &self.defines {
            write!(f, "{{{{define {:?}}}}}{}{{{{end}}}}", name, list)?;
        }
        write!(f, "{}", self.root)
    }
}
