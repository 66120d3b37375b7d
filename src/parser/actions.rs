//! Grammar of a single `{{ ... }}` action.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{cut, map, not, opt, success, value},
    error::{VerboseError, VerboseErrorKind, context},
    multi::{many0, many1},
    sequence::{pair, preceded, terminated, tuple},
};

use super::tokens::*;
use super::Source;
use crate::ast::{Command, Operand, Pipeline, Pos};
use crate::error::SyntaxError;

/// What an action says to the block builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Pipeline(Pipeline),
    If(Pipeline),
    ElseIf(Pipeline),
    ElseWith(Pipeline),
    Else,
    End,
    Range(Pipeline),
    With(Pipeline),
    Define(String),
    Template(String, Option<Pipeline>),
    Block(String, Pipeline),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub pos: Pos,
    pub kind: ActionKind,
}

/// Parse the interior of an action. `body` must be a slice of `src`.
pub fn parse_action<'a>(src: &Source<'a>, body: &'a str) -> Result<Action, SyntaxError> {
    let start = body.trim_start_matches(is_space);
    if start.is_empty() {
        return Err(SyntaxError::new(src.pos(start), "missing value for command"));
    }
    let pos = src.pos(start);
    match terminated(|i| action(src, i), ws)(start) {
        Ok(("", kind)) => Ok(Action { pos, kind }),
        Ok((rest, _)) => Err(SyntaxError::new(
            src.pos(rest),
            format!("unexpected {:?} in command", next_token(rest)),
        )),
        Err(e) => Err(to_syntax_error(src, e)),
    }
}

fn action<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, ActionKind> {
    alt((
        map(
            preceded(pair(keyword("if"), ws), cut(context("if", |i| pipeline(src, i, true)))),
            ActionKind::If,
        ),
        |i| else_clause(src, i),
        value(ActionKind::End, keyword("end")),
        map(
            preceded(
                pair(keyword("range"), ws),
                cut(context("range", |i| pipeline(src, i, true))),
            ),
            ActionKind::Range,
        ),
        map(
            preceded(
                pair(keyword("with"), ws),
                cut(context("with", |i| pipeline(src, i, true))),
            ),
            ActionKind::With,
        ),
        map(
            preceded(pair(keyword("define"), ws), cut(context("define clause", parse_string))),
            ActionKind::Define,
        ),
        map(
            preceded(
                pair(keyword("template"), ws),
                cut(pair(
                    context("template clause", parse_string),
                    opt(preceded(ws1, |i| pipeline(src, i, false))),
                )),
            ),
            |(name, pipe)| ActionKind::Template(name, pipe),
        ),
        map(
            preceded(
                pair(keyword("block"), ws),
                cut(pair(
                    context("block clause", parse_string),
                    preceded(ws1, context("block clause", |i| pipeline(src, i, false))),
                )),
            ),
            |(name, pipe)| ActionKind::Block(name, pipe),
        ),
        value(ActionKind::Break, keyword("break")),
        value(ActionKind::Continue, keyword("continue")),
        map(|i| pipeline(src, i, true), ActionKind::Pipeline),
    ))(input)
}

fn else_clause<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, ActionKind> {
    let (rest, _) = keyword("else")(input)?;
    alt((
        map(
            preceded(
                tuple((ws, keyword("if"), ws)),
                cut(context("if", |i| pipeline(src, i, true))),
            ),
            ActionKind::ElseIf,
        ),
        map(
            preceded(
                tuple((ws, keyword("with"), ws)),
                cut(context("with", |i| pipeline(src, i, true))),
            ),
            ActionKind::ElseWith,
        ),
        success(ActionKind::Else),
    ))(rest)
}

/// Parse `[decl] command ('|' command)*`.
pub fn pipeline<'a>(src: &Source<'a>, input: &'a str, allow_decl: bool) -> Res<'a, Pipeline> {
    let pos = src.pos(input);
    let (rest, decl) = if allow_decl {
        opt(declaration)(input)?
    } else {
        (input, None)
    };
    let (rest, first) = command(src, rest)?;
    let (rest, others) = many0(preceded(
        tuple((ws, char('|'), ws)),
        cut(|i| command(src, i)),
    ))(rest)?;

    let mut cmds = Vec::with_capacity(others.len() + 1);
    cmds.push(first);
    cmds.extend(others);

    let (decl, is_assign) = decl.unwrap_or_default();
    Ok((
        rest,
        Pipeline {
            pos,
            is_assign,
            decl,
            cmds,
        },
    ))
}

/// Parse `$x :=`, `$i, $v :=` or `$x =`.
fn declaration(input: &str) -> Res<'_, (Vec<String>, bool)> {
    let (rest, first) = parse_variable_name(input)?;
    let (rest, second) = opt(preceded(tuple((ws, char(','), ws)), parse_variable_name))(rest)?;
    let (rest, _) = ws(rest)?;
    let (rest, is_assign) = alt((
        value(false, tag(":=")),
        value(true, terminated(char('='), not(char('=')))),
    ))(rest)?;
    let (rest, _) = ws(rest)?;

    let mut names = vec![first.to_string()];
    names.extend(second.map(str::to_string));
    Ok((rest, (names, is_assign)))
}

/// Parse operands separated by whitespace.
fn command<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, Command> {
    let pos = src.pos(input);
    let (rest, first) = context("command", |i| operand(src, i))(input)?;
    let (rest, more) = many0(preceded(ws1, |i| operand(src, i)))(rest)?;

    let mut args = Vec::with_capacity(more.len() + 1);
    args.push(first);
    args.extend(more);
    Ok((rest, Command::new(pos, args)))
}

fn operand<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, Operand> {
    let (rest, term) = term(src, input)?;
    if !matches!(term, Operand::Pipe(_)) {
        return Ok((rest, term));
    }
    let (rest, fields) = parse_fields(rest)?;
    if fields.is_empty() {
        return Ok((rest, term));
    }
    Ok((
        rest,
        Operand::Chain {
            node: Box::new(term),
            fields,
        },
    ))
}

fn term<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, Operand> {
    alt((
        |i| parenthesized(src, i),
        map(parse_string, Operand::String),
        map(parse_number, Operand::Number),
        map(parse_bool, Operand::Bool),
        value(Operand::Nil, parse_nil),
        map(many1(parse_field), Operand::Field),
        value(Operand::Dot, char('.')),
        map(pair(parse_variable_name, parse_fields), |(name, fields)| {
            Operand::Variable {
                name: name.to_string(),
                fields,
            }
        }),
        map(parse_identifier, |name| Operand::Identifier(name.to_string())),
    ))(input)
}

fn parenthesized<'a>(src: &Source<'a>, input: &'a str) -> Res<'a, Operand> {
    let (rest, _) = char('(')(input)?;
    let (rest, _) = ws(rest)?;
    let (rest, pipe) = cut(|i| pipeline(src, i, false))(rest)?;
    let (rest, _) = ws(rest)?;
    let (rest, _) = cut(context("parenthesized pipeline", char(')')))(rest)?;
    Ok((rest, Operand::Pipe(pipe)))
}

/// First whitespace-delimited token of `input`, for error messages.
fn next_token(input: &str) -> &str {
    let trimmed = input.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| c.is_whitespace() || i >= 16)
        .map_or(trimmed.len(), |(i, _)| i);
    &trimmed[..end]
}

fn to_syntax_error(src: &Source<'_>, err: nom::Err<VerboseError<&str>>) -> SyntaxError {
    let errors = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.errors,
        nom::Err::Incomplete(_) => Vec::new(),
    };
    let Some((input, first)) = errors.first() else {
        return SyntaxError::new(Pos::default(), "incomplete action");
    };

    // An explicit failure carries its message as the innermost context.
    if let VerboseErrorKind::Context(message) = first {
        return SyntaxError::new(src.pos(input), *message);
    }

    let ctx = errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(c) => Some(*c),
        _ => None,
    });
    let token = next_token(input);
    let at = src.pos(input.trim_start());
    let message = match (ctx.unwrap_or("operand"), token) {
        ("command", "" | "|") => "missing value for command".to_string(),
        (c, "") => format!("unexpected EOF in {}", c),
        (c, t) => format!("unexpected {:?} in {}", t, c),
    };
    SyntaxError::new(at, message)
}
