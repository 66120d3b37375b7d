use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{map, not, recognize},
    multi::many0,
    sequence::{pair, preceded, terminated},
};

use super::Res;

/// Whitespace allowed inside an action.
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse optional whitespace.
pub fn ws(input: &str) -> Res<'_, &str> {
    take_while(is_space)(input)
}

/// Parse at least one whitespace character (operand separator).
pub fn ws1(input: &str) -> Res<'_, &str> {
    take_while1(is_space)(input)
}

/// Parse an identifier (function name, field name).
pub fn parse_identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// Match `word` only when it is not the prefix of a longer identifier.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    move |input| terminated(tag(word), not(satisfy(is_ident_char)))(input)
}

/// Parse one `.Name` segment.
pub fn parse_field(input: &str) -> Res<'_, String> {
    map(preceded(char('.'), parse_identifier), str::to_string)(input)
}

/// Parse zero or more `.Name` segments.
pub fn parse_fields(input: &str) -> Res<'_, Vec<String>> {
    many0(parse_field)(input)
}

/// Parse `$` or `$name`.
pub fn parse_variable_name(input: &str) -> Res<'_, &str> {
    recognize(pair(char('$'), take_while(is_ident_char)))(input)
}
