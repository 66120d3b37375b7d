use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize, value},
    sequence::{pair, tuple},
};

use super::identifiers::{is_ident_char, keyword};
use super::{Res, fail};
use crate::ast::Number;

/// Parse a double-quoted string with escapes, or a raw back-quoted string.
pub fn parse_string(input: &str) -> Res<'_, String> {
    alt((parse_quoted_string, parse_raw_string))(input)
}

/// Parse a double-quoted string: `"a\tb"`.
pub fn parse_quoted_string(input: &str) -> Res<'_, String> {
    let (rest, _) = char('"')(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&rest[i + 1..], out)),
            '\n' => break,
            '\\' => {
                let Some((_, escape)) = chars.next() else {
                    break;
                };
                let decoded = match escape {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'v' => '\x0b',
                    '0' => '\0',
                    '\\' | '"' | '\'' => escape,
                    'x' | 'u' | 'U' => {
                        let width = match escape {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let digits: String = chars.by_ref().take(width).map(|(_, d)| d).collect();
                        match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                            Some(ch) if digits.len() == width => ch,
                            _ => {
                                return fail(
                                    &rest[i..],
                                    "invalid escape sequence in quoted string",
                                );
                            }
                        }
                    }
                    _ => return fail(&rest[i..], "invalid escape sequence in quoted string"),
                };
                out.push(decoded);
            }
            c => out.push(c),
        }
    }
    fail(input, "unterminated quoted string")
}

/// Parse a raw string: `` `no \escapes` ``.
pub fn parse_raw_string(input: &str) -> Res<'_, String> {
    let (rest, _) = char('`')(input)?;
    let (rest, content) = take_while(|c| c != '`')(rest)?;
    match char::<_, nom::error::VerboseError<&str>>('`')(rest) {
        Ok((rest, _)) => Ok((rest, content.to_string())),
        Err(_) => fail(input, "unterminated raw quoted string"),
    }
}

fn digits_with_separators(input: &str) -> Res<'_, &str> {
    recognize(pair(digit1, take_while(|c: char| c.is_ascii_digit() || c == '_')))(input)
}

/// Parse an integer or float literal.
///
/// Integers accept `0x`, `0o` and `0b` prefixes and `_` separators; floats
/// accept a fraction and/or an exponent.
pub fn parse_number(input: &str) -> Res<'_, Number> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(tuple((
                char('0'),
                one_of("xXoObB"),
                take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
            ))),
            recognize(tuple((
                digits_with_separators,
                opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit() || c == '_'))),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
        )),
    )))(input)?;

    if rest.starts_with(is_ident_char) || rest.starts_with('.') {
        return fail(input, "bad number syntax");
    }

    match convert_number(text) {
        Some(n) => Ok((rest, n)),
        None => fail(input, "bad number syntax"),
    }
}

fn convert_number(text: &str) -> Option<Number> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let (negative, body) = match clean.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, clean.strip_prefix('+').unwrap_or(&clean)),
    };

    let radix = match body.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let magnitude = i64::from_str_radix(&body[2..], radix).ok()?;
        return Some(Number::Int(if negative { -magnitude } else { magnitude }));
    }

    if body.contains(['.', 'e', 'E']) {
        let x: f64 = body.parse().ok()?;
        return Some(Number::Float(if negative { -x } else { x }));
    }

    clean.parse().ok().map(Number::Int)
}

pub fn parse_bool(input: &str) -> Res<'_, bool> {
    alt((value(true, keyword("true")), value(false, keyword("false"))))(input)
}

pub fn parse_nil(input: &str) -> Res<'_, ()> {
    value((), keyword("nil"))(input)
}
