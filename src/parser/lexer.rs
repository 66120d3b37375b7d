//! Split template source into literal text and action bodies.
//!
//! Trim markers are resolved here: `{{- ` strips trailing whitespace from the
//! preceding text and ` -}}` strips leading whitespace from the following
//! text. Comments are dropped.

use super::tokens::is_space;

const LEFT: &str = "{{";
const RIGHT: &str = "}}";

#[derive(Debug, Clone, PartialEq)]
pub enum Item<'a> {
    Text(&'a str),
    /// `start` is the byte offset of the opening delimiter.
    Action { start: usize, body: &'a str },
}

/// Lexing failure: byte offset and message.
pub type LexError = (usize, &'static str);

pub fn lex(src: &str) -> Result<Vec<Item<'_>>, LexError> {
    let mut items = Vec::new();
    let mut cursor = 0;
    let mut trim_next = false;

    loop {
        let rest = &src[cursor..];
        let Some(found) = rest.find(LEFT) else {
            push_text(&mut items, rest, trim_next, false);
            return Ok(items);
        };

        let open = cursor + found;
        let mut inner_start = open + LEFT.len();
        let trim_left = has_left_trim(&src[inner_start..]);
        push_text(&mut items, &src[cursor..open], trim_next, trim_left);
        if trim_left {
            inner_start += 1;
        }

        let inner = &src[inner_start..];
        let lead = inner.trim_start_matches(is_space);
        if lead.starts_with("/*") && (trim_left || lead.len() == inner.len()) {
            let comment_start = inner_start + (inner.len() - lead.len());
            let (end, trim_right) =
                close_comment(src, comment_start).ok_or((open, "unclosed comment"))?;
            cursor = end;
            trim_next = trim_right;
            continue;
        }

        let close = find_close(inner).ok_or((open, "unclosed action"))?;
        let mut body = &inner[..close];
        let trim_right = has_right_trim(body);
        if trim_right {
            body = &body[..body.len() - 1];
        }
        items.push(Item::Action { start: open, body });
        cursor = inner_start + close + RIGHT.len();
        trim_next = trim_right;
    }
}

fn push_text<'a>(items: &mut Vec<Item<'a>>, text: &'a str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_space);
    }
    if !text.is_empty() {
        items.push(Item::Text(text));
    }
}

/// `{{- ` : a dash followed by whitespace. `{{-3}}` is a number.
fn has_left_trim(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

/// ` -}}` : whitespace followed by a dash right before the delimiter.
fn has_right_trim(body: &str) -> bool {
    body.strip_suffix('-')
        .is_some_and(|head| head.ends_with(is_space))
}

/// Find the end of `/* ... */` starting at `start` and the closing delimiter
/// that must follow it. Returns the offset just past `}}`.
fn close_comment(src: &str, start: usize) -> Option<(usize, bool)> {
    let end = start + src[start..].find("*/")? + 2;
    let after = &src[end..];
    if after.starts_with(RIGHT) {
        return Some((end + RIGHT.len(), false));
    }
    let lead = after.trim_start_matches(is_space);
    if lead.len() < after.len() && lead.starts_with("-}}") {
        return Some((end + (after.len() - lead.len()) + 3, true));
    }
    None
}

/// Offset of the closing `}}`, skipping quoted strings.
///
/// Delimiters are ASCII, so scanning bytes never splits a character.
fn find_close(inner: &str) -> Option<usize> {
    let bytes = inner.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(b'"') if b == b'\\' => i += 1,
            // An unterminated string stops at the line end; the action
            // grammar reports it.
            Some(b'"') if b == b'\n' => quote = None,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if inner[i..].starts_with(RIGHT) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies<'a>(items: &[Item<'a>]) -> Vec<&'a str> {
        items
            .iter()
            .filter_map(|item| match item {
                Item::Action { body, .. } => Some(*body),
                Item::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_text_and_actions() {
        let items = lex("a {{ .B }} c").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("a "),
                Item::Action { start: 2, body: " .B " },
                Item::Text(" c"),
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        let items = lex("a  \n {{- .B -}} \n\t c").unwrap();
        assert_eq!(items[0], Item::Text("a"));
        assert_eq!(bodies(&items), vec![" .B "]);
        assert_eq!(items[2], Item::Text("c"));
    }

    #[test]
    fn test_dash_without_space_is_not_trim() {
        let items = lex("x {{-3}} y").unwrap();
        assert_eq!(items[0], Item::Text("x "));
        assert_eq!(bodies(&items), vec!["-3"]);
    }

    #[test]
    fn test_close_delimiter_inside_string() {
        let items = lex(r#"{{ print "}}" }}"#).unwrap();
        assert_eq!(bodies(&items), vec![r#" print "}}" "#]);
    }

    #[test]
    fn test_comments_are_dropped() {
        let items = lex("a {{/* note */}} b {{- /* trimmed */ -}} c").unwrap();
        assert_eq!(items, vec![Item::Text("a "), Item::Text(" b"), Item::Text("c")]);
    }

    #[test]
    fn test_unclosed() {
        assert_eq!(lex("select {{ .A"), Err((7, "unclosed action")));
        assert_eq!(lex("{{/* x }}"), Err((0, "unclosed comment")));
    }
}
