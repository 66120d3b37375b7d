//! Placeholder dialects.
//!
//! The evaluator leaves a bare `?` wherever an argument was captured and
//! `??` for a literal question mark. A [`Placeholder`] renders the former as
//! the dialect's positional marker and the latter as a single `?`.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// A formatted statement and the number of placeholders it contains.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formatted {
    pub sql: String,
    pub placeholders: usize,
}

/// Strategy for rendering positional placeholders.
///
/// Only [`placeholder`](Placeholder::placeholder) is required. A custom
/// dialect may refuse an index, e.g. to enforce a parameter limit.
pub trait Placeholder: Send + Sync {
    /// Render the placeholder for the 1-based argument `index`.
    fn placeholder(&self, index: usize) -> Result<String, FormatError>;

    /// Name used in log events.
    fn name(&self) -> &str {
        "custom"
    }

    /// Replace every unescaped `?` in `raw` and unescape `??`.
    fn format(&self, raw: &str) -> Result<Formatted, FormatError> {
        let mut sql = String::with_capacity(raw.len());
        let mut placeholders = 0;
        let mut rest = raw;
        while let Some(at) = rest.find('?') {
            sql.push_str(&rest[..at]);
            rest = &rest[at + 1..];
            if let Some(after) = rest.strip_prefix('?') {
                sql.push('?');
                rest = after;
                continue;
            }
            placeholders += 1;
            sql.push_str(&self.placeholder(placeholders)?);
        }
        sql.push_str(rest);
        Ok(Formatted { sql, placeholders })
    }
}

/// Built-in dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1` (PostgreSQL)
    Dollar,
    /// `:1` (Oracle)
    Colon,
    /// `@p1` (SQL Server)
    AtP,
}

impl Dialect {
    pub fn prefix(self) -> &'static str {
        match self {
            Dialect::Question => "?",
            Dialect::Dollar => "$",
            Dialect::Colon => ":",
            Dialect::AtP => "@p",
        }
    }
}

impl Placeholder for Dialect {
    fn name(&self) -> &str {
        match self {
            Dialect::Question => "question",
            Dialect::Dollar => "dollar",
            Dialect::Colon => "colon",
            Dialect::AtP => "at_p",
        }
    }

    fn placeholder(&self, index: usize) -> Result<String, FormatError> {
        Ok(match self {
            Dialect::Question => "?".to_string(),
            _ => format!("{}{}", self.prefix(), index),
        })
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "question" | "?" => Ok(Dialect::Question),
            "dollar" | "$" | "postgres" => Ok(Dialect::Dollar),
            "colon" | ":" | "oracle" => Ok(Dialect::Colon),
            "at_p" | "@p" | "mssql" => Ok(Dialect::AtP),
            _ => Err(format!("unknown placeholder dialect: {}", s)),
        }
    }
}

/// Collapse ASCII whitespace runs to one space and trim both ends.
///
/// Other Unicode spaces (e.g. NBSP) are data and pass through untouched.
pub fn normalize_whitespace(sql: &str) -> String {
    sql.split(|c: char| c.is_ascii_whitespace())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dialects() {
        let raw = "a = ? and b = ?";
        assert_eq!(Dialect::Question.format(raw).unwrap().sql, "a = ? and b = ?");
        assert_eq!(Dialect::Dollar.format(raw).unwrap().sql, "a = $1 and b = $2");
        assert_eq!(Dialect::Colon.format(raw).unwrap().sql, "a = :1 and b = :2");
        assert_eq!(Dialect::AtP.format(raw).unwrap().sql, "a = @p1 and b = @p2");
        assert_eq!(Dialect::AtP.format(raw).unwrap().placeholders, 2);
    }

    #[test]
    fn test_escape_is_not_counted() {
        let out = Dialect::Dollar.format("x = '??' and y = ? and z ?? w").unwrap();
        assert_eq!(out.sql, "x = '?' and y = $1 and z ? w");
        assert_eq!(out.placeholders, 1);

        let out = Dialect::Question.format("select '??' , ?").unwrap();
        assert_eq!(out.sql, "select '?' , ?");
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_escape_then_placeholder() {
        // `???` is an escaped `?` followed by a real one.
        let out = Dialect::Dollar.format("???").unwrap();
        assert_eq!(out.sql, "?$1");
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_custom_dialect_can_reject() {
        struct Limited;
        impl Placeholder for Limited {
            fn placeholder(&self, index: usize) -> Result<String, FormatError> {
                if index > 2 {
                    return Err(FormatError::Rejected {
                        index,
                        reason: "at most 2 parameters".to_string(),
                    });
                }
                Ok(format!("#{}", index))
            }
        }
        assert_eq!(Limited.format("? ?").unwrap().sql, "#1 #2");
        assert_eq!(
            Limited.format("? ? ?").unwrap_err(),
            FormatError::Rejected {
                index: 3,
                reason: "at most 2 parameters".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("\n\tselect *\n   from t\r\n where  'a   b' "),
            "select * from t where 'a b'"
        );
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_normalize_keeps_unicode_spaces() {
        assert_eq!(
            normalize_whitespace(" where name = 'a\u{a0}\u{a0}b'\x0c\n"),
            "where name = 'a\u{a0}\u{a0}b'"
        );
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!("dollar".parse::<Dialect>().unwrap(), Dialect::Dollar);
        assert_eq!("AT_P".parse::<Dialect>().unwrap(), Dialect::AtP);
        assert!("percent".parse::<Dialect>().is_err());
    }
}
