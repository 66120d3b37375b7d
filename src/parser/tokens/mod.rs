pub mod identifiers;
pub mod literals;

pub use self::identifiers::{
    is_ident_char, is_space, keyword, parse_field, parse_fields, parse_identifier,
    parse_variable_name, ws, ws1,
};
pub use self::literals::{
    parse_bool, parse_nil, parse_number, parse_quoted_string, parse_raw_string, parse_string,
};

use nom::IResult;
use nom::error::{VerboseError, VerboseErrorKind};

/// Result type shared by every token parser.
pub type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Abort parsing at `input` with a complete error message.
///
/// The message is stored as the innermost context entry, which is how the
/// parser tells explicit failures apart from combinator mismatches.
pub fn fail<'a, T>(input: &'a str, message: &'static str) -> Res<'a, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(message))],
    }))
}
