//! The compile pipeline: parse, capture, execute, format.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::capture::{self, CAPTURE_FUNC};
use crate::config::CompilerConfig;
use crate::error::{ConfigError, FormatError, Result};
use crate::exec::{self, EvalContext};
use crate::funcs::{FuncError, FuncMap};
use crate::parser::{self, tokens::parse_identifier};
use crate::placeholder::{Dialect, Placeholder, normalize_whitespace};
use crate::value::Value;

/// Words that can never name a function.
const KEYWORDS: &[&str] = &[
    "if", "else", "end", "range", "with", "define", "template", "block", "break", "continue",
    "true", "false", "nil",
];

/// A compiled statement: SQL text and its bound arguments, one per
/// placeholder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compiled {
    pub sql: String,
    pub args: Vec<Value>,
}

impl From<Compiled> for (String, Vec<Value>) {
    fn from(c: Compiled) -> Self {
        (c.sql, c.args)
    }
}

/// Compiles templated SQL into a statement plus arguments.
///
/// Holds only read-only settings, so one instance can serve any number of
/// threads.
///
/// ```
/// use sqltpl::{Compiler, Dialect, Value};
///
/// let compiler = Compiler::builder().dialect(Dialect::Dollar).build().unwrap();
/// let data: Value = [("Value", 5)].into_iter().collect();
/// let out = compiler.compile_value("select * from t where v = {{.Value}}", &data).unwrap();
/// assert_eq!(out.sql, "select * from t where v = $1");
/// assert_eq!(out.args, vec![Value::Int(5)]);
/// ```
#[derive(Clone)]
pub struct Compiler {
    placeholder: Arc<dyn Placeholder>,
    funcs: FuncMap,
    normalize_whitespace: bool,
}

impl Compiler {
    /// Pass-through `?` placeholders, builtin functions only.
    pub fn new() -> Self {
        Self {
            placeholder: Arc::new(Dialect::default()),
            funcs: FuncMap::new(),
            normalize_whitespace: true,
        }
    }

    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::default()
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            placeholder: Arc::new(config.placeholder),
            funcs: FuncMap::new(),
            normalize_whitespace: config.normalize_whitespace,
        }
    }

    pub fn funcs(&self) -> &FuncMap {
        &self.funcs
    }

    /// Compile `text` against any serializable data.
    pub fn compile<T: Serialize + ?Sized>(&self, text: &str, data: &T) -> Result<Compiled> {
        let data = Value::from_serialize(data)?;
        self.compile_value(text, &data)
    }

    pub fn compile_value(&self, text: &str, data: &Value) -> Result<Compiled> {
        let mut tpl = parser::parse_with_funcs(text, &self.funcs)?;
        capture::rewrite(&mut tpl);

        let mut ctx = EvalContext::new(&self.funcs);
        let raw = exec::execute(&tpl, data, &mut ctx)?;
        let args = ctx.into_args();

        let formatted = self.placeholder.format(&raw)?;
        if formatted.placeholders != args.len() {
            return Err(FormatError::CountMismatch {
                placeholders: formatted.placeholders,
                args: args.len(),
            }
            .into());
        }

        let sql = if self.normalize_whitespace {
            normalize_whitespace(&formatted.sql)
        } else {
            formatted.sql
        };

        debug!(
            template_len = text.len(),
            sub_templates = tpl.defines.len(),
            args = args.len(),
            dialect = self.placeholder.name(),
            "compiled statement"
        );
        Ok(Compiled { sql, args })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("placeholder", &self.placeholder.name())
            .field("funcs", &self.funcs)
            .field("normalize_whitespace", &self.normalize_whitespace)
            .finish()
    }
}

/// Builder for [`Compiler`].
#[derive(Clone)]
pub struct CompilerBuilder {
    placeholder: Arc<dyn Placeholder>,
    funcs: FuncMap,
    normalize_whitespace: bool,
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        let Compiler {
            placeholder,
            funcs,
            normalize_whitespace,
        } = Compiler::new();
        Self {
            placeholder,
            funcs,
            normalize_whitespace,
        }
    }
}

impl CompilerBuilder {
    /// Use a custom placeholder strategy.
    pub fn placeholder(mut self, placeholder: impl Placeholder + 'static) -> Self {
        self.placeholder = Arc::new(placeholder);
        self
    }

    pub fn dialect(self, dialect: Dialect) -> Self {
        self.placeholder(dialect)
    }

    /// Register a pipeline function. Shadows a builtin of the same name.
    pub fn function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.funcs.insert(name, f);
        self
    }

    /// Register every function in `funcs`, replacing same-named entries.
    pub fn functions(mut self, funcs: FuncMap) -> Self {
        self.funcs.extend(funcs);
        self
    }

    pub fn normalize_whitespace(mut self, on: bool) -> Self {
        self.normalize_whitespace = on;
        self
    }

    /// Apply the dialect and whitespace settings of `config`.
    pub fn config(self, config: &CompilerConfig) -> Self {
        self.dialect(config.placeholder)
            .normalize_whitespace(config.normalize_whitespace)
    }

    pub fn build(self) -> std::result::Result<Compiler, ConfigError> {
        for name in self.funcs.names() {
            if name == CAPTURE_FUNC {
                return Err(ConfigError::ReservedName(name.to_string()));
            }
            if !is_valid_name(name) {
                return Err(ConfigError::InvalidName(name.to_string()));
            }
        }
        Ok(Compiler {
            placeholder: self.placeholder,
            funcs: self.funcs,
            normalize_whitespace: self.normalize_whitespace,
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    matches!(parse_identifier(name), Ok(("", _))) && !KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, EvalError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_is_pass_through() {
        let out = Compiler::new()
            .compile("select *\n  from t\n  where a = {{.A}}", &json!({"A": 1}))
            .unwrap();
        assert_eq!(out.sql, "select * from t where a = ?");
        assert_eq!(out.args, vec![Value::Int(1)]);
    }

    #[test]
    fn test_into_tuple() {
        let (sql, args): (String, Vec<Value>) = Compiler::new()
            .compile("x = {{.X}}", &json!({"X": "y"}))
            .unwrap()
            .into();
        assert_eq!(sql, "x = ?");
        assert_eq!(args, vec![Value::from("y")]);
    }

    #[test]
    fn test_reserved_name() {
        let err = Compiler::builder()
            .function(CAPTURE_FUNC, |_: &[Value]| Ok(Value::Null))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReservedName(_)));
        assert_eq!(err.to_string(), "invalid function name, _sql_arg_ is reserved");
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "1abc", "a-b", "range"] {
            let err = Compiler::builder()
                .function(name, |_: &[Value]| Ok(Value::Null))
                .build()
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidName(_)), "{name}");
        }
    }

    #[test]
    fn test_whitespace_can_be_kept() {
        let compiler = Compiler::builder().normalize_whitespace(false).build().unwrap();
        let out = compiler.compile("a =  {{.A}}\n", &json!({"A": 1})).unwrap();
        assert_eq!(out.sql, "a =  ?\n");
    }

    #[test]
    fn test_literal_question_mark_is_a_mismatch() {
        let err = Compiler::new()
            .compile("select * from t where a = ? and b = {{.B}}", &json!({"B": 1}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::CountMismatch {
                placeholders: 2,
                args: 1
            })
        ));
    }

    #[test]
    fn test_errors_pass_through() {
        let err = Compiler::new().compile("{{if}}", &json!({})).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));

        let err = Compiler::new().compile("{{.Nope}}", &json!({})).unwrap_err();
        assert!(matches!(err, Error::Eval(EvalError::MissingField { .. })));
    }

    #[test]
    fn test_config() {
        let config = CompilerConfig::from_toml_str("placeholder = \"colon\"").unwrap();
        let out = Compiler::builder()
            .config(&config)
            .build()
            .unwrap()
            .compile("a = {{.A}}", &json!({"A": 1}))
            .unwrap();
        assert_eq!(out.sql, "a = :1");

        let out = Compiler::from_config(&config)
            .compile("a = {{.A}}", &json!({"A": 1}))
            .unwrap();
        assert_eq!(out.sql, "a = :1");
    }

    #[test]
    fn test_compiler_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compiler>();
    }
}
