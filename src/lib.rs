//! sqltpl: templated SQL with every value bound as a parameter.
//!
//! Write dynamic SQL with Go-style template actions (optional filters,
//! `IN` lists, conditional `ORDER BY`/`LIMIT`). Every value an action prints
//! is replaced by a positional placeholder and returned as a bound argument.
//!
//! # Example
//! ```
//! use sqltpl::prelude::*;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Filter {
//!     name: String,
//!     ids: Vec<i64>,
//!     limit: Option<i64>,
//! }
//!
//! let compiler = Compiler::builder().dialect(Dialect::Dollar).build()?;
//! let filter = Filter {
//!     name: "ann".into(),
//!     ids: vec![1, 2],
//!     limit: None,
//! };
//! let out = compiler.compile(
//!     r#"
//!     select * from users
//!     where name = {{ .name }} and id = any({{ .ids }})
//!     {{ if .limit }} limit {{ .limit }} {{ end }}
//!     "#,
//!     &filter,
//! )?;
//!
//! assert_eq!(out.sql, "select * from users where name = $1 and id = any($2)");
//! assert_eq!(out.args, vec![Value::from("ann"), Value::from(vec![1i64, 2])]);
//! # Ok::<(), sqltpl::Error>(())
//! ```
//!
//! # Pipeline
//!
//! ```text
//! template text -> parser -> capture::rewrite -> exec -> placeholder -> SQL + args
//! ```

pub mod ast;
pub mod capture;
pub mod compiler;
pub mod config;
pub mod error;
pub mod exec;
pub mod funcs;
pub mod parser;
pub mod placeholder;
pub mod value;

pub use compiler::{Compiled, Compiler, CompilerBuilder};
pub use config::CompilerConfig;
pub use error::{ConfigError, Error, EvalError, FormatError, Result, SyntaxError};
pub use funcs::{FuncError, FuncMap};
pub use placeholder::{Dialect, Formatted, Placeholder};
pub use value::Value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compiler::{Compiled, Compiler};
    pub use crate::funcs::{FuncError, FuncMap};
    pub use crate::placeholder::{Dialect, Placeholder};
    pub use crate::value::Value;
}
