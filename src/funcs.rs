//! Pipeline functions: the caller-supplied registry and the builtins every
//! template can use.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

/// Error returned by a pipeline function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FuncError(pub String);

impl FuncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A callable registered under a name. Receives the evaluated arguments,
/// with the piped value (if any) last.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync>;

type Builtin = fn(&[Value]) -> Result<Value, FuncError>;

/// Names of the builtin functions, in lookup order.
pub const BUILTINS: &[&str] = &[
    "and", "or", "not", "len", "index", "slice", "eq", "ne", "lt", "le", "gt", "ge", "print",
    "println", "printf",
];

/// Mapping from function name to callable. Read-only once handed to a
/// [`Compiler`](crate::Compiler).
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: HashMap<String, Function>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(f));
    }

    /// Move every entry of `other` into this map.
    pub fn extend(&mut self, other: FuncMap) {
        self.funcs.extend(other.funcs);
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Whether `name` resolves to a registered or builtin function.
    pub fn resolves(&self, name: &str) -> bool {
        self.contains(name) || is_builtin(name)
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FuncMap").field("funcs", &names).finish()
    }
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Eager implementation of a builtin. `and` and `or` are included for
/// completeness; the evaluator short-circuits them itself.
pub(crate) fn builtin(name: &str) -> Option<Builtin> {
    let f: Builtin = match name {
        "and" => and,
        "or" => or,
        "not" => not,
        "len" => len,
        "index" => index,
        "slice" => slice,
        "eq" => eq,
        "ne" => ne,
        "lt" => lt,
        "le" => le,
        "gt" => gt,
        "ge" => ge,
        "print" => print,
        "println" => println,
        "printf" => printf,
        _ => return None,
    };
    Some(f)
}

fn arity(args: &[Value], want: usize) -> Result<(), FuncError> {
    if args.len() != want {
        return Err(FuncError::new(format!(
            "wrong number of args: got {} want {}",
            args.len(),
            want
        )));
    }
    Ok(())
}

fn min_arity(args: &[Value], min: usize) -> Result<(), FuncError> {
    if args.len() < min {
        return Err(FuncError::new(format!(
            "wrong number of args: got {} want at least {}",
            args.len(),
            min
        )));
    }
    Ok(())
}

fn and(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 1)?;
    let hit = args.iter().find(|v| !v.is_truthy());
    Ok(hit.or(args.last()).cloned().unwrap_or_default())
}

fn or(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 1)?;
    let hit = args.iter().find(|v| v.is_truthy());
    Ok(hit.or(args.last()).cloned().unwrap_or_default())
}

fn not(args: &[Value]) -> Result<Value, FuncError> {
    arity(args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn len(args: &[Value]) -> Result<Value, FuncError> {
    arity(args, 1)?;
    args[0]
        .len()
        .map(Value::from)
        .ok_or_else(|| FuncError::new(format!("len of type {}", args[0].kind())))
}

fn int_index(v: &Value) -> Result<i64, FuncError> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::UInt(u) => Err(FuncError::new(format!("index out of range: {}", u))),
        other => Err(FuncError::new(format!(
            "cannot index with type {}",
            other.kind()
        ))),
    }
}

fn checked_index(i: i64, len: usize) -> Result<usize, FuncError> {
    usize::try_from(i)
        .ok()
        .filter(|&n| n < len)
        .ok_or_else(|| FuncError::new(format!("index out of range: {}", i)))
}

fn index(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 1)?;
    let mut item = args[0].clone();
    for key in &args[1..] {
        item = match &item {
            Value::Seq(items) => {
                let i = checked_index(int_index(key)?, items.len())?;
                items[i].clone()
            }
            Value::String(s) => {
                let i = checked_index(int_index(key)?, s.len())?;
                Value::Int(s.as_bytes()[i] as i64)
            }
            Value::Map(map) => match key {
                Value::String(k) => map.get(k).cloned().unwrap_or_default(),
                other => {
                    return Err(FuncError::new(format!(
                        "value has type {}; should be string",
                        other.kind()
                    )));
                }
            },
            Value::Null => return Err(FuncError::new("index of untyped nil")),
            other => {
                return Err(FuncError::new(format!(
                    "can't index item of type {}",
                    other.kind()
                )));
            }
        };
    }
    Ok(item)
}

fn slice(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 1)?;
    if args.len() > 3 {
        return Err(FuncError::new("too many slice indexes"));
    }
    let range = |len: usize| -> Result<(usize, usize), FuncError> {
        let bound = |v: Option<&Value>, default: usize| -> Result<usize, FuncError> {
            match v {
                None => Ok(default),
                Some(v) => {
                    let i = int_index(v)?;
                    usize::try_from(i)
                        .ok()
                        .filter(|&n| n <= len)
                        .ok_or_else(|| FuncError::new(format!("index out of range: {}", i)))
                }
            }
        };
        let start = bound(args.get(1), 0)?;
        let end = bound(args.get(2), len)?;
        if start > end {
            return Err(FuncError::new(format!(
                "invalid slice index: {} > {}",
                start, end
            )));
        }
        Ok((start, end))
    };
    match &args[0] {
        Value::Seq(items) => {
            let (start, end) = range(items.len())?;
            Ok(Value::Seq(items[start..end].to_vec()))
        }
        Value::String(s) => {
            let (start, end) = range(s.len())?;
            s.get(start..end)
                .map(Value::from)
                .ok_or_else(|| FuncError::new("slice splits a multi-byte character"))
        }
        other => Err(FuncError::new(format!(
            "can't slice item of type {}",
            other.kind()
        ))),
    }
}

fn basic_eq(a: &Value, b: &Value) -> Result<bool, FuncError> {
    match (a, b) {
        (Value::Seq(_) | Value::Map(_), _) | (_, Value::Seq(_) | Value::Map(_)) => Err(
            FuncError::new(format!("non-comparable types {} and {}", a.kind(), b.kind())),
        ),
        _ if a.is_number() && b.is_number() => {
            Ok(matches!(basic_cmp(a, b), Ok(Ordering::Equal)))
        }
        _ => Ok(a == b),
    }
}

fn basic_cmp(a: &Value, b: &Value) -> Result<Ordering, FuncError> {
    let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::UInt(x), Value::UInt(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::UInt(y)) => Some(int_uint_cmp(*x, *y)),
        (Value::UInt(x), Value::Int(y)) => Some(int_uint_cmp(*y, *x).reverse()),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::UInt(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::UInt(y)) => x.partial_cmp(&(*y as f64)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => {
            return Err(FuncError::new(format!(
                "incompatible types for comparison: {} and {}",
                a.kind(),
                b.kind()
            )));
        }
    };
    ord.ok_or_else(|| FuncError::new("comparison with NaN"))
}

fn int_uint_cmp(i: i64, u: u64) -> Ordering {
    u64::try_from(i).map_or(Ordering::Less, |i| i.cmp(&u))
}

fn eq(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 2)?;
    for other in &args[1..] {
        if basic_eq(&args[0], other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ne(args: &[Value]) -> Result<Value, FuncError> {
    arity(args, 2)?;
    Ok(Value::Bool(!basic_eq(&args[0], &args[1])?))
}

fn compare(args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, FuncError> {
    arity(args, 2)?;
    Ok(Value::Bool(accept(basic_cmp(&args[0], &args[1])?)))
}

fn lt(args: &[Value]) -> Result<Value, FuncError> {
    compare(args, |o| o == Ordering::Less)
}

fn le(args: &[Value]) -> Result<Value, FuncError> {
    compare(args, |o| o != Ordering::Greater)
}

fn gt(args: &[Value]) -> Result<Value, FuncError> {
    compare(args, |o| o == Ordering::Greater)
}

fn ge(args: &[Value]) -> Result<Value, FuncError> {
    compare(args, |o| o != Ordering::Less)
}

fn print(args: &[Value]) -> Result<Value, FuncError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        // Operands are separated by a space only when neither is a string.
        if i > 0 && !matches!(arg, Value::String(_)) && !matches!(args[i - 1], Value::String(_)) {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    Ok(Value::String(out))
}

fn println(args: &[Value]) -> Result<Value, FuncError> {
    let mut out = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    Ok(Value::String(out))
}

fn printf(args: &[Value]) -> Result<Value, FuncError> {
    min_arity(args, 1)?;
    let format = args[0]
        .as_str()
        .ok_or_else(|| FuncError::new("printf format must be a string"))?;
    let mut rest = args[1..].iter();
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = rest.next() else {
            out.push_str(&format!("%!{}(MISSING)", verb));
            continue;
        };
        match (verb, arg) {
            ('v' | 's', v) => out.push_str(&v.to_string()),
            ('d', Value::Int(i)) => out.push_str(&i.to_string()),
            ('d', Value::UInt(u)) => out.push_str(&u.to_string()),
            ('f', Value::Float(x)) => out.push_str(&format!("{:.6}", x)),
            ('f', Value::Int(i)) => out.push_str(&format!("{:.6}", *i as f64)),
            ('f', Value::UInt(u)) => out.push_str(&format!("{:.6}", *u as f64)),
            ('q', v) => out.push_str(&format!("{:?}", v.to_string())),
            ('t', Value::Bool(b)) => out.push_str(&b.to_string()),
            (verb, v) => out.push_str(&format!("%!{}({}={})", verb, v.kind(), v)),
        }
    }
    let extra: Vec<String> = rest.map(|v| format!("{}={}", v.kind(), v)).collect();
    if !extra.is_empty() {
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }
    Ok(Value::String(out))
}
