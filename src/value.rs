//! The core value type of the interpreter and its coercion lattice.
//!
//! [`Value`] covers the five kinds a Knight program can observe directly
//! (null, booleans, integers, strings, lists) plus the two kinds that only
//! arise inside an AST: variables and function calls. Strings and lists are
//! reference-counted so the same value can be aliased from several AST
//! positions, stored in variables, and nested in lists without copying;
//! every operation that "modifies" a string or list builds a fresh one.
//!
//! Each of the five literal kinds defines four total coercions
//! ([`to_boolean`](Value::to_boolean), [`to_integer`](Value::to_integer),
//! [`to_text`](Value::to_text), [`to_list`](Value::to_list)); variables and
//! calls define none and report a typed error instead. Equality is
//! structural and kind-exact: `1` never equals `"1"`.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::Function;
use crate::evaluator::Variable;

/// A single Knight value, literal or AST node.
#[derive(Clone)]
pub enum Value {
    /// The sole null value.
    Null,
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// 64-bit signed integers (the spec only requires 32).
    Integer(i64),
    /// Immutable UTF-8 text; lengths and indexing are in runes, not bytes.
    String(Rc<str>),
    /// An ordered, possibly empty sequence of values.
    List(Rc<Vec<Value>>),
    /// A named, shared, mutable cell. Only `BLOCK` can hand one to a program.
    Variable(Variable),
    /// A function call with exactly `function.arity` arguments.
    Call {
        function: &'static Function,
        args: Rc<Vec<Value>>,
    },
}

impl Value {
    /// The kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Variable(_) => "Variable",
            Value::Call { .. } => "Call",
        }
    }

    /// Coerce to a boolean: nonzero, nonempty, non-null.
    pub fn to_boolean(&self) -> Result<bool, Error> {
        match self {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(*b),
            Value::Integer(n) => Ok(*n != 0),
            Value::String(s) => Ok(!s.is_empty()),
            Value::List(l) => Ok(!l.is_empty()),
            _ => Err(self.no_conversion("Boolean")),
        }
    }

    /// Coerce to an integer.
    ///
    /// Strings parse a leading-whitespace-then-sign-then-digits prefix and
    /// discard the rest; no digits at all yields 0, and digit runs beyond
    /// the 64-bit range saturate. Lists convert to their length.
    pub fn to_integer(&self) -> Result<i64, Error> {
        match self {
            Value::Null => Ok(0),
            Value::Boolean(b) => Ok(i64::from(*b)),
            Value::Integer(n) => Ok(*n),
            Value::String(s) => Ok(parse_integer_prefix(s)),
            Value::List(l) => Ok(l.len() as i64),
            _ => Err(self.no_conversion("Integer")),
        }
    }

    /// Coerce to text. Lists join their elements with `"\n"`, which fails if
    /// any element is itself unconvertible (e.g. a `BLOCK` result).
    pub fn to_text(&self) -> Result<Rc<str>, Error> {
        match self {
            Value::Null => Ok("null".into()),
            Value::Boolean(true) => Ok("true".into()),
            Value::Boolean(false) => Ok("false".into()),
            Value::Integer(n) => Ok(n.to_string().into()),
            Value::String(s) => Ok(s.clone()),
            Value::List(l) => Ok(join(l, "\n")?.into()),
            _ => Err(self.no_conversion("String")),
        }
    }

    /// Coerce to a list.
    ///
    /// Integers become their base-10 digits with the sign propagated into
    /// each digit (`-123` is `[-1, -2, -3]`, `0` is `[0]`); strings become
    /// one single-rune string per rune; booleans become `[]` or `[TRUE]`.
    pub fn to_list(&self) -> Result<Rc<Vec<Value>>, Error> {
        match self {
            Value::Null => Ok(Rc::new(Vec::new())),
            Value::Boolean(false) => Ok(Rc::new(Vec::new())),
            Value::Boolean(true) => Ok(Rc::new(vec![Value::Boolean(true)])),
            Value::Integer(n) => Ok(Rc::new(integer_digits(*n))),
            Value::String(s) => Ok(Rc::new(
                s.chars()
                    .map(|c| Value::String(c.to_string().into()))
                    .collect(),
            )),
            Value::List(l) => Ok(l.clone()),
            _ => Err(self.no_conversion("List")),
        }
    }

    fn no_conversion(&self, target: &'static str) -> Error {
        Error::NoConversion {
            kind: self.kind(),
            target,
        }
    }
}

/// Concatenate the text forms of `elements`, interspersing `separator`.
///
/// Fails if any element lacks a text conversion.
pub(crate) fn join(elements: &[Value], separator: &str) -> Result<String, Error> {
    let mut joined = String::new();

    for (i, element) in elements.iter().enumerate() {
        if i != 0 {
            joined.push_str(separator);
        }
        joined.push_str(&element.to_text()?);
    }

    Ok(joined)
}

/// Parse the integer prefix of a string: optional leading whitespace, an
/// optional `+`/`-`, then a maximal run of ASCII digits.
fn parse_integer_prefix(s: &str) -> i64 {
    let s = s.trim_start();

    let (negative, s) = match s.strip_prefix(['+', '-']) {
        Some(rest) => (s.starts_with('-'), rest),
        None => (false, s),
    };

    let digits: &str = &s[..s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len()];
    if digits.is_empty() {
        return 0;
    }

    // Over-long digit runs saturate rather than wrap.
    match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// The base-10 digits of `n`, most significant first, each carrying `n`'s sign.
fn integer_digits(mut n: i64) -> Vec<Value> {
    if n == 0 {
        return vec![Value::Integer(0)];
    }

    let mut digits = Vec::new();
    while n != 0 {
        // Rust's % truncates toward zero, so each digit inherits the sign.
        digits.push(Value::Integer(n % 10));
        n /= 10;
    }

    digits.reverse();
    digits
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(l) => {
                write!(f, "List(")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Variable(var) => write!(f, "Variable({})", var.name()),
            Value::Call { function, args } => {
                write!(f, "Call({}", function.full_name)?;
                for arg in args.iter() {
                    write!(f, ", {arg:?}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The `DUMP` debug representation: `null`, `true`/`false`, decimal
/// integers, double-quoted strings with `\"` `\\` `\n` `\t` `\r` escaped,
/// and `[a, b]` lists.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::List(l) => {
                write!(f, "[")?;
                for (i, element) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Variable(var) => write!(f, "Variable({})", var.name()),
            Value::Call { function, .. } => write!(f, "Call({})", function.full_name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Deferred values compare by identity: the same cell, the same node.
            (Value::Variable(a), Value::Variable(b)) => a == b,
            (Value::Call { args: a, .. }, Value::Call { args: b, .. }) => Rc::ptr_eq(a, b),
            _ => false, // Different kinds are never equal, without coercion.
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(Rc::new(v.into_iter().map(|x| x.into()).collect()))
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(Rc::new(arr.into_iter().map(|x| x.into()).collect()))
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for the empty list, Knight's `@`.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn empty_list() -> Value {
    Value::List(Rc::new(Vec::new()))
}
