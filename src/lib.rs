//! Knight - an interpreter for the Knight programming language
//!
//! This crate implements Knight, a small dynamically-typed language in which
//! every program is a single prefix-form expression:
//!
//! ```text
//! ; = a 3
//! ; = b 4
//! : OUTPUT + a b
//! ```
//!
//! Functions have fixed arities and are identified by their first character
//! (`O` starts `OUTPUT`, `+` is addition), so source can be parsed with a
//! single rune of lookahead and no grammar table. Values are dynamically
//! typed and coerce on demand: `+ "1" 2` is `"12"`, while `+ 1 "2"` is `3`.
//!
//! ## Architecture
//!
//! - `value`: the [`Value`](value::Value) sum type and its coercions
//! - `parser`: single-lookahead parser producing a `Value` tree
//! - `evaluator`: the [`Environment`] plus tree-walking execution
//! - `builtinops`: the function registry and all builtin implementations
//!
//! The usual entry point is [`evaluate`], which runs one program against a
//! fresh environment:
//!
//! ```
//! use knight::{evaluate, value::Value};
//!
//! assert_eq!(evaluate("+ 1 2").unwrap(), Value::Integer(3));
//! ```
//!
//! Embedders that want variables to persist between programs (such as a
//! REPL) can hold an [`Environment`] and use [`evaluate_with`].

use std::fmt;

use crate::evaluator::Environment;
use crate::value::Value;

/// Categorizes the different kinds of syntax errors.
#[derive(Debug, PartialEq, Clone)]
pub enum SyntaxErrorKind {
    /// No expression remained after skipping whitespace and comments. Also
    /// used internally as the end-of-input marker while parsing arguments.
    EmptyInput,
    /// The first rune of a token doesn't start any production.
    UnknownToken(char),
    /// A string's closing quote was never found before the end of the source.
    UnterminatedString(char),
    /// A function's argument slot could not be filled before the end of the
    /// source. `index` is 1-based.
    MissingArgument {
        index: usize,
        function: &'static str,
    },
}

/// A structured syntax error, carrying the (1-based) source line it occurred on.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, line: usize) -> Self {
        SyntaxError { kind, line }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::EmptyInput => {
                write!(f, "source contained no expression")
            }
            SyntaxErrorKind::UnknownToken(c) => {
                write!(f, "[line {}] unknown token start: {c:?}", self.line)
            }
            SyntaxErrorKind::UnterminatedString(quote) => {
                write!(f, "[line {}] unterminated {quote} string", self.line)
            }
            SyntaxErrorKind::MissingArgument { index, function } => {
                write!(
                    f,
                    "[line {}] missing argument {index} for function {function}",
                    self.line
                )
            }
        }
    }
}

/// Error types for the interpreter.
///
/// Every failure a Knight program can provoke maps onto one of these; they
/// propagate out of [`evaluate`] without any recovery. `QUIT` is not an
/// error: it terminates the process directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The source couldn't be parsed.
    Syntax(SyntaxError),
    /// A variable was executed before ever being assigned.
    UndefinedVariable(String),
    /// An operator was applied to a value kind it doesn't accept.
    InvalidType {
        function: &'static str,
        kind: &'static str,
    },
    /// A value kind with no defined coercion (a variable or call) was asked
    /// to convert.
    NoConversion {
        kind: &'static str,
        target: &'static str,
    },
    /// The divisor of `/` or `%` was zero.
    DivisionByZero { function: &'static str },
    /// Integer exponentiation with a negative exponent.
    NegativeExponent { exponent: i64 },
    /// String/list replication with a negative count.
    NegativeRepeat { kind: &'static str, amount: i64 },
    /// An argument was the right kind but outside the operation's domain
    /// (empty containers, invalid codepoints, out-of-range windows).
    Domain {
        function: &'static str,
        message: String,
    },
    /// The underlying stdin/stdout/subprocess operation failed.
    Io(String),
}

impl Error {
    /// Create a Domain error for `function` with a preformatted message.
    pub(crate) fn domain(function: &'static str, message: impl Into<String>) -> Self {
        Error::Domain {
            function,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{e}"),
            Error::UndefinedVariable(name) => {
                write!(f, "undefined variable {name:?} encountered")
            }
            Error::InvalidType { function, kind } => {
                write!(f, "invalid type given to {function}: {kind}")
            }
            Error::NoConversion { kind, target } => {
                write!(f, "{kind} does not define a conversion to {target}")
            }
            Error::DivisionByZero { function } => {
                write!(f, "zero divisor given to {function}")
            }
            Error::NegativeExponent { exponent } => {
                write!(f, "negative exponent given to ^: {exponent}")
            }
            Error::NegativeRepeat { kind, amount } => {
                write!(f, "negative replication amount for a {kind} in *: {amount}")
            }
            Error::Domain { function, message } => {
                write!(f, "{message} given to {function}")
            }
            Error::Io(message) => write!(f, "io error: {message}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Parse `source` as one Knight expression and execute it against a fresh
/// environment.
///
/// Trailing source after the first expression is ignored, matching the
/// language's single-expression program model.
pub fn evaluate(source: &str) -> Result<Value, Error> {
    let mut env = Environment::new();
    evaluate_with(source, &mut env)
}

/// Like [`evaluate`], but runs against a caller-supplied environment so
/// variables persist across calls.
pub fn evaluate_with(source: &str, env: &mut Environment) -> Result<Value, Error> {
    let program = parser::parse_program(source, env)?;
    evaluator::execute(&program, env)
}

pub mod builtinops;
pub mod evaluator;
pub mod parser;
pub mod value;
