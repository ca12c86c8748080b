//! The builtin function registry and every builtin implementation.
//!
//! Each Knight function is identified by the single character that starts
//! its token (`O` for `OUTPUT`, `+` for addition) and has a fixed arity the
//! parser enforces, so handlers can index their argument slice freely.
//!
//! Handlers receive their arguments *unevaluated* and decide what to execute
//! themselves: `BLOCK` executes nothing, `&`/`|`/`IF`/`WHILE` execute
//! conditionally, and everything else executes left to right. This is why
//! the registry stores plain handler functions rather than typed wrappers -
//! there is no point at which all arguments are known to be evaluated.
//!
//! ## Adding a function
//!
//! 1. Implement a handler with the canonical signature
//!    `fn(&[Value], &mut Environment) -> Result<Value, Error>`
//! 2. Add a `Function` entry to `FUNCTIONS` under its arity group
//! 3. Add cases to the table test at the bottom of this file

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::process;
use std::rc::Rc;
use std::sync::LazyLock;

use rand::Rng;

use crate::Error;
use crate::evaluator::{
    Environment, execute, execute_to_boolean, execute_to_integer, execute_to_list, execute_to_text,
};
use crate::value::{Value, join};

/// The canonical handler signature. Arguments arrive unevaluated.
pub type Handler = fn(&[Value], &mut Environment) -> Result<Value, Error>;

/// Definition of one builtin function.
pub struct Function {
    /// The identifying character the parser dispatches on.
    pub name: char,
    /// The display name used in diagnostics (`"OUTPUT"`, `"+"`).
    pub full_name: &'static str,
    /// How many arguments the parser must supply. Always `args.len()`.
    pub arity: usize,
    /// The implementation.
    pub handler: Handler,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({}/{})", self.full_name, self.arity)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        // The identifying character uniquely names a function.
        self.name == other.name
    }
}

//
// Arity 0
//

fn true_(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Boolean(true))
}

fn false_(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Boolean(false))
}

fn null(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Null)
}

fn empty_list(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::List(Rc::new(Vec::new())))
}

/// Read one line from the environment's input; null at end of input.
fn prompt(_args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    match env.read_line()? {
        Some(line) => Ok(line.into()),
        None => Ok(Value::Null),
    }
}

/// A uniformly random nonnegative integer.
fn random(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Integer(rand::thread_rng().gen_range(0..=i64::MAX)))
}

//
// Arity 1
//

/// Return the argument without executing it; the only handler that may hand
/// a call or variable back to the program.
fn block(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(args[0].clone())
}

/// Execute the argument, then execute its result.
fn call(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let deferred = execute(&args[0], env)?;
    execute(&deferred, env)
}

/// Terminate the process with the argument as exit status.
fn quit(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let status = execute_to_integer(&args[0], env)?;
    process::exit(status as i32)
}

fn not(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Boolean(!execute_to_boolean(&args[0], env)?))
}

fn negate(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Integer(execute_to_integer(&args[0], env)?.wrapping_neg()))
}

/// The length of a list or string; other kinds are measured through their
/// list conversion, so `LENGTH 123` is 3.
fn length(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = execute(&args[0], env)?;

    match &container {
        Value::List(l) => Ok(Value::Integer(l.len() as i64)),
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        other => Ok(Value::Integer(other.to_list()?.len() as i64)),
    }
}

/// Write the argument's debug representation, then return the argument.
fn dump(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let value = execute(&args[0], env)?;
    write!(env.output(), "{value}")?;
    Ok(value)
}

/// Print the argument's text form followed by a newline; a single trailing
/// `\` is stripped and suppresses the newline instead.
fn output(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let text = execute_to_text(&args[0], env)?;
    let out = env.output();

    match text.strip_suffix('\\') {
        Some(prefix) => {
            write!(out, "{prefix}")?;
            out.flush()?;
        }
        None => writeln!(out, "{text}")?,
    }

    Ok(Value::Null)
}

/// Integer to one-rune string, or string to its first rune's codepoint.
fn ascii(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let value = execute(&args[0], env)?;

    match &value {
        Value::Integer(n) => {
            let scalar = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::domain("ASCII", format!("invalid codepoint {n}")))?;
            Ok(Value::String(scalar.to_string().into()))
        }

        Value::String(s) => {
            let first = s
                .chars()
                .next()
                .ok_or_else(|| Error::domain("ASCII", "an empty string"))?;
            Ok(Value::Integer(i64::from(u32::from(first))))
        }

        other => Err(Error::InvalidType {
            function: "ASCII",
            kind: other.kind(),
        }),
    }
}

/// Wrap the argument in a one-element list.
fn box_(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let value = execute(&args[0], env)?;
    Ok(Value::List(Rc::new(vec![value])))
}

/// The first element of a list, or the first rune of a string.
fn head(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = execute(&args[0], env)?;

    match &container {
        Value::List(l) => l
            .first()
            .cloned()
            .ok_or_else(|| Error::domain("[", "an empty list")),

        Value::String(s) => {
            let first = s
                .chars()
                .next()
                .ok_or_else(|| Error::domain("[", "an empty string"))?;
            Ok(Value::String(first.to_string().into()))
        }

        other => Err(Error::InvalidType {
            function: "[",
            kind: other.kind(),
        }),
    }
}

/// Everything but the first element/rune.
fn tail(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = execute(&args[0], env)?;

    match &container {
        Value::List(l) => {
            if l.is_empty() {
                return Err(Error::domain("]", "an empty list"));
            }
            Ok(Value::List(Rc::new(l[1..].to_vec())))
        }

        Value::String(s) => {
            let mut runes = s.chars();
            if runes.next().is_none() {
                return Err(Error::domain("]", "an empty string"));
            }
            Ok(Value::String(runes.as_str().into()))
        }

        other => Err(Error::InvalidType {
            function: "]",
            kind: other.kind(),
        }),
    }
}

/// Run a shell command and capture its stdout, with one trailing line
/// terminator stripped.
#[cfg(feature = "system")]
fn system(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let command = execute_to_text(&args[0], env)?;
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_owned());

    let captured = process::Command::new(shell)
        .arg("-c")
        .arg(&*command)
        .stdin(process::Stdio::inherit())
        .output()?;

    if !captured.status.success() {
        return Err(Error::Io(format!(
            "command {command:?} exited with {}",
            captured.status
        )));
    }

    let mut text = String::from_utf8_lossy(&captured.stdout).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    if text.ends_with('\r') {
        text.pop();
    }

    Ok(Value::String(text.into()))
}

//
// Arity 2
//

/// Addition, concatenation, or list concatenation, dispatched on the first
/// argument; the second is coerced to match.
fn add(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    match &lhs {
        Value::Integer(l) => Ok(Value::Integer(
            l.wrapping_add(execute_to_integer(&args[1], env)?),
        )),

        Value::String(l) => {
            let rhs = execute_to_text(&args[1], env)?;
            let mut joined = String::with_capacity(l.len() + rhs.len());
            joined.push_str(l);
            joined.push_str(&rhs);
            Ok(Value::String(joined.into()))
        }

        Value::List(l) => {
            let rhs = execute_to_list(&args[1], env)?;
            let mut joined = Vec::with_capacity(l.len() + rhs.len());
            joined.extend_from_slice(l);
            joined.extend_from_slice(&rhs);
            Ok(Value::List(Rc::new(joined)))
        }

        other => Err(Error::InvalidType {
            function: "+",
            kind: other.kind(),
        }),
    }
}

fn subtract(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    match &lhs {
        Value::Integer(l) => Ok(Value::Integer(
            l.wrapping_sub(execute_to_integer(&args[1], env)?),
        )),
        other => Err(Error::InvalidType {
            function: "-",
            kind: other.kind(),
        }),
    }
}

fn replication_amount(kind: &'static str, amount: i64) -> Result<usize, Error> {
    if amount < 0 {
        return Err(Error::NegativeRepeat { kind, amount });
    }
    Ok(amount as usize)
}

/// Multiplication, or string/list replication by the second argument.
fn multiply(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;
    // Every multiply case wants an integer on the right.
    let rhs = execute_to_integer(&args[1], env)?;

    match &lhs {
        Value::Integer(l) => Ok(Value::Integer(l.wrapping_mul(rhs))),

        Value::String(l) => {
            let amount = replication_amount("String", rhs)?;
            Ok(Value::String(l.repeat(amount).into()))
        }

        Value::List(l) => {
            let amount = replication_amount("List", rhs)?;
            let mut repeated = Vec::with_capacity(l.len().saturating_mul(amount));
            for _ in 0..amount {
                repeated.extend_from_slice(l);
            }
            Ok(Value::List(Rc::new(repeated)))
        }

        other => Err(Error::InvalidType {
            function: "*",
            kind: other.kind(),
        }),
    }
}

fn divide(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    match &lhs {
        Value::Integer(l) => {
            let rhs = execute_to_integer(&args[1], env)?;
            if rhs == 0 {
                return Err(Error::DivisionByZero { function: "/" });
            }
            Ok(Value::Integer(l.wrapping_div(rhs)))
        }
        other => Err(Error::InvalidType {
            function: "/",
            kind: other.kind(),
        }),
    }
}

fn remainder(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    match &lhs {
        Value::Integer(l) => {
            let rhs = execute_to_integer(&args[1], env)?;
            if rhs == 0 {
                return Err(Error::DivisionByZero { function: "%" });
            }
            Ok(Value::Integer(l.wrapping_rem(rhs)))
        }
        other => Err(Error::InvalidType {
            function: "%",
            kind: other.kind(),
        }),
    }
}

/// Integer exponentiation, or joining a list with a separator.
fn exponentiate(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    match &lhs {
        Value::Integer(base) => {
            let exponent = execute_to_integer(&args[1], env)?;
            if exponent < 0 {
                return Err(Error::NegativeExponent { exponent });
            }
            // Every result representable in 32 bits is exact through a
            // double-precision pow.
            Ok(Value::Integer((*base as f64).powf(exponent as f64) as i64))
        }

        Value::List(l) => {
            let separator = execute_to_text(&args[1], env)?;
            Ok(Value::String(join(l, &separator)?.into()))
        }

        other => Err(Error::InvalidType {
            function: "^",
            kind: other.kind(),
        }),
    }
}

/// Order two executed values: dispatch on the left kind, coerce the right to
/// it. Lists compare elementwise, then by length.
fn compare(lhs: &Value, rhs: &Value, function: &'static str) -> Result<Ordering, Error> {
    match lhs {
        Value::Integer(l) => Ok(l.cmp(&rhs.to_integer()?)),
        Value::String(l) => Ok((**l).cmp(&rhs.to_text()?)),
        Value::Boolean(l) => Ok(l.cmp(&rhs.to_boolean()?)),

        Value::List(l) => {
            let rhs = rhs.to_list()?;
            for (a, b) in l.iter().zip(rhs.iter()) {
                let ordering = compare(a, b, function)?;
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
            Ok(l.len().cmp(&rhs.len()))
        }

        other => Err(Error::InvalidType {
            function,
            kind: other.kind(),
        }),
    }
}

fn less_than(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;
    let rhs = execute(&args[1], env)?;
    Ok(Value::Boolean(compare(&lhs, &rhs, "<")? == Ordering::Less))
}

fn greater_than(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;
    let rhs = execute(&args[1], env)?;
    Ok(Value::Boolean(compare(&lhs, &rhs, ">")? == Ordering::Greater))
}

/// Structural, kind-exact equality; never coerces.
fn equal_to(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;
    let rhs = execute(&args[1], env)?;
    Ok(Value::Boolean(lhs == rhs))
}

/// Return the executed lhs if falsey, otherwise execute and return the rhs.
fn and(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    if lhs.to_boolean()? {
        execute(&args[1], env)
    } else {
        Ok(lhs)
    }
}

/// Return the executed lhs if truthy, otherwise execute and return the rhs.
fn or(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = execute(&args[0], env)?;

    if lhs.to_boolean()? {
        Ok(lhs)
    } else {
        execute(&args[1], env)
    }
}

/// Execute both arguments in order, returning the second.
fn then(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    execute(&args[0], env)?;
    execute(&args[1], env)
}

/// Assign to a variable, which must appear literally (not be executed).
fn assign(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    match &args[0] {
        Value::Variable(variable) => {
            let value = execute(&args[1], env)?;
            variable.assign(value.clone());
            Ok(value)
        }
        other => Err(Error::InvalidType {
            function: "=",
            kind: other.kind(),
        }),
    }
}

/// Execute the body while the condition holds; always yields null.
fn while_(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    while execute_to_boolean(&args[0], env)? {
        execute(&args[1], env)?;
    }

    Ok(Value::Null)
}

//
// Arity 3
//

fn if_(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    if execute_to_boolean(&args[0], env)? {
        execute(&args[1], env)
    } else {
        execute(&args[2], env)
    }
}

/// Execute and validate the start/length pair of `GET`/`SET`.
fn index_window(
    function: &'static str,
    start: &Value,
    length: &Value,
    env: &mut Environment,
) -> Result<(usize, usize), Error> {
    let start = execute_to_integer(start, env)?;
    if start < 0 {
        return Err(Error::domain(function, format!("negative start {start}")));
    }

    let length = execute_to_integer(length, env)?;
    if length < 0 {
        return Err(Error::domain(function, format!("negative length {length}")));
    }

    Ok((start as usize, length as usize))
}

fn check_window(
    function: &'static str,
    container: &'static str,
    len: usize,
    start: usize,
    length: usize,
) -> Result<(), Error> {
    if start.checked_add(length).is_none_or(|stop| stop > len) {
        return Err(Error::domain(
            function,
            format!("out-of-bounds {container} range {start}+{length} (length {len})"),
        ));
    }
    Ok(())
}

/// The sublist/substring covering `[start, start+length)`. String indices
/// are in runes.
fn get(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = execute(&args[0], env)?;
    let (start, length) = index_window("GET", &args[1], &args[2], env)?;

    match &container {
        Value::String(s) => {
            check_window("GET", "string", s.chars().count(), start, length)?;
            let window: String = s.chars().skip(start).take(length).collect();
            Ok(Value::String(window.into()))
        }

        Value::List(l) => {
            check_window("GET", "list", l.len(), start, length)?;
            Ok(Value::List(Rc::new(l[start..start + length].to_vec())))
        }

        other => Err(Error::InvalidType {
            function: "GET",
            kind: other.kind(),
        }),
    }
}

//
// Arity 4
//

/// A copy of the collection with `[start, start+length)` replaced by the
/// fourth argument, coerced to the collection's kind.
fn set(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = execute(&args[0], env)?;
    let (start, length) = index_window("SET", &args[1], &args[2], env)?;

    match &container {
        Value::String(s) => {
            check_window("SET", "string", s.chars().count(), start, length)?;
            let replacement = execute_to_text(&args[3], env)?;

            let mut spliced = String::with_capacity(s.len() + replacement.len());
            spliced.extend(s.chars().take(start));
            spliced.push_str(&replacement);
            spliced.extend(s.chars().skip(start + length));
            Ok(Value::String(spliced.into()))
        }

        Value::List(l) => {
            check_window("SET", "list", l.len(), start, length)?;
            let replacement = execute_to_list(&args[3], env)?;

            let mut spliced = Vec::with_capacity(l.len() - length + replacement.len());
            spliced.extend_from_slice(&l[..start]);
            spliced.extend_from_slice(&replacement);
            spliced.extend_from_slice(&l[start + length..]);
            Ok(Value::List(Rc::new(spliced)))
        }

        other => Err(Error::InvalidType {
            function: "SET",
            kind: other.kind(),
        }),
    }
}

/// Global registry of all builtin functions, grouped by arity.
///
/// This is the single place a function's identifying character, display
/// name, and arity are tied together; both the parser and the diagnostics
/// go through it.
static FUNCTIONS: LazyLock<Vec<Function>> = LazyLock::new(|| {
    #[cfg_attr(not(feature = "system"), expect(unused_mut))]
    let mut functions = vec![
        // Arity 0
        Function { name: 'T', full_name: "TRUE", arity: 0, handler: true_ },
        Function { name: 'F', full_name: "FALSE", arity: 0, handler: false_ },
        Function { name: 'N', full_name: "NULL", arity: 0, handler: null },
        Function { name: '@', full_name: "@", arity: 0, handler: empty_list },
        Function { name: 'P', full_name: "PROMPT", arity: 0, handler: prompt },
        Function { name: 'R', full_name: "RANDOM", arity: 0, handler: random },
        // Arity 1
        Function { name: 'B', full_name: "BLOCK", arity: 1, handler: block },
        Function { name: 'C', full_name: "CALL", arity: 1, handler: call },
        Function { name: 'Q', full_name: "QUIT", arity: 1, handler: quit },
        Function { name: '!', full_name: "!", arity: 1, handler: not },
        Function { name: 'L', full_name: "LENGTH", arity: 1, handler: length },
        Function { name: 'D', full_name: "DUMP", arity: 1, handler: dump },
        Function { name: 'O', full_name: "OUTPUT", arity: 1, handler: output },
        Function { name: 'A', full_name: "ASCII", arity: 1, handler: ascii },
        Function { name: '~', full_name: "~", arity: 1, handler: negate },
        Function { name: ',', full_name: ",", arity: 1, handler: box_ },
        Function { name: '[', full_name: "[", arity: 1, handler: head },
        Function { name: ']', full_name: "]", arity: 1, handler: tail },
        // Arity 2
        Function { name: '+', full_name: "+", arity: 2, handler: add },
        Function { name: '-', full_name: "-", arity: 2, handler: subtract },
        Function { name: '*', full_name: "*", arity: 2, handler: multiply },
        Function { name: '/', full_name: "/", arity: 2, handler: divide },
        Function { name: '%', full_name: "%", arity: 2, handler: remainder },
        Function { name: '^', full_name: "^", arity: 2, handler: exponentiate },
        Function { name: '<', full_name: "<", arity: 2, handler: less_than },
        Function { name: '>', full_name: ">", arity: 2, handler: greater_than },
        Function { name: '?', full_name: "?", arity: 2, handler: equal_to },
        Function { name: '&', full_name: "&", arity: 2, handler: and },
        Function { name: '|', full_name: "|", arity: 2, handler: or },
        Function { name: ';', full_name: ";", arity: 2, handler: then },
        Function { name: '=', full_name: "=", arity: 2, handler: assign },
        Function { name: 'W', full_name: "WHILE", arity: 2, handler: while_ },
        // Arity 3
        Function { name: 'I', full_name: "IF", arity: 3, handler: if_ },
        Function { name: 'G', full_name: "GET", arity: 3, handler: get },
        // Arity 4
        Function { name: 'S', full_name: "SET", arity: 4, handler: set },
    ];

    #[cfg(feature = "system")]
    functions.push(Function {
        name: '`',
        full_name: "`",
        arity: 1,
        handler: system,
    });

    functions
});

/// Lazy static map from identifying character to Function.
static FUNCTIONS_BY_NAME: LazyLock<HashMap<char, &'static Function>> = LazyLock::new(|| {
    let functions: &'static [Function] = FUNCTIONS.as_slice();
    functions.iter().map(|f| (f.name, f)).collect()
});

/// Find a builtin function by its identifying character.
pub fn find_function(name: char) -> Option<&'static Function> {
    FUNCTIONS_BY_NAME.get(&name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::evaluator::tests::{run, run_with_input};
    use crate::value::{empty_list as nil, val};

    #[test]
    fn test_registry() {
        let output = find_function('O').unwrap();
        assert_eq!(output.full_name, "OUTPUT");
        assert_eq!(output.arity, 1);

        assert_eq!(find_function('S').unwrap().arity, 4);
        assert_eq!(find_function('I').unwrap().arity, 3);
        assert_eq!(find_function(';').unwrap().arity, 2);
        assert_eq!(find_function('@').unwrap().arity, 0);

        // Lowercase and digits start variables, not functions.
        assert!(find_function('x').is_none());
        assert!(find_function('3').is_none());
        assert!(find_function('$').is_none());
    }

    /// Evaluate each source and compare against the expected outcome.
    fn run_table(cases: Vec<(&str, Result<Value, Error>)>) {
        for (i, (source, expected)) in cases.into_iter().enumerate() {
            let (result, _) = run(source);
            assert_eq!(result, expected, "case #{} {source:?}", i + 1);
        }
    }

    fn invalid(function: &'static str, kind: &'static str) -> Result<Value, Error> {
        Err(Error::InvalidType { function, kind })
    }

    #[test]
    fn test_arithmetic() {
        run_table(vec![
            ("+ 1 2", Ok(val(3))),
            ("+ 1 \"2\"", Ok(val(3))),
            ("+ 10 TRUE", Ok(val(11))),
            ("- 5 8", Ok(val(-3))),
            ("- 5 \"3\"", Ok(val(2))),
            ("* 6 7", Ok(val(42))),
            ("* 6 ~7", Ok(val(-42))),
            ("/ 10 3", Ok(val(3))),
            ("/ ~7 2", Ok(val(-3))), // truncates toward zero
            ("% 7 3", Ok(val(1))),
            ("% ~7 2", Ok(val(-1))), // sign follows the dividend
            ("^ 2 10", Ok(val(1024))),
            ("^ 0 0", Ok(val(1))),
            ("^ 10 0", Ok(val(1))),
            ("^ ~2 3", Ok(val(-8))),
            ("~ 12", Ok(val(-12))),
            ("~ \"  -5x\"", Ok(val(5))),
            // Errors
            ("/ 1 0", Err(Error::DivisionByZero { function: "/" })),
            ("% 1 0", Err(Error::DivisionByZero { function: "%" })),
            ("^ 2 ~1", Err(Error::NegativeExponent { exponent: -1 })),
            ("+ TRUE 1", invalid("+", "Boolean")),
            ("+ NULL 1", invalid("+", "Null")),
            ("- \"a\" 1", invalid("-", "String")),
            ("* TRUE 2", invalid("*", "Boolean")),
            ("/ \"8\" 2", invalid("/", "String")),
            ("^ \"2\" 2", invalid("^", "String")),
        ]);
    }

    #[test]
    fn test_string_and_list_operators() {
        run_table(vec![
            ("+ \"x=\" 3", Ok(val("x=3"))),
            ("+ \"ab\" \"cd\"", Ok(val("abcd"))),
            ("* \"ab\" 3", Ok(val("ababab"))),
            ("* \"ab\" 0", Ok(val(""))),
            ("+ ,1 ,2", Ok(val([1, 2]))),
            ("+ @ 123", Ok(val([1, 2, 3]))),
            ("+ @ \"ab\"", Ok(val(["a", "b"]))),
            ("* ,5 3", Ok(val([5, 5, 5]))),
            ("* @ 10", Ok(nil())),
            ("^ + @ \"abc\" \"-\"", Ok(val("a-b-c"))),
            ("^ @ \"-\"", Ok(val(""))),
            (",\"one\"", Ok(val(["one"]))),
            ("[ \"knight\"", Ok(val("k"))),
            ("] \"knight\"", Ok(val("night"))),
            ("[ +@123", Ok(val(1))),
            ("] +@123", Ok(val([2, 3]))),
            (
                "* \"ab\" ~1",
                Err(Error::NegativeRepeat {
                    kind: "String",
                    amount: -1,
                }),
            ),
            (
                "* ,1 ~2",
                Err(Error::NegativeRepeat {
                    kind: "List",
                    amount: -2,
                }),
            ),
            ("[ \"\"", Err(Error::domain("[", "an empty string"))),
            ("[ @", Err(Error::domain("[", "an empty list"))),
            ("] \"\"", Err(Error::domain("]", "an empty string"))),
            ("] @", Err(Error::domain("]", "an empty list"))),
            ("[ 5", invalid("[", "Integer")),
            ("] TRUE", invalid("]", "Boolean")),
        ]);
    }

    #[test]
    fn test_comparisons() {
        run_table(vec![
            ("< 1 2", Ok(val(true))),
            ("< 2 1", Ok(val(false))),
            ("> 2 1", Ok(val(true))),
            ("< ~5 0", Ok(val(true))),
            // The right side coerces to the left's kind.
            ("< 9 \"10\"", Ok(val(true))),
            ("< \"9\" 10", Ok(val(false))), // lexicographic: "9" > "10"
            ("< \"abc\" \"abd\"", Ok(val(true))),
            ("< FALSE TRUE", Ok(val(true))),
            ("> TRUE 0", Ok(val(true))),
            ("< +@12 +@13", Ok(val(true))),
            ("< +@12 +@123", Ok(val(true))), // prefix is smaller
            ("> +@21 +@12", Ok(val(true))),
            ("< NULL 1", invalid("<", "Null")),
            ("> NULL 1", invalid(">", "Null")),
        ]);
    }

    #[test]
    fn test_equality_never_coerces() {
        run_table(vec![
            ("? 1 1", Ok(val(true))),
            ("? 1 2", Ok(val(false))),
            ("? 1 \"1\"", Ok(val(false))),
            ("? 0 FALSE", Ok(val(false))),
            ("? NULL FALSE", Ok(val(false))),
            ("? \"\" NULL", Ok(val(false))),
            ("? \"a\" \"a\"", Ok(val(true))),
            ("? @ @", Ok(val(true))),
            ("? ,1 ,1", Ok(val(true))),
            ("? ,1 ,2", Ok(val(false))),
            ("? +@12 +@12", Ok(val(true))),
        ]);
    }

    #[test]
    fn test_logic_and_control() {
        run_table(vec![
            // & and | return the deciding value itself.
            ("& 0 1", Ok(val(0))),
            ("& 1 2", Ok(val(2))),
            ("| 0 2", Ok(val(2))),
            ("| 1 2", Ok(val(1))),
            ("& \"\" \"x\"", Ok(val(""))),
            ("| \"a\" \"x\"", Ok(val("a"))),
            ("! TRUE", Ok(val(false))),
            ("! \"\"", Ok(val(true))),
            ("! @", Ok(val(true))),
            ("; 1 2", Ok(val(2))),
            ("IF TRUE 1 2", Ok(val(1))),
            ("IF \"\" 1 2", Ok(val(2))),
            ("WHILE FALSE 1", Ok(Value::Null)),
            ("= x + 1 2", Ok(val(3))),
            ("= x = y 5", Ok(val(5))),
            ("& BLOCK + 1 2 0", invalid_conversion("Call", "Boolean")),
            ("| BLOCK x 0", invalid_conversion("Variable", "Boolean")),
            ("= 1 2", invalid("=", "Integer")),
            ("= \"x\" 2", invalid("=", "String")),
        ]);
    }

    fn invalid_conversion(kind: &'static str, target: &'static str) -> Result<Value, Error> {
        Err(Error::NoConversion { kind, target })
    }

    #[test]
    fn test_length() {
        run_table(vec![
            ("LENGTH \"\"", Ok(val(0))),
            ("LENGTH \"hello\"", Ok(val(5))),
            ("LENGTH @", Ok(val(0))),
            ("LENGTH +@123", Ok(val(3))),
            ("LENGTH * ,0 9", Ok(val(9))),
            ("LENGTH * \"a\" 7", Ok(val(7))),
            // Other kinds measure their list conversion.
            ("LENGTH 123", Ok(val(3))),
            ("LENGTH ~123", Ok(val(3))),
            ("LENGTH 0", Ok(val(1))),
            ("LENGTH TRUE", Ok(val(1))),
            ("LENGTH NULL", Ok(val(0))),
        ]);
    }

    #[test]
    fn test_ascii() {
        run_table(vec![
            ("ASCII 65", Ok(val("A"))),
            ("ASCII 10", Ok(val("\n"))),
            ("ASCII \"A\"", Ok(val(65))),
            ("ASCII \"no\"", Ok(val(110))), // first rune only
            ("ASCII TRUE", invalid("ASCII", "Boolean")),
            ("ASCII \"\"", Err(Error::domain("ASCII", "an empty string"))),
            (
                "ASCII ~1",
                Err(Error::domain("ASCII", "invalid codepoint -1")),
            ),
            (
                "ASCII 1114112", // one past the last scalar value
                Err(Error::domain("ASCII", "invalid codepoint 1114112")),
            ),
        ]);
    }

    #[test]
    fn test_get_and_set() {
        run_table(vec![
            ("GET \"hello world\" 6 5", Ok(val("world"))),
            ("GET \"hello\" 0 0", Ok(val(""))),
            ("GET \"hello\" 5 0", Ok(val(""))),
            ("GET +@12345 1 3", Ok(val([2, 3, 4]))),
            ("SET \"hello\" 1 3 \"u\"", Ok(val("huo"))),
            ("SET \"hello\" 0 0 \"say \"", Ok(val("say hello"))),
            ("SET +@123 1 1 @", Ok(val([1, 3]))),
            ("SET +@123 1 1 +@99", Ok(val([1, 9, 9, 3]))),
            // SET coerces its replacement to the collection's kind.
            ("SET \"abcd\" 1 2 9", Ok(val("a9d"))),
            // GET/SET composition: the window written is the window read.
            ("GET SET \"hello\" 1 3 \"uu\" 1 2", Ok(val("uu"))),
            ("GET \"abc\" 1 3", Err(out_of_bounds("GET", "string", 1, 3, 3))),
            ("GET +@12 0 3", Err(out_of_bounds("GET", "list", 0, 3, 2))),
            ("SET \"abc\" 2 2 \"x\"", Err(out_of_bounds("SET", "string", 2, 2, 3))),
            ("GET \"abc\" ~1 1", Err(Error::domain("GET", "negative start -1"))),
            ("GET \"abc\" 0 ~1", Err(Error::domain("GET", "negative length -1"))),
            ("SET \"abc\" ~2 1 \"x\"", Err(Error::domain("SET", "negative start -2"))),
            ("GET 12 0 1", invalid("GET", "Integer")),
            ("SET TRUE 0 1 2", invalid("SET", "Boolean")),
        ]);
    }

    fn out_of_bounds(
        function: &'static str,
        container: &'static str,
        start: usize,
        length: usize,
        len: usize,
    ) -> Error {
        Error::domain(
            function,
            format!("out-of-bounds {container} range {start}+{length} (length {len})"),
        )
    }

    #[test]
    fn test_rune_indexing() {
        // Multi-byte runes count as one unit everywhere.
        run_table(vec![
            ("LENGTH \"héllo\"", Ok(val(5))),
            ("GET \"héllo\" 1 2", Ok(val("él"))),
            ("SET \"héllo\" 0 2 \"ha\"", Ok(val("hallo"))),
            ("[ \"ému\"", Ok(val("é"))),
            ("] \"ému\"", Ok(val("mu"))),
            ("ASCII \"é\"", Ok(val(233))),
            ("ASCII 233", Ok(val("é"))),
        ]);
    }

    #[test]
    fn test_output_and_dump_formats() {
        let cases: Vec<(&str, &str)> = vec![
            ("OUTPUT \"plain\"", "plain\n"),
            ("OUTPUT 42", "42\n"),
            ("OUTPUT TRUE", "true\n"),
            ("OUTPUT NULL", "null\n"),
            ("OUTPUT +@12", "1\n2\n"),
            // A single trailing backslash suppresses the newline.
            ("OUTPUT \"no newline\\\"", "no newline"),
            ("OUTPUT \"\\\"", ""),
            ("DUMP 3", "3"),
            ("DUMP \"hi\"", "\"hi\""),
            ("DUMP NULL", "null"),
            ("DUMP ,,1", "[[1]]"),
            ("DUMP + @ \"a\\b\"", "[\"a\", \"\\\\\", \"b\"]"),
            ("; DUMP 1 DUMP \"x\"", "1\"x\""),
        ];

        for (source, expected) in cases {
            let (result, stdout) = run(source);
            result.unwrap_or_else(|e| panic!("program {source:?} failed: {e}"));
            assert_eq!(stdout, expected, "stdout mismatch for {source:?}");
        }

        // DUMP returns its value.
        let (result, _) = run("+ DUMP 2 3");
        assert_eq!(result.unwrap(), val(5));
    }

    #[test]
    fn test_prompt() {
        let (result, _) = run_with_input("PROMPT", "line one\nline two\n");
        assert_eq!(result.unwrap(), val("line one"));

        let (result, _) = run_with_input("+ PROMPT PROMPT", "a\nb\n");
        assert_eq!(result.unwrap(), val("ab"));

        // Carriage returns before the newline are stripped, once.
        let (result, _) = run_with_input("PROMPT", "dos line\r\n");
        assert_eq!(result.unwrap(), val("dos line"));

        let (result, _) = run_with_input("PROMPT", "");
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[test]
    fn test_random_is_nonnegative() {
        for _ in 0..32 {
            let (result, _) = run("RANDOM");
            match result.unwrap() {
                Value::Integer(n) => assert!(n >= 0),
                other => panic!("expected an integer, got {other:?}"),
            }
        }
    }

    #[cfg(feature = "system")]
    #[test]
    fn test_system_captures_stdout() {
        let (result, _) = run("` \"echo knight\"");
        assert_eq!(result.unwrap(), val("knight"));

        let (result, _) = run("` \"exit 3\"");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
