//! Execution of parsed programs: variable cells, the environment, and the
//! `execute` dispatch that drives every builtin.
//!
//! Knight has exactly one mutable entity: the variable cell. Cells are
//! interned by name in the [`Environment`] at parse time and shared by
//! identity, so assigning through any reference to `foo` is visible through
//! every other reference to `foo`, including ones already captured inside a
//! `BLOCK`. The environment also owns the interpreter's reader and writer;
//! `PROMPT`, `OUTPUT`, and `DUMP` go through it, which is what lets tests
//! observe a program's exact stdout.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::Error;
use crate::value::Value;

/// A named, shared, mutable variable cell.
///
/// Cloning a `Variable` clones the reference, not the cell: all clones see
/// the same assignment. A cell starts unset; executing it before the first
/// assignment is a runtime error, and nothing ever unsets it again.
#[derive(Clone)]
pub struct Variable {
    inner: Rc<VariableInner>,
}

struct VariableInner {
    name: String,
    value: RefCell<Option<Value>>,
}

impl Variable {
    fn new(name: &str) -> Self {
        Variable {
            inner: Rc::new(VariableInner {
                name: name.to_owned(),
                value: RefCell::new(None),
            }),
        }
    }

    /// The name this cell was interned under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Overwrite the cell's value. Storing an unexecuted value (a call or
    /// another variable) is allowed; that is how `BLOCK` results are kept
    /// for a later `CALL`.
    pub fn assign(&self, value: Value) {
        *self.inner.value.borrow_mut() = Some(value);
    }

    /// The currently assigned value, or `None` if the cell is still unset.
    pub fn fetch(&self) -> Option<Value> {
        self.inner.value.borrow().clone()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner.value.borrow() {
            Some(value) => write!(f, "Variable({} = {value:?})", self.inner.name),
            None => write!(f, "Variable({}, unset)", self.inner.name),
        }
    }
}

/// The interning table for variable cells, plus the I/O handles the builtin
/// functions read and write through.
///
/// One environment spans one program run (or several, for embedders that
/// reuse it); cells are created lazily on first mention and never collected.
pub struct Environment {
    variables: HashMap<String, Variable>,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Environment {
    /// An environment wired to the process's stdin and stdout.
    pub fn new() -> Self {
        Environment::with_io(std::io::stdin().lock(), std::io::stdout())
    }

    /// An environment reading from and writing to caller-supplied handles.
    pub fn with_io(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Environment {
            variables: HashMap::new(),
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Fetch the variable cell for `name`, creating an unset one on first
    /// mention. Two lookups of the same name always yield the same cell.
    pub fn lookup(&mut self, name: &str) -> Variable {
        self.variables
            .entry(name.to_owned())
            .or_insert_with(|| Variable::new(name))
            .clone()
    }

    /// Read one line for `PROMPT`, or `None` at end of input. The trailing
    /// newline and at most one carriage return before it are stripped.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }

        Ok(Some(line))
    }

    /// The writer `OUTPUT` and `DUMP` print to.
    pub(crate) fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Environment")
            .field("variables", &names)
            .finish_non_exhaustive()
    }
}

/// Execute one value.
///
/// The five literal kinds execute to themselves; a variable executes to its
/// current value (an error if unset); a call invokes its function's handler,
/// which decides which of its own arguments to execute, and when.
pub fn execute(value: &Value, env: &mut Environment) -> Result<Value, Error> {
    match value {
        Value::Variable(variable) => variable
            .fetch()
            .ok_or_else(|| Error::UndefinedVariable(variable.name().to_owned())),
        Value::Call { function, args } => (function.handler)(args, env),
        literal => Ok(literal.clone()),
    }
}

//
// Execute-then-coerce helpers, the shape nearly every builtin wants.
//

pub(crate) fn execute_to_boolean(value: &Value, env: &mut Environment) -> Result<bool, Error> {
    execute(value, env)?.to_boolean()
}

pub(crate) fn execute_to_integer(value: &Value, env: &mut Environment) -> Result<i64, Error> {
    execute(value, env)?.to_integer()
}

pub(crate) fn execute_to_text(value: &Value, env: &mut Environment) -> Result<Rc<str>, Error> {
    execute(value, env)?.to_text()
}

pub(crate) fn execute_to_list(
    value: &Value,
    env: &mut Environment,
) -> Result<Rc<Vec<Value>>, Error> {
    execute(value, env)?.to_list()
}
