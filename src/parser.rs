//! Parsing of Knight source into a value tree.
//!
//! Knight's grammar is designed so the first rune of a token determines the
//! whole production: digits start integers, lowercase starts a variable,
//! quotes start strings, and anything else names a function whose fixed
//! arity says exactly how many expressions to parse next. The parser is
//! therefore a single dispatch over one rune of lookahead, recursing once
//! per argument slot, with no backtracking anywhere.
//!
//! Errors carry the remaining input at the failure point; line numbers are
//! computed once at the boundary by counting newlines in the consumed
//! prefix of the source.

use nom::branch::alt;
use nom::bytes::complete::{take_till, take_while1};
use nom::character::complete::{char, one_of};
use nom::combinator::value;
use nom::multi::many0_count;
use nom::sequence::preceded;
use nom::{IResult, Parser};
use std::rc::Rc;

use crate::builtinops::find_function;
use crate::evaluator::Environment;
use crate::value::Value;
use crate::{Error, SyntaxError, SyntaxErrorKind};

/// A parse failure plus the remaining input where it happened, so the line
/// number can be recovered against the full source.
#[derive(Debug)]
struct ParseFailure<'a> {
    kind: SyntaxErrorKind,
    at: &'a str,
}

impl<'a> ParseFailure<'a> {
    fn into_syntax_error(self, source: &str) -> SyntaxError {
        SyntaxError::new(self.kind, line_number(source, self.at))
    }
}

impl<'a> nom::error::ParseError<&'a str> for ParseFailure<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        // The lexical combinators below only fail when a rune doesn't start
        // any production; the dispatch in parse_value pre-checks them, so
        // this is plumbing for nom rather than a reachable path.
        ParseFailure {
            kind: SyntaxErrorKind::UnknownToken(input.chars().next().unwrap_or('\0')),
            at: input,
        }
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, ParseFailure<'a>>;

/// The 1-based line number of the position where `remaining` starts.
fn line_number(source: &str, remaining: &str) -> usize {
    let offset = source.len().saturating_sub(remaining.len());
    source[..offset].matches('\n').count() + 1
}

/// Parse one expression from `source`, interning variables into `env`.
///
/// Trailing source after the expression is ignored; a source that is only
/// whitespace and comments reports the empty-input error.
pub fn parse_program(source: &str, env: &mut Environment) -> Result<Value, Error> {
    match parse_value(source, env) {
        Ok((_rest, program)) => Ok(program),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => {
            Err(Error::Syntax(failure.into_syntax_error(source)))
        }
        // Complete-input parsers never suspend, but the conversion must total.
        Err(nom::Err::Incomplete(_)) => Err(Error::Syntax(SyntaxError::new(
            SyntaxErrorKind::EmptyInput,
            line_number(source, ""),
        ))),
    }
}

/// Whitespace, plus the runes this implementation deliberately reads as
/// whitespace: `(`, `)`, and `:`.
fn is_soup(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == ':'
}

fn is_variable_start(c: char) -> bool {
    c.is_lowercase() || c == '_'
}

fn is_variable_body(c: char) -> bool {
    is_variable_start(c) || c.is_numeric()
}

fn is_word_function(c: char) -> bool {
    c.is_uppercase() || c == '_'
}

/// Consume everything before the next token: whitespace-likes and `#`
/// comments, in any interleaving.
fn skip_soup(input: &str) -> PResult<'_, ()> {
    let (input, _) = many0_count(alt((
        value((), take_while1(is_soup)),
        value((), preceded(char('#'), take_till(|c| c == '\n'))),
    )))
    .parse(input)?;

    Ok((input, ()))
}

/// Parse the next expression, dispatching on its first rune.
fn parse_value<'a>(input: &'a str, env: &mut Environment) -> PResult<'a, Value> {
    let (input, ()) = skip_soup(input)?;

    let Some(c) = input.chars().next() else {
        // Recoverable: the caller decides whether running out of input is
        // an empty program or a missing argument.
        return Err(nom::Err::Error(ParseFailure {
            kind: SyntaxErrorKind::EmptyInput,
            at: input,
        }));
    };

    if c.is_ascii_digit() {
        parse_integer(input)
    } else if is_variable_start(c) {
        parse_variable(input, env)
    } else if c == '\'' || c == '"' {
        parse_string(input)
    } else {
        parse_call(c, input, env)
    }
}

fn parse_integer(input: &str) -> PResult<'_, Value> {
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit()).parse(input)?;

    // Literals beyond the 64-bit range saturate rather than wrap.
    let n = digits.parse::<i64>().unwrap_or(i64::MAX);
    Ok((input, Value::Integer(n)))
}

/// A variable mention: the maximal `[_a-z0-9]` run, interned by name so
/// every mention of `foo` shares one cell.
fn parse_variable<'a>(input: &'a str, env: &mut Environment) -> PResult<'a, Value> {
    let (input, name) = take_while1(is_variable_body).parse(input)?;
    Ok((input, Value::Variable(env.lookup(name))))
}

/// A string literal: everything up to the matching quote, verbatim. Knight
/// strings have no escape sequences.
fn parse_string(input: &str) -> PResult<'_, Value> {
    let start = input;
    let (input, quote) = one_of("'\"").parse(input)?;
    let (input, contents) = take_till(move |c| c == quote).parse(input)?;

    if input.is_empty() {
        return Err(nom::Err::Failure(ParseFailure {
            kind: SyntaxErrorKind::UnterminatedString(quote),
            at: start,
        }));
    }

    let (input, _) = char(quote).parse(input)?;
    Ok((input, Value::String(contents.into())))
}

/// A function call: the name rune (word functions consume their whole
/// uppercase run), then exactly `arity` argument expressions.
fn parse_call<'a>(c: char, input: &'a str, env: &mut Environment) -> PResult<'a, Value> {
    let start = input;

    let mut input = if is_word_function(c) {
        take_while1(is_word_function).parse(input)?.0
    } else {
        &input[c.len_utf8()..]
    };

    let Some(function) = find_function(c) else {
        return Err(nom::Err::Failure(ParseFailure {
            kind: SyntaxErrorKind::UnknownToken(c),
            at: start,
        }));
    };

    let mut args = Vec::with_capacity(function.arity);
    for index in 1..=function.arity {
        match parse_value(input, env) {
            Ok((rest, argument)) => {
                input = rest;
                args.push(argument);
            }

            // Running out of input inside an argument slot names the
            // function that wanted the argument, at the call's own line.
            Err(nom::Err::Error(failure)) if failure.kind == SyntaxErrorKind::EmptyInput => {
                return Err(nom::Err::Failure(ParseFailure {
                    kind: SyntaxErrorKind::MissingArgument {
                        index,
                        function: function.full_name,
                    },
                    at: start,
                }));
            }

            Err(other) => return Err(other),
        }
    }

    Ok((
        input,
        Value::Call {
            function,
            args: Rc::new(args),
        },
    ))
}
