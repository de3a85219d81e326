//! turns a text expression of one real variable `x` into a symbolic expression
//!
//! Grammar (nom recursive descent, loosest binding first):
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := atom (('^' | '**') unary)?          right associative, binds tighter than '-'
//! atom    := number | function '(' sum ')' | symbol | '(' sum ')'
//! ```
//! Symbols are the bound variable `x` and the named constants `pi`, `e`, `E`.
//! Multiplication is always explicit: `2x` is rejected, `2*x` is accepted.
//!
//!# Example
//! ```rust, ignore
//! use RustedReconstruct::symbolic::parse_expr::parse_expression;
//! let parsed = parse_expression("x^2 + sin(2*x)").unwrap();
//! let value = parsed.eval_expression(&["x"], &[1.0]).unwrap();
//! ```
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, cut, map, map_res, opt, recognize},
    error::{ErrorKind, FromExternalError, ParseError},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded},
};
use std::f64::consts::{E, PI};
use thiserror::Error;

/// Name of the bound variable.
pub const VARIABLE: &str = "x";

/// Functions accepted in expressions, with their aliases.
pub const FUNCTIONS: [&str; 20] = [
    "sin", "cos", "tan", "tg", "cot", "ctg", "asin", "arcsin", "acos", "arccos", "atan", "arctan",
    "arctg", "acot", "arccot", "arcctg", "exp", "ln", "log", "sqrt",
];

/// Syntax error with the byte offset where parsing stopped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{cause} (at position {position})")]
pub struct ExprSyntaxError {
    pub position: usize,
    pub cause: String,
}

/// nom error carrying the unparsed rest of the input and, for errors raised by the grammar
/// itself, a readable message.
#[derive(Debug, Clone, PartialEq)]
struct SyntaxError<'a> {
    remaining: &'a str,
    message: Option<String>,
}

impl<'a> SyntaxError<'a> {
    fn new(remaining: &'a str, message: String) -> Self {
        SyntaxError {
            remaining,
            message: Some(message),
        }
    }

    fn into_report(self, text: &str) -> ExprSyntaxError {
        let position = text.len() - self.remaining.len();
        let cause = match self.message {
            Some(message) => message,
            None if self.remaining.trim().is_empty() => "unexpected end of expression".to_string(),
            None => {
                let snippet: String = self.remaining.chars().take(12).collect();
                format!("unexpected input at '{}'", snippet)
            }
        };
        ExprSyntaxError { position, cause }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        SyntaxError {
            remaining: input,
            message: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // keep the branch that got further
    fn or(self, other: Self) -> Self {
        if self.remaining.len() < other.remaining.len() {
            self
        } else {
            other
        }
    }
}

impl<'a> FromExternalError<&'a str, String> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, e: String) -> Self {
        SyntaxError::new(input, e)
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

/// Strips surrounding whitespace around `inner`.
fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = SyntaxError<'a>>
where
    F: Parser<&'a str, Output = O, Error = SyntaxError<'a>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Decimal literal: `2`, `2.5`, `.5`, `1e-3`.
fn number(input: &str) -> PResult<'_, Expr> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ));
    let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));
    map_res(recognize(pair(mantissa, exponent)), |text: &str| {
        text.parse::<f64>()
            .map(Expr::Const)
            .map_err(|e| format!("invalid number '{}': {}", text, e))
    })
    .parse(input)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn apply_function(name: &str, argument: Expr) -> Option<Expr> {
    let arg = Box::new(argument);
    let expr = match name {
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tan" | "tg" => Expr::tg(arg),
        "cot" | "ctg" => Expr::ctg(arg),
        "asin" | "arcsin" => Expr::arcsin(arg),
        "acos" | "arccos" => Expr::arccos(arg),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg),
        "acot" | "arccot" | "arcctg" => Expr::arcctg(arg),
        "exp" => Expr::Exp(arg),
        "ln" | "log" => Expr::Ln(arg),
        "sqrt" => Expr::Pow(arg, Box::new(Expr::Const(0.5))),
        _ => return None,
    };
    Some(expr)
}

/// A function call `name(arg)` or a bare symbol.
fn call_or_symbol(input: &str) -> PResult<'_, Expr> {
    let (rest, name) = identifier(input)?;
    let (rest, open) = opt(ws(char('('))).parse(rest)?;
    if open.is_some() {
        if !FUNCTIONS.contains(&name) {
            return Err(nom::Err::Failure(SyntaxError::new(
                input,
                format!("unknown function '{}'", name),
            )));
        }
        let (rest, argument) = cut(sum).parse(rest)?;
        let (rest, _) = cut(ws(char(')'))).parse(rest)?;
        return match apply_function(name, argument) {
            Some(expr) => Ok((rest, expr)),
            None => Err(nom::Err::Failure(SyntaxError::new(
                input,
                format!("unknown function '{}'", name),
            ))),
        };
    }
    match name {
        VARIABLE => Ok((rest, Expr::Var(VARIABLE.to_string()))),
        "pi" => Ok((rest, Expr::Const(PI))),
        "e" | "E" => Ok((rest, Expr::Const(E))),
        _ => Err(nom::Err::Failure(SyntaxError::new(
            input,
            format!(
                "unknown symbol '{}', expressions depend on '{}' only",
                name, VARIABLE
            ),
        ))),
    }
}

fn parenthesized(input: &str) -> PResult<'_, Expr> {
    preceded(char('('), cut(delimited(multispace0, sum, ws(char(')'))))).parse(input)
}

fn atom(input: &str) -> PResult<'_, Expr> {
    ws(alt((number, call_or_symbol, parenthesized))).parse(input)
}

fn power(input: &str) -> PResult<'_, Expr> {
    let (rest, base) = atom(input)?;
    let (rest, exponent) =
        opt(preceded(ws(alt((tag("**"), tag("^")))), cut(unary))).parse(rest)?;
    let expr = match exponent {
        Some(exponent) => base.pow(exponent),
        None => base,
    };
    Ok((rest, expr))
}

fn unary(input: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(ws(char('-')), cut(unary)), |expr| -expr),
        preceded(ws(char('+')), cut(unary)),
        power,
    ))
    .parse(input)
}

fn product(input: &str) -> PResult<'_, Expr> {
    let (rest, first) = unary(input)?;
    fold_many0(
        pair(ws(one_of("*/")), cut(unary)),
        move || first.clone(),
        |acc, (op, rhs)| if op == '*' { acc * rhs } else { acc / rhs },
    )
    .parse(rest)
}

fn sum(input: &str) -> PResult<'_, Expr> {
    let (rest, first) = product(input)?;
    fold_many0(
        pair(ws(one_of("+-")), cut(product)),
        move || first.clone(),
        |acc, (op, rhs)| if op == '+' { acc + rhs } else { acc - rhs },
    )
    .parse(rest)
}

/// Parses a full expression; trailing input is an error.
pub fn parse_expression(text: &str) -> Result<Expr, ExprSyntaxError> {
    if text.trim().is_empty() {
        return Err(ExprSyntaxError {
            position: 0,
            cause: "empty expression".to_string(),
        });
    }
    match all_consuming(ws(sum)).parse(text) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e.into_report(text)),
        Err(nom::Err::Incomplete(_)) => Err(ExprSyntaxError {
            position: text.len(),
            cause: "incomplete expression".to_string(),
        }),
    }
}

/// Blank text means "not provided".
pub fn parse_optional_expression(text: &str) -> Result<Option<Expr>, ExprSyntaxError> {
    if text.trim().is_empty() {
        Ok(None)
    } else {
        parse_expression(text).map(Some)
    }
}
