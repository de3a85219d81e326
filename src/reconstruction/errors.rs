use crate::symbolic::parse_expr::ExprSyntaxError;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// The user-facing input a parse error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum InputField {
    #[strum(to_string = "f'(x)")]
    FirstDerivative,
    #[strum(to_string = "f''(x)")]
    SecondDerivative,
    #[strum(to_string = "f(a)=b")]
    FunctionCondition,
    #[strum(to_string = "f'(c)=d")]
    DerivativeCondition,
}

/// Malformed text in one of the primary inputs. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse {field} input '{text}': {cause}")]
pub struct ParseError {
    pub field: InputField,
    pub text: String,
    /// byte offset of the failure, when the grammar could locate it
    pub position: Option<usize>,
    pub cause: String,
}

impl ParseError {
    pub fn new(field: InputField, text: &str, cause: impl Into<String>) -> Self {
        ParseError {
            field,
            text: text.to_string(),
            position: None,
            cause: cause.into(),
        }
    }

    pub fn from_syntax(field: InputField, text: &str, err: ExprSyntaxError) -> Self {
        ParseError {
            field,
            text: text.to_string(),
            position: Some(err.position),
            cause: err.cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("no closed-form antiderivative of {integrand}: {reason}")]
    NoClosedForm { integrand: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("cannot evaluate {expression} numerically, unresolved symbols: {}", .symbols.join(", "))]
    UnresolvedSymbols {
        expression: String,
        symbols: Vec<String>,
    },
    #[error("evaluation failed: {0}")]
    Symbolic(String),
}

/// Every fatal condition of a reconstruction run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("invalid plotting range [{xmin}, {xmax}]: {reason}")]
    InvalidRange { xmin: f64, xmax: f64, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
}
