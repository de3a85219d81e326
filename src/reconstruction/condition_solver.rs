//! Initial conditions: parsing `a,b` pairs, building the equations `f(a) - b = 0` and
//! `f'(c) - d = 0`, solving them jointly for the integration constants and substituting the
//! solution back into the reconstructed functions.
//!
//! After the bound variable is replaced by a number every reconstructed expression is affine in
//! the constants (each integration adds one constant as a plain summand, and the second one can
//! only be multiplied by `x`), so the joint solve is a linear system. Equations that turn out to
//! be nonlinear in a constant are not solved; the constants then stay symbolic. The same holds
//! for a condition placed where the function is not finite.
use crate::reconstruction::errors::{InputField, ParseError};
use crate::reconstruction::reconstructor::ReconstructedFunctions;
use crate::symbolic::symbolic_engine::Expr;
use log::{info, warn};
use nalgebra::DMatrix;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// pivots smaller than this (relative to the largest coefficient) count as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionTarget {
    /// f(a) = b
    Function,
    /// f'(c) = d
    FirstDerivative,
}

impl ConditionTarget {
    pub fn field(&self) -> InputField {
        match self {
            ConditionTarget::Function => InputField::FunctionCondition,
            ConditionTarget::FirstDerivative => InputField::DerivativeCondition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialCondition {
    pub target: ConditionTarget,
    pub point: f64,
    pub value: f64,
}

/// Parses `"a,b"`: exactly two finite real numbers separated by a comma.
pub fn parse_condition(text: &str, target: ConditionTarget) -> Result<InitialCondition, ParseError> {
    let field = target.field();
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(ParseError::new(
            field,
            text,
            format!(
                "expected two comma-separated numbers 'a,b', found {} value(s)",
                parts.len()
            ),
        ));
    }
    let mut numbers = [0.0; 2];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        let number: f64 = part
            .parse()
            .map_err(|_| ParseError::new(field, text, format!("'{}' is not a real number", part)))?;
        if !number.is_finite() {
            return Err(ParseError::new(field, text, format!("'{}' is not finite", part)));
        }
        *slot = number;
    }
    Ok(InitialCondition {
        target,
        point: numbers[0],
        value: numbers[1],
    })
}

/// Blank text means the condition was not supplied.
pub fn parse_optional_condition(
    text: &str,
    target: ConditionTarget,
) -> Result<Option<InitialCondition>, ParseError> {
    if text.trim().is_empty() {
        Ok(None)
    } else {
        parse_condition(text, target).map(Some)
    }
}

/// One equation `expr(point) - value` per condition, simplified.
pub fn build_equations(
    functions: &ReconstructedFunctions,
    conditions: &[InitialCondition],
    var: &str,
) -> Vec<Expr> {
    conditions
        .iter()
        .map(|condition| {
            let expr = match condition.target {
                ConditionTarget::Function => &functions.f_expr,
                ConditionTarget::FirstDerivative => &functions.fprime_expr,
            };
            (expr.set_variable(var, condition.point) - Expr::Const(condition.value)).simplify()
        })
        .collect()
}

/// Resolved values of the integration constants. Empty when the system had no solution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolutionMapping(BTreeMap<String, Expr>);

impl SolutionMapping {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, constant: &str) -> Option<&Expr> {
        self.0.get(constant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Expr)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SolutionMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no solution");
        }
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value.pretty()))
            .collect();
        write!(f, "{}", pairs.join(", "))
    }
}

/// Why the equations could not be turned into a linear system.
#[derive(Debug, Clone, PartialEq)]
enum SystemDefect {
    /// a coefficient still depends on a constant (or on another symbol)
    Nonlinear,
    /// the condition point lies where f or f' is not finite, e.g. ln(x) at 0
    NonFinite { equation: usize, value: f64 },
}

/// Linear system `A c = r` read off the equations.
fn linear_system(equations: &[Expr], constants: &[String]) -> Result<DMatrix<f64>, SystemDefect> {
    let zeros: HashMap<String, f64> = constants.iter().map(|name| (name.clone(), 0.0)).collect();
    let mut augmented = DMatrix::zeros(equations.len(), constants.len() + 1);
    for (i, equation) in equations.iter().enumerate() {
        for (j, constant) in constants.iter().enumerate() {
            let coefficient = equation
                .diff(constant)
                .simplify()
                .eval_constant()
                .map_err(|_| SystemDefect::Nonlinear)?;
            if !coefficient.is_finite() {
                return Err(SystemDefect::NonFinite {
                    equation: i,
                    value: coefficient,
                });
            }
            augmented[(i, j)] = coefficient;
        }
        let free_term = equation
            .set_variable_from_map(&zeros)
            .simplify()
            .eval_constant()
            .map_err(|_| SystemDefect::Nonlinear)?;
        if !free_term.is_finite() {
            return Err(SystemDefect::NonFinite {
                equation: i,
                value: free_term,
            });
        }
        augmented[(i, constants.len())] = -free_term;
    }
    Ok(augmented)
}

/// Gauss-Jordan elimination; returns the reduced matrix and the pivot column of each pivot row,
/// or `None` for an inconsistent system.
fn reduce(mut m: DMatrix<f64>) -> Option<(DMatrix<f64>, Vec<usize>)> {
    let (nrows, ncols) = m.shape();
    let nconstants = ncols - 1;
    let scale = m
        .columns(0, nconstants)
        .iter()
        .fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = PIVOT_TOLERANCE * scale;
    let mut pivots = Vec::new();
    let mut row = 0;
    for col in 0..nconstants {
        if row == nrows {
            break;
        }
        // partial pivoting: largest entry of the column among the remaining rows
        let Some(best) = (row..nrows).max_by(|&a, &b| m[(a, col)].abs().total_cmp(&m[(b, col)].abs()))
        else {
            break;
        };
        if m[(best, col)].abs() <= tolerance {
            continue;
        }
        m.swap_rows(row, best);
        let pivot = m[(row, col)];
        for k in 0..ncols {
            m[(row, k)] /= pivot;
        }
        for other in 0..nrows {
            if other == row {
                continue;
            }
            let factor = m[(other, col)];
            if factor != 0.0 {
                for k in 0..ncols {
                    m[(other, k)] -= factor * m[(row, k)];
                }
            }
        }
        pivots.push(col);
        row += 1;
    }
    // rows without a pivot must read 0 = 0
    let rhs_tolerance = PIVOT_TOLERANCE * scale.max(m.column(nconstants).amax());
    for r in row..nrows {
        if m[(r, nconstants)].abs() > rhs_tolerance {
            return None;
        }
    }
    Some((m, pivots))
}

/// Solves the equations jointly for `constants`.
///
/// Constants are taken as pivots in the order given, so with too few conditions the earlier
/// constants are expressed through the later ones and the later ones stay free.
/// Inconsistent or nonlinear systems, and conditions at points where the function is not
/// finite, give an empty mapping.
pub fn solve_constants(equations: &[Expr], constants: &[String]) -> SolutionMapping {
    if equations.is_empty() || constants.is_empty() {
        return SolutionMapping::default();
    }
    let augmented = match linear_system(equations, constants) {
        Ok(augmented) => augmented,
        Err(SystemDefect::Nonlinear) => {
            warn!(
                "initial conditions are not linear in {}, constants left unresolved",
                constants.join(", ")
            );
            return SolutionMapping::default();
        }
        Err(SystemDefect::NonFinite { equation, value }) => {
            warn!(
                "initial condition #{} evaluates to {} at its point, constants left unresolved",
                equation + 1,
                value
            );
            return SolutionMapping::default();
        }
    };
    let Some((reduced, pivots)) = reduce(augmented) else {
        warn!("initial conditions are inconsistent, constants left unresolved");
        return SolutionMapping::default();
    };
    let nconstants = constants.len();
    let free: Vec<usize> = (0..nconstants).filter(|j| !pivots.contains(j)).collect();
    let mut mapping = BTreeMap::new();
    for (row, &col) in pivots.iter().enumerate() {
        // adding 0.0 turns a -0.0 left by elimination into 0.0
        let mut value = Expr::Const(reduced[(row, nconstants)] + 0.0);
        for &j in &free {
            let coefficient = reduced[(row, j)];
            if coefficient != 0.0 {
                value = value - Expr::Const(coefficient) * Expr::Var(constants[j].clone());
            }
        }
        mapping.insert(constants[col].clone(), value.simplify());
    }
    if !free.is_empty() {
        let names: Vec<&str> = free.iter().map(|&j| constants[j].as_str()).collect();
        warn!(
            "not enough initial conditions, {} stays symbolic",
            names.join(", ")
        );
    }
    let mapping = SolutionMapping(mapping);
    info!("integration constants: {}", mapping);
    mapping
}

/// Substitutes the solution into f and f′ together. An empty mapping leaves both unchanged.
pub fn apply_solution(
    functions: &ReconstructedFunctions,
    mapping: &SolutionMapping,
) -> ReconstructedFunctions {
    if mapping.is_empty() {
        return functions.clone();
    }
    ReconstructedFunctions {
        f_expr: functions.f_expr.substitute_from_map(&mapping.0).simplify(),
        fprime_expr: functions.fprime_expr.substitute_from_map(&mapping.0).simplify(),
        constants: functions.constants.clone(),
    }
}
