//! # Polynomial Module
//!
//! Polynomial view of symbolic expressions, shared by the simplifier, the integrator
//! and the root finder.
//!
//! Two representations are used:
//! - **Multivariate**: [`MultiPoly`], a map from [`MonomialKey`] to coefficient. It is how the
//!   simplifier brings expressions such as `(x + C1)*x` into canonical expanded form.
//! - **Univariate**: a dense `Vec<f64>` of coefficients in ascending powers, `[c0, c1, c2, ...]`.
//!   Used by rational integration and by `polynomial_roots`.
//!
//! Roots of polynomials above degree two come from the eigenvalues of the companion matrix
//! (nalgebra Schur decomposition with an iteration cap, then a few Newton steps). When the
//! decomposition does not converge, a capped Aberth-Ehrlich iteration takes over.

use crate::symbolic::symbolic_engine::Expr;
use nalgebra::{DMatrix, Schur};
use num_complex::Complex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Largest integer power of a sum that is expanded into monomials.
pub const MAX_EXPANSION_DEGREE: i32 = 16;
/// Relative size under which the result of adding two coefficients counts as cancellation.
const CANCELLATION_TOLERANCE: f64 = 1e-13;
/// Iteration cap of the Schur decomposition of a companion matrix.
const MAX_SCHUR_ITERATIONS: usize = 500;
/// Iteration cap of the Aberth-Ehrlich fallback.
const MAX_ABERTH_ITERATIONS: usize = 500;
/// Relative residual under which an unsettled Aberth estimate still counts as a root.
const BACKWARD_ERROR_TOLERANCE: f64 = 1e-9;
/// Relative distance under which computed roots are one (multiple) root.
pub const ROOT_CLUSTER_TOLERANCE: f64 = 1e-4;

/// Variable part of a polynomial term: variable name -> exponent.
///
/// - `x^2` → `MonomialKey({"x": 2})`
/// - `C1*x` → `MonomialKey({"C1": 1, "x": 1})`
/// - `5` (constant) → `MonomialKey({})`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MonomialKey(pub BTreeMap<String, i32>);

impl MonomialKey {
    pub fn one() -> Self {
        MonomialKey(BTreeMap::new())
    }

    pub fn single(var: &str, exponent: i32) -> Self {
        let mut map = BTreeMap::new();
        if exponent != 0 {
            map.insert(var.to_string(), exponent);
        }
        MonomialKey(map)
    }

    pub fn is_constant(&self) -> bool {
        self.0.is_empty()
    }

    /// Total degree.
    pub fn degree(&self) -> i32 {
        self.0.values().sum()
    }

    pub fn exponent_of(&self, var: &str) -> i32 {
        self.0.get(var).copied().unwrap_or(0)
    }

    pub fn mul(&self, other: &MonomialKey) -> MonomialKey {
        let mut map = self.0.clone();
        for (var, exp) in &other.0 {
            *map.entry(var.clone()).or_insert(0) += exp;
        }
        map.retain(|_, exp| *exp != 0);
        MonomialKey(map)
    }

    /// Product of the variables in name order, `Var` for exponent one, `Pow` otherwise.
    pub fn to_expr(&self) -> Expr {
        let mut factors = self.0.iter().map(|(var, exp)| {
            if *exp == 1 {
                Expr::Var(var.clone())
            } else {
                Expr::Pow(Box::new(Expr::Var(var.clone())), Box::new(Expr::Const(*exp as f64)))
            }
        });
        match factors.next() {
            None => Expr::Const(1.0),
            Some(first) => factors.fold(first, |acc, factor| acc * factor),
        }
    }

    /// Reads a monomial back from an expression built by `to_expr` (or any product of
    /// variables and integer powers of variables).
    pub fn from_expr(expr: &Expr) -> Option<MonomialKey> {
        match expr {
            Expr::Const(c) if *c == 1.0 => Some(MonomialKey::one()),
            Expr::Var(v) => Some(MonomialKey::single(v, 1)),
            Expr::Pow(base, exp) => match (base.as_ref(), exp.as_ref()) {
                (Expr::Var(v), Expr::Const(n)) if is_integer(*n) => {
                    Some(MonomialKey::single(v, *n as i32))
                }
                _ => None,
            },
            Expr::Mul(lhs, rhs) => {
                let lhs = MonomialKey::from_expr(lhs)?;
                let rhs = MonomialKey::from_expr(rhs)?;
                Some(lhs.mul(&rhs))
            }
            _ => None,
        }
    }

    /// Display order of terms in a sum: higher total degree first; ties are broken by
    /// comparing exponents of variables taken in descending name order, so that
    /// `x^2` comes before `C1*x` and `x` before `C2`.
    pub fn display_order(&self, other: &MonomialKey) -> Ordering {
        other
            .degree()
            .cmp(&self.degree())
            .then_with(|| {
                let mut names: Vec<&String> = self.0.keys().chain(other.0.keys()).collect();
                names.sort();
                names.dedup();
                for name in names.into_iter().rev() {
                    let ord = other.exponent_of(name).cmp(&self.exponent_of(name));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            })
    }
}

pub type MultiPoly = BTreeMap<MonomialKey, f64>;

pub fn is_integer(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Adds two coefficients, snapping the result to zero when it is pure rounding noise.
pub fn add_coefficients(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.abs() <= CANCELLATION_TOLERANCE * a.abs().max(b.abs()) {
        0.0
    } else {
        sum
    }
}

fn poly_add_scaled(acc: &mut MultiPoly, other: &MultiPoly, scale: f64) {
    for (key, coeff) in other {
        let entry = acc.entry(key.clone()).or_insert(0.0);
        *entry = add_coefficients(*entry, scale * coeff);
    }
    acc.retain(|_, coeff| *coeff != 0.0);
}

fn poly_mul(a: &MultiPoly, b: &MultiPoly) -> MultiPoly {
    let mut result = MultiPoly::new();
    for (ka, ca) in a {
        for (kb, cb) in b {
            let entry = result.entry(ka.mul(kb)).or_insert(0.0);
            *entry = add_coefficients(*entry, ca * cb);
        }
    }
    result.retain(|_, coeff| *coeff != 0.0);
    result
}

fn constant_poly(c: f64) -> MultiPoly {
    let mut poly = MultiPoly::new();
    if c != 0.0 {
        poly.insert(MonomialKey::one(), c);
    }
    poly
}

/// Multivariate polynomial form of an expression, or `None` when the expression is not a
/// polynomial (non-integer or negative powers, division by a non-constant, functions).
pub fn to_multipoly(expr: &Expr) -> Option<MultiPoly> {
    match expr {
        Expr::Const(c) if c.is_finite() => Some(constant_poly(*c)),
        Expr::Var(v) => {
            let mut poly = MultiPoly::new();
            poly.insert(MonomialKey::single(v, 1), 1.0);
            Some(poly)
        }
        Expr::Add(lhs, rhs) => {
            let mut poly = to_multipoly(lhs)?;
            poly_add_scaled(&mut poly, &to_multipoly(rhs)?, 1.0);
            Some(poly)
        }
        Expr::Sub(lhs, rhs) => {
            let mut poly = to_multipoly(lhs)?;
            poly_add_scaled(&mut poly, &to_multipoly(rhs)?, -1.0);
            Some(poly)
        }
        Expr::Mul(lhs, rhs) => Some(poly_mul(&to_multipoly(lhs)?, &to_multipoly(rhs)?)),
        Expr::Div(lhs, rhs) => match rhs.as_ref() {
            Expr::Const(c) if *c != 0.0 && c.is_finite() => {
                let mut poly = MultiPoly::new();
                poly_add_scaled(&mut poly, &to_multipoly(lhs)?, 1.0 / c);
                Some(poly)
            }
            _ => None,
        },
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Const(n) if is_integer(*n) && *n >= 0.0 && *n <= MAX_EXPANSION_DEGREE as f64 => {
                let base = to_multipoly(base)?;
                let mut result = constant_poly(1.0);
                for _ in 0..(*n as i32) {
                    result = poly_mul(&result, &base);
                }
                Some(result)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Builds `c * monomial` with the coefficient folded in front.
pub fn term_to_expr(coeff: f64, rest: Expr) -> Expr {
    match (coeff, &rest) {
        (_, Expr::Const(c)) if *c == 1.0 => Expr::Const(coeff),
        (c, _) if c == 1.0 => rest,
        _ => Expr::Mul(Box::new(Expr::Const(coeff)), Box::new(rest)),
    }
}

/// Canonical expression of a multivariate polynomial.
pub fn multipoly_to_expr(poly: &MultiPoly) -> Expr {
    let mut terms: Vec<(&MonomialKey, &f64)> =
        poly.iter().filter(|(_, coeff)| **coeff != 0.0).collect();
    terms.sort_by(|a, b| a.0.display_order(b.0));
    let mut exprs = terms
        .into_iter()
        .map(|(key, coeff)| term_to_expr(*coeff, key.to_expr()));
    match exprs.next() {
        None => Expr::Const(0.0),
        Some(first) => exprs.fold(first, |acc, term| acc + term),
    }
}

impl Expr {
    /// Dense coefficients `[c0, c1, ...]` when the expression is a polynomial in `var`
    /// alone (no other symbols).
    pub fn as_univariate_polynomial(&self, var: &str) -> Option<Vec<f64>> {
        let poly = to_multipoly(self)?;
        let mut coeffs: Vec<f64> = Vec::new();
        for (key, coeff) in &poly {
            if key.0.keys().any(|name| name != var) {
                return None;
            }
            let power = key.exponent_of(var) as usize;
            if coeffs.len() <= power {
                coeffs.resize(power + 1, 0.0);
            }
            coeffs[power] += coeff;
        }
        if coeffs.is_empty() {
            coeffs.push(0.0);
        }
        Some(coeffs)
    }

    /// `(a, b)` when the expression equals `a*var + b` with `a != 0`.
    pub fn as_linear(&self, var: &str) -> Option<(f64, f64)> {
        let coeffs = trim_polynomial(&self.as_univariate_polynomial(var)?);
        match coeffs.len() {
            2 => Some((coeffs[1], coeffs[0])),
            _ => None,
        }
    }
}

/// Drops vanishing leading coefficients.
pub fn trim_polynomial(coeffs: &[f64]) -> Vec<f64> {
    let scale = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    let mut trimmed = coeffs.to_vec();
    while trimmed.len() > 1 {
        let last = trimmed[trimmed.len() - 1];
        if last == 0.0 || last.abs() <= 1e-14 * scale {
            trimmed.pop();
        } else {
            break;
        }
    }
    if trimmed.is_empty() {
        trimmed.push(0.0);
    }
    trimmed
}

pub fn degree(coeffs: &[f64]) -> usize {
    trim_polynomial(coeffs).len() - 1
}

/// Expression `c0 + c1*var + ...` in canonical (descending) order.
pub fn polynomial_to_expr(coeffs: &[f64], var: &str) -> Expr {
    let mut poly = MultiPoly::new();
    for (power, coeff) in coeffs.iter().enumerate() {
        if *coeff != 0.0 {
            poly.insert(MonomialKey::single(var, power as i32), *coeff);
        }
    }
    multipoly_to_expr(&poly)
}

/// Horner evaluation.
pub fn poly_eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

pub fn poly_eval_complex(coeffs: &[f64], z: Complex<f64>) -> Complex<f64> {
    coeffs
        .iter()
        .rev()
        .fold(Complex::new(0.0, 0.0), |acc, c| acc * z + Complex::new(*c, 0.0))
}

pub fn poly_derivative(coeffs: &[f64]) -> Vec<f64> {
    if coeffs.len() <= 1 {
        return vec![0.0];
    }
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(power, c)| power as f64 * c)
        .collect()
}

/// Antiderivative with zero constant term.
pub fn poly_integral(coeffs: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0];
    result.extend(
        coeffs
            .iter()
            .enumerate()
            .map(|(power, c)| c / (power as f64 + 1.0)),
    );
    result
}

/// `a + scale * b`
pub fn poly_add_dense(a: &[f64], b: &[f64], scale: f64) -> Vec<f64> {
    let mut result = vec![0.0; a.len().max(b.len())];
    for (i, c) in a.iter().enumerate() {
        result[i] += c;
    }
    for (i, c) in b.iter().enumerate() {
        result[i] = add_coefficients(result[i], scale * c);
    }
    trim_polynomial(&result)
}

pub fn poly_multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0; a.len() + b.len() - 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            result[i + j] += ca * cb;
        }
    }
    trim_polynomial(&result)
}

pub fn poly_power(base: &[f64], exponent: u32) -> Vec<f64> {
    (0..exponent).fold(vec![1.0], |acc, _| poly_multiply(&acc, base))
}

/// Long division `num = quotient * den + remainder`, `deg(remainder) < deg(den)`.
pub fn poly_divide(num: &[f64], den: &[f64]) -> Result<(Vec<f64>, Vec<f64>), String> {
    let den = trim_polynomial(den);
    let lead = den[den.len() - 1];
    if lead == 0.0 {
        return Err("division by the zero polynomial".to_string());
    }
    let mut remainder = trim_polynomial(num);
    if remainder.len() < den.len() {
        return Ok((vec![0.0], remainder));
    }
    let mut quotient = vec![0.0; remainder.len() - den.len() + 1];
    for shift in (0..quotient.len()).rev() {
        let top = remainder[shift + den.len() - 1];
        let factor = top / lead;
        quotient[shift] = factor;
        for (i, d) in den.iter().enumerate() {
            remainder[shift + i] = add_coefficients(remainder[shift + i], -factor * d);
        }
        remainder[shift + den.len() - 1] = 0.0;
    }
    remainder.truncate(den.len() - 1);
    if remainder.is_empty() {
        remainder.push(0.0);
    }
    Ok((quotient, trim_polynomial(&remainder)))
}

/// Coefficients of `p(t + shift)` in powers of `t`.
pub fn poly_shift(coeffs: &[f64], shift: f64) -> Vec<f64> {
    // repeated synthetic division by (t - shift) gives the Taylor coefficients at `shift`
    let mut work = coeffs.to_vec();
    let n = work.len();
    let mut result = vec![0.0; n];
    for k in 0..n {
        let mut acc = 0.0;
        for i in (k..n).rev() {
            acc = acc * shift + work[i];
            work[i] = acc;
        }
        result[k] = work[k];
    }
    result
}

/// All complex roots of a real polynomial given in ascending coefficients, with multiplicity.
///
/// Fails when neither the Schur decomposition of the companion matrix nor the
/// Aberth-Ehrlich iteration converges within their iteration caps.
pub fn polynomial_roots(coeffs: &[f64]) -> Result<Vec<Complex<f64>>, String> {
    let mut coeffs = trim_polynomial(coeffs);
    let mut roots = Vec::new();
    // roots at zero are split off exactly
    while coeffs.len() > 1 && coeffs[0] == 0.0 {
        roots.push(Complex::new(0.0, 0.0));
        coeffs.remove(0);
    }
    match coeffs.len() {
        0 | 1 => {}
        2 => roots.push(Complex::new(-coeffs[0] / coeffs[1], 0.0)),
        3 => {
            let (c, b, a) = (coeffs[0], coeffs[1], coeffs[2]);
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                // numerically stable form
                let q = -0.5 * (b + b.signum() * disc.sqrt());
                let (r1, r2) = if q == 0.0 { (0.0, 0.0) } else { (q / a, c / q) };
                roots.push(Complex::new(r1, 0.0));
                roots.push(Complex::new(r2, 0.0));
            } else {
                let re = -b / (2.0 * a);
                let im = (-disc).sqrt() / (2.0 * a);
                roots.push(Complex::new(re, im));
                roots.push(Complex::new(re, -im));
            }
        }
        _ => match companion_roots(&coeffs) {
            Some(found) => roots.extend(found),
            None => roots.extend(aberth_roots(&coeffs)?),
        },
    }
    Ok(roots)
}

/// Eigenvalues of the companion matrix, `None` when the Schur iteration hits its cap.
fn companion_roots(coeffs: &[f64]) -> Option<Vec<Complex<f64>>> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree];
    let mut companion = DMatrix::<f64>::zeros(degree, degree);
    for i in 1..degree {
        companion[(i, i - 1)] = 1.0;
    }
    for i in 0..degree {
        companion[(i, degree - 1)] = -coeffs[i] / lead;
    }
    let schur = Schur::try_new(companion, f64::EPSILON, MAX_SCHUR_ITERATIONS)?;
    let derivative = poly_derivative(coeffs);
    let roots: Vec<Complex<f64>> = schur
        .complex_eigenvalues()
        .iter()
        .map(|root| polish_root(coeffs, &derivative, *root))
        .collect();
    if roots.iter().all(|root| root.re.is_finite() && root.im.is_finite()) {
        Some(roots)
    } else {
        None
    }
}

/// Simultaneous Aberth-Ehrlich iteration from points on a circle around the origin.
fn aberth_roots(coeffs: &[f64]) -> Result<Vec<Complex<f64>>, String> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree];
    let radius = (0..degree)
        .map(|k| (coeffs[k] / lead).abs().powf(1.0 / (degree - k) as f64))
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);
    let one = Complex::new(1.0, 0.0);
    // rotated so that no start point lies on the real axis
    let mut z: Vec<Complex<f64>> = (0..degree)
        .map(|k| Complex::from_polar(radius, 2.0 * PI * k as f64 / degree as f64 + 0.4))
        .collect();
    let derivative = poly_derivative(coeffs);
    for _ in 0..MAX_ABERTH_ITERATIONS {
        let mut largest_step = 0.0_f64;
        for k in 0..degree {
            let value = poly_eval_complex(coeffs, z[k]);
            if value.norm() == 0.0 {
                continue;
            }
            let ratio = value / poly_eval_complex(&derivative, z[k]);
            let repulsion: Complex<f64> = (0..degree)
                .filter(|&j| j != k)
                .map(|j| one / (z[k] - z[j]))
                .sum();
            let step = ratio / (one - ratio * repulsion);
            if !step.re.is_finite() || !step.im.is_finite() {
                // stationary point of p or two coinciding estimates: nudge and go on
                z[k] += Complex::new(1e-7, 1e-7) * radius;
                largest_step = f64::INFINITY;
                continue;
            }
            z[k] -= step;
            largest_step = largest_step.max(step.norm() / z[k].norm().max(1.0));
        }
        if largest_step <= 4.0 * f64::EPSILON {
            return Ok(z);
        }
    }
    // clusters of multiple roots only settle to rounding level; accept them by backward error
    let settled = z.iter().all(|root| {
        let bound: f64 = coeffs
            .iter()
            .enumerate()
            .map(|(power, c)| c.abs() * root.norm().powi(power as i32))
            .sum();
        poly_eval_complex(coeffs, *root).norm() <= BACKWARD_ERROR_TOLERANCE * bound
    });
    if settled {
        Ok(z)
    } else {
        Err(format!(
            "root finder did not converge for {}",
            polynomial_to_expr(coeffs, "x")
        ))
    }
}

/// A few Newton steps, each kept only when it lowers the residual.
fn polish_root(coeffs: &[f64], derivative: &[f64], root: Complex<f64>) -> Complex<f64> {
    let mut z = root;
    let mut residual = poly_eval_complex(coeffs, z).norm();
    for _ in 0..3 {
        let d = poly_eval_complex(derivative, z);
        if d.norm() == 0.0 || residual == 0.0 {
            break;
        }
        let candidate = z - poly_eval_complex(coeffs, z) / d;
        let candidate_residual = poly_eval_complex(coeffs, candidate).norm();
        if candidate_residual.is_nan() || candidate_residual >= residual {
            break;
        }
        z = candidate;
        residual = candidate_residual;
    }
    z
}

/// Groups roots closer than [`ROOT_CLUSTER_TOLERANCE`] (relative) into one root with a
/// multiplicity; the representative is the mean of the group.
pub fn cluster_roots(roots: &[Complex<f64>]) -> Vec<(Complex<f64>, usize)> {
    // (sum, count)
    let mut groups: Vec<(Complex<f64>, usize)> = Vec::new();
    for root in roots {
        let found = groups.iter_mut().find(|(sum, count)| {
            let mean = *sum / *count as f64;
            (mean - *root).norm() <= ROOT_CLUSTER_TOLERANCE * mean.norm().max(1.0)
        });
        match found {
            Some((sum, count)) => {
                *sum += *root;
                *count += 1;
            }
            None => groups.push((*root, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(sum, count)| (sum / count as f64, count))
        .collect()
}

pub fn is_real_root(root: &Complex<f64>) -> bool {
    root.im.abs() <= 1e-8 * root.re.abs().max(1.0)
}

/// Distinct real roots, ascending.
pub fn real_polynomial_roots(coeffs: &[f64]) -> Result<Vec<f64>, String> {
    let mut real: Vec<f64> = cluster_roots(&polynomial_roots(coeffs)?)
        .iter()
        .filter(|(root, _)| is_real_root(root))
        .map(|(root, _)| root.re)
        .collect();
    sort_and_dedup(&mut real);
    Ok(real)
}

/// Sorts ascending and merges values closer than a relative 1e-9.
pub fn sort_and_dedup(values: &mut Vec<f64>) {
    values.retain(|v| v.is_finite());
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_to_multipoly_expands_products() {
        // (x + 1)*(x - 1) = x^2 - 1
        let expr = (x() + Expr::Const(1.0)) * (x() - Expr::Const(1.0));
        let coeffs = expr.as_univariate_polynomial("x").unwrap();
        assert_eq!(trim_polynomial(&coeffs), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_univariate_rejects_other_symbols() {
        let expr = Expr::var("C1") * x();
        assert!(expr.as_univariate_polynomial("x").is_none());
        assert!(to_multipoly(&expr).is_some());
    }

    #[test]
    fn test_non_polynomials_are_rejected() {
        assert!(to_multipoly(&Expr::sin(x().boxed())).is_none());
        assert!(to_multipoly(&(Expr::Const(1.0) / x())).is_none());
        assert!(to_multipoly(&x().pow(Expr::Const(0.5))).is_none());
    }

    #[test]
    fn test_multipoly_to_expr_orders_terms() {
        // C2 + C1*x + x^2  ->  x^2 + C1*x + C2
        let expr = Expr::var("C2") + Expr::var("C1") * x() + x().pow(Expr::Const(2.0));
        let poly = to_multipoly(&expr).unwrap();
        let rebuilt = multipoly_to_expr(&poly);
        let expected = x().pow(Expr::Const(2.0)) + Expr::var("C1") * x() + Expr::var("C2");
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_as_linear() {
        let expr = Expr::Const(3.0) * x() - Expr::Const(2.0);
        assert_eq!(expr.as_linear("x"), Some((3.0, -2.0)));
        assert_eq!(x().pow(Expr::Const(2.0)).as_linear("x"), None);
        assert_eq!(Expr::Const(4.0).as_linear("x"), None);
    }

    #[test]
    fn test_poly_divide() {
        // (x^3 - 1) / (x - 1) = x^2 + x + 1
        let (q, r) = poly_divide(&[-1.0, 0.0, 0.0, 1.0], &[-1.0, 1.0]).unwrap();
        assert_eq!(q, vec![1.0, 1.0, 1.0]);
        assert_eq!(r, vec![0.0]);
    }

    #[test]
    fn test_dense_arithmetic() {
        // (x + 1)^2 - 2x = x^2 + 1
        let square = poly_power(&[1.0, 1.0], 2);
        assert_eq!(square, vec![1.0, 2.0, 1.0]);
        assert_eq!(poly_add_dense(&square, &[0.0, 2.0], -1.0), vec![1.0, 0.0, 1.0]);
        assert_eq!(poly_multiply(&[-1.0, 1.0], &[1.0, 1.0]), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_poly_shift() {
        // p(x) = x^2, p(t + 1) = t^2 + 2t + 1
        let shifted = poly_shift(&[0.0, 0.0, 1.0], 1.0);
        assert_eq!(shifted, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_quadratic_roots() {
        let roots = real_polynomial_roots(&[-4.0, 0.0, 1.0]).unwrap();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], -2.0, epsilon = 1e-12);
        assert_relative_eq!(roots[1], 2.0, epsilon = 1e-12);
        // x^2 + 1 has no real roots
        assert!(real_polynomial_roots(&[1.0, 0.0, 1.0]).unwrap().is_empty());
    }

    #[test]
    fn test_cubic_roots_by_companion_matrix() {
        // (x - 1)(x - 2)(x + 3) = x^3 - 7x + 6
        let roots = real_polynomial_roots(&[6.0, -7.0, 0.0, 1.0]).unwrap();
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[0], -3.0, epsilon = 1e-9);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(roots[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cubic_with_complex_pair() {
        // (x - 1)(x^2 + 1) = x^3 - x^2 + x - 1
        let roots = real_polynomial_roots(&[-1.0, 1.0, -1.0, 1.0]).unwrap();
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 1.0, epsilon = 1e-9);
    }

    fn assert_all_roots(coeffs: &[f64], count: usize) {
        let roots = polynomial_roots(coeffs).unwrap();
        assert_eq!(roots.len(), count);
        for root in &roots {
            let bound: f64 = coeffs
                .iter()
                .enumerate()
                .map(|(power, c)| c.abs() * root.norm().max(1.0).powi(power as i32))
                .sum();
            assert!(poly_eval_complex(coeffs, *root).norm() <= 1e-8 * bound, "{} is not a root", root);
        }
    }

    #[test]
    fn test_quartics_with_complex_pairs() {
        // x^4 + 1, x^4 + 2: no real roots at all
        assert_all_roots(&[1.0, 0.0, 0.0, 0.0, 1.0], 4);
        assert_all_roots(&[2.0, 0.0, 0.0, 0.0, 1.0], 4);
        assert!(real_polynomial_roots(&[1.0, 0.0, 0.0, 0.0, 1.0]).unwrap().is_empty());
        // x^4 - 1 = (x - 1)(x + 1)(x^2 + 1)
        let roots = real_polynomial_roots(&[-1.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-9);
        // x^6 + x^3 + 1 and x^5 + 1
        assert_all_roots(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0], 6);
        assert_all_roots(&[1.0, 0.0, 0.0, 0.0, 0.0, 1.0], 5);
    }

    #[test]
    fn test_aberth_iteration() {
        // (x^2 + 1)(x^2 + 4)
        let roots = aberth_roots(&[4.0, 0.0, 5.0, 0.0, 1.0]).unwrap();
        let mut moduli: Vec<f64> = roots.iter().map(|root| root.norm()).collect();
        moduli.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(moduli[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(moduli[3], 2.0, epsilon = 1e-10);
        assert!(roots.iter().all(|root| root.re.abs() < 1e-10));
        // (x - 1)^2 (x + 2): the double root settles only to rounding level
        let roots = aberth_roots(&[2.0, -3.0, 0.0, 1.0]).unwrap();
        let clusters = cluster_roots(&roots);
        assert_eq!(clusters.len(), 2);
        let double = clusters.iter().find(|(_, count)| *count == 2).unwrap();
        assert_relative_eq!(double.0.re, 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_repeated_roots_are_grouped() {
        // (x - 1)^2 (x + 2) = x^3 - 3x + 2
        let clusters = cluster_roots(&polynomial_roots(&[2.0, -3.0, 0.0, 1.0]).unwrap());
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|(root, _)| is_real_root(root)));
        assert_eq!(clusters.iter().map(|(_, count)| count).sum::<usize>(), 3);
        let roots = real_polynomial_roots(&[2.0, -3.0, 0.0, 1.0]).unwrap();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], -2.0, epsilon = 1e-9);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_poly_integral_and_derivative() {
        let p = vec![1.0, 2.0, 3.0];
        let integral = poly_integral(&p);
        assert_eq!(integral, vec![0.0, 1.0, 1.0, 1.0]);
        assert_eq!(poly_derivative(&integral), p);
    }
}
