//! Symbolic indefinite integration.
//!
//! `integrate` simplifies the integrand, dispatches on its shape and simplifies the result.
//! The antiderivative never carries a constant of integration; callers add their own.
//!
//! Supported classes:
//! - polynomials, also with symbolic coefficients such as `C1*x + C2`
//! - elementary functions of a linear argument `a*x + b`
//! - polynomial × `exp`/`sin`/`cos`/`c^u` of a linear argument (tabular integration by parts)
//! - products and integer powers of `sin`/`cos` of linear arguments, also times `exp` of a
//!   linear argument (product-to-sum, then the cyclic by-parts closed form)
//! - integer powers of `tg`/`ctg`, and of `1/sin`/`1/cos` (reduction formulas)
//! - polynomial × `ln`/`arctg`/`arcctg` of a linear argument, and `ln`/`arctg` of a polynomial
//! - rational functions `p/q` (long division, then partial fractions)
//! - substitution `f(u(x)) * u'(x)` and `u'/u`
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_polynomial::{
    MAX_EXPANSION_DEGREE, MonomialKey, MultiPoly, add_coefficients, cluster_roots, degree,
    is_integer,
    multipoly_to_expr, poly_add_dense, poly_derivative, poly_divide, poly_integral,
    poly_multiply, poly_power, poly_shift, polynomial_roots, polynomial_to_expr, to_multipoly,
    trim_polynomial,
};
use nalgebra::{DMatrix, DVector};

/// Imaginary part (relative) under which a grouped root of a denominator counts as real.
const REAL_ROOT_TOLERANCE: f64 = 1e-7;
/// Relative distance under which a factor coefficient is taken as the nearby integer.
const FACTOR_SNAP_TOLERANCE: f64 = 1e-7;

impl Expr {
    /// Main integration method - integrates with respect to a variable
    /// Returns the indefinite integral (without constant of integration)
    pub fn integrate(&self, var: &str) -> Result<Expr, String> {
        let integrand = self.simplify();
        let antiderivative = integrand.integrate_(var)?;
        Ok(antiderivative.simplify())
    }

    fn integrate_(&self, var: &str) -> Result<Expr, String> {
        // ∫ c dx = c*x
        if !self.contains_variable(var) {
            return Ok(self.clone() * Expr::var(var));
        }
        if let Some(poly) = to_multipoly(self) {
            return Ok(integrate_multipoly(&poly, var));
        }
        match self {
            // ∫ (f ± g) dx = ∫ f dx ± ∫ g dx
            Expr::Add(lhs, rhs) => Ok(lhs.integrate_(var)? + rhs.integrate_(var)?),
            Expr::Sub(lhs, rhs) => Ok(lhs.integrate_(var)? - rhs.integrate_(var)?),
            Expr::Mul(_, _) => self.integrate_multiplication(var),
            Expr::Div(num, den) => self.integrate_division(num, den, var),
            Expr::Pow(base, exp) => self.integrate_power(base, exp, var),
            _ => self.integrate_function(var),
        }
    }

    /// Products: constant factors out, then rational, tabular, substitution, distribution.
    fn integrate_multiplication(&self, var: &str) -> Result<Expr, String> {
        let mut factors = Vec::new();
        collect_factors(self, &mut factors);
        let (constant, varying): (Vec<Expr>, Vec<Expr>) = factors
            .into_iter()
            .partition(|factor| !factor.contains_variable(var));
        let coefficient = product_of(constant);
        if let [single] = varying.as_slice() {
            return Ok(coefficient * single.integrate_(var)?);
        }
        let integrand = product_of(varying.clone());

        if let Some((num, den)) = as_rational(&integrand, var) {
            if degree(&den) > 0 {
                return Ok(coefficient * integrate_rational(&num, &den, var)?);
            }
        }
        if let Some(result) = integrate_polynomial_times_function(&varying, var)? {
            return Ok(coefficient * result);
        }
        if let Some(result) = integrate_by_substitution(&varying, var) {
            return Ok(coefficient * result);
        }
        if let Some(result) = integrate_harmonic_product(&varying, var) {
            return Ok(coefficient * result);
        }
        // (a + b) * g = a*g + b*g
        if let Some(position) = varying
            .iter()
            .position(|factor| matches!(factor, Expr::Add(_, _) | Expr::Sub(_, _)))
        {
            let mut rest = varying.clone();
            let sum = rest.remove(position);
            let rest = product_of(rest);
            let distributed = match sum {
                Expr::Add(a, b) => {
                    (*a * rest.clone()).integrate_(var)? + (*b * rest).integrate_(var)?
                }
                Expr::Sub(a, b) => {
                    (*a * rest.clone()).integrate_(var)? - (*b * rest).integrate_(var)?
                }
                _ => return Err(format!("cannot integrate product {}", integrand)),
            };
            return Ok(coefficient * distributed);
        }
        Err(format!("cannot integrate product {}", integrand))
    }

    /// Handle division in integration
    fn integrate_division(&self, num: &Expr, den: &Expr, var: &str) -> Result<Expr, String> {
        // ∫ f(x)/c dx = (1/c) * ∫ f(x) dx
        if !den.contains_variable(var) {
            return Ok(num.integrate_(var)? / den.clone());
        }
        if let Some((p, q)) = as_rational(self, var) {
            return integrate_rational(&p, &q, var);
        }
        // c / f(u)^n
        if !num.contains_variable(var) {
            let (base, n) = match den {
                Expr::Pow(base, exp) => match exp.as_const() {
                    Some(n) if is_integer(n) => (base.as_ref(), n as i32),
                    _ => (den, 0),
                },
                _ => (den, 1),
            };
            if n != 0 {
                if let Some(result) = integrate_trig_power(base, -n, var) {
                    return Ok(num.clone() * result);
                }
            }
        }
        // u'/u and friends: look at num * den^-1 as a product
        let mut factors = Vec::new();
        collect_factors(num, &mut factors);
        factors.push(den.clone().pow(Expr::Const(-1.0)));
        let (constant, varying): (Vec<Expr>, Vec<Expr>) = factors
            .into_iter()
            .partition(|factor| !factor.contains_variable(var));
        if let Some(result) = integrate_by_substitution(&varying, var) {
            return Ok(product_of(constant) * result);
        }
        match num {
            Expr::Add(a, b) => Ok((*a.clone() / den.clone()).integrate_(var)?
                + (*b.clone() / den.clone()).integrate_(var)?),
            Expr::Sub(a, b) => Ok((*a.clone() / den.clone()).integrate_(var)?
                - (*b.clone() / den.clone()).integrate_(var)?),
            _ => Err(format!("cannot integrate quotient ({}) / ({})", num, den)),
        }
    }

    /// Handle power integration
    fn integrate_power(&self, base: &Expr, exp: &Expr, var: &str) -> Result<Expr, String> {
        // ∫ (ax+b)^n dx
        if let (Some((a, _)), Expr::Const(n)) = (base.as_linear(var), exp) {
            if *n == -1.0 {
                return Ok(Expr::Const(1.0 / a) * base.clone().ln());
            }
            let raised = base.clone().pow(Expr::Const(n + 1.0));
            return Ok(Expr::Const(1.0 / (a * (n + 1.0))) * raised);
        }
        // ∫ c^(ax+b) dx = c^(ax+b) / (a ln c)
        if !base.contains_variable(var) {
            if let Some((a, _)) = exp.as_linear(var) {
                if let Expr::Const(c) = base {
                    if *c <= 0.0 || *c == 1.0 {
                        return Err(format!("cannot integrate power with base {}", c));
                    }
                }
                return Ok(self.clone() / (Expr::Const(a) * base.clone().ln()));
            }
        }
        // sin^n, cos^n, exp(u)^n
        if let Some(result) = integrate_harmonic_product(std::slice::from_ref(self), var) {
            return Ok(result);
        }
        // tg^n, ctg^n, 1/sin^n, 1/cos^n
        if let Some(n) = exp.as_const().filter(|n| is_integer(*n)) {
            if let Some(result) = integrate_trig_power(base, n as i32, var) {
                return Ok(result);
            }
        }
        if let Some((p, q)) = as_rational(self, var) {
            return integrate_rational(&p, &q, var);
        }
        Err(format!("cannot integrate power ({})^({})", base, exp))
    }

    /// Elementary functions of a linear argument, by parts for `ln`/`arctg`/`arcctg`
    /// of a polynomial.
    fn integrate_function(&self, var: &str) -> Result<Expr, String> {
        let arg = match self.children().as_slice() {
            [arg] => (*arg).clone(),
            _ => return Err(format!("cannot integrate {}", self)),
        };
        if let Some((a, _)) = arg.as_linear(var) {
            if let Some(antiderivative) = self.outer_antiderivative(&arg) {
                return Ok(Expr::Const(1.0 / a) * antiderivative);
            }
        }
        if let Some(p) = arg.as_univariate_polynomial(var) {
            let x = Expr::var(var);
            // ∫ g(p) dx = x g(p) - ∫ x g'(p) p' dx, where g' is rational in p
            let x_dp = poly_multiply(&[0.0, 1.0], &poly_derivative(&p));
            let one_plus_p2 = poly_add_dense(&[1.0], &poly_multiply(&p, &p), 1.0);
            match self {
                Expr::Ln(_) => {
                    return Ok(x * self.clone() - integrate_rational(&x_dp, &p, var)?);
                }
                Expr::arctg(_) => {
                    return Ok(x * self.clone() - integrate_rational(&x_dp, &one_plus_p2, var)?);
                }
                Expr::arcctg(_) => {
                    return Ok(x * self.clone() + integrate_rational(&x_dp, &one_plus_p2, var)?);
                }
                _ => {}
            }
        }
        if let Some(result) = integrate_by_substitution(std::slice::from_ref(self), var) {
            return Ok(result);
        }
        Err(format!("cannot integrate {}", self))
    }

    /// `F(u)` with `F' = f` for an elementary function node `f(.)`, taken at `u`.
    fn outer_antiderivative(&self, u: &Expr) -> Option<Expr> {
        let u = u.clone();
        let one_minus_u2 = Expr::Const(1.0) - u.clone().pow(Expr::Const(2.0));
        let one_plus_u2 = Expr::Const(1.0) + u.clone().pow(Expr::Const(2.0));
        let antiderivative = match self {
            Expr::Exp(_) => u.exp(),
            // u ln(u) - u
            Expr::Ln(_) => u.clone() * u.clone().ln() - u,
            Expr::sin(_) => -Expr::cos(u.boxed()),
            Expr::cos(_) => Expr::sin(u.boxed()),
            // -ln(cos u)
            Expr::tg(_) => -Expr::cos(u.boxed()).ln(),
            Expr::ctg(_) => Expr::sin(u.boxed()).ln(),
            Expr::arcsin(_) => {
                u.clone() * Expr::arcsin(u.boxed()) + one_minus_u2.pow(Expr::Const(0.5))
            }
            Expr::arccos(_) => {
                u.clone() * Expr::arccos(u.boxed()) - one_minus_u2.pow(Expr::Const(0.5))
            }
            Expr::arctg(_) => {
                u.clone() * Expr::arctg(u.boxed()) - Expr::Const(0.5) * one_plus_u2.ln()
            }
            Expr::arcctg(_) => {
                u.clone() * Expr::arcctg(u.boxed()) + Expr::Const(0.5) * one_plus_u2.ln()
            }
            _ => return None,
        };
        Some(antiderivative)
    }
}

/// ∫ Σ c·m dx term by term, raising the power of `var` in each monomial.
fn integrate_multipoly(poly: &MultiPoly, var: &str) -> Expr {
    let mut result = MultiPoly::new();
    for (key, coeff) in poly {
        let power = key.exponent_of(var);
        let raised = key.mul(&MonomialKey::single(var, 1));
        result.insert(raised, coeff / (power as f64 + 1.0));
    }
    multipoly_to_expr(&result)
}

fn collect_factors(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Mul(lhs, rhs) => {
            collect_factors(lhs, out);
            collect_factors(rhs, out);
        }
        _ => out.push(expr.clone()),
    }
}

fn product_of(factors: Vec<Expr>) -> Expr {
    let mut factors = factors.into_iter();
    match factors.next() {
        None => Expr::Const(1.0),
        Some(first) => factors.fold(first, |acc, factor| acc * factor),
    }
}

/// `(numerator, denominator)` coefficients when `expr` is a rational function of `var`.
fn as_rational(expr: &Expr, var: &str) -> Option<(Vec<f64>, Vec<f64>)> {
    if let Some(p) = expr.as_univariate_polynomial(var) {
        return Some((p, vec![1.0]));
    }
    let rational = match expr {
        Expr::Mul(lhs, rhs) => {
            let (pl, ql) = as_rational(lhs, var)?;
            let (pr, qr) = as_rational(rhs, var)?;
            (poly_multiply(&pl, &pr), poly_multiply(&ql, &qr))
        }
        Expr::Div(lhs, rhs) => {
            let (pl, ql) = as_rational(lhs, var)?;
            let (pr, qr) = as_rational(rhs, var)?;
            (poly_multiply(&pl, &qr), poly_multiply(&ql, &pr))
        }
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) => {
            let sign = if matches!(expr, Expr::Sub(_, _)) { -1.0 } else { 1.0 };
            let (pl, ql) = as_rational(lhs, var)?;
            let (pr, qr) = as_rational(rhs, var)?;
            (
                poly_add_dense(&poly_multiply(&pl, &qr), &poly_multiply(&pr, &ql), sign),
                poly_multiply(&ql, &qr),
            )
        }
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Const(n)
                if is_integer(*n) && *n < 0.0 && -*n <= MAX_EXPANSION_DEGREE as f64 =>
            {
                let (pb, qb) = as_rational(base, var)?;
                let k = (-*n) as u32;
                (poly_power(&qb, k), poly_power(&pb, k))
            }
            _ => return None,
        },
        _ => return None,
    };
    let den = trim_polynomial(&rational.1);
    if den.iter().all(|c| *c == 0.0) {
        return None;
    }
    Some((trim_polynomial(&rational.0), den))
}

/// `var - shift`
fn shifted_variable(var: &str, shift: f64) -> Expr {
    polynomial_to_expr(&[-shift, 1.0], var)
}

fn snap_to_integer(value: f64) -> f64 {
    if (value - value.round()).abs() < 1e-9 {
        value.round()
    } else {
        value
    }
}

/// Grouped multiple roots are only accurate to a few digits less than simple ones.
fn snap_factor_coefficient(value: f64) -> f64 {
    if (value - value.round()).abs() <= FACTOR_SNAP_TOLERANCE * value.abs().max(1.0) {
        value.round()
    } else {
        value
    }
}

/// ∫ p(x)/q(x) dx
fn integrate_rational(num: &[f64], den: &[f64], var: &str) -> Result<Expr, String> {
    let den = trim_polynomial(den);
    let lead = den[den.len() - 1];
    if lead == 0.0 {
        return Err("division by zero polynomial".to_string());
    }
    let (quotient, remainder) = poly_divide(num, &den)?;
    let polynomial_part = polynomial_to_expr(&poly_integral(&quotient), var);
    if degree(&den) == 0 || remainder.iter().all(|c| *c == 0.0) {
        return Ok(polynomial_part);
    }
    let monic: Vec<f64> = den.iter().map(|c| c / lead).collect();
    let remainder: Vec<f64> = remainder.iter().map(|c| c / lead).collect();
    Ok(polynomial_part + integrate_proper_fraction(&remainder, &monic, var)?)
}

/// ∫ r(x)/q(x) dx with q monic and deg r < deg q.
fn integrate_proper_fraction(r: &[f64], q: &[f64], var: &str) -> Result<Expr, String> {
    let n = degree(q);
    if n == 2 && q[1] * q[1] - 4.0 * q[0] < 0.0 {
        let r1 = r.get(1).copied().unwrap_or(0.0);
        return Ok(quadratic_term(q[1], q[0], 1, r1, r[0], var));
    }

    // q = (x - x0)^n: expand r around x0 and integrate powers of (x - x0)
    let center = -q[n - 1] / n as f64;
    let scale = q.iter().fold(1.0_f64, |m, c| m.max(c.abs()));
    if n >= 2 && poly_shift(q, center)[..n].iter().all(|c| c.abs() <= 1e-10 * scale) {
        let root = snap_to_integer(center);
        let t = shifted_variable(var, root);
        let mut result = Expr::Const(0.0);
        for (k, coeff) in poly_shift(r, root).iter().enumerate() {
            if *coeff == 0.0 {
                continue;
            }
            let power = k as f64 - n as f64;
            let term = if power == -1.0 {
                t.clone().ln()
            } else {
                Expr::Const(1.0 / (power + 1.0)) * t.clone().pow(Expr::Const(power + 1.0))
            };
            result = result + Expr::Const(*coeff) * term;
        }
        return Ok(result);
    }

    let (linear, quadratic) = factor_denominator(q, var)?;
    partial_fractions(r, q, &linear, &quadratic, var)
}

/// `(root, multiplicity)` of the factors `x - root`.
type LinearFactors = Vec<(f64, usize)>;
/// `((p, s), multiplicity)` of the irreducible factors `x^2 + p x + s`.
type QuadraticFactors = Vec<((f64, f64), usize)>;

/// Real factorisation of a monic `q`, repeated factors grouped.
fn factor_denominator(q: &[f64], var: &str) -> Result<(LinearFactors, QuadraticFactors), String> {
    let n = degree(q);
    let mut linear = Vec::new();
    let mut quadratic = Vec::new();
    for (root, multiplicity) in cluster_roots(&polynomial_roots(q)?) {
        if root.im.abs() <= REAL_ROOT_TOLERANCE * root.re.abs().max(1.0) {
            linear.push((snap_factor_coefficient(root.re), multiplicity));
        } else if root.im > 0.0 {
            // (x - z)(x - conj z)
            let p = snap_factor_coefficient(-2.0 * root.re);
            let s = snap_factor_coefficient(root.norm_sqr());
            quadratic.push(((p, s), multiplicity));
        }
    }
    let found: usize = linear.iter().map(|(_, m)| m).sum::<usize>()
        + 2 * quadratic.iter().map(|(_, m)| m).sum::<usize>();
    if found != n {
        return Err(format!(
            "cannot factor denominator {} into real linear and quadratic factors",
            polynomial_to_expr(q, var)
        ));
    }
    Ok((linear, quadratic))
}

/// ∫ r/q dx over the factorisation of q: the coefficients of
/// Σ A_k/(x - a)^k + Σ (B_k x + C_k)/(x^2 + p x + s)^k come from one linear system.
fn partial_fractions(
    r: &[f64],
    q: &[f64],
    linear: &[(f64, usize)],
    quadratic: &[((f64, f64), usize)],
    var: &str,
) -> Result<Expr, String> {
    let n = degree(q);
    let linear_factor = |root: f64| vec![-root, 1.0];
    let quadratic_factor = |(p, s): (f64, f64)| vec![s, p, 1.0];
    let factors: Vec<(Vec<f64>, usize)> = linear
        .iter()
        .map(|(root, m)| (linear_factor(*root), *m))
        .chain(quadratic.iter().map(|(pq, m)| (quadratic_factor(*pq), *m)))
        .collect();
    // q with the k-th power of factor `index` taken out
    let cofactor = |index: usize, k: usize| -> Vec<f64> {
        factors
            .iter()
            .enumerate()
            .fold(vec![1.0], |acc, (i, (factor, m))| {
                let power = if i == index { m - k } else { *m };
                poly_multiply(&acc, &poly_power(factor, power as u32))
            })
    };
    // one column per unknown, in the order the terms are rebuilt below
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (index, (_, m)) in factors.iter().enumerate() {
        for k in 1..=*m {
            let base = cofactor(index, k);
            if index >= linear.len() {
                columns.push(poly_multiply(&[0.0, 1.0], &base));
            }
            columns.push(base);
        }
    }
    if columns.len() != n {
        return Err("partial fraction system is not square".to_string());
    }
    let matrix = DMatrix::from_fn(n, n, |row, col| columns[col].get(row).copied().unwrap_or(0.0));
    let rhs = DVector::from_fn(n, |row, _| r.get(row).copied().unwrap_or(0.0));
    let coefficients = matrix
        .lu()
        .solve(&rhs)
        .ok_or_else(|| format!("singular partial fraction system for {}", polynomial_to_expr(q, var)))?;
    let scale = coefficients.amax().max(1.0);
    let clean = |c: f64| if c.abs() <= 1e-12 * scale { 0.0 } else { snap_to_integer(c) };

    let mut result = Expr::Const(0.0);
    let mut next = 0;
    for (root, m) in linear {
        let t = shifted_variable(var, *root);
        for k in 1..=*m {
            let a = clean(coefficients[next]);
            next += 1;
            if a == 0.0 {
                continue;
            }
            let term = if k == 1 {
                t.clone().ln()
            } else {
                Expr::Const(1.0 / (1.0 - k as f64)) * t.clone().pow(Expr::Const(1.0 - k as f64))
            };
            result = result + Expr::Const(a) * term;
        }
    }
    for ((p, s), m) in quadratic {
        for k in 1..=*m {
            let b = clean(coefficients[next]);
            let c = clean(coefficients[next + 1]);
            next += 2;
            result = result + quadratic_term(*p, *s, k, b, c, var);
        }
    }
    Ok(result)
}

/// ∫ (b x + c)/(x^2 + p x + s)^k dx for an irreducible quadratic.
fn quadratic_term(p: f64, s: f64, k: usize, b: f64, c: f64, var: &str) -> Expr {
    let quadratic = polynomial_to_expr(&[s, p, 1.0], var);
    let shift = p / 2.0;
    let w2 = s - shift * shift;
    // b x + c = b (x + p/2) + d
    let d = c - b * shift;
    let mut result = Expr::Const(0.0);
    if b != 0.0 {
        result = if k == 1 {
            Expr::Const(b / 2.0) * quadratic.clone().ln()
        } else {
            Expr::Const(b / (2.0 * (1.0 - k as f64)))
                * quadratic.clone().pow(Expr::Const(1.0 - k as f64))
        };
    }
    if d != 0.0 {
        let t = polynomial_to_expr(&[shift, 1.0], var);
        result = result + Expr::Const(d) * reduced_quadratic_power(&t, &quadratic, w2, k);
    }
    result
}

/// I_k = ∫ dt/(t^2 + w2)^k with I_k = t/(2 w2 (k-1) Q^(k-1)) + (2k-3)/(2 w2 (k-1)) I_(k-1).
fn reduced_quadratic_power(t: &Expr, quadratic: &Expr, w2: f64, k: usize) -> Expr {
    if k == 1 {
        let w = w2.sqrt();
        return Expr::Const(1.0 / w) * Expr::arctg((t.clone() / Expr::Const(w)).boxed());
    }
    let km1 = k as f64 - 1.0;
    let head = Expr::Const(1.0 / (2.0 * w2 * km1))
        * (t.clone() / quadratic.clone().pow(Expr::Const(km1)));
    let tail = Expr::Const((2.0 * k as f64 - 3.0) / (2.0 * w2 * km1))
        * reduced_quadratic_power(t, quadratic, w2, k - 1);
    head + tail
}

/// Polynomial times one transcendental factor of a linear argument.
fn integrate_polynomial_times_function(
    factors: &[Expr],
    var: &str,
) -> Result<Option<Expr>, String> {
    let mut polynomial = vec![1.0];
    let mut others = Vec::new();
    for factor in factors {
        match factor.as_univariate_polynomial(var) {
            Some(p) => polynomial = poly_multiply(&polynomial, &p),
            None => others.push(factor),
        }
    }
    let function = match others.as_slice() {
        [function] => *function,
        _ => return Ok(None),
    };
    if let Some(result) = tabular_integration(&polynomial, function, var) {
        return Ok(Some(result));
    }
    let arg = match function.children().as_slice() {
        [arg] => (*arg).clone(),
        _ => return Ok(None),
    };
    let (a, b) = match arg.as_linear(var) {
        Some(linear) => linear,
        None => return Ok(None),
    };
    // ∫ p g(u) dx = P g(u) - ∫ P g'(u) a dx, P = ∫ p
    let big_p = poly_integral(&polynomial);
    let scaled: Vec<f64> = big_p.iter().map(|c| c * a).collect();
    let one_plus_u2 = vec![1.0 + b * b, 2.0 * a * b, a * a];
    let big_p_expr = polynomial_to_expr(&big_p, var);
    let result = match function {
        Expr::Ln(_) => big_p_expr * function.clone() - integrate_rational(&scaled, &[b, a], var)?,
        Expr::arctg(_) => {
            big_p_expr * function.clone() - integrate_rational(&scaled, &one_plus_u2, var)?
        }
        Expr::arcctg(_) => {
            big_p_expr * function.clone() + integrate_rational(&scaled, &one_plus_u2, var)?
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/// ∫ p(x) g(ax+b) dx = Σ (-1)^(k-1) p^(k-1)(x) G_k(x), G_k the k-th antiderivative of g.
fn tabular_integration(polynomial: &[f64], function: &Expr, var: &str) -> Option<Expr> {
    let u = match function {
        Expr::Exp(arg) | Expr::sin(arg) | Expr::cos(arg) => arg.as_ref(),
        Expr::Pow(base, exp) if !base.contains_variable(var) => exp.as_ref(),
        _ => return None,
    };
    let (a, _) = u.as_linear(var)?;
    let mut derivative = trim_polynomial(polynomial);
    let mut sign = 1.0;
    let mut result = Expr::Const(0.0);
    for k in 1..=degree(&derivative) + 1 {
        let g_k = repeated_antiderivative(function, u, a, k)?;
        result = result + Expr::Const(sign) * polynomial_to_expr(&derivative, var) * g_k;
        derivative = poly_derivative(&derivative);
        sign = -sign;
    }
    Some(result)
}

fn repeated_antiderivative(function: &Expr, u: &Expr, a: f64, k: usize) -> Option<Expr> {
    let scale = Expr::Const(1.0 / a.powi(k as i32));
    let sin = Expr::sin(u.clone().boxed());
    let cos = Expr::cos(u.clone().boxed());
    let g_k = match function {
        Expr::Exp(_) => scale * function.clone(),
        Expr::sin(_) => match k % 4 {
            1 => scale * -cos,
            2 => scale * -sin,
            3 => scale * cos,
            _ => scale * sin,
        },
        Expr::cos(_) => match k % 4 {
            1 => scale * sin,
            2 => scale * -cos,
            3 => scale * -sin,
            _ => scale * cos,
        },
        Expr::Pow(base, _) => {
            let c = base.as_const()?;
            if c <= 0.0 || c == 1.0 {
                return None;
            }
            Expr::Const(1.0 / (a * c.ln()).powi(k as i32)) * function.clone()
        }
        _ => return None,
    };
    Some(g_k)
}

/// Largest power of a trigonometric factor that is expanded or reduced.
const MAX_TRIG_POWER: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Harmonic {
    Sin,
    Cos,
}

/// `coeff * kind(a x + b)`; a constant is `Cos` with `a = b = 0`.
#[derive(Clone, Copy, Debug)]
struct HarmonicTerm {
    coeff: f64,
    kind: Harmonic,
    a: f64,
    b: f64,
}

impl HarmonicTerm {
    fn constant(coeff: f64) -> Self {
        HarmonicTerm { coeff, kind: Harmonic::Cos, a: 0.0, b: 0.0 }
    }

    /// Non-negative frequency; constants folded into `coeff`.
    fn normalized(self) -> Self {
        let mut term = self;
        if term.a < 0.0 || (term.a == 0.0 && term.b < 0.0) {
            term.a = -term.a;
            term.b = -term.b;
            if term.kind == Harmonic::Sin {
                term.coeff = -term.coeff;
            }
        }
        if term.a == 0.0 {
            let value = match term.kind {
                Harmonic::Sin => term.b.sin(),
                Harmonic::Cos => term.b.cos(),
            };
            return HarmonicTerm::constant(term.coeff * value);
        }
        term
    }

    fn same_harmonic(&self, other: &HarmonicTerm) -> bool {
        let close = |u: f64, v: f64| (u - v).abs() <= 1e-12 * u.abs().max(v.abs()).max(1.0);
        self.kind == other.kind && close(self.a, other.a) && close(self.b, other.b)
    }

    /// Product-to-sum: `self * other` as two terms.
    fn times(&self, other: &HarmonicTerm) -> [HarmonicTerm; 2] {
        let half = 0.5 * self.coeff * other.coeff;
        let (sum_a, sum_b) = (self.a + other.a, self.b + other.b);
        let (diff_a, diff_b) = (self.a - other.a, self.b - other.b);
        let term = |coeff: f64, kind: Harmonic, a: f64, b: f64| HarmonicTerm { coeff, kind, a, b };
        match (self.kind, other.kind) {
            // sin A sin B = (cos(A - B) - cos(A + B))/2
            (Harmonic::Sin, Harmonic::Sin) => [
                term(half, Harmonic::Cos, diff_a, diff_b),
                term(-half, Harmonic::Cos, sum_a, sum_b),
            ],
            // cos A cos B = (cos(A - B) + cos(A + B))/2
            (Harmonic::Cos, Harmonic::Cos) => [
                term(half, Harmonic::Cos, diff_a, diff_b),
                term(half, Harmonic::Cos, sum_a, sum_b),
            ],
            // sin A cos B = (sin(A + B) + sin(A - B))/2
            (Harmonic::Sin, Harmonic::Cos) => [
                term(half, Harmonic::Sin, sum_a, sum_b),
                term(half, Harmonic::Sin, diff_a, diff_b),
            ],
            // cos A sin B = (sin(A + B) - sin(A - B))/2
            (Harmonic::Cos, Harmonic::Sin) => [
                term(half, Harmonic::Sin, sum_a, sum_b),
                term(-half, Harmonic::Sin, diff_a, diff_b),
            ],
        }
    }

    fn to_expr(self, var: &str) -> Expr {
        let arg = polynomial_to_expr(&[self.b, self.a], var).boxed();
        match self.kind {
            Harmonic::Sin => Expr::sin(arg),
            Harmonic::Cos => Expr::cos(arg),
        }
    }
}

/// Multiplies a sum of harmonics by one more harmonic and merges equal ones.
fn multiply_harmonics(terms: &[HarmonicTerm], factor: &HarmonicTerm) -> Vec<HarmonicTerm> {
    let mut result: Vec<HarmonicTerm> = Vec::new();
    for term in terms {
        for product in term.times(factor) {
            let product = product.normalized();
            match result.iter_mut().find(|existing| existing.same_harmonic(&product)) {
                Some(existing) => existing.coeff = add_coefficients(existing.coeff, product.coeff),
                None => result.push(product),
            }
        }
    }
    result.retain(|term| term.coeff != 0.0);
    result
}

/// `(a, b)` of a linear argument, `(0, c)` of a constant one.
fn linear_or_constant(u: &Expr, var: &str) -> Option<(f64, f64)> {
    if u.contains_variable(var) {
        u.as_linear(var)
    } else {
        u.simplify().as_const().map(|c| (0.0, c))
    }
}

/// ∫ p(x) exp(αx + β) Π sin/cos(a_i x + b_i)^(n_i) dx: the trigonometric part is turned into
/// a sum of single harmonics, each integrated on its own.
fn integrate_harmonic_product(factors: &[Expr], var: &str) -> Option<Expr> {
    let mut polynomial = vec![1.0];
    let (mut alpha, mut beta) = (0.0, 0.0);
    let mut terms = vec![HarmonicTerm::constant(1.0)];
    let mut transcendental = false;
    for factor in factors {
        if let Some(p) = factor.as_univariate_polynomial(var) {
            polynomial = poly_multiply(&polynomial, &p);
            continue;
        }
        let (base, n) = match factor {
            Expr::Pow(base, exp) => match exp.as_const() {
                Some(n) if is_integer(n) && n >= 1.0 && n <= MAX_TRIG_POWER as f64 => {
                    (base.as_ref(), n as usize)
                }
                _ => (factor, 1),
            },
            _ => (factor, 1),
        };
        match base {
            Expr::Exp(u) => {
                let (a, b) = linear_or_constant(u, var)?;
                alpha += n as f64 * a;
                beta += n as f64 * b;
            }
            Expr::sin(u) | Expr::cos(u) => {
                let (a, b) = linear_or_constant(u, var)?;
                let kind = if matches!(base, Expr::sin(_)) { Harmonic::Sin } else { Harmonic::Cos };
                let harmonic = HarmonicTerm { coeff: 1.0, kind, a, b };
                for _ in 0..n {
                    terms = multiply_harmonics(&terms, &harmonic);
                }
            }
            // c^u = exp(u ln c)
            Expr::Pow(c, u) => {
                let c = c.as_const().filter(|c| *c > 0.0 && *c != 1.0)?;
                let (a, b) = linear_or_constant(u, var)?;
                alpha += a * c.ln();
                beta += b * c.ln();
            }
            _ => return None,
        }
        transcendental = true;
    }
    if !transcendental {
        return None;
    }
    let exponential = Expr::Const(beta.exp());
    let exp_expr = polynomial_to_expr(&[beta, alpha], var).exp();
    let mut result = Expr::Const(0.0);
    for term in terms {
        let piece = if term.a == 0.0 {
            // constant harmonic
            if alpha == 0.0 {
                exponential.clone() * polynomial_to_expr(&poly_integral(&polynomial), var)
            } else {
                tabular_integration(&polynomial, &exp_expr, var)?
            }
        } else if alpha == 0.0 {
            exponential.clone() * tabular_integration(&polynomial, &term.to_expr(var), var)?
        } else if degree(&polynomial) == 0 {
            // ∫ e^(αx+β) sin(ax+b) = e^(αx+β) (α sin - a cos)/(α² + a²), cos likewise
            let sin = HarmonicTerm { kind: Harmonic::Sin, coeff: 1.0, ..term }.to_expr(var);
            let cos = HarmonicTerm { kind: Harmonic::Cos, coeff: 1.0, ..term }.to_expr(var);
            let combination = match term.kind {
                Harmonic::Sin => Expr::Const(alpha) * sin - Expr::Const(term.a) * cos,
                Harmonic::Cos => Expr::Const(alpha) * cos + Expr::Const(term.a) * sin,
            };
            Expr::Const(polynomial[0] / (alpha * alpha + term.a * term.a))
                * exp_expr.clone()
                * combination
        } else {
            return None;
        };
        result = result + Expr::Const(term.coeff) * piece;
    }
    Some(result)
}

/// ∫ f(ax+b)^n dx for `f` in tg, ctg and for negative powers of sin, cos (reduction formulas).
fn integrate_trig_power(base: &Expr, n: i32, var: &str) -> Option<Expr> {
    if n == 0 || n.unsigned_abs() as usize > MAX_TRIG_POWER {
        return None;
    }
    let (u, kind) = match base {
        Expr::sin(u) | Expr::cos(u) | Expr::tg(u) | Expr::ctg(u) => (u.as_ref(), base),
        _ => return None,
    };
    let (a, _) = u.as_linear(var)?;
    let m = n.unsigned_abs() as usize;
    let antiderivative = match (kind, n > 0) {
        (Expr::tg(_), true) | (Expr::ctg(_), false) => tangent_power(u, m),
        (Expr::ctg(_), true) | (Expr::tg(_), false) => cotangent_power(u, m),
        (Expr::cos(_), false) => secant_power(u, m),
        (Expr::sin(_), false) => cosecant_power(u, m),
        _ => return None,
    };
    Some(Expr::Const(1.0 / a) * antiderivative)
}

/// ∫ tg(u)^m du = tg^(m-1)/(m-1) - ∫ tg^(m-2) du
fn tangent_power(u: &Expr, m: usize) -> Expr {
    match m {
        0 => u.clone(),
        1 => -Expr::cos(u.clone().boxed()).ln(),
        _ => {
            let power = Expr::tg(u.clone().boxed()).pow(Expr::Const(m as f64 - 1.0));
            Expr::Const(1.0 / (m as f64 - 1.0)) * power - tangent_power(u, m - 2)
        }
    }
}

/// ∫ ctg(u)^m du = -ctg^(m-1)/(m-1) - ∫ ctg^(m-2) du
fn cotangent_power(u: &Expr, m: usize) -> Expr {
    match m {
        0 => u.clone(),
        1 => Expr::sin(u.clone().boxed()).ln(),
        _ => {
            let power = Expr::ctg(u.clone().boxed()).pow(Expr::Const(m as f64 - 1.0));
            Expr::Const(-1.0 / (m as f64 - 1.0)) * power - cotangent_power(u, m - 2)
        }
    }
}

/// ∫ du/cos(u)^m = sin/((m-1) cos^(m-1)) + (m-2)/(m-1) ∫ du/cos^(m-2)
fn secant_power(u: &Expr, m: usize) -> Expr {
    match m {
        0 => u.clone(),
        // ln(tg(u/2 + π/4))
        1 => Expr::tg(
            (Expr::Const(0.5) * u.clone() + Expr::Const(std::f64::consts::FRAC_PI_4)).boxed(),
        )
        .ln(),
        2 => Expr::tg(u.clone().boxed()),
        _ => {
            let k = m as f64 - 1.0;
            let head = Expr::sin(u.clone().boxed()) / Expr::cos(u.clone().boxed()).pow(Expr::Const(k));
            Expr::Const(1.0 / k) * head + Expr::Const((k - 1.0) / k) * secant_power(u, m - 2)
        }
    }
}

/// ∫ du/sin(u)^m = -cos/((m-1) sin^(m-1)) + (m-2)/(m-1) ∫ du/sin^(m-2)
fn cosecant_power(u: &Expr, m: usize) -> Expr {
    match m {
        0 => u.clone(),
        // ln(tg(u/2))
        1 => Expr::tg((Expr::Const(0.5) * u.clone()).boxed()).ln(),
        2 => -Expr::ctg(u.clone().boxed()),
        _ => {
            let k = m as f64 - 1.0;
            let head = Expr::cos(u.clone().boxed()) / Expr::sin(u.clone().boxed()).pow(Expr::Const(k));
            Expr::Const(-1.0 / k) * head + Expr::Const((k - 1.0) / k) * cosecant_power(u, m - 2)
        }
    }
}

/// Outer antiderivatives `(u, F(u))` a factor offers for the substitution `t = u(x)`.
fn substitution_candidates(factor: &Expr) -> Vec<(Expr, Expr)> {
    let mut candidates = Vec::new();
    match factor {
        Expr::Pow(base, exp) => {
            if let Expr::Const(n) = exp.as_ref() {
                let u = base.as_ref().clone();
                let antiderivative = if *n == -1.0 {
                    u.clone().ln()
                } else {
                    Expr::Const(1.0 / (n + 1.0)) * u.clone().pow(Expr::Const(n + 1.0))
                };
                candidates.push((u, antiderivative));
            }
        }
        Expr::Var(_) | Expr::Const(_) | Expr::Add(_, _) | Expr::Sub(_, _) | Expr::Mul(_, _)
        | Expr::Div(_, _) => {}
        _ => {
            if let [arg] = factor.children().as_slice() {
                if let Some(antiderivative) = factor.outer_antiderivative(arg) {
                    candidates.push(((*arg).clone(), antiderivative));
                }
            }
        }
    }
    // the factor itself as t: ∫ t dt = t^2/2
    candidates.push((
        factor.clone(),
        Expr::Const(0.5) * factor.clone().pow(Expr::Const(2.0)),
    ));
    candidates
}

/// ∫ f(u) · (k u') dx = k F(u) when the remaining factors are a constant multiple of u'.
fn integrate_by_substitution(factors: &[Expr], var: &str) -> Option<Expr> {
    for (i, factor) in factors.iter().enumerate() {
        let rest = product_of(
            factors
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, f)| f.clone())
                .collect(),
        );
        for (u, antiderivative) in substitution_candidates(factor) {
            if !u.contains_variable(var) {
                continue;
            }
            let du = u.diff(var).simplify();
            if du.is_zero() {
                continue;
            }
            let ratio = (rest.clone() / du).simplify();
            if !ratio.contains_variable(var) {
                return Some(ratio * antiderivative);
            }
        }
    }
    None
}

///////////////////////////////////////////////////////////////////////////////////////////
// tests
////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod integration_tests {
    use crate::symbolic::parse_expr::parse_expression;
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    /// Central difference of the antiderivative must give back the integrand.
    fn check_antiderivative(text: &str, points: &[f64]) {
        let integrand = parse_expression(text).unwrap();
        let antiderivative = integrand
            .integrate("x")
            .unwrap_or_else(|e| panic!("{}: {}", text, e));
        let h = 1e-5;
        for &point in points {
            let upper = antiderivative.eval_expression(&["x"], &[point + h]).unwrap();
            let lower = antiderivative.eval_expression(&["x"], &[point - h]).unwrap();
            let numeric = (upper - lower) / (2.0 * h);
            let expected = integrand.eval_expression(&["x"], &[point]).unwrap();
            assert_relative_eq!(numeric, expected, epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_integrate_constant() {
        // ∫ 5 dx = 5x
        let result = Expr::Const(5.0).integrate("x").unwrap();
        assert_eq!(result, Expr::Const(5.0) * x());
    }

    #[test]
    fn test_integrate_polynomial() {
        // ∫ 2x dx = x^2
        let result = parse_expression("2*x").unwrap().integrate("x").unwrap();
        assert_eq!(result, x().pow(Expr::Const(2.0)));
        // ∫ (3x^2 + 2x + 1) dx = x^3 + x^2 + x
        let result = parse_expression("3*x^2 + 2*x + 1")
            .unwrap()
            .integrate("x")
            .unwrap();
        let expected = x().pow(Expr::Const(3.0)) + x().pow(Expr::Const(2.0)) + x();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_integrate_with_symbolic_coefficients() {
        // ∫ (x + C1) dx = x^2/2 + C1*x
        let integrand = x() + Expr::var("C1");
        let result = integrand.integrate("x").unwrap();
        let expected = Expr::Const(0.5) * x().pow(Expr::Const(2.0)) + Expr::var("C1") * x();
        assert_eq!(result, expected);
        // ∫ C1 dx = C1*x
        assert_eq!(
            Expr::var("C1").integrate("x").unwrap(),
            Expr::var("C1") * x()
        );
    }

    #[test]
    fn test_integrate_elementary_functions_of_linear_argument() {
        check_antiderivative("sin(2*x)", &[0.3, 1.1]);
        check_antiderivative("3*cos(x - 1)", &[0.3, 1.1]);
        check_antiderivative("exp(3*x - 1)", &[-0.5, 0.2]);
        check_antiderivative("tan(x)", &[0.3, 1.1]);
        check_antiderivative("cot(2*x)", &[0.3, 0.6]);
        check_antiderivative("ln(x)", &[0.5, 2.0]);
        check_antiderivative("asin(x/2)", &[-0.5, 0.9]);
        check_antiderivative("acos(x)", &[-0.5, 0.4]);
        check_antiderivative("atan(x)", &[-1.5, 2.0]);
        check_antiderivative("acot(3*x + 1)", &[0.5, 2.0]);
    }

    #[test]
    fn test_integrate_powers() {
        check_antiderivative("1/x", &[0.5, 3.0]);
        check_antiderivative("x^-2", &[0.5, 3.0]);
        check_antiderivative("sqrt(x)", &[0.5, 3.0]);
        check_antiderivative("(2*x + 1)^3", &[-1.0, 0.5]);
        check_antiderivative("2^x", &[-1.0, 0.5]);
        check_antiderivative("e^(2*x)", &[-1.0, 0.5]);
    }

    #[test]
    fn test_integration_by_parts() {
        // ∫ x e^x dx = e^x (x - 1)
        let result = parse_expression("x*exp(x)").unwrap().integrate("x").unwrap();
        let value = result.eval_expression(&["x"], &[1.0]).unwrap();
        assert_relative_eq!(value, 0.0, epsilon = 1e-12);
        check_antiderivative("x^2*sin(x)", &[0.3, 2.0]);
        check_antiderivative("(x + 1)*cos(2*x)", &[0.3, 2.0]);
        check_antiderivative("x*ln(x)", &[0.5, 2.0]);
        check_antiderivative("x*atan(x)", &[-1.0, 2.0]);
        check_antiderivative("x^3*2^x", &[-1.0, 1.0]);
        check_antiderivative("ln(x^2 + 1)", &[-1.0, 2.0]);
    }

    #[test]
    fn test_integrate_rational_functions() {
        check_antiderivative("1/(x^2 + 1)", &[-1.0, 2.0]);
        check_antiderivative("(2*x + 3)/(x^2 + 2*x + 5)", &[-1.0, 2.0]);
        check_antiderivative("1/(x^2 - 1)", &[1.5, 3.0]);
        check_antiderivative("x^3/(x + 1)", &[0.0, 2.0]);
        check_antiderivative("1/(x - 1)^2", &[1.5, 3.0]);
        check_antiderivative("(x + 2)/(x - 1)^3", &[1.5, 3.0]);
        check_antiderivative("(2*x + 3)/(x^3 - 7*x + 6)", &[3.0, 4.0]);
    }

    #[test]
    fn test_rational_functions_with_complex_and_repeated_factors() {
        // (x + 1)(x^2 - x + 1)
        check_antiderivative("1/(x^3 + 1)", &[0.5, 2.0]);
        // roots 1, -2, -2
        check_antiderivative("1/((x - 1)*(x + 2)^2)", &[1.5, 3.0]);
        check_antiderivative("1/(x^3 - 3*x + 2)", &[1.5, 3.0]);
        check_antiderivative("1/(x^4 + 1)", &[-1.0, 0.5, 2.0]);
        check_antiderivative("x^2/(x^4 - 1)", &[1.5, 3.0]);
        check_antiderivative("(x^2 + 3)/((x - 2)*(x^2 + 2*x + 5))", &[2.5, 4.0]);
        check_antiderivative("1/(x^2 + 1)^2", &[-1.0, 2.0]);
        check_antiderivative("(3*x + 1)/(x^2 + 4)^3", &[-1.0, 2.0]);
        check_antiderivative("x/((x - 1)^2*(x^2 + 1))", &[1.5, 3.0]);
    }

    #[test]
    fn test_partial_fraction_coefficients() {
        // 1/((x - 1)(x + 2)^2) = (1/9)/(x - 1) - (1/9)/(x + 2) - (1/3)/(x + 2)^2
        let result = parse_expression("1/((x - 1)*(x + 2)^2)")
            .unwrap()
            .integrate("x")
            .unwrap();
        let at = |x: f64| result.eval_expression(&["x"], &[x]).unwrap();
        let expected = |x: f64| ((x - 1.0).ln() - (x + 2.0).ln()) / 9.0 + 1.0 / (3.0 * (x + 2.0));
        assert_relative_eq!(at(3.0) - at(2.0), expected(3.0) - expected(2.0), epsilon = 1e-10);
    }

    #[test]
    fn test_integrate_arctan_form() {
        // ∫ 1/(x^2 + 1) dx = arctg(x)
        let result = parse_expression("1/(x^2 + 1)").unwrap().integrate("x").unwrap();
        assert_relative_eq!(
            result.eval_expression(&["x"], &[1.0]).unwrap(),
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_integrate_trigonometric_powers() {
        check_antiderivative("sin(x)^2", &[0.3, 1.2]);
        check_antiderivative("cos(x)^2", &[0.3, 1.2]);
        check_antiderivative("cos(x)^3", &[0.3, 1.2]);
        check_antiderivative("sin(2*x)^4", &[0.3, 1.2]);
        check_antiderivative("sin(x)^2*cos(x)^2", &[0.3, 1.2]);
        check_antiderivative("x*sin(x)^2", &[0.3, 2.0]);
        check_antiderivative("tan(x)^2", &[0.3, 1.0]);
        check_antiderivative("tan(2*x)^3", &[0.2, 0.6]);
        check_antiderivative("cot(x)^3", &[0.5, 1.2]);
        check_antiderivative("1/cos(x)^2", &[0.3, 1.0]);
        check_antiderivative("2/sin(x)^2", &[0.5, 2.0]);
        check_antiderivative("1/sin(x)", &[0.5, 2.0]);
        check_antiderivative("1/cos(x)", &[-0.5, 1.0]);
        check_antiderivative("cos(x)^-3", &[0.3, 1.0]);
        check_antiderivative("sin(x)^-4", &[0.5, 2.0]);
    }

    #[test]
    fn test_sin_squared_closed_form() {
        // ∫ sin(x)^2 dx = x/2 - sin(2x)/4
        let result = parse_expression("sin(x)^2").unwrap().integrate("x").unwrap();
        for x in [0.0, 0.7, 2.0] {
            let value = result.eval_expression(&["x"], &[x]).unwrap();
            assert_relative_eq!(value, x / 2.0 - (2.0 * x).sin() / 4.0, epsilon = 1e-12);
        }
        // ∫ tg(x)^2 dx = tg(x) - x
        let result = parse_expression("tan(x)^2").unwrap().integrate("x").unwrap();
        let value = result.eval_expression(&["x"], &[0.5]).unwrap();
        assert_relative_eq!(value, 0.5_f64.tan() - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_products_of_harmonics() {
        check_antiderivative("sin(x)*cos(2*x)", &[0.3, 1.2]);
        check_antiderivative("sin(3*x)*sin(x + 1)", &[0.3, 1.2]);
        check_antiderivative("exp(x)*sin(x)", &[0.3, 1.2]);
        check_antiderivative("exp(2*x)*cos(3*x + 1)", &[-0.3, 0.8]);
        check_antiderivative("exp(-x)*sin(x)^2", &[0.3, 1.2]);
        check_antiderivative("2^x*cos(x)", &[0.3, 1.2]);
        check_antiderivative("exp(x)^2", &[-0.5, 0.5]);
        check_antiderivative("x*exp(x)*exp(x)", &[-0.5, 0.5]);
    }

    #[test]
    fn test_integrate_by_substitution() {
        check_antiderivative("2*x*cos(x^2)", &[0.3, 1.2]);
        check_antiderivative("sin(x)*cos(x)", &[0.3, 1.2]);
        check_antiderivative("cos(x)/sin(x)", &[0.3, 1.2]);
        check_antiderivative("x*exp(x^2)", &[0.3, 1.2]);
        check_antiderivative("exp(x)/(exp(x) + 1)", &[0.3, 1.2]);
    }

    #[test]
    fn test_no_closed_form() {
        assert!(parse_expression("exp(x^2)").unwrap().integrate("x").is_err());
        assert!(parse_expression("sin(x)/x").unwrap().integrate("x").is_err());
    }
}
