//! Real zeros of an expression in one variable.
//!
//! Polynomials are solved completely (companion matrix for degree > 2, repeated roots
//! reported once); for the elementary
//! functions the principal zeros of their linear arguments are returned, the same choice a
//! CAS makes when asked to solve `sin(x) = 0` without a domain.
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_polynomial::{real_polynomial_roots, sort_and_dedup, trim_polynomial};
use std::f64::consts::PI;

impl Expr {
    /// Real solutions of `self = 0` for `var`, ascending, duplicates merged.
    ///
    /// An expression that vanishes identically (or never) has no isolated zeros and gives an
    /// empty list. Shapes the solver does not know are an error.
    pub fn real_roots(&self, var: &str) -> Result<Vec<f64>, String> {
        let others: Vec<String> = self
            .all_arguments_are_variables()
            .into_iter()
            .filter(|name| name != var)
            .collect();
        if !others.is_empty() {
            return Err(format!(
                "cannot solve {} = 0 for {}: free symbols {}",
                self,
                var,
                others.join(", ")
            ));
        }
        let mut roots = self.simplify().real_roots_(var)?;
        sort_and_dedup(&mut roots);
        Ok(roots)
    }

    fn real_roots_(&self, var: &str) -> Result<Vec<f64>, String> {
        if !self.contains_variable(var) {
            return Ok(Vec::new());
        }
        if let Some(coeffs) = self.as_univariate_polynomial(var) {
            let coeffs = trim_polynomial(&coeffs);
            if coeffs.len() <= 1 {
                return Ok(Vec::new());
            }
            return real_polynomial_roots(&coeffs);
        }
        match self {
            // a*b = 0 when either factor is
            Expr::Mul(lhs, rhs) => {
                let mut roots = lhs.real_roots_(var)?;
                roots.extend(rhs.real_roots_(var)?);
                Ok(roots)
            }
            Expr::Div(num, den) => {
                let roots = num.real_roots_(var)?;
                Ok(roots
                    .into_iter()
                    .filter(|root| {
                        den.eval_expression(&[var], &[*root])
                            .map(|value| value.is_finite() && value != 0.0)
                            .unwrap_or(false)
                    })
                    .collect())
            }
            Expr::Pow(base, exp) => match exp.as_ref() {
                Expr::Const(n) if *n > 0.0 => base.real_roots_(var),
                Expr::Const(_) => Ok(Vec::new()),
                _ => Err(format!("cannot solve {} = 0", self)),
            },
            Expr::Exp(_) => Ok(Vec::new()),
            // ln(u) = 0 <=> u = 1
            Expr::Ln(arg) => (arg.as_ref().clone() - Expr::Const(1.0)).simplify().real_roots_(var),
            Expr::sin(arg) => linear_preimages(arg, &[0.0, PI], var, self),
            Expr::cos(arg) => linear_preimages(arg, &[PI / 2.0, 3.0 * PI / 2.0], var, self),
            Expr::tg(arg) | Expr::arcsin(arg) | Expr::arctg(arg) => {
                linear_preimages(arg, &[0.0], var, self)
            }
            Expr::ctg(arg) => linear_preimages(arg, &[PI / 2.0], var, self),
            Expr::arccos(arg) => linear_preimages(arg, &[1.0], var, self),
            Expr::arcctg(_) => Ok(Vec::new()),
            _ => Err(format!("cannot solve {} = 0 for {}", self, var)),
        }
    }
}

/// `x` with `a*x + b = value` for each value, when the argument is linear.
fn linear_preimages(arg: &Expr, values: &[f64], var: &str, whole: &Expr) -> Result<Vec<f64>, String> {
    match arg.as_linear(var) {
        Some((a, b)) => Ok(values.iter().map(|value| (value - b) / a).collect()),
        None => Err(format!("cannot solve {} = 0: argument is not linear in {}", whole, var)),
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::parse_expr::parse_expression;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn roots(text: &str) -> Vec<f64> {
        parse_expression(text).unwrap().real_roots("x").unwrap()
    }

    #[test]
    fn test_polynomial_roots() {
        let r = roots("x^2 - 4");
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], -2.0, epsilon = 1e-12);
        assert_relative_eq!(r[1], 2.0, epsilon = 1e-12);
        let r = roots("6*x - 12");
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 2.0);
    }

    #[test]
    fn test_complex_roots_are_dropped() {
        assert!(roots("x^2 + 1").is_empty());
        let r = roots("x^3 - x^2 + x - 1");
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_higher_degree_polynomials() {
        assert!(roots("x^4 + 1").is_empty());
        assert!(roots("12*x^2 + 2").is_empty());
        // x^5 - x = x (x - 1)(x + 1)(x^2 + 1)
        let r = roots("x^5 - x");
        assert_eq!(r.len(), 3);
        assert_relative_eq!(r[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(r[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[2], 1.0, epsilon = 1e-9);
        // double root at 1
        let r = roots("x^3 - 3*x + 2");
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[1], 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_constant_has_no_isolated_roots() {
        assert!(roots("0").is_empty());
        assert!(roots("3").is_empty());
        assert!(roots("x - x").is_empty());
    }

    #[test]
    fn test_products_and_quotients() {
        let r = roots("x*exp(x)");
        assert_eq!(r, vec![0.0]);
        let r = roots("(x - 1)/(x + 2)");
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 1.0);
        // the zero of the numerator is a pole, not a root
        assert!(roots("(x - 1)/(x - 1)^2").is_empty());
    }

    #[test]
    fn test_elementary_functions() {
        let r = roots("sin(x)");
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[1], PI);
        let r = roots("cos(2*x)");
        assert_relative_eq!(r[0], PI / 4.0);
        assert_relative_eq!(r[1], 3.0 * PI / 4.0);
        assert_eq!(roots("ln(x)"), vec![1.0]);
        assert!(roots("exp(x)").is_empty());
        let r = roots("atan(x - 3)");
        assert_relative_eq!(r[0], 3.0);
    }

    #[test]
    fn test_unsupported_shapes_fail() {
        assert!(parse_expression("sin(x) - x/2").unwrap().real_roots("x").is_err());
        assert!(parse_expression("sin(x^2)").unwrap().real_roots("x").is_err());
    }
}
