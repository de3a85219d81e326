//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation and direct evaluation of [`Expr`] trees.
//!
//! ## Key Methods
//! - `diff(var)` - analytical derivative using sum, product, quotient and chain rules
//! - `eval_expression(vars, values)` - one-shot evaluation without building a closure
//!
//! The reconstruction pipeline uses `diff` to check that an antiderivative really
//! differentiates back to its integrand, and to read off the coefficients of the
//! integration constants in initial-condition equations.

use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// - Power rule: d/dx(u^n) = n*u^(n-1)*u' for exponents free of `var`
    /// - Exponential rule: d/dx(a^u) = a^u*ln(a)*u' for bases free of `var`
    /// - General power: d/dx(f^g) = f^g*(g'*ln(f) + g*f'/f)
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = (f'*g - f*g')/g^2
    /// - Chain rule for every elementary function
    ///
    /// The result is not simplified; call `simplify()` on it when a readable form is needed.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x").simplify(); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Pow(rhs.clone(), Box::new(Expr::Const(2.0)))),
            ),
            Expr::Pow(base, exp) => {
                let base_depends = base.contains_variable(var);
                let exp_depends = exp.contains_variable(var);
                match (base_depends, exp_depends) {
                    (_, false) => Expr::Mul(
                        Box::new(Expr::Mul(
                            exp.clone(),
                            Box::new(Expr::Pow(
                                base.clone(),
                                Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                            )),
                        )),
                        Box::new(base.diff(var)),
                    ),
                    (false, true) => Expr::Mul(
                        Box::new(Expr::Mul(
                            Box::new(self.clone()),
                            Box::new(Expr::Ln(base.clone())),
                        )),
                        Box::new(exp.diff(var)),
                    ),
                    (true, true) => Expr::Mul(
                        Box::new(self.clone()),
                        Box::new(Expr::Add(
                            Box::new(Expr::Mul(
                                Box::new(exp.diff(var)),
                                Box::new(Expr::Ln(base.clone())),
                            )),
                            Box::new(Expr::Div(
                                Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                                base.clone(),
                            )),
                        )),
                    ),
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::cos(expr.clone())),
                    Box::new(Expr::Const(2.0)),
                )),
            ),
            Expr::ctg(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::sin(expr.clone())),
                    Box::new(Expr::Const(2.0)),
                )),
            ),
            Expr::arcsin(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arccos(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
            Expr::arcctg(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
        }
    } // end of diff

    /// DIRECT EXPRESSION EVALUATION

    /// Evaluates symbolic expression directly without creating a closure.
    ///
    /// # Arguments
    /// * `vars` - Variable names in order matching values array
    /// * `values` - Numerical values for each variable
    ///
    /// # Errors
    /// Returns the name of the first symbol that has no value in `vars`.
    ///
    /// # Performance
    /// Use `compile()` for repeated evaluation, `eval_expression()` for one-time use
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> Result<f64, String> {
        let value = match self {
            Expr::Var(name) => {
                let index = vars
                    .iter()
                    .position(|&v| v == name)
                    .ok_or_else(|| format!("symbol '{}' has no value", name))?;
                values[index]
            }
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => {
                lhs.eval_expression(vars, values)? + rhs.eval_expression(vars, values)?
            }
            Expr::Sub(lhs, rhs) => {
                lhs.eval_expression(vars, values)? - rhs.eval_expression(vars, values)?
            }
            Expr::Mul(lhs, rhs) => {
                lhs.eval_expression(vars, values)? * rhs.eval_expression(vars, values)?
            }
            Expr::Div(lhs, rhs) => {
                lhs.eval_expression(vars, values)? / rhs.eval_expression(vars, values)?
            }
            Expr::Pow(base, exp) => {
                let base_fn = base.eval_expression(vars, values)?;
                let exp_fn = exp.eval_expression(vars, values)?;
                base_fn.powf(exp_fn)
            }
            Expr::Exp(expr) => expr.eval_expression(vars, values)?.exp(),
            Expr::Ln(expr) => expr.eval_expression(vars, values)?.ln(),
            Expr::sin(expr) => expr.eval_expression(vars, values)?.sin(),
            Expr::cos(expr) => expr.eval_expression(vars, values)?.cos(),
            Expr::tg(expr) => expr.eval_expression(vars, values)?.tan(),
            Expr::ctg(expr) => 1.0 / expr.eval_expression(vars, values)?.tan(),
            Expr::arcsin(expr) => expr.eval_expression(vars, values)?.asin(),
            Expr::arccos(expr) => expr.eval_expression(vars, values)?.acos(),
            Expr::arctg(expr) => expr.eval_expression(vars, values)?.atan(),
            Expr::arcctg(expr) => PI / 2.0 - expr.eval_expression(vars, values)?.atan(),
        };
        Ok(value)
    } // end of eval_expression

    /// Value of an expression that contains no symbols at all.
    pub fn eval_constant(&self) -> Result<f64, String> {
        self.eval_expression(&[], &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn numeric_derivative(expr: &Expr, at: f64) -> f64 {
        let h = 1e-6;
        let plus = expr.eval_expression(&["x"], &[at + h]).unwrap();
        let minus = expr.eval_expression(&["x"], &[at - h]).unwrap();
        (plus - minus) / (2.0 * h)
    }

    #[test]
    fn test_diff_polynomial() {
        let f = x().pow(Expr::Const(3.0)) + Expr::Const(2.0) * x();
        let df = f.diff("x");
        for &point in &[-1.5, 0.0, 0.7, 2.0] {
            let expected = 3.0 * point * point + 2.0;
            assert_relative_eq!(
                df.eval_expression(&["x"], &[point]).unwrap(),
                expected,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_diff_matches_numeric_for_elementary_functions() {
        let functions = vec![
            Expr::sin(Box::new(Expr::Const(2.0) * x())),
            Expr::cos(x().boxed()),
            Expr::tg(x().boxed()),
            Expr::ctg(x().boxed()),
            Expr::Exp(Box::new(x() * x())),
            Expr::Ln(Box::new(x() + Expr::Const(3.0))),
            Expr::arcsin(Box::new(x() / Expr::Const(2.0))),
            Expr::arccos(Box::new(x() / Expr::Const(2.0))),
            Expr::arctg(x().boxed()),
            Expr::arcctg(x().boxed()),
            x() / (x() + Expr::Const(2.0)),
        ];
        for f in functions {
            let df = f.diff("x");
            for &point in &[0.3, 0.9] {
                let analytic = df.eval_expression(&["x"], &[point]).unwrap();
                assert_relative_eq!(analytic, numeric_derivative(&f, point), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_diff_constant_base_power() {
        // d/dx 2^x = 2^x ln 2
        let f = Expr::Const(2.0).pow(x());
        let df = f.diff("x");
        let value = df.eval_expression(&["x"], &[1.0]).unwrap();
        assert_relative_eq!(value, 2.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_diff_variable_base_and_exponent() {
        // d/dx x^x = x^x (ln x + 1)
        let f = x().pow(x());
        let df = f.diff("x");
        let value = df.eval_expression(&["x"], &[2.0]).unwrap();
        assert_relative_eq!(value, 4.0 * (2.0_f64.ln() + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_diff_treats_constants_of_integration_as_constants() {
        let f = Expr::var("C1") * x() + Expr::var("C2");
        let df = f.diff("x").simplify();
        assert_eq!(df, Expr::var("C1"));
        let dc = f.diff("C1").simplify();
        assert_eq!(dc, x());
    }

    #[test]
    fn test_eval_expression_reports_unknown_symbol() {
        let f = x() + Expr::var("C1");
        let err = f.eval_expression(&["x"], &[1.0]).unwrap_err();
        assert!(err.contains("C1"));
    }
}
