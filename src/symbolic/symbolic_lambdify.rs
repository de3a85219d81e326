use crate::symbolic::symbolic_engine::Expr;
use nalgebra::DVector;
use std::f64::consts::PI;

/// Compiled form of an [`Expr`]: variables are resolved to argument slots once, so
/// repeated evaluation over a grid does no name lookups.
#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Ctg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
    ArcCtg(Box<Lambda>),
}

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Compiles the expression against the argument order `vars`.
    ///
    /// Fails with the list of every free symbol that is not in `vars`, e.g. integration
    /// constants the initial conditions did not pin down.
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, String> {
        let unresolved: Vec<String> = self
            .all_arguments_are_variables()
            .into_iter()
            .filter(|name| !vars.contains(&name.as_str()))
            .collect();
        if !unresolved.is_empty() {
            return Err(format!(
                "expression {} has unresolved symbols: {}",
                self,
                unresolved.join(", ")
            ));
        }
        Ok(self.compile_(vars))
    }

    fn compile_(&self, vars: &[&str]) -> Lambda {
        let unary = |e: &Expr| Box::new(e.compile_(vars));
        match self {
            // every name was checked by compile(), so the slot exists
            Expr::Var(name) => Lambda::Var(vars.iter().position(|v| *v == name.as_str()).unwrap_or(0)),
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(unary(a.as_ref()), unary(b.as_ref())),
            Expr::Sub(a, b) => Lambda::Sub(unary(a.as_ref()), unary(b.as_ref())),
            Expr::Mul(a, b) => Lambda::Mul(unary(a.as_ref()), unary(b.as_ref())),
            Expr::Div(a, b) => Lambda::Div(unary(a.as_ref()), unary(b.as_ref())),
            Expr::Pow(a, b) => Lambda::Pow(unary(a.as_ref()), unary(b.as_ref())),
            Expr::Exp(e) => Lambda::Exp(unary(e.as_ref())),
            Expr::Ln(e) => Lambda::Ln(unary(e.as_ref())),
            Expr::sin(e) => Lambda::Sin(unary(e.as_ref())),
            Expr::cos(e) => Lambda::Cos(unary(e.as_ref())),
            Expr::tg(e) => Lambda::Tg(unary(e.as_ref())),
            Expr::ctg(e) => Lambda::Ctg(unary(e.as_ref())),
            Expr::arcsin(e) => Lambda::ArcSin(unary(e.as_ref())),
            Expr::arccos(e) => Lambda::ArcCos(unary(e.as_ref())),
            Expr::arctg(e) => Lambda::ArcTg(unary(e.as_ref())),
            Expr::arcctg(e) => Lambda::ArcCtg(unary(e.as_ref())),
        }
    }

    /// Converts a single-variable symbolic expression into an executable Rust closure.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::var("x").pow(Expr::Const(2.0)); // x^2
    /// let func = f.lambdify1D("x").unwrap();
    /// assert_eq!(func(3.0), 9.0);
    /// ```
    pub fn lambdify1D(&self, var: &str) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, String> {
        let compiled = self.compile(&[var])?;
        Ok(Box::new(move |x| compiled.eval(&[x])))
    }

    /// Values of the expression at every grid point, using standard floating point semantics
    /// (points outside the domain give NaN or infinities rather than errors).
    pub fn evaluate_on_grid(&self, var: &str, grid: &DVector<f64>) -> Result<DVector<f64>, String> {
        let compiled = self.compile(&[var])?;
        Ok(grid.map(|x| compiled.eval(&[x])))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::Ctg(e) => 1.0 / e.eval(args).tan(),
            Lambda::ArcSin(e) => e.eval(args).asin(),
            Lambda::ArcCos(e) => e.eval(args).acos(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
            Lambda::ArcCtg(e) => (PI / 2.0) - e.eval(args).atan(),
        }
    }
}
