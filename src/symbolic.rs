#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```rust, ignore
/// use RustedReconstruct::symbolic::parse_expr::parse_expression;
/// let input = "x^2 + sin(2*x)";
/// let parsed_expression = parse_expression(input).unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let value = parsed_expression.eval_expression(&["x"], &[1.0]).unwrap();
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the expression tree, substitution of numbers and expressions for symbols, symbol queries
pub mod symbolic_engine;
/// analytical derivatives and direct numerical evaluation
///# Example
/// ```rust, ignore
/// use RustedReconstruct::symbolic::parse_expr::parse_expression;
/// let f = parse_expression("x^3 + exp(2*x)").unwrap();
/// let df_dx = f.diff("x").simplify();
/// println!("df_dx = {}", df_dx);
/// ```
pub mod symbolic_engine_derivatives;
/// symbolic indefinite integration
///# Example
/// ```rust, ignore
/// use RustedReconstruct::symbolic::parse_expr::parse_expression;
/// let integrand = parse_expression("x*exp(x)").unwrap();
/// let antiderivative = integrand.integrate("x").unwrap();
/// println!("{}", antiderivative.pretty());
/// ```
pub mod symbolic_integration;
/// compiles symbolic expressions into numerically callable functions
///# Example
/// ```rust, ignore
/// use RustedReconstruct::symbolic::parse_expr::parse_expression;
/// use RustedReconstruct::symbolic::utils::linspace;
/// let f = parse_expression("sin(x)/x").unwrap();
/// let values = f.evaluate_on_grid("x", &linspace(0.1, 1.0, 10)).unwrap();
/// let g = f.lambdify1D("x").unwrap();
/// println!("{} {}", values[0], g(0.5));
/// ```
pub mod symbolic_lambdify;
/// plain text and LaTeX output
pub mod symbolic_latex;
/// univariate and multivariate polynomial helpers, polynomial roots
pub mod symbolic_polynomial;
/// algebraic simplification
pub mod symbolic_simplify;
/// real zeros of expressions in one variable
pub mod symbolic_solve;
pub mod utils;
