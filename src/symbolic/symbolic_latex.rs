//! Human-facing renderings of [`Expr`]: precedence-aware plain text (`Expr::pretty`) and LaTeX
//! (the [`Latex`] trait). `Display` on `Expr` stays fully parenthesised for logs.
//!
//! Plain text output is accepted back by `parse_expression`.
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;
use std::fmt::{Display, Formatter, Result};

/// A trait for types that can be formatted as LaTeX.
pub trait Latex {
    /// Format the value as LaTeX.
    fn fmt_latex(&self, f: &mut Formatter) -> Result;

    /// Wraps the value in a [`LatexFormatter`], which implements [`Display`].
    fn as_display(&self) -> LatexFormatter<'_, Self> {
        LatexFormatter(self)
    }
}

/// A wrapper type that implements [`Display`] for any type that implements [`Latex`].
pub struct LatexFormatter<'a, T: ?Sized>(&'a T);

impl<T: ?Sized> Display for LatexFormatter<'_, T>
where
    T: Latex,
{
    fn fmt(&self, f: &mut Formatter) -> Result {
        self.0.fmt_latex(f)
    }
}

impl Latex for Expr {
    fn fmt_latex(&self, f: &mut Formatter) -> Result {
        write_expr(f, self, Style::Latex)
    }
}

struct Pretty<'a>(&'a Expr);

impl Display for Pretty<'_> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write_expr(f, self.0, Style::Plain)
    }
}

impl Expr {
    /// Plain text with the minimal parentheses, `x^2 - 2*x + C1`.
    pub fn pretty(&self) -> String {
        Pretty(self).to_string()
    }

    /// LaTeX source, `x^{2} - 2 x + C_{1}`.
    pub fn to_latex(&self) -> String {
        self.as_display().to_string()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Style {
    Plain,
    Latex,
}

const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const POWER: u8 = 3;
const ATOM: u8 = 4;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(_, _) | Expr::Sub(_, _) => SUM,
        Expr::Mul(_, _) | Expr::Div(_, _) => PRODUCT,
        Expr::Const(c) if *c < 0.0 => PRODUCT,
        Expr::Pow(_, exp) if !matches!(exp.as_ref(), Expr::Const(h) if *h == 0.5) => POWER,
        _ => ATOM,
    }
}

/// `(true, |e|)` when the expression prints with a leading minus sign.
fn split_sign(expr: &Expr) -> (bool, Expr) {
    match expr {
        Expr::Const(c) if *c < 0.0 => (true, Expr::Const(-c)),
        Expr::Mul(lhs, rhs) => match lhs.as_ref() {
            Expr::Const(c) if *c == -1.0 => (true, rhs.as_ref().clone()),
            Expr::Const(c) if *c < 0.0 => (true, Expr::Const(-c) * rhs.as_ref().clone()),
            _ => (false, expr.clone()),
        },
        Expr::Div(num, den) => match split_sign(num) {
            (true, abs) => (true, abs / den.as_ref().clone()),
            _ => (false, expr.clone()),
        },
        _ => (false, expr.clone()),
    }
}

fn format_number(value: f64, style: Style) -> String {
    if value == PI {
        return match style {
            Style::Plain => "pi".to_string(),
            Style::Latex => "\\pi".to_string(),
        };
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    if value.is_finite() && (value.abs() < 1e-4 || value.abs() >= 1e15) {
        let scientific = format!("{:e}", value);
        return match (style, scientific.split_once('e')) {
            (Style::Latex, Some((mantissa, exponent))) => {
                format!("{} \\cdot 10^{{{}}}", mantissa, exponent)
            }
            _ => scientific,
        };
    }
    let fixed = format!("{:.6}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn write_child(f: &mut Formatter, expr: &Expr, min_precedence: u8, style: Style) -> Result {
    if precedence(expr) < min_precedence {
        match style {
            Style::Plain => write!(f, "(")?,
            Style::Latex => write!(f, "\\left(")?,
        }
        write_expr(f, expr, style)?;
        match style {
            Style::Plain => write!(f, ")"),
            Style::Latex => write!(f, "\\right)"),
        }
    } else {
        write_expr(f, expr, style)
    }
}

fn write_variable(f: &mut Formatter, name: &str, style: Style) -> Result {
    if style == Style::Latex {
        // C1 -> C_{1}
        let split = name.find(|c: char| c.is_ascii_digit());
        if let Some(position) = split.filter(|p| *p > 0) {
            let (stem, index) = name.split_at(position);
            if index.chars().all(|c| c.is_ascii_digit()) {
                return write!(f, "{}_{{{}}}", stem, index);
            }
        }
    }
    write!(f, "{}", name)
}

fn function_names(expr: &Expr) -> Option<(&'static str, &'static str)> {
    let names = match expr {
        Expr::Ln(_) => ("ln", "\\ln"),
        Expr::sin(_) => ("sin", "\\sin"),
        Expr::cos(_) => ("cos", "\\cos"),
        Expr::tg(_) => ("tan", "\\tan"),
        Expr::ctg(_) => ("cot", "\\cot"),
        Expr::arcsin(_) => ("arcsin", "\\arcsin"),
        Expr::arccos(_) => ("arccos", "\\arccos"),
        Expr::arctg(_) => ("arctan", "\\arctan"),
        Expr::arcctg(_) => ("arccot", "\\operatorname{arccot}"),
        _ => return None,
    };
    Some(names)
}

fn write_expr(f: &mut Formatter, expr: &Expr, style: Style) -> Result {
    match expr {
        Expr::Var(name) => write_variable(f, name, style),
        Expr::Const(c) if *c < 0.0 => write!(f, "-{}", format_number(-c, style)),
        Expr::Const(c) => write!(f, "{}", format_number(*c, style)),
        Expr::Add(lhs, rhs) => {
            write_expr(f, lhs, style)?;
            match split_sign(rhs) {
                (true, abs) => {
                    write!(f, " - ")?;
                    write_child(f, &abs, PRODUCT, style)
                }
                (false, _) => {
                    write!(f, " + ")?;
                    write_expr(f, rhs, style)
                }
            }
        }
        Expr::Sub(lhs, rhs) => {
            write_expr(f, lhs, style)?;
            match split_sign(rhs) {
                (true, abs) => {
                    write!(f, " + ")?;
                    write_child(f, &abs, PRODUCT, style)
                }
                (false, _) => {
                    write!(f, " - ")?;
                    write_child(f, rhs, PRODUCT, style)
                }
            }
        }
        Expr::Mul(lhs, rhs) => {
            if let (true, abs) = split_sign(expr) {
                write!(f, "-")?;
                return write_child(f, &abs, PRODUCT, style);
            }
            write_child(f, lhs, PRODUCT, style)?;
            match style {
                Style::Plain => write!(f, "*")?,
                Style::Latex if matches!(rhs.as_ref(), Expr::Const(_)) => write!(f, " \\cdot ")?,
                Style::Latex => write!(f, " ")?,
            }
            if split_sign(rhs).0 {
                write_child(f, rhs, ATOM, style)
            } else {
                write_child(f, rhs, PRODUCT, style)
            }
        }
        Expr::Div(num, den) => {
            if let (true, abs) = split_sign(expr) {
                write!(f, "-")?;
                return write_child(f, &abs, PRODUCT, style);
            }
            match style {
                Style::Plain => {
                    write_child(f, num, PRODUCT, style)?;
                    write!(f, "/")?;
                    write_child(f, den, POWER, style)
                }
                Style::Latex => {
                    write!(f, "\\frac{{")?;
                    write_expr(f, num, style)?;
                    write!(f, "}}{{")?;
                    write_expr(f, den, style)?;
                    write!(f, "}}")
                }
            }
        }
        Expr::Pow(base, exp) => {
            if matches!(exp.as_ref(), Expr::Const(h) if *h == 0.5) {
                return match style {
                    Style::Plain => {
                        write!(f, "sqrt(")?;
                        write_expr(f, base, style)?;
                        write!(f, ")")
                    }
                    Style::Latex => {
                        write!(f, "\\sqrt{{")?;
                        write_expr(f, base, style)?;
                        write!(f, "}}")
                    }
                };
            }
            write_child(f, base, ATOM, style)?;
            match style {
                Style::Plain => {
                    write!(f, "^")?;
                    write_child(f, exp, ATOM, style)
                }
                Style::Latex => {
                    write!(f, "^{{")?;
                    write_expr(f, exp, style)?;
                    write!(f, "}}")
                }
            }
        }
        Expr::Exp(arg) => match style {
            Style::Plain => {
                write!(f, "exp(")?;
                write_expr(f, arg, style)?;
                write!(f, ")")
            }
            Style::Latex => {
                write!(f, "e^{{")?;
                write_expr(f, arg, style)?;
                write!(f, "}}")
            }
        },
        _ => {
            let (plain, latex) = function_names(expr).unwrap_or(("?", "?"));
            let arg = match expr.children().as_slice() {
                [arg] => (*arg).clone(),
                _ => return write!(f, "{}", expr),
            };
            match style {
                Style::Plain => {
                    write!(f, "{}(", plain)?;
                    write_expr(f, &arg, style)?;
                    write!(f, ")")
                }
                Style::Latex => {
                    write!(f, "{}\\left(", latex)?;
                    write_expr(f, &arg, style)?;
                    write!(f, "\\right)")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_pretty_polynomial() {
        let expr = parse_expression("(x + 1)^2").unwrap().simplify();
        assert_eq!(expr.pretty(), "x^2 + 2*x + 1");
        let expr = x().pow(Expr::Const(2.0)) + Expr::Const(-1.0);
        assert_eq!(expr.pretty(), "x^2 - 1");
    }

    #[test]
    fn test_pretty_signs() {
        assert_eq!((-Expr::cos(x().boxed())).pretty(), "-cos(x)");
        assert_eq!((x() - (Expr::Const(1.0) + x())).pretty(), "x - (1 + x)");
        assert_eq!((x() + Expr::Const(-2.0) * x()).pretty(), "x - 2*x");
        assert_eq!((Expr::Const(2.0) * Expr::Const(-3.0)).pretty(), "2*(-3)");
        assert_eq!(x().pow(Expr::Const(-1.0)).pretty(), "x^(-1)");
    }

    #[test]
    fn test_pretty_numbers() {
        assert_eq!((Expr::Const(0.5) * x()).pretty(), "0.5*x");
        assert_eq!(Expr::Const(1.0 / 3.0).pretty(), "0.333333");
        assert_eq!(Expr::Const(1e-9).pretty(), "1e-9");
        assert_eq!(Expr::Const(PI).pretty(), "pi");
    }

    #[test]
    fn test_pretty_division_and_roots() {
        let expr = x() / (Expr::Const(2.0) * x());
        assert_eq!(expr.pretty(), "x/(2*x)");
        assert_eq!(x().pow(Expr::Const(0.5)).pretty(), "sqrt(x)");
        assert_eq!(Expr::tg(x().boxed()).pretty(), "tan(x)");
    }

    #[test]
    fn test_pretty_output_parses_back() {
        for text in [
            "x^2 - 3*x + sin(2*x)/2",
            "-cos(x) + exp(-x)",
            "x*atan(x) - ln(1 + x^2)/2",
            "1/(x - 1)^2 - (x + 2)/(x^2 + 1)",
            "2^x/ln(2) - sqrt(x)",
        ] {
            let expr = parse_expression(text).unwrap().simplify();
            let reparsed = parse_expression(&expr.pretty()).unwrap();
            for point in [1.5, 2.5] {
                assert_relative_eq!(
                    reparsed.eval_expression(&["x"], &[point]).unwrap(),
                    expr.eval_expression(&["x"], &[point]).unwrap(),
                    epsilon = 1e-5
                );
            }
        }
    }

    #[test]
    fn test_latex() {
        let expr = x().pow(Expr::Const(2.0)) + Expr::var("C1") * x() + Expr::var("C2");
        assert_eq!(expr.to_latex(), "x^{2} + C_{1} x + C_{2}");
        assert_eq!((Expr::Const(1.0) / x()).to_latex(), "\\frac{1}{x}");
        assert_eq!(
            Expr::sin(x().boxed()).to_latex(),
            "\\sin\\left(x\\right)"
        );
        assert_eq!((Expr::Const(2.0) * x()).exp().to_latex(), "e^{2 x}");
        assert_eq!(
            format!("{}", x().pow(Expr::Const(0.5)).as_display()),
            "\\sqrt{x}"
        );
    }
}
