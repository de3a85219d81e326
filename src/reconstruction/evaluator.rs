use crate::reconstruction::errors::EvaluationError;
use crate::symbolic::parse_expr::VARIABLE;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::linspace;
use log::{debug, warn};
use nalgebra::DVector;

/// Number of points of the sample grid shared by every curve.
pub const GRID_SIZE: usize = 1000;

/// `GRID_SIZE` evenly spaced points over `[xmin, xmax]`, both endpoints included.
pub fn sample_grid(xmin: f64, xmax: f64) -> DVector<f64> {
    linspace(xmin, xmax, GRID_SIZE)
}

/// Evaluates `expr` at every grid point. Fails before touching the grid if anything other
/// than the bound variable is still free.
pub fn evaluate(expr: &Expr, grid: &DVector<f64>) -> Result<DVector<f64>, EvaluationError> {
    let unresolved: Vec<String> = expr
        .all_arguments_are_variables()
        .into_iter()
        .filter(|name| name != VARIABLE)
        .collect();
    if !unresolved.is_empty() {
        return Err(EvaluationError::UnresolvedSymbols {
            expression: expr.pretty(),
            symbols: unresolved,
        });
    }
    expr.evaluate_on_grid(VARIABLE, grid)
        .map_err(EvaluationError::Symbolic)
}

/// Comma-separated x-coordinates of user-asserted critical points.
///
/// Never fails: a malformed list gives no points and a warning message for the caller.
pub fn parse_critical_points(text: &str) -> (Vec<f64>, Option<String>) {
    if text.trim().is_empty() {
        return (Vec::new(), None);
    }
    let parsed: Result<Vec<f64>, String> = text
        .split(',')
        .map(|item| {
            let item = item.trim();
            match item.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(item.to_string()),
            }
        })
        .collect();
    match parsed {
        Ok(points) => (points, None),
        Err(item) => {
            let message = format!(
                "could not parse critical points '{}': '{}' is not a number",
                text, item
            );
            warn!("{}", message);
            (Vec::new(), Some(message))
        }
    }
}

/// Real zeros of f″. Best effort: anything the solver cannot handle gives no points.
pub fn inflection_points(fdoubleprime: &Expr) -> Vec<f64> {
    match fdoubleprime.real_roots(VARIABLE) {
        Ok(roots) => roots.into_iter().filter(|root| root.is_finite()).collect(),
        Err(reason) => {
            debug!("inflection points skipped: {}", reason);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_has_fixed_size_and_exact_bounds() {
        for (xmin, xmax) in [(-5.0, 5.0), (-10.0, 10.0), (0.25, 0.5), (-3.3, 7.1)] {
            let grid = sample_grid(xmin, xmax);
            assert_eq!(grid.len(), GRID_SIZE);
            assert_eq!(grid[0], xmin);
            assert_eq!(grid[GRID_SIZE - 1], xmax);
        }
    }

    #[test]
    fn test_evaluate() {
        let grid = sample_grid(-1.0, 1.0);
        let values = evaluate(&parse_expression("x^2 + 1").unwrap(), &grid).unwrap();
        assert_eq!(values.len(), GRID_SIZE);
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[GRID_SIZE - 1], 2.0);
    }

    #[test]
    fn test_unresolved_constant_fails_fast() {
        let expr = parse_expression("x^2").unwrap() + Expr::var("C1");
        match evaluate(&expr, &sample_grid(0.0, 1.0)) {
            Err(EvaluationError::UnresolvedSymbols { symbols, .. }) => {
                assert_eq!(symbols, vec!["C1".to_string()])
            }
            other => panic!("expected unresolved symbols, got {:?}", other),
        }
    }

    #[test]
    fn test_critical_points() {
        assert_eq!(parse_critical_points("1, -2.5,3"), (vec![1.0, -2.5, 3.0], None));
        assert_eq!(parse_critical_points("  "), (vec![], None));
        let (points, warning) = parse_critical_points("abc");
        assert!(points.is_empty());
        assert!(warning.unwrap().contains("abc"));
        let (points, warning) = parse_critical_points("1,,2");
        assert!(points.is_empty());
        assert!(warning.is_some());
    }

    #[test]
    fn test_inflection_points() {
        let points = inflection_points(&parse_expression("6*x").unwrap());
        assert_eq!(points, vec![0.0]);
        let points = inflection_points(&parse_expression("x^2 - 1").unwrap());
        assert_relative_eq!(points[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(points[1], 1.0, epsilon = 1e-12);
        // complex zeros only
        assert!(inflection_points(&parse_expression("x^2 + 4").unwrap()).is_empty());
    }

    #[test]
    fn test_inflection_failures_are_swallowed() {
        assert!(inflection_points(&parse_expression("sin(x) - x/3").unwrap()).is_empty());
        assert!(inflection_points(&parse_expression("0").unwrap()).is_empty());
    }

    #[test]
    fn test_inflection_points_of_quartics() {
        // x^4 + 1 has only complex zeros
        assert!(inflection_points(&parse_expression("x^4 + 1").unwrap()).is_empty());
        assert!(inflection_points(&parse_expression("x^4 + 2").unwrap()).is_empty());
        let points = inflection_points(&parse_expression("x^4 - 1").unwrap());
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(points[1], 1.0, epsilon = 1e-9);
    }
}
