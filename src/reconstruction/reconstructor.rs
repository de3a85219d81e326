use crate::reconstruction::errors::IntegrationError;
use crate::reconstruction::symbols::RunScope;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::equivalent;
use log::{debug, info};

/// Which derivatives the user supplied. The two variants are the two reconstruction paths.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivativeChain {
    FirstOnly { fprime: Expr },
    /// `fprime` is kept for cross-checking only; reconstruction starts from `fdoubleprime`
    WithSecond { fprime: Expr, fdoubleprime: Expr },
}

impl DerivativeChain {
    pub fn new(fprime: Expr, fdoubleprime: Option<Expr>) -> Self {
        match fdoubleprime {
            Some(fdoubleprime) => DerivativeChain::WithSecond {
                fprime,
                fdoubleprime,
            },
            None => DerivativeChain::FirstOnly { fprime },
        }
    }

    pub fn second_derivative(&self) -> Option<&Expr> {
        match self {
            DerivativeChain::FirstOnly { .. } => None,
            DerivativeChain::WithSecond { fdoubleprime, .. } => Some(fdoubleprime),
        }
    }
}

/// f and f′, possibly still containing integration constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedFunctions {
    pub f_expr: Expr,
    pub fprime_expr: Expr,
    /// integration constants introduced, in order
    pub constants: Vec<String>,
}

/// Integrates up the derivative chain, one fresh constant per integration step.
pub fn reconstruct(
    chain: &DerivativeChain,
    scope: &mut RunScope,
) -> Result<ReconstructedFunctions, IntegrationError> {
    let first_new_constant = scope.constants().len();
    let fprime_expr = match chain {
        DerivativeChain::FirstOnly { fprime } => fprime.simplify(),
        DerivativeChain::WithSecond {
            fprime,
            fdoubleprime,
        } => {
            let fprime_expr = antiderivative(fdoubleprime, scope)?;
            let drift = (fprime.clone() - fprime_expr.clone()).diff(&scope.variable);
            if equivalent(&drift, &Expr::Const(0.0)) {
                debug!("f'(x) = {} agrees with the integral of f''(x)", fprime.pretty());
            } else {
                debug!(
                    "f'(x) = {} differs from the integral of f''(x) = {}; the latter is used",
                    fprime.pretty(),
                    fprime_expr.pretty()
                );
            }
            fprime_expr
        }
    };
    let f_expr = antiderivative(&fprime_expr, scope)?;
    let constants = scope.constants()[first_new_constant..].to_vec();
    info!(
        "reconstructed f(x) = {}, f'(x) = {}",
        f_expr.pretty(),
        fprime_expr.pretty()
    );
    Ok(ReconstructedFunctions {
        f_expr,
        fprime_expr,
        constants,
    })
}

/// `∫ integrand dx + C` with a newly introduced constant `C`.
fn antiderivative(integrand: &Expr, scope: &mut RunScope) -> Result<Expr, IntegrationError> {
    let integral =
        integrand
            .integrate(&scope.variable)
            .map_err(|reason| IntegrationError::NoClosedForm {
                integrand: integrand.pretty(),
                reason,
            })?;
    let constant = scope.introduce_constant();
    Ok((integral + constant).simplify())
}
