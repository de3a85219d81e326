use crate::symbolic::parse_expr::VARIABLE;
use crate::symbolic::symbolic_engine::Expr;

/// Symbols owned by a single reconstruction run: the bound variable and the integration
/// constants handed out so far. A fresh scope is created for every run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunScope {
    pub variable: String,
    constants: Vec<String>,
}

impl Default for RunScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RunScope {
    pub fn new() -> Self {
        RunScope {
            variable: VARIABLE.to_string(),
            constants: Vec::new(),
        }
    }

    /// Next integration constant `C1`, `C2`, ...
    pub fn introduce_constant(&mut self) -> Expr {
        let name = format!("C{}", self.constants.len() + 1);
        self.constants.push(name.clone());
        Expr::Var(name)
    }

    /// Constants in introduction order.
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    pub fn variable_expr(&self) -> Expr {
        Expr::var(&self.variable)
    }
}
