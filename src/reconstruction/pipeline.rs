//! The whole reconstruction run: text inputs in, sample arrays and display strings out.
//!
//! Stages run strictly forward (parser, reconstructor, condition solver, evaluator) and the
//! first fatal condition ends the run without any partial output. Degraded annotations
//! (unparsable critical points, unsolvable inflection points) only add warnings.
use crate::Utils::task_parser::{
    DocumentMap, Value, parse_document_as, parse_document_from_file, template_from,
};
use crate::reconstruction::condition_solver::{
    ConditionTarget, SolutionMapping, apply_solution, build_equations, parse_condition,
    parse_optional_condition, solve_constants,
};
use crate::reconstruction::errors::{InputField, ParseError, ReconstructionError};
use crate::reconstruction::evaluator::{
    evaluate, inflection_points, parse_critical_points, sample_grid,
};
use crate::reconstruction::reconstructor::{
    DerivativeChain, ReconstructedFunctions, reconstruct,
};
use crate::reconstruction::symbols::RunScope;
use crate::symbolic::parse_expr::{parse_expression, parse_optional_expression};
use crate::symbolic::symbolic_engine::Expr;
use log::{error, info, warn};
use nalgebra::DVector;
use std::path::{Path, PathBuf};

/// Bounds any plotting range must stay within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

impl Default for DisplayRange {
    fn default() -> Self {
        DisplayRange {
            min: -10.0,
            max: 10.0,
        }
    }
}

impl DisplayRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Raw inputs of one run, as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionInput {
    /// f'(x), required
    pub fprime: String,
    /// f''(x), blank when not given
    pub fdoubleprime: String,
    /// "a,b" for f(a) = b, required
    pub ic_f: String,
    /// "c,d" for f'(c) = d, blank when not given
    pub ic_fprime: String,
    /// comma separated x-coordinates where f' is known to vanish
    pub critical_points: String,
    pub xmin: f64,
    pub xmax: f64,
    pub display_range: DisplayRange,
}

impl Default for ReconstructionInput {
    fn default() -> Self {
        ReconstructionInput {
            fprime: "2*x".to_string(),
            fdoubleprime: String::new(),
            ic_f: "0,0".to_string(),
            ic_fprime: String::new(),
            critical_points: String::new(),
            xmin: -5.0,
            xmax: 5.0,
            display_range: DisplayRange::default(),
        }
    }
}

/// Output options that come with a task file rather than with the math.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskSettings {
    pub loglevel: Option<String>,
    pub log_to_file: bool,
    pub plot: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

fn task_template() -> DocumentMap {
    template_from(&[
        ("derivatives", &["fprime", "fdoubleprime"]),
        ("conditions", &["f", "fprime"]),
        ("annotations", &["critical_points"]),
        ("range", &["xmin", "xmax"]),
        ("settings", &["loglevel", "log_to_file", "plot", "csv"]),
    ])
}

fn read_task(text: &str) -> Result<DocumentMap, ReconstructionError> {
    parse_document_as(text, Some(task_template())).map_err(ReconstructionError::Config)
}

/// Reads a task file once and builds both the inputs and the output settings from it.
pub fn load_task(path: &Path) -> Result<(ReconstructionInput, TaskSettings), ReconstructionError> {
    let doc = parse_document_from_file(path, Some(task_template()))
        .map_err(ReconstructionError::Config)?;
    Ok((
        ReconstructionInput::from_document(&doc)?,
        TaskSettings::from_document(&doc)?,
    ))
}

fn task_values<'a>(doc: &'a DocumentMap, title: &str, key: &str) -> Option<&'a Vec<Value>> {
    doc.get(title).and_then(|section| section.get(key)).and_then(|v| v.as_ref())
}

/// values of a key joined back with commas, e.g. `f: 0, 1` gives "0,1"
fn task_text(doc: &DocumentMap, title: &str, key: &str) -> Option<String> {
    task_values(doc, title, key).map(|values| {
        values
            .iter()
            .map(Value::to_string_value)
            .collect::<Vec<_>>()
            .join(",")
    })
}

fn task_number(doc: &DocumentMap, title: &str, key: &str) -> Result<Option<f64>, ReconstructionError> {
    match task_values(doc, title, key) {
        None => Ok(None),
        Some(values) => match values.as_slice() {
            [value] => value.as_float().map(Some).ok_or_else(|| {
                ReconstructionError::Config(format!("{}.{} must be a number, got '{}'", title, key, value))
            }),
            _ => Err(ReconstructionError::Config(format!(
                "{}.{} must be a single number",
                title, key
            ))),
        },
    }
}

impl ReconstructionInput {
    /// Reads the inputs from a task document; keys that are absent keep their defaults.
    ///
    /// ```text
    /// derivatives
    ///   fprime: 3*x^2 - 3
    /// conditions
    ///   f: 0, 1
    /// annotations
    ///   critical_points: -1, 1
    /// range
    ///   xmin: -3; xmax: 3
    /// ```
    pub fn from_task_document(text: &str) -> Result<Self, ReconstructionError> {
        Self::from_document(&read_task(text)?)
    }

    /// Same as [`ReconstructionInput::from_task_document`] for an already parsed document.
    pub fn from_document(doc: &DocumentMap) -> Result<Self, ReconstructionError> {
        let mut input = ReconstructionInput::default();
        if let Some(fprime) = task_text(doc, "derivatives", "fprime") {
            input.fprime = fprime;
        }
        if let Some(fdoubleprime) = task_text(doc, "derivatives", "fdoubleprime") {
            input.fdoubleprime = fdoubleprime;
        }
        if let Some(ic_f) = task_text(doc, "conditions", "f") {
            input.ic_f = ic_f;
        }
        if let Some(ic_fprime) = task_text(doc, "conditions", "fprime") {
            input.ic_fprime = ic_fprime;
        }
        if let Some(points) = task_text(doc, "annotations", "critical_points") {
            input.critical_points = points;
        }
        if let Some(xmin) = task_number(doc, "range", "xmin")? {
            input.xmin = xmin;
        }
        if let Some(xmax) = task_number(doc, "range", "xmax")? {
            input.xmax = xmax;
        }
        Ok(input)
    }

    /// Fatal unless `xmin < xmax`, both finite and inside the display range.
    pub fn validate_range(&self) -> Result<(), ReconstructionError> {
        let reason = if !self.xmin.is_finite() || !self.xmax.is_finite() {
            Some("bounds must be finite".to_string())
        } else if self.xmin >= self.xmax {
            Some("xmin must be smaller than xmax".to_string())
        } else if !self.display_range.contains(self.xmin) || !self.display_range.contains(self.xmax) {
            Some(format!(
                "bounds must lie within [{}, {}]",
                self.display_range.min, self.display_range.max
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ReconstructionError::InvalidRange {
                xmin: self.xmin,
                xmax: self.xmax,
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl TaskSettings {
    pub fn from_task_document(text: &str) -> Result<Self, ReconstructionError> {
        Self::from_document(&read_task(text)?)
    }

    pub fn from_document(doc: &DocumentMap) -> Result<Self, ReconstructionError> {
        let log_to_file = match task_values(doc, "settings", "log_to_file") {
            None => false,
            Some(values) => values.first().and_then(Value::as_boolean).ok_or_else(|| {
                ReconstructionError::Config("settings.log_to_file must be true or false".to_string())
            })?,
        };
        Ok(TaskSettings {
            loglevel: task_text(doc, "settings", "loglevel"),
            log_to_file,
            plot: task_text(doc, "settings", "plot").map(PathBuf::from),
            csv: task_text(doc, "settings", "csv").map(PathBuf::from),
        })
    }
}

/// Plain text and LaTeX forms of one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendering {
    pub plain: String,
    pub latex: String,
}

impl From<&Expr> for Rendering {
    fn from(expr: &Expr) -> Self {
        Rendering {
            plain: expr.pretty(),
            latex: expr.to_latex(),
        }
    }
}

/// Result of the symbolic stages: the final expressions, possibly with constants left free.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicReconstruction {
    pub chain: DerivativeChain,
    pub functions: ReconstructedFunctions,
    pub solution: SolutionMapping,
}

impl SymbolicReconstruction {
    /// Integration constants still present in f or f′.
    pub fn unresolved_constants(&self) -> Vec<String> {
        self.functions
            .constants
            .iter()
            .filter(|name| {
                self.functions.f_expr.contains_variable(name)
                    || self.functions.fprime_expr.contains_variable(name)
            })
            .cloned()
            .collect()
    }
}

/// Everything the rendering side needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionOutput {
    pub grid: DVector<f64>,
    pub f_values: DVector<f64>,
    pub fprime_values: DVector<f64>,
    pub fdoubleprime_values: Option<DVector<f64>>,
    pub critical_points: Vec<f64>,
    pub inflection_points: Vec<f64>,
    pub f_expr: Expr,
    pub fprime_expr: Expr,
    pub fdoubleprime_expr: Option<Expr>,
    pub f_display: Rendering,
    pub fprime_display: Rendering,
    pub fdoubleprime_display: Option<Rendering>,
    /// integration constants introduced by the run
    pub constants: Vec<String>,
    pub solution: SolutionMapping,
    pub warnings: Vec<String>,
}

/// One reconstruction run over a fixed set of inputs.
pub struct FunctionReconstruction {
    pub input: ReconstructionInput,
}

impl FunctionReconstruction {
    pub fn new(input: ReconstructionInput) -> Self {
        FunctionReconstruction { input }
    }

    /// Parser, reconstructor and condition solver.
    pub fn solve(&self) -> Result<SymbolicReconstruction, ReconstructionError> {
        let input = &self.input;
        let fprime = parse_expression(&input.fprime)
            .map_err(|e| ParseError::from_syntax(InputField::FirstDerivative, &input.fprime, e))?;
        let fdoubleprime = parse_optional_expression(&input.fdoubleprime)
            .map_err(|e| ParseError::from_syntax(InputField::SecondDerivative, &input.fdoubleprime, e))?;
        let mut conditions = vec![parse_condition(&input.ic_f, ConditionTarget::Function)?];
        if let Some(condition) =
            parse_optional_condition(&input.ic_fprime, ConditionTarget::FirstDerivative)?
        {
            conditions.push(condition);
        }
        input.validate_range()?;
        info!("inputs parsed, {} initial condition(s)", conditions.len());

        let chain = DerivativeChain::new(fprime, fdoubleprime);
        let mut scope = RunScope::new();
        let functions = reconstruct(&chain, &mut scope)?;
        let equations = build_equations(&functions, &conditions, &scope.variable);
        let solution = solve_constants(&equations, &functions.constants);
        let functions = apply_solution(&functions, &solution);
        Ok(SymbolicReconstruction {
            chain,
            functions,
            solution,
        })
    }

    /// The full run, ending with the evaluator.
    pub fn run(&self) -> Result<ReconstructionOutput, ReconstructionError> {
        let result = self.run_();
        if let Err(e) = &result {
            error!("reconstruction failed: {}", e);
        }
        result
    }

    fn run_(&self) -> Result<ReconstructionOutput, ReconstructionError> {
        let symbolic = self.solve()?;
        let unresolved = symbolic.unresolved_constants();
        if !unresolved.is_empty() {
            warn!("initial conditions leave {} unresolved", unresolved.join(", "));
        }
        let SymbolicReconstruction {
            chain,
            functions,
            solution,
        } = symbolic;
        let fdoubleprime_expr = chain.second_derivative().map(Expr::simplify);

        let grid = sample_grid(self.input.xmin, self.input.xmax);
        let f_values = evaluate(&functions.f_expr, &grid)?;
        let fprime_values = evaluate(&functions.fprime_expr, &grid)?;
        let fdoubleprime_values = match &fdoubleprime_expr {
            Some(expr) => Some(evaluate(expr, &grid)?),
            None => None,
        };
        info!("evaluated on {} points over [{}, {}]", grid.len(), self.input.xmin, self.input.xmax);

        let mut warnings = Vec::new();
        let (critical_points, warning) = parse_critical_points(&self.input.critical_points);
        warnings.extend(warning);
        let inflection_points = fdoubleprime_expr
            .as_ref()
            .map(inflection_points)
            .unwrap_or_default();

        Ok(ReconstructionOutput {
            f_display: Rendering::from(&functions.f_expr),
            fprime_display: Rendering::from(&functions.fprime_expr),
            fdoubleprime_display: fdoubleprime_expr.as_ref().map(Rendering::from),
            grid,
            f_values,
            fprime_values,
            fdoubleprime_values,
            critical_points,
            inflection_points,
            f_expr: functions.f_expr,
            fprime_expr: functions.fprime_expr,
            fdoubleprime_expr,
            constants: functions.constants,
            solution,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::errors::EvaluationError;
    use crate::reconstruction::evaluator::GRID_SIZE;
    use crate::symbolic::symbolic_simplify::equivalent;
    use approx::assert_relative_eq;

    fn input(fprime: &str, fdoubleprime: &str, ic_f: &str, ic_fprime: &str) -> ReconstructionInput {
        ReconstructionInput {
            fprime: fprime.to_string(),
            fdoubleprime: fdoubleprime.to_string(),
            ic_f: ic_f.to_string(),
            ic_fprime: ic_fprime.to_string(),
            ..ReconstructionInput::default()
        }
    }

    fn run(input: ReconstructionInput) -> Result<ReconstructionOutput, ReconstructionError> {
        FunctionReconstruction::new(input).run()
    }

    #[test]
    fn test_square_from_linear_derivative() {
        let output = run(input("2*x", "", "0,0", "")).unwrap();
        assert!(equivalent(&output.f_expr, &parse_expression("x^2").unwrap()));
        assert_eq!(output.fprime_display.plain, "2*x");
        assert_eq!(output.f_display.plain, "x^2");
        assert_eq!(output.f_display.latex, "x^{2}");
        assert_eq!(output.constants, vec!["C1"]);
        assert!(output.fdoubleprime_values.is_none());
        for (x, f) in output.grid.iter().zip(output.f_values.iter()) {
            assert_relative_eq!(*f, x * x, epsilon = 1e-12);
        }
        for (x, fp) in output.grid.iter().zip(output.fprime_values.iter()) {
            assert_relative_eq!(*fp, 2.0 * x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_line_from_zero_second_derivative() {
        let output = run(input("2", "0", "0,1", "0,2")).unwrap();
        assert!(equivalent(&output.f_expr, &parse_expression("2*x + 1").unwrap()));
        assert_eq!(output.fprime_expr, Expr::Const(2.0));
        assert_eq!(output.constants, vec!["C1", "C2"]);
        assert_eq!(output.fdoubleprime_display.as_ref().unwrap().plain, "0");
        let fpp = output.fdoubleprime_values.unwrap();
        assert_eq!(fpp.len(), GRID_SIZE);
        assert!(fpp.iter().all(|v| *v == 0.0));
        // f'' vanishes identically, no isolated inflection points
        assert!(output.inflection_points.is_empty());
    }

    #[test]
    fn test_cubic_with_inflection_point() {
        let mut cubic = input("3*x^2 - 3", "6*x", "0,0", "0,-3");
        cubic.critical_points = "-1, 1".to_string();
        let output = run(cubic).unwrap();
        assert!(equivalent(&output.f_expr, &parse_expression("x^3 - 3*x").unwrap()));
        assert_eq!(output.critical_points, vec![-1.0, 1.0]);
        assert_eq!(output.inflection_points, vec![0.0]);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_squared_cosine_second_derivative() {
        let output = run(input("x/2 + sin(2*x)/4", "cos(x)^2", "0,0", "0,0")).unwrap();
        assert_eq!(output.solution.len(), 2);
        for (x, f) in output.grid.iter().zip(output.f_values.iter()) {
            assert_relative_eq!(*f, x * x / 4.0 + (1.0 - (2.0 * x).cos()) / 8.0, epsilon = 1e-9);
        }
        let fpp = output.fdoubleprime_values.unwrap();
        for (x, v) in output.grid.iter().zip(fpp.iter()) {
            assert_relative_eq!(*v, x.cos().powi(2), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_positive_quartic_second_derivative_has_no_inflection() {
        let output = run(input("x^5/5 + x", "x^4 + 1", "0,0", "0,0")).unwrap();
        for (x, f) in output.grid.iter().zip(output.f_values.iter()) {
            assert_relative_eq!(*f, x.powi(6) / 30.0 + x * x / 2.0, epsilon = 1e-9, max_relative = 1e-12);
        }
        assert!(output.inflection_points.is_empty());
    }

    #[test]
    fn test_malformed_derivative_is_fatal() {
        match run(input("not_a_number()", "", "0,0", "")) {
            Err(ReconstructionError::Parse(e)) => {
                assert_eq!(e.field, InputField::FirstDerivative);
                assert_eq!(e.text, "not_a_number()");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        match run(input("2*x", "x +", "0,0", "")) {
            Err(ReconstructionError::Parse(e)) => assert_eq!(e.field, InputField::SecondDerivative),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_conditions_are_fatal() {
        match run(input("2*x", "", "0", "")) {
            Err(ReconstructionError::Parse(e)) => assert_eq!(e.field, InputField::FunctionCondition),
            other => panic!("expected a parse error, got {:?}", other),
        }
        match run(input("2*x", "", "0,0", "1")) {
            Err(ReconstructionError::Parse(e)) => {
                assert_eq!(e.field, InputField::DerivativeCondition)
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_critical_points_only_warn() {
        let mut with_bad_points = input("2*x", "", "0,0", "");
        with_bad_points.critical_points = "abc".to_string();
        let output = run(with_bad_points).unwrap();
        assert!(output.critical_points.is_empty());
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.f_values.len(), GRID_SIZE);
        assert_eq!(output.fprime_values.len(), GRID_SIZE);
    }

    #[test]
    fn test_runs_are_idempotent() {
        let first = run(input("x*exp(x)", "", "1,2", "")).unwrap();
        let second = run(input("x*exp(x)", "", "1,2", "")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grid_spans_requested_range() {
        let mut narrow = input("cos(x)", "", "0,0", "");
        narrow.xmin = -0.5;
        narrow.xmax = 2.0;
        let output = run(narrow).unwrap();
        assert_eq!(output.grid.len(), GRID_SIZE);
        assert_eq!(output.grid[0], -0.5);
        assert_eq!(output.grid[GRID_SIZE - 1], 2.0);
    }

    #[test]
    fn test_invalid_ranges_are_fatal() {
        for (xmin, xmax) in [(1.0, 1.0), (2.0, -2.0), (-11.0, 0.0), (0.0, f64::NAN)] {
            let mut bad = input("2*x", "", "0,0", "");
            bad.xmin = xmin;
            bad.xmax = xmax;
            assert!(matches!(run(bad), Err(ReconstructionError::InvalidRange { .. })));
        }
    }

    #[test]
    fn test_underdetermined_leaves_constant_symbolic() {
        let reconstruction = FunctionReconstruction::new(input("x", "0", "0,1", ""));
        let symbolic = reconstruction.solve().unwrap();
        assert_eq!(symbolic.unresolved_constants(), vec!["C1"]);
        assert!(equivalent(
            &symbolic.functions.f_expr,
            &(Expr::var("C1") * Expr::var("x") + Expr::Const(1.0))
        ));
        match reconstruction.run() {
            Err(ReconstructionError::Evaluation(EvaluationError::UnresolvedSymbols {
                symbols, ..
            })) => assert_eq!(symbols, vec!["C1"]),
            other => panic!("expected unresolved symbols, got {:?}", other),
        }
    }

    #[test]
    fn test_no_closed_form_is_fatal() {
        assert!(matches!(
            run(input("exp(x^2)", "", "0,0", "")),
            Err(ReconstructionError::Integration(_))
        ));
    }

    #[test]
    fn test_input_from_task_document() {
        let text = "derivatives\n  fprime: 3*x^2 - 3\n  fdoubleprime: 6*x\nconditions\n  f: 0, 1\n  fprime: 0, -3\nannotations\n  critical_points: -1, 1\nrange\n  xmin: -3; xmax: 3\nsettings\n  loglevel: warn\n  plot: cubic.png\n";
        let input = ReconstructionInput::from_task_document(text).unwrap();
        assert_eq!(input.fprime, "3*x^2 - 3");
        assert_eq!(input.fdoubleprime, "6*x");
        assert_eq!(input.ic_f, "0,1");
        assert_eq!(input.ic_fprime, "0,-3");
        assert_eq!(input.critical_points, "-1,1");
        assert_eq!((input.xmin, input.xmax), (-3.0, 3.0));
        let settings = TaskSettings::from_task_document(text).unwrap();
        assert_eq!(settings.loglevel.as_deref(), Some("warn"));
        assert_eq!(settings.plot, Some(PathBuf::from("cubic.png")));
        assert_eq!(settings.csv, None);
        assert!(!settings.log_to_file);
        let output = FunctionReconstruction::new(input).run().unwrap();
        assert!(equivalent(&output.f_expr, &parse_expression("x^3 - 3*x + 1").unwrap()));
    }

    #[test]
    fn test_task_document_defaults_and_errors() {
        let input = ReconstructionInput::from_task_document("range\n  xmax: 2\n").unwrap();
        assert_eq!(input.fprime, "2*x");
        assert_eq!(input.ic_f, "0,0");
        assert_eq!((input.xmin, input.xmax), (-5.0, 2.0));
        assert!(matches!(
            ReconstructionInput::from_task_document("range\n  xmin: low\n"),
            Err(ReconstructionError::Config(_))
        ));
    }
    #[test]
    fn test_load_task_reads_the_file_once_for_both_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.txt");
        std::fs::write(
            &path,
            "derivatives\n  fprime: cos(x)\nconditions\n  f: 0, 2\nsettings\n  log_to_file: true\n  csv: out.csv\n",
        )
        .unwrap();
        let (input, settings) = load_task(&path).unwrap();
        assert_eq!(input.fprime, "cos(x)");
        assert_eq!(input.ic_f, "0,2");
        assert!(settings.log_to_file);
        assert_eq!(settings.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(settings.plot, None);
        match load_task(&dir.path().join("missing.txt")) {
            Err(ReconstructionError::Config(message)) => assert!(message.contains("missing.txt")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }
}
