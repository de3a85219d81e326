/*
Pretty printing of a finished reconstruction: the functions, the integration constants and the
marker points as a two-column table.
*/
use crate::reconstruction::pipeline::ReconstructionOutput;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, PartialEq, Tabled)]
pub struct SummaryRow {
    key: &'static str,
    value: String,
}

fn format_points(points: &[f64]) -> String {
    if points.is_empty() {
        "none".to_string()
    } else {
        points
            .iter()
            .map(|p| format!("{:.6}", p + 0.0).trim_end_matches('0').trim_end_matches('.').to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn summary_rows(output: &ReconstructionOutput) -> Vec<SummaryRow> {
    let mut rows = vec![
        SummaryRow { key: "f(x)", value: output.f_display.plain.clone() },
        SummaryRow { key: "f'(x)", value: output.fprime_display.plain.clone() },
    ];
    if let Some(fpp) = &output.fdoubleprime_display {
        rows.push(SummaryRow { key: "f''(x)", value: fpp.plain.clone() });
    }
    rows.push(SummaryRow { key: "constants", value: output.solution.to_string() });
    rows.push(SummaryRow { key: "critical points", value: format_points(&output.critical_points) });
    if output.fdoubleprime_values.is_some() {
        rows.push(SummaryRow {
            key: "inflection points",
            value: format_points(&output.inflection_points),
        });
    }
    rows.push(SummaryRow { key: "LaTeX f(x)", value: output.f_display.latex.clone() });
    for warning in &output.warnings {
        rows.push(SummaryRow { key: "warning", value: warning.clone() });
    }
    rows
}

pub fn summary_table(output: &ReconstructionOutput) -> String {
    let mut table = Table::new(summary_rows(output));
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::pipeline::{FunctionReconstruction, ReconstructionInput};

    #[test]
    fn test_summary_rows() {
        let input = ReconstructionInput {
            fprime: "3*x^2 - 3".to_string(),
            fdoubleprime: "6*x".to_string(),
            ic_fprime: "0,-3".to_string(),
            critical_points: "-1,1".to_string(),
            ..ReconstructionInput::default()
        };
        let output = FunctionReconstruction::new(input).run().unwrap();
        let rows = summary_rows(&output);
        assert_eq!(rows[0].key, "f(x)");
        assert!(rows.iter().any(|row| row.key == "f''(x)" && row.value == "6*x"));
        assert!(rows.iter().any(|row| row.key == "critical points" && row.value == "-1, 1"));
        assert!(rows.iter().any(|row| row.key == "inflection points" && row.value == "0"));
        assert!(rows.iter().all(|row| row.key != "warning"));
        assert!(summary_table(&output).contains("constants"));
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(&[]), "none");
        assert_eq!(format_points(&[0.5, 2.0, -1.25]), "0.5, 2, -1.25");
    }
}
