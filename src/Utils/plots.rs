use crate::reconstruction::pipeline::ReconstructionOutput;
use nalgebra::DVector;
use plotters::prelude::*;
use std::path::Path;

const PANEL_HEIGHT: u32 = 320;
const DASH: f64 = 0.04;

/// Consecutive runs of finite samples; poles and domain errors break the curve.
pub fn finite_segments(x: &DVector<f64>, y: &DVector<f64>) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if yi.is_finite() {
            current.push((xi, yi));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// y range of the finite samples with a small margin.
pub fn y_bounds(y: &DVector<f64>) -> (f64, f64) {
    let (min, max) = y
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (-1.0, 1.0);
    }
    if max - min < 1e-12 {
        return (min - 1.0, max + 1.0);
    }
    let pad = 0.05 * (max - min);
    (min - pad, max + pad)
}

/// Pieces of a dashed vertical line at `x` from `ymin` to `ymax`.
fn vertical_dashes(x: f64, ymin: f64, ymax: f64) -> Vec<Vec<(f64, f64)>> {
    let step = DASH * (ymax - ymin);
    let mut dashes = Vec::new();
    let mut y = ymin;
    while y < ymax {
        dashes.push(vec![(x, y), (x, (y + step).min(ymax))]);
        y += 2.0 * step;
    }
    dashes
}

/// Stacked panels of f, f' and (when given) f'' over the common grid, with dashed markers at
/// critical points (on f and f') and red dashed markers at inflection points (on f and f'').
pub fn plot_reconstruction(
    output: &ReconstructionOutput,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut panels = vec![
        ("f(x)", &output.f_values, true, true),
        ("f'(x)", &output.fprime_values, true, false),
    ];
    if let Some(fpp) = &output.fdoubleprime_values {
        panels.push(("f''(x)", fpp, false, true));
    }
    let grid = &output.grid;
    if grid.is_empty() {
        return Err("nothing to plot: empty grid".into());
    }
    let (xmin, xmax) = (grid[0], grid[grid.len() - 1]);

    let root = BitMapBackend::new(path, (900, PANEL_HEIGHT * panels.len() as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((panels.len(), 1));
    for (index, ((label, values, show_critical, show_inflection), area)) in
        panels.iter().zip(areas.iter()).enumerate()
    {
        let (ymin, ymax) = y_bounds(values);
        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)?;
        chart.configure_mesh().x_desc("x").y_desc(*label).draw()?;

        let color = Palette99::pick(index);
        for segment in finite_segments(grid, values) {
            chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
        }
        if *show_critical {
            for &x in &output.critical_points {
                chart.draw_series(
                    vertical_dashes(x, ymin, ymax)
                        .into_iter()
                        .map(|dash| PathElement::new(dash, BLUE.mix(0.6).stroke_width(1))),
                )?;
            }
        }
        if *show_inflection {
            for &x in &output.inflection_points {
                chart.draw_series(
                    vertical_dashes(x, ymin, ymax)
                        .into_iter()
                        .map(|dash| PathElement::new(dash, RED.mix(0.6).stroke_width(1))),
                )?;
            }
        }
    }
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_split_at_non_finite_samples() {
        let x = DVector::from_vec(vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![-0.5, -1.0, f64::INFINITY, 1.0, 0.5]);
        let segments = finite_segments(&x, &y);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![(-2.0, -0.5), (-1.0, -1.0)]);
        assert_eq!(segments[1], vec![(1.0, 1.0), (2.0, 0.5)]);
        let all_nan = DVector::from_element(3, f64::NAN);
        assert!(finite_segments(&x.rows(0, 3).into_owned(), &all_nan).is_empty());
    }

    #[test]
    fn test_y_bounds() {
        let (lo, hi) = y_bounds(&DVector::from_vec(vec![0.0, 10.0, f64::NAN]));
        assert!(lo < 0.0 && hi > 10.0);
        assert_eq!(y_bounds(&DVector::from_vec(vec![2.0, 2.0])), (1.0, 3.0));
        assert_eq!(y_bounds(&DVector::from_vec(vec![f64::NAN])), (-1.0, 1.0));
    }

    #[test]
    fn test_vertical_dashes_stay_in_range() {
        let dashes = vertical_dashes(0.5, -1.0, 1.0);
        assert!(!dashes.is_empty());
        for dash in &dashes {
            assert!(dash.iter().all(|&(x, y)| x == 0.5 && (-1.0..=1.0).contains(&y)));
        }
    }
}
