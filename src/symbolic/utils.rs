// numeric helpers shared by the evaluator and the tests
use nalgebra::DVector;

/// `num_values` evenly spaced points from `start` to `end`; both endpoints are exact.
pub fn linspace(start: f64, end: f64, num_values: usize) -> DVector<f64> {
    match num_values {
        0 => DVector::zeros(0),
        1 => DVector::from_element(1, start),
        _ => {
            let step = (end - start) / (num_values as f64 - 1.0);
            DVector::from_fn(num_values, |i, _| {
                if i == num_values - 1 {
                    end
                } else {
                    start + i as f64 * step
                }
            })
        }
    }
}
