//! Weighted statistics over posterior samples

use itertools::Itertools;
use ndarray::{Array1, Zip};

/// Compute the weighted mean of an array
pub fn weighted_mean(values: &Array1<f64>, weights: &Array1<f64>) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }

    let (sum, weight_sum) = Zip::from(values)
        .and(weights)
        .fold((0.0, 0.0), |(sum, weight_sum), &v, &w| {
            (sum + v * w, weight_sum + w)
        });

    if weight_sum > 0.0 { Some(sum / weight_sum) } else { None }
}

/// Weighted mean and weighted standard deviation of an array
///
/// The deviation is the square root of the weighted mean squared deviation
/// from the weighted mean. Both values are returned together so that a
/// caller can never mistake one for the other.
pub fn weighted_mean_and_standard_deviation(
    values: &Array1<f64>,
    weights: &Array1<f64>,
) -> Option<(f64, f64)> {
    let mean = weighted_mean(values, weights)?;
    let (sum, weight_sum) = Zip::from(values)
        .and(weights)
        .fold((0.0, 0.0), |(sum, weight_sum), &v, &w| {
            (sum + w * (v - mean).powi(2), weight_sum + w)
        });
    Some((mean, f64::sqrt(sum / weight_sum)))
}

/// Weighted quantile of an array
///
/// Values are sorted and the quantile is read from the midpoints of the
/// cumulative normalized weights, interpolating linearly between adjacent
/// values. `q` must lie in `[0, 1]`.
pub fn weighted_quantile(values: &Array1<f64>, weights: &Array1<f64>, q: f64) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let weight_sum: f64 = weights.sum();
    if weight_sum <= 0.0 {
        return None;
    }

    let order = (0..values.len())
        .sorted_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(std::cmp::Ordering::Equal));

    // Cumulative weight midpoints of the sorted samples
    let mut cumulative = 0.0;
    let mut points = Vec::with_capacity(values.len());
    for i in order {
        let w = weights[i];
        points.push(((cumulative + 0.5 * w) / weight_sum, values[i]));
        cumulative += w;
    }

    if q <= points[0].0 {
        return Some(points[0].1);
    }
    if q >= points[points.len() - 1].0 {
        return Some(points[points.len() - 1].1);
    }
    for pair in points.windows(2) {
        let (q0, v0) = pair[0];
        let (q1, v1) = pair[1];
        if q <= q1 {
            let t = if q1 > q0 { (q - q0) / (q1 - q0) } else { 0.0 };
            return Some(v0 + t * (v1 - v0));
        }
    }
    unreachable!("quantile midpoints cover the requested q")
}
