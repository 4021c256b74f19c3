//! Special functions needed by priors and posterior quantiles

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Inverse of the standard normal CDF
///
/// Acklam's rational approximation, refined with one Halley step; the result
/// is accurate to better than 1e-9 over the open unit interval.
pub fn probit(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let x = if p < P_LOW {
        let q = f64::sqrt(-2.0 * f64::ln(p));
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = f64::sqrt(-2.0 * f64::ln(1.0 - p));
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    // One step of Halley's method against the exact CDF
    let e = normal_cdf(x) - p;
    let u = e * f64::sqrt(std::f64::consts::TAU) * f64::exp(0.5 * x * x);
    x - u / (1.0 + 0.5 * x * u)
}

/// The pair of CDF quantiles corresponding to a symmetric `sigma` confidence limit
///
/// For `sigma = 1` this is approximately `(0.159, 0.841)`.
pub fn sigma_to_quantiles(sigma: f64) -> (f64, f64) {
    let upper = normal_cdf(sigma);
    (1.0 - upper, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn probit_inverts_cdf() {
        for &p in &[1e-6, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0 - 1e-6] {
            assert_relative_eq!(normal_cdf(probit(p)), p, epsilon = 1e-12);
        }
    }

    #[test]
    fn probit_known_values() {
        assert_relative_eq!(probit(0.5), 0.0, epsilon = 1e-12);
        assert_relative_eq!(probit(0.8413447460685429), 1.0, epsilon = 1e-9);
        assert_relative_eq!(probit(0.9772498680518208), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn probit_edges() {
        assert!(probit(0.0).is_infinite());
        assert!(probit(1.0).is_infinite());
        assert!(probit(0.0) < 0.0);
    }

    #[test]
    fn sigma_quantiles_are_symmetric() {
        let (lo, hi) = sigma_to_quantiles(3.0);
        assert_relative_eq!(lo + hi, 1.0, epsilon = 1e-12);
        assert_relative_eq!(hi, 0.9986501019683699, epsilon = 1e-9);
    }
}
