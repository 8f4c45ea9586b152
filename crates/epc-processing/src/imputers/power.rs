//! Numeric building blocks for regression imputation: a Yeo-Johnson power
//! transform with standardization and a one-variable least-squares fit.

use serde::{Deserialize, Serialize};

const LAMBDA_BOUNDS: (f64, f64) = (-5.0, 5.0);
const LAMBDA_TOLERANCE: f64 = 1e-8;
const MAX_SEARCH_ITERATIONS: usize = 200;
const EPS: f64 = 1e-12;

/// Yeo-Johnson transform of a single value.
pub fn yeo_johnson(x: f64, lambda: f64) -> f64 {
    if x >= 0.0 {
        if lambda.abs() < EPS {
            x.ln_1p()
        } else {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() < EPS {
        -(-x).ln_1p()
    } else {
        -((1.0 - x).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Profile log-likelihood of `lambda` under a normal model of the transformed data.
fn log_likelihood(values: &[f64], lambda: f64) -> f64 {
    let transformed: Vec<f64> = values.iter().map(|&x| yeo_johnson(x, lambda)).collect();
    let var = variance(&transformed);
    if var <= 0.0 || !var.is_finite() {
        return f64::NEG_INFINITY;
    }
    let n = values.len() as f64;
    let jacobian: f64 = values.iter().map(|x| x.signum() * x.abs().ln_1p()).sum();
    -0.5 * n * var.ln() + (lambda - 1.0) * jacobian
}

/// Maximize the log-likelihood over `LAMBDA_BOUNDS` by golden-section search.
fn estimate_lambda(values: &[f64]) -> f64 {
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = LAMBDA_BOUNDS;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = log_likelihood(values, c);
    let mut fd = log_likelihood(values, d);

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if (b - a).abs() < LAMBDA_TOLERANCE {
            break;
        }
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = log_likelihood(values, c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = log_likelihood(values, d);
        }
    }

    (a + b) / 2.0
}

/// Fitted Yeo-Johnson transform followed by standardization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerTransform {
    lambda: f64,
    mean: f64,
    scale: f64,
}

impl PowerTransform {
    /// Estimate λ and the standardization parameters from `values`.
    ///
    /// Constant input has no likelihood maximum; λ is then fixed at 1 and the
    /// scale at 1.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                lambda: 1.0,
                mean: 0.0,
                scale: 1.0,
            };
        }

        let lambda = if variance(values) > 0.0 {
            estimate_lambda(values)
        } else {
            1.0
        };

        let transformed: Vec<f64> = values.iter().map(|&x| yeo_johnson(x, lambda)).collect();
        let mean = mean(&transformed);
        let std = variance(&transformed).sqrt();
        let scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };

        Self {
            lambda,
            mean,
            scale,
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn transform(&self, x: f64) -> f64 {
        (yeo_johnson(x, self.lambda) - self.mean) / self.scale
    }
}

/// Ordinary least squares `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit on paired samples. With no variance in `xs` the slope is 0.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Self {
        let x_mean = mean(xs);
        let y_mean = mean(ys);
        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Coefficient of determination. A constant `actual` scores 1 only on a perfect fit.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let m = mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - m).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yeo_johnson_identity_at_one() {
        for x in [-3.5, -1.0, 0.0, 2.0, 150.0] {
            assert!((yeo_johnson(x, 1.0) - x).abs() < 1e-12);
        }
    }

    #[test]
    fn test_yeo_johnson_log_branches() {
        assert!((yeo_johnson(3.0, 0.0) - 4f64.ln()).abs() < 1e-12);
        assert!((yeo_johnson(-3.0, 2.0) + 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_data_gets_compressing_lambda() {
        let values: Vec<f64> = (1..=60).map(|i| (i as f64 / 8.0).exp()).collect();
        let transform = PowerTransform::fit(&values);
        assert!(transform.lambda() < 1.0);
        assert!(transform.lambda() >= LAMBDA_BOUNDS.0);
    }

    #[test]
    fn test_transform_is_standardized() {
        let values: Vec<f64> = (1..=50).map(|i| 20.0 + i as f64 * 3.0).collect();
        let transform = PowerTransform::fit(&values);
        let out: Vec<f64> = values.iter().map(|&v| transform.transform(v)).collect();
        assert!(mean(&out).abs() < 1e-9);
        assert!((variance(&out) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_input() {
        let transform = PowerTransform::fit(&[42.0, 42.0, 42.0]);
        assert_eq!(transform.lambda(), 1.0);
        assert_eq!(transform.transform(42.0), 0.0);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let fit = LinearFit::fit(&xs, &ys);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        let predicted: Vec<f64> = xs.iter().map(|&x| fit.predict(x)).collect();
        assert!((r_squared(&ys, &predicted) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_without_x_variance() {
        let fit = LinearFit::fit(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.predict(10.0), 2.0);
    }
}
