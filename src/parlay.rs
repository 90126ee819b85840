use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PropError, PropResult};
use crate::projection::LegProjection;

pub const MIN_LEGS: usize = 2;
pub const DEFAULT_COPULA_POINTS: usize = 4096;

const PSD_TOLERANCE: f64 = 1e-9;
const PROB_EPS: f64 = 1e-12;

// Payout multiplier by leg count; counts outside the table pay the 12-leg price.
const PAYOUTS: &[(usize, f64)] = &[
    (2, 2.64),
    (3, 5.96),
    (4, 11.28),
    (5, 23.35),
    (6, 47.0),
    (7, 75.0),
    (8, 95.0),
    (9, 150.0),
    (10, 250.0),
    (11, 350.0),
    (12, 400.0),
];
const FALLBACK_PAYOUT: f64 = 400.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "matrix", rename_all = "lowercase")]
pub enum ParlayMode {
    #[default]
    Independent,
    Correlated(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayQuote {
    pub legs: usize,
    /// Joint hit probability in [0, 1].
    pub probability: f64,
    pub odds_multiplier: f64,
    pub american_odds: String,
    /// Expected value in percent of stake.
    pub expected_value: f64,
    /// Sum of leg quantiles over the standard deviation of that sum (correlated mode only).
    pub composite_z: Option<f64>,
}

impl ParlayQuote {
    pub fn payout(&self, stake: f64) -> f64 {
        stake * self.odds_multiplier
    }
}

pub fn odds_multiplier(legs: usize) -> f64 {
    PAYOUTS
        .iter()
        .find(|(n, _)| *n == legs)
        .map(|(_, m)| *m)
        .unwrap_or(FALLBACK_PAYOUT)
}

pub fn american_odds(multiplier: f64) -> String {
    format!("+{:.0}", multiplier * 100.0)
}

pub fn expected_value(probability: f64, multiplier: f64) -> f64 {
    (probability * multiplier - 1.0) * 100.0
}

pub fn aggregate_parlay(confidences: &[f64], mode: &ParlayMode) -> PropResult<ParlayQuote> {
    aggregate_parlay_with_points(confidences, mode, DEFAULT_COPULA_POINTS)
}

pub fn aggregate_legs(legs: &[LegProjection], mode: &ParlayMode) -> PropResult<ParlayQuote> {
    let confidences: Vec<f64> = legs.iter().map(|l| l.confidence).collect();
    aggregate_parlay(&confidences, mode)
}

/// Like `aggregate_parlay`, with an explicit lattice size for the correlated integral.
pub fn aggregate_parlay_with_points(
    confidences: &[f64],
    mode: &ParlayMode,
    points: usize,
) -> PropResult<ParlayQuote> {
    let n = confidences.len();
    if n < MIN_LEGS {
        return Err(PropError::TooFewLegs(n));
    }
    let mut probs = Vec::with_capacity(n);
    for c in confidences {
        if !c.is_finite() || !(0.0..=100.0).contains(c) {
            return Err(PropError::InvalidConfidence(*c));
        }
        probs.push(c / 100.0);
    }

    let (probability, composite_z) = match mode {
        ParlayMode::Independent => (probs.iter().product::<f64>(), None),
        ParlayMode::Correlated(matrix) => {
            let corr = normalize_correlation(matrix, n)?;
            let chol = cholesky(&corr)?;
            let z: Vec<f64> = probs
                .iter()
                .map(|p| normal_quantile(p.clamp(PROB_EPS, 1.0 - PROB_EPS)))
                .collect();
            let total_var: f64 = corr.iter().flatten().sum();
            let composite = (total_var > 0.0).then(|| z.iter().sum::<f64>() / total_var.sqrt());
            let joint = if probs.iter().any(|p| *p <= 0.0) {
                0.0
            } else {
                orthant_probability(&z, &chol, points.max(1))
            };
            (joint, composite)
        }
    };

    let probability = probability.clamp(0.0, 1.0);
    let odds_multiplier = odds_multiplier(n);
    debug!(legs = n, probability, odds_multiplier, "aggregated parlay");

    Ok(ParlayQuote {
        legs: n,
        probability,
        odds_multiplier,
        american_odds: american_odds(odds_multiplier),
        expected_value: expected_value(probability, odds_multiplier),
        composite_z,
    })
}

/// Checks dimensions, averages (i, j) with (j, i), pins the diagonal to 1 and rejects entries
/// outside [-1, 1].
pub fn normalize_correlation(matrix: &[Vec<f64>], n: usize) -> PropResult<Vec<Vec<f64>>> {
    if matrix.len() != n {
        return Err(PropError::MatrixDimension {
            expected: n,
            rows: matrix.len(),
        });
    }
    if let Some((row, cols)) = matrix
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|(_, cols)| *cols != n)
    {
        return Err(PropError::MatrixRowLength {
            row,
            expected: n,
            cols,
        });
    }

    let mut out = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                out[i][j] = 1.0;
                continue;
            }
            let v = (matrix[i][j] + matrix[j][i]) / 2.0;
            if !v.is_finite() || !(-1.0..=1.0).contains(&v) {
                return Err(PropError::InvalidCorrelation {
                    row: i,
                    col: j,
                    value: v,
                });
            }
            out[i][j] = v;
        }
    }
    Ok(out)
}

/// Lower-triangular factor of a positive semi-definite matrix. Zero pivots are allowed, so
/// perfectly correlated legs still factor.
pub fn cholesky(matrix: &[Vec<f64>]) -> PropResult<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let s = matrix[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if s < -PSD_TOLERANCE {
                    return Err(PropError::MatrixNotPositiveSemiDefinite { row: i, pivot: s });
                }
                l[i][i] = s.max(0.0).sqrt();
            } else if l[j][j] > PSD_TOLERANCE {
                l[i][j] = s / l[j][j];
            } else if s.abs() > PSD_TOLERANCE.sqrt() {
                return Err(PropError::MatrixNotPositiveSemiDefinite { row: i, pivot: s });
            }
        }
    }
    Ok(l)
}

/// P(Z_i <= z_i for all i) for a Gaussian vector with Cholesky factor `chol`, via Genz's
/// separation of variables over a Richtmyer lattice with antithetic pairs.
fn orthant_probability(z: &[f64], chol: &[Vec<f64>], points: usize) -> f64 {
    let n = z.len();
    let first = conditional_cdf(z[0], 0.0, chol[0][0]);
    if n == 1 {
        return first;
    }

    let alphas: Vec<f64> = first_primes(n - 1)
        .into_iter()
        .map(|p| (p as f64).sqrt())
        .collect();
    let mut w = vec![0.0; n - 1];
    let mut y = vec![0.0; n];
    let mut total = 0.0;
    for k in 1..=points {
        for (wi, a) in w.iter_mut().zip(&alphas) {
            *wi = (k as f64 * a).fract();
        }
        total += genz_sample(z, chol, first, &w, &mut y, false);
        total += genz_sample(z, chol, first, &w, &mut y, true);
    }
    total / (2 * points) as f64
}

fn genz_sample(
    z: &[f64],
    chol: &[Vec<f64>],
    first: f64,
    w: &[f64],
    y: &mut [f64],
    antithetic: bool,
) -> f64 {
    let mut e = first;
    let mut f = first;
    for i in 1..z.len() {
        let wi = if antithetic { 1.0 - w[i - 1] } else { w[i - 1] };
        y[i - 1] = normal_quantile((wi * e).clamp(PROB_EPS, 1.0 - PROB_EPS));
        let shift: f64 = (0..i).map(|j| chol[i][j] * y[j]).sum();
        e = conditional_cdf(z[i], shift, chol[i][i]);
        f *= e;
        if f == 0.0 {
            break;
        }
    }
    f
}

fn conditional_cdf(z: f64, shift: f64, scale: f64) -> f64 {
    if scale > PSD_TOLERANCE {
        normal_cdf((z - shift) / scale)
    } else if z - shift >= 0.0 {
        1.0
    } else {
        0.0
    }
}

fn first_primes(n: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|p| *p * *p <= candidate)
            .all(|p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Standard normal CDF approximation (Abramowitz and Stegun 7.1.26).
///
/// The polynomial is scaled by its value at t = 1 so that erf(0) is exactly 0: the CDF is 0.5
/// at the centre and continuous across it.
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }
    if x == 0.0 {
        return 0.5;
    }

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let y = 1.0 - erf_poly(t) / erf_poly(1.0) * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

fn erf_poly(t: f64) -> f64 {
    const A: [f64; 5] = [
        0.254829592,
        -0.284496736,
        1.421413741,
        -1.453152027,
        1.061405429,
    ];
    ((((A[4] * t + A[3]) * t + A[2]) * t + A[1]) * t + A[0]) * t
}

/// Inverse of `normal_cdf`: Acklam's rational approximation, polished with Newton steps against
/// `normal_cdf` itself so the pair round-trips.
pub fn normal_quantile(p: f64) -> f64 {
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

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let mut x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    for _ in 0..2 {
        let residual = normal_cdf(x) - p;
        let pdf = (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
        if residual.abs() < 1e-15 || pdf <= f64::MIN_POSITIVE {
            break;
        }
        x -= residual / pdf;
    }
    x
}
