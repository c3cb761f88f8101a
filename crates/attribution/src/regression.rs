//! Attribution model — ordinary least squares of period sales on per-channel
//! spend plus an intercept.
//!
//! The fit uses a Householder QR decomposition of the design matrix rather
//! than the normal equations, so conditioning is that of `X`, not `XᵀX`.
//! Rank deficiency is reported, never regularized away.

use crate::design::DesignMatrix;
use mix_core::config::SolverConfig;
use mix_core::error::{MixError, MixResult, SingularReason};
use mix_core::types::Metric;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A fitted linear attribution model. Read-only after fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionModel {
    /// Baseline sales not attributable to any channel.
    pub intercept: f64,
    /// Channel names, in design-matrix column order.
    pub channels: Vec<String>,
    /// Marginal sales per unit of spend, one per channel (intercept excluded).
    pub coefficients: Vec<f64>,
    /// Channels whose spend is zero in every period. They are left out of the
    /// regression and carry a coefficient of zero.
    pub zero_spend: Vec<String>,
    pub observations: usize,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Undefined when the response has no variance.
    pub r_squared: Metric,
}

impl AttributionModel {
    /// Fit the model to a design matrix.
    pub fn fit(matrix: &DesignMatrix, solver: &SolverConfig) -> MixResult<Self> {
        let spend = matrix.spend();
        let active: Vec<usize> = (0..matrix.num_channels())
            .filter(|&c| spend.column(c).iter().any(|v| *v != 0.0))
            .collect();
        let zero_spend: Vec<String> = (0..matrix.num_channels())
            .filter(|c| !active.contains(c))
            .map(|c| matrix.channels()[c].clone())
            .collect();

        let n = matrix.num_periods();
        let p = active.len() + 1;
        if n < p {
            return Err(MixError::SingularMatrix(
                SingularReason::InsufficientPeriods {
                    periods: n,
                    parameters: p,
                },
            ));
        }

        let mut x = Array2::<f64>::ones((n, p));
        for (j, &c) in active.iter().enumerate() {
            x.column_mut(j + 1).assign(&spend.column(c));
        }
        let y = matrix.response().clone();

        let beta = solve_least_squares(&x, &y, solver.rank_tolerance).map_err(|column| {
            // Column 0 is the intercept, which can only be rank-deficient
            // when there are no observations; `n >= p` rules that out.
            let channel = active
                .get(column.saturating_sub(1))
                .map(|&c| matrix.channels()[c].clone())
                .unwrap_or_default();
            MixError::SingularMatrix(SingularReason::CollinearChannel { channel })
        })?;

        let fitted = x.dot(&beta);
        let residuals = &y - &fitted;
        let rss = residuals.mapv(|r| r * r).sum();
        let mean = y.mean().unwrap_or(0.0);
        let tss = y.mapv(|v| (v - mean) * (v - mean)).sum();
        let r_squared = if tss == 0.0 {
            Metric::Undefined
        } else {
            Metric::Value(1.0 - rss / tss)
        };

        let mut coefficients = vec![0.0; matrix.num_channels()];
        for (j, &c) in active.iter().enumerate() {
            coefficients[c] = beta[j + 1];
        }

        if !zero_spend.is_empty() {
            debug!(channels = ?zero_spend, "Channels with zero spend excluded from fit");
        }
        info!(
            observations = n,
            parameters = p,
            intercept = beta[0],
            r_squared = %r_squared,
            "Attribution model fitted"
        );

        Ok(Self {
            intercept: beta[0],
            channels: matrix.channels().to_vec(),
            coefficients,
            zero_spend,
            observations: n,
            fitted: fitted.to_vec(),
            residuals: residuals.to_vec(),
            r_squared,
        })
    }

    pub fn coefficient(&self, channel: &str) -> Option<f64> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .map(|i| self.coefficients[i])
    }

    /// Predicted period sales for the given per-channel spend. Channels not
    /// mentioned spend nothing.
    pub fn predict(&self, spend: &HashMap<String, f64>) -> MixResult<f64> {
        let unknown: Vec<String> = spend
            .keys()
            .filter(|c| !self.channels.contains(c))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let mut channels = unknown;
            channels.sort();
            return Err(MixError::UnknownChannel { channels });
        }

        Ok(self
            .channels
            .iter()
            .zip(&self.coefficients)
            .fold(self.intercept, |acc, (channel, coef)| {
                acc + coef * spend.get(channel).copied().unwrap_or(0.0)
            }))
    }
}

/// Solve `min ‖x·β − y‖` by Householder QR.
///
/// On rank deficiency returns the index of the first column whose component
/// orthogonal to the preceding columns is below `tolerance` times its norm.
fn solve_least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    tolerance: f64,
) -> Result<Array1<f64>, usize> {
    let (n, p) = x.dim();
    let norms: Vec<f64> = (0..p)
        .map(|j| x.column(j).mapv(|v| v * v).sum().sqrt())
        .collect();

    let mut a = x.clone();
    let mut b = y.clone();

    for j in 0..p {
        let alpha = a.slice(s![j.., j]).mapv(|v| v * v).sum().sqrt();
        if norms[j] == 0.0 || alpha <= tolerance * norms[j] {
            return Err(j);
        }

        // Reflect a[j.., j] onto ∓alpha·e1, choosing the sign that avoids
        // cancellation.
        let head = a[[j, j]];
        let diag = if head > 0.0 { -alpha } else { alpha };
        let mut v = a.slice(s![j.., j]).to_owned();
        v[0] -= diag;
        let v_norm_sq = v.mapv(|e| e * e).sum();

        for k in j..p {
            let proj = v.dot(&a.slice(s![j.., k])) * 2.0 / v_norm_sq;
            let mut col = a.slice_mut(s![j.., k]);
            col.scaled_add(-proj, &v);
        }
        let proj = v.dot(&b.slice(s![j..])) * 2.0 / v_norm_sq;
        b.slice_mut(s![j..]).scaled_add(-proj, &v);

        a[[j, j]] = diag;
        for i in (j + 1)..n {
            a[[i, j]] = 0.0;
        }
    }

    // Back substitution on the upper-triangular R.
    let mut beta = Array1::<f64>::zeros(p);
    for i in (0..p).rev() {
        let tail: f64 = ((i + 1)..p).map(|k| a[[i, k]] * beta[k]).sum();
        beta[i] = (b[i] - tail) / a[[i, i]];
    }
    Ok(beta)
}
