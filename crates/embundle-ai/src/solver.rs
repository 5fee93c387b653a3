//! Multinomial logistic regression by full-batch gradient descent.
//!
//! Minimises mean cross-entropy plus `‖W‖² / (2·C·N)`, which has the same
//! minimiser as the usual `½‖W‖² + C·Σ loss` form. The bias is not penalised.
//! The step is `1/L` for the smoothness bound
//! `L = ½(max‖x‖² + 1) + 1/(C·N)`, so iterations never diverge.

use embundle_core::params::{dot, softmax};
use embundle_core::{BundleError, EmbeddingMatrix, TrainConfig};
use tracing::{debug, info};

/// Fitted weights (`C × D`) and bias (`C`).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub num_features: usize,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub iterations: usize,
    pub converged: bool,
    /// Regularised objective evaluated on the last iteration.
    pub loss: f32,
}

impl LinearModel {
    pub fn num_classes(&self) -> usize {
        self.weights.len()
    }

    /// `argmax_c(dot(x, w_c) + b_c)`.
    pub fn predict(&self, x: &[f32]) -> usize {
        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (c, (w, b)) in self.weights.iter().zip(&self.bias).enumerate() {
            let score = dot(w, x) + b;
            if score > best_score {
                best_score = score;
                best = c;
            }
        }
        best
    }

    /// Fraction of rows whose prediction equals `y`.
    pub fn accuracy(&self, x: &EmbeddingMatrix, y: &[u32]) -> f32 {
        if y.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter_rows()
            .zip(y)
            .filter(|&(row, &label)| self.predict(row) == label as usize)
            .count();
        correct as f32 / y.len() as f32
    }
}

/// Fit a `num_classes`-way linear model to rows of `x` with class ids `y`.
pub fn fit(
    x: &EmbeddingMatrix,
    y: &[u32],
    num_classes: usize,
    config: &TrainConfig,
) -> Result<LinearModel, BundleError> {
    let config = config.validate()?;
    let n = x.rows();
    let d = x.dim();
    let c = num_classes;

    // No rows means no observed classes either.
    if c == 0 || n == 0 {
        return Err(BundleError::NoClasses);
    }
    if c == 1 {
        return Err(BundleError::SingleClass("0".into()));
    }
    if y.len() != n {
        return Err(BundleError::LabelCount {
            expected: n,
            actual: y.len(),
        });
    }
    if let Some(&bad) = y.iter().find(|&&id| id as usize >= c) {
        return Err(BundleError::EncodingMismatch(format!(
            "class id {bad} out of range for {c} classes"
        )));
    }

    let lambda = 1.0 / (config.c * n as f32);
    let max_sq = x.iter_rows().map(|r| dot(r, r)).fold(0.0f32, f32::max);
    let step = 1.0 / (0.5 * (max_sq + 1.0) + lambda);
    let inv_n = 1.0 / n as f32;

    let mut w = vec![0.0f32; c * d];
    let mut b = vec![0.0f32; c];
    let mut gw = vec![0.0f32; c * d];
    let mut gb = vec![0.0f32; c];
    let mut probs = vec![0.0f32; c];

    let mut iterations = 0;
    let mut converged = false;
    let mut loss = 0.0f32;

    for iter in 0..config.max_iter {
        gw.fill(0.0);
        gb.fill(0.0);
        let mut data_loss = 0.0f32;

        for (row, &label) in x.iter_rows().zip(y) {
            for (k, p) in probs.iter_mut().enumerate() {
                *p = dot(&w[k * d..(k + 1) * d], row) + b[k];
            }
            softmax(&mut probs);
            let label = label as usize;
            data_loss -= probs[label].max(f32::MIN_POSITIVE).ln();

            for (k, &p) in probs.iter().enumerate() {
                let residual = if k == label { p - 1.0 } else { p };
                gb[k] += residual;
                for (g, &xj) in gw[k * d..(k + 1) * d].iter_mut().zip(row) {
                    *g += residual * xj;
                }
            }
        }

        let mut max_grad = 0.0f32;
        let mut penalty = 0.0f32;
        for (g, &wv) in gw.iter_mut().zip(&w) {
            *g = *g * inv_n + lambda * wv;
            max_grad = max_grad.max(g.abs());
            penalty += wv * wv;
        }
        for g in gb.iter_mut() {
            *g *= inv_n;
            max_grad = max_grad.max(g.abs());
        }
        loss = data_loss * inv_n + 0.5 * lambda * penalty;

        if iter % 50 == 0 {
            debug!(iter, loss, max_grad, "solver progress");
        }
        if max_grad < config.tol {
            converged = true;
            break;
        }

        for (wv, g) in w.iter_mut().zip(&gw) {
            *wv -= step * g;
        }
        for (bv, g) in b.iter_mut().zip(&gb) {
            *bv -= step * g;
        }
        iterations = iter + 1;
    }

    info!(
        classes = c,
        features = d,
        samples = n,
        iterations,
        converged,
        loss,
        "fitted multinomial logistic regression"
    );

    Ok(LinearModel {
        num_features: d,
        weights: (0..c).map(|k| w[k * d..(k + 1) * d].to_vec()).collect(),
        bias: b,
        iterations,
        converged,
        loss,
    })
}
