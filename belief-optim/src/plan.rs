//! Group wide quantities of one optimizer step.
//!
//! Bias corrections and the rectification term depend only on the step
//! count and group hyperparameters, so they are computed once per group
//! in f64 and shared by all parameters.

use crate::config::AdaBeliefConfig;

/// How parameters move in this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    /// `p -= step_size * m / ((sqrt(v) + eps) / denom_correction)`
    Adaptive {
        /// learning rate with bias correction and rectification applied
        step_size: f32,
        /// second moment bias correction applied to the denominator
        denom_correction: f32,
    },
    /// `p -= step_size * m`, used by rectification while the variance
    /// estimate is not yet tractable
    Momentum {
        /// learning rate with bias correction applied
        step_size: f32,
    },
    /// Running averages are updated, parameters stay
    Skip,
}

/// Everything a step needs besides per parameter tensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Step count after increment, starts at 1
    pub step: u64,
    /// `1 - beta1^step`
    pub bias_correction1: f64,
    /// `sqrt(1 - beta2^step)`
    pub bias_correction2_sqrt: f64,
    /// Length of the approximated SMA, only with rectify
    pub n_sma: Option<f64>,
    /// Update kind
    pub update: Update,
}

impl StepPlan {
    /// Plan step number `step` (counting from 1) of group with `config`
    #[must_use]
    pub fn new(config: &AdaBeliefConfig, step: u64) -> StepPlan {
        let (beta1, beta2) = (f64::from(config.beta1), f64::from(config.beta2));
        let bias_correction1 = debias(beta1, step);
        let bias_correction2_sqrt = debias(beta2, step).sqrt();
        let lr = f64::from(config.lr);
        let debiased = |step_size: f64| {
            if config.adam_debias {
                step_size
            } else {
                step_size / bias_correction1
            }
        };

        if !config.rectify {
            return StepPlan {
                step,
                bias_correction1,
                bias_correction2_sqrt,
                n_sma: None,
                update: Update::Adaptive {
                    step_size: debiased(lr) as f32,
                    denom_correction: bias_correction2_sqrt as f32,
                },
            };
        }

        let (rt, n_sma) = rectification(beta2, step);
        let update = if n_sma >= f64::from(config.n_sma_threshold) {
            Update::Adaptive { step_size: debiased(lr * rt) as f32, denom_correction: 1. }
        } else if config.degenerated_to_sgd {
            Update::Momentum { step_size: debiased(lr) as f32 }
        } else {
            Update::Skip
        };
        StepPlan { step, bias_correction1, bias_correction2_sqrt, n_sma: Some(n_sma), update }
    }
}

/// `1 - beta^step`
fn debias(beta: f64, step: u64) -> f64 {
    1. - beta.powf(step as f64)
}

/// Variance rectification term of RAdam and length of the approximated SMA.
/// The term is only meaningful when `n_sma > 4`.
fn rectification(beta2: f64, step: u64) -> (f64, f64) {
    let n_sma_max = 2. / (1. - beta2) - 1.;
    let beta2_t = beta2.powf(step as f64);
    let n_sma = n_sma_max - 2. * step as f64 * beta2_t / (1. - beta2_t);
    if n_sma <= 4. {
        return (0., n_sma);
    }
    let rt = ((1. - beta2_t) * (n_sma - 4.) / (n_sma_max - 4.) * (n_sma - 2.) / n_sma * n_sma_max
        / (n_sma_max - 2.))
        .sqrt();
    (rt, n_sma)
}
