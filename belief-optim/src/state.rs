use crate::config::AdaBeliefConfig;
use belief_core::{BeliefError, DType, Shape, Tensor};

/// Per parameter state of AdaBelief.
///
/// State is created lazily on the first step that sees a gradient for the
/// parameter, before that the optimizer holds `None` for it. All tensors
/// have the dtype of the parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub(crate) exp_avg: Tensor,
    pub(crate) exp_avg_var: Tensor,
    pub(crate) exp_grad_norm: Option<Tensor>,
    pub(crate) max_exp_avg_var: Option<Tensor>,
}

impl Moments {
    pub(crate) fn zeros_like(param: &Tensor, config: &AdaBeliefConfig) -> Moments {
        Moments {
            exp_avg: param.zeros_like(),
            exp_avg_var: param.zeros_like(),
            exp_grad_norm: config.adanorm.then(|| Tensor::zeros(1, param.dtype())),
            max_exp_avg_var: config.ams_bound.then(|| param.zeros_like()),
        }
    }

    /// Running average of the gradient
    #[must_use]
    pub fn exp_avg(&self) -> &Tensor {
        &self.exp_avg
    }

    /// Running average of the squared residual between gradient and its average
    #[must_use]
    pub fn exp_avg_var(&self) -> &Tensor {
        &self.exp_avg_var
    }

    /// Running average of the gradient norm, only with adanorm
    #[must_use]
    pub fn exp_grad_norm(&self) -> Option<&Tensor> {
        self.exp_grad_norm.as_ref()
    }

    /// Elementwise maximum of all past `exp_avg_var`, only with ams_bound
    #[must_use]
    pub fn max_exp_avg_var(&self) -> Option<&Tensor> {
        self.max_exp_avg_var.as_ref()
    }

    /// Dtype of all state tensors
    #[must_use]
    pub fn dtype(&self) -> DType {
        self.exp_avg.dtype()
    }

    pub(crate) fn check_shape(&self, shape: &Shape) -> Result<(), BeliefError> {
        if self.exp_avg.shape() != shape {
            return Err(BeliefError::ShapeMismatch {
                expected: self.exp_avg.shape().clone(),
                found: shape.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn fill_zero(&mut self) {
        self.exp_avg.fill_zero();
        self.exp_avg_var.fill_zero();
        for t in [&mut self.exp_grad_norm, &mut self.max_exp_avg_var].into_iter().flatten() {
            t.fill_zero();
        }
    }
}
