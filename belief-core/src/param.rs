//! Trainable parameters live in an arena and are referred to by [ParamId].
//! Optimizer state is keyed by the same handle.

use crate::error::BeliefError;
use crate::grad::Gradient;
use crate::tensor::Tensor;

/// Stable handle of a parameter inside a [ParamStore].
#[derive(Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash, Debug)]
pub struct ParamId(usize);

impl ParamId {
    /// Convert id to usize
    #[must_use]
    pub const fn i(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for ParamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

/// Trainable tensor with an optionally attached gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter values, updated in place by optimizers
    pub data: Tensor,
    /// Gradient from the last backward pass, None if the parameter did not
    /// take part in it
    pub grad: Option<Gradient>,
}

impl Parameter {
    /// Parameter without gradient
    #[must_use]
    pub fn new(data: Tensor) -> Parameter {
        Parameter { data, grad: None }
    }
}

/// Arena of parameters. Handles are never invalidated, parameters are
/// never removed.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    params: Vec<Parameter>,
}

impl ParamStore {
    /// Empty store
    #[must_use]
    pub fn new() -> ParamStore {
        ParamStore::default()
    }

    /// Add parameter, returns its handle
    pub fn insert(&mut self, data: Tensor) -> ParamId {
        self.params.push(Parameter::new(data));
        ParamId(self.params.len() - 1)
    }

    /// Get parameter
    #[must_use]
    pub fn get(&self, id: ParamId) -> Option<&Parameter> {
        self.params.get(id.0)
    }

    /// Get mutable parameter
    pub fn get_mut(&mut self, id: ParamId) -> Option<&mut Parameter> {
        self.params.get_mut(id.0)
    }

    /// Parameter values
    #[must_use]
    pub fn data(&self, id: ParamId) -> Option<&Tensor> {
        self.get(id).map(|p| &p.data)
    }

    /// Attach gradient to parameter, replacing the previous one.
    /// Gradient must have the same shape as the parameter.
    pub fn set_grad(&mut self, id: ParamId, grad: impl Into<Gradient>) -> Result<(), BeliefError> {
        let param = self.params.get_mut(id.0).ok_or(BeliefError::UnknownParameter { param: id })?;
        let grad = grad.into();
        if grad.shape() != param.data.shape() {
            return Err(BeliefError::ShapeMismatch {
                expected: param.data.shape().clone(),
                found: grad.shape().clone(),
            });
        }
        param.grad = Some(grad);
        Ok(())
    }

    /// Detach gradients from all parameters
    pub fn zero_grad(&mut self) {
        for p in &mut self.params {
            p.grad = None;
        }
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Handles of all parameters in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ParamId> {
        (0..self.params.len()).map(ParamId)
    }

    /// All parameters as a slice indexed by [`ParamId::i`]
    pub fn as_mut_slice(&mut self) -> &mut [Parameter] {
        &mut self.params
    }
}
