use crate::error::BeliefError;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Memory layout of a gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every element stored
    Dense,
    /// Only nonzero elements stored, as (flat index, value) pairs
    Sparse,
}

/// Sparse gradient in coordinate format over flat indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    shape: Shape,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseTensor {
    /// Create sparse tensor, every index must be within the shape.
    pub fn new(
        shape: impl Into<Shape>,
        indices: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<SparseTensor, BeliefError> {
        let shape = shape.into();
        if indices.len() != values.len() {
            return Err(BeliefError::ShapeMismatch {
                expected: Shape::from(indices.len()),
                found: Shape::from(values.len()),
            });
        }
        if let Some(&i) = indices.iter().find(|&&i| i >= shape.numel()) {
            return Err(BeliefError::ShapeMismatch {
                expected: shape,
                found: Shape::from(i + 1),
            });
        }
        Ok(SparseTensor { shape, indices, values })
    }

    /// Shape of the dense tensor this represents
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of stored elements
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// Gradient attached to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    /// Dense gradient
    Dense(Tensor),
    /// Sparse gradient, optimizers that need element wise access reject it
    Sparse(SparseTensor),
}

impl Gradient {
    /// Layout of this gradient
    #[must_use]
    pub fn layout(&self) -> Layout {
        match self {
            Gradient::Dense(_) => Layout::Dense,
            Gradient::Sparse(_) => Layout::Sparse,
        }
    }

    /// Dense tensor, None if the gradient is sparse
    #[must_use]
    pub fn as_dense(&self) -> Option<&Tensor> {
        match self {
            Gradient::Dense(x) => Some(x),
            Gradient::Sparse(_) => None,
        }
    }

    /// Shape of the gradient
    #[must_use]
    pub fn shape(&self) -> &Shape {
        match self {
            Gradient::Dense(x) => x.shape(),
            Gradient::Sparse(x) => x.shape(),
        }
    }
}

impl From<Tensor> for Gradient {
    fn from(value: Tensor) -> Self {
        Gradient::Dense(value)
    }
}

impl From<SparseTensor> for Gradient {
    fn from(value: SparseTensor) -> Self {
        Gradient::Sparse(value)
    }
}

#[test]
fn sparse_indices_are_checked() {
    let x = SparseTensor::new([2, 2], vec![0, 3], vec![1., 2.]);
    assert_eq!(x.map(|x| x.nnz()), Ok(2));
    assert!(SparseTensor::new([2, 2], vec![4], vec![1.]).is_err());
    assert!(SparseTensor::new([2, 2], vec![1, 2], vec![1.]).is_err());
}
