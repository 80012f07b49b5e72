use crate::dtype::DType;
use crate::error::BeliefError;
use crate::scalar::Scalar;
use crate::shape::Shape;
use half::{bf16, f16};

/// Backing buffer of a dense tensor, one variant per [dtype](DType).
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// bf16 elements
    BF16(Vec<bf16>),
    /// f16 elements
    F16(Vec<f16>),
    /// f32 elements
    F32(Vec<f32>),
}

impl Storage {
    fn zeros(n: usize, dtype: DType) -> Storage {
        match dtype {
            DType::BF16 => Storage::BF16(vec![bf16::ZERO; n]),
            DType::F16 => Storage::F16(vec![f16::ZERO; n]),
            DType::F32 => Storage::F32(vec![0.; n]),
        }
    }

    // Rounds to nearest, stochastic packing lives in crate::rounding
    fn from_f32(data: impl Iterator<Item = f32>, dtype: DType) -> Storage {
        match dtype {
            DType::BF16 => Storage::BF16(data.map(bf16::from_f32).collect()),
            DType::F16 => Storage::F16(data.map(f16::from_f32).collect()),
            DType::F32 => Storage::F32(data.collect()),
        }
    }

    /// Number of stored elements
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Storage::BF16(x) => x.len(),
            Storage::F16(x) => x.len(),
            Storage::F32(x) => x.len(),
        }
    }

    /// Whether the buffer holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [DType] of stored elements
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Storage::BF16(_) => DType::BF16,
            Storage::F16(_) => DType::F16,
            Storage::F32(_) => DType::F32,
        }
    }
}

/// Dense multidimensional array stored in row major order.
///
/// Tensor owns its buffer, all mutation is in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    storage: Storage,
}

impl Tensor {
    /// Tensor filled with zeros
    #[must_use]
    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Tensor {
        let shape = shape.into();
        let storage = Storage::zeros(shape.numel(), dtype);
        Tensor { shape, storage }
    }

    /// Zero filled tensor with the same shape and dtype as self
    #[must_use]
    pub fn zeros_like(&self) -> Tensor {
        Tensor::zeros(self.shape.clone(), self.dtype())
    }

    /// Create tensor from elements of any [Scalar] type. Dtype of the tensor
    /// is the dtype of the scalar.
    /// ```
    /// use belief_core::{DType, Tensor};
    /// let x = Tensor::from_vec(vec![2f32, 3., 1., 4., 1., 3.], [2, 3])?;
    /// assert_eq!(x.shape(), &[2, 3]);
    /// assert_eq!(x.dtype(), DType::F32);
    /// # Ok::<(), belief_core::BeliefError>(())
    /// ```
    pub fn from_vec<T: Scalar>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Tensor, BeliefError> {
        Tensor::from_f32(data.into_iter().map(Scalar::into_f32), shape, T::dtype())
    }

    /// Create tensor of given dtype from f32 values, rounding each to nearest.
    pub fn from_f32(
        data: impl IntoIterator<Item = f32>,
        shape: impl Into<Shape>,
        dtype: DType,
    ) -> Result<Tensor, BeliefError> {
        let shape = shape.into();
        let storage = Storage::from_f32(data.into_iter(), dtype);
        if storage.len() != shape.numel() {
            return Err(BeliefError::ShapeMismatch {
                expected: shape,
                found: Shape::from(storage.len()),
            });
        }
        Ok(Tensor { shape, storage })
    }

    /// Returns the [shape](Shape) of the self tensor.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns number of elements in the self tensor.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns the [dtype](DType) of the self tensor.
    #[must_use]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Backing buffer
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Copy elements out of the tensor. `T` must match the tensor's dtype.
    pub fn to_vec<T: Scalar>(&self) -> Result<Vec<T>, BeliefError> {
        if T::dtype() != self.dtype() {
            return Err(BeliefError::DTypeMismatch {
                expected: T::dtype(),
                found: self.dtype(),
            });
        }
        // Same dtype, so the round trip through f32 is exact
        Ok(self.to_f32_vec().into_iter().map(T::from_f32).collect())
    }

    /// Full precision copy of the elements, exact for every dtype.
    #[must_use]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.storage {
            Storage::BF16(x) => x.iter().map(|v| v.to_f32()).collect(),
            Storage::F16(x) => x.iter().map(|v| v.to_f32()).collect(),
            Storage::F32(x) => x.clone(),
        }
    }

    /// Borrow elements of f32 tensor, None for reduced precision tensors.
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.storage {
            Storage::F32(x) => Some(x),
            _ => None,
        }
    }

    /// Mutably borrow elements of f32 tensor, None for reduced precision tensors.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.storage {
            Storage::F32(x) => Some(x),
            _ => None,
        }
    }

    /// First element as f32, None for empty tensors.
    /// Usually used for tensors with exactly one element.
    #[must_use]
    pub fn item(&self) -> Option<f32> {
        match &self.storage {
            Storage::BF16(x) => x.first().map(|v| v.to_f32()),
            Storage::F16(x) => x.first().map(|v| v.to_f32()),
            Storage::F32(x) => x.first().copied(),
        }
    }

    /// Euclidean norm of all elements
    #[must_use]
    pub fn l2_norm(&self) -> f32 {
        match &self.storage {
            Storage::F32(x) => l2_norm(x),
            _ => l2_norm(&self.to_f32_vec()),
        }
    }

    /// Set all elements to zero, keeping shape and dtype
    pub fn fill_zero(&mut self) {
        match &mut self.storage {
            Storage::BF16(x) => x.fill(bf16::ZERO),
            Storage::F16(x) => x.fill(f16::ZERO),
            Storage::F32(x) => x.fill(0.),
        }
    }
}

/// Euclidean norm of a slice, accumulated in f64
#[must_use]
pub fn l2_norm(x: &[f32]) -> f32 {
    x.iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt() as f32
}

impl<const N: usize> From<[f32; N]> for Tensor {
    fn from(value: [f32; N]) -> Self {
        Tensor {
            shape: Shape::from(N),
            storage: Storage::F32(value.into()),
        }
    }
}

impl From<Vec<f32>> for Tensor {
    fn from(value: Vec<f32>) -> Self {
        Tensor {
            shape: Shape::from(value.len()),
            storage: Storage::F32(value),
        }
    }
}
