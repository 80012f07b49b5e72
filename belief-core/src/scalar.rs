use crate::dtype::DType;
use half::{bf16, f16};

/// Scalar trait is implemented for all [dtypes](DType)
pub trait Scalar: Copy + Sized + core::fmt::Debug + Send + Sync + 'static {
    /// Get dtype of Self
    fn dtype() -> DType;
    /// Convert f32 into Self, rounding to nearest
    fn from_f32(t: f32) -> Self;
    /// Convert self into f32, this is always exact
    fn into_f32(self) -> f32;
}

impl Scalar for f32 {
    fn dtype() -> DType {
        DType::F32
    }

    fn from_f32(t: f32) -> Self {
        t
    }

    fn into_f32(self) -> f32 {
        self
    }
}

impl Scalar for bf16 {
    fn dtype() -> DType {
        DType::BF16
    }

    fn from_f32(t: f32) -> Self {
        bf16::from_f32(t)
    }

    fn into_f32(self) -> f32 {
        self.to_f32()
    }
}

impl Scalar for f16 {
    fn dtype() -> DType {
        DType::F16
    }

    fn from_f32(t: f32) -> Self {
        f16::from_f32(t)
    }

    fn into_f32(self) -> f32 {
        self.to_f32()
    }
}
