/// DType of tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    /// 16 bit brain floating point type
    BF16,
    /// 16 bit IEEE floating point type
    F16,
    /// 32 bit floating point type
    F32,
}

impl DType {
    /// Reduced precision dtypes are promoted to f32 for arithmetic
    /// and packed back with stochastic rounding.
    #[must_use]
    pub const fn is_reduced(self) -> bool {
        matches!(self, Self::BF16 | Self::F16)
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DType::BF16 => "BF16",
            DType::F16 => "F16",
            DType::F32 => "F32",
        })
    }
}
