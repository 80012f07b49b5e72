//! Packing of f32 values into reduced precision storage.
//!
//! Round to nearest is biased when the same value is nudged by tiny updates
//! over and over: updates smaller than half an ulp are lost every time.
//! Stochastic rounding picks one of the two neighbouring representable
//! values with probability proportional to the distance to the other one,
//! so the expected stored value equals the f32 value.

use crate::error::BeliefError;
use crate::shape::Shape;
use crate::tensor::{Storage, Tensor};
use half::{bf16, f16};
use rand::Rng;

/// Round f32 to bf16 stochastically.
///
/// bf16 is the upper half of f32, so adding uniform noise to the lower
/// 16 bits and truncating rounds the magnitude up with probability equal
/// to the truncated fraction.
pub fn round_stochastic_bf16(x: f32, rng: &mut impl Rng) -> bf16 {
    if !x.is_finite() {
        return bf16::from_f32(x);
    }
    let noise = rng.gen::<u32>() & 0xFFFF;
    let bits = x.to_bits().wrapping_add(noise) & 0xFFFF_0000;
    bf16::from_bits((bits >> 16) as u16)
}

/// Round f32 to f16 stochastically.
///
/// f16 has a different exponent range than f32, so the two neighbours are
/// found explicitly and one of them is drawn.
pub fn round_stochastic_f16(x: f32, rng: &mut impl Rng) -> f16 {
    let nearest = f16::from_f32(x);
    let n = nearest.to_f32();
    if !x.is_finite() || !n.is_finite() || n == x {
        return nearest;
    }
    let other = if n < x { f16_next_up(nearest) } else { f16_next_down(nearest) };
    let o = other.to_f32();
    if !o.is_finite() {
        return nearest;
    }
    let (lo, hi, lo_v, hi_v) = if n < o { (nearest, other, n, o) } else { (other, nearest, o, n) };
    let p_hi = (x - lo_v) / (hi_v - lo_v);
    if rng.gen::<f32>() < p_hi {
        hi
    } else {
        lo
    }
}

fn f16_next_up(x: f16) -> f16 {
    let bits = x.to_bits();
    if bits & 0x7FFF == 0 {
        // +0 and -0 both step to the smallest positive subnormal
        f16::from_bits(0x0001)
    } else if bits & 0x8000 == 0 {
        f16::from_bits(bits + 1)
    } else {
        f16::from_bits(bits - 1)
    }
}

fn f16_next_down(x: f16) -> f16 {
    let bits = x.to_bits();
    if bits & 0x7FFF == 0 {
        f16::from_bits(0x8001)
    } else if bits & 0x8000 == 0 {
        f16::from_bits(bits - 1)
    } else {
        f16::from_bits(bits + 1)
    }
}

/// Write `src` into `dst`, rounding stochastically when `dst` is stored
/// in reduced precision. f32 destinations are copied exactly.
pub fn copy_stochastic(dst: &mut Tensor, src: &[f32], rng: &mut impl Rng) -> Result<(), BeliefError> {
    if dst.numel() != src.len() {
        return Err(BeliefError::ShapeMismatch {
            expected: dst.shape().clone(),
            found: Shape::from(src.len()),
        });
    }
    match dst.storage_mut() {
        Storage::BF16(x) => {
            for (d, &s) in x.iter_mut().zip(src) {
                *d = round_stochastic_bf16(s, rng);
            }
        }
        Storage::F16(x) => {
            for (d, &s) in x.iter_mut().zip(src) {
                *d = round_stochastic_f16(s, rng);
            }
        }
        Storage::F32(x) => x.copy_from_slice(src),
    }
    Ok(())
}

/// Full precision working view of a tensor.
///
/// f32 tensors are borrowed directly. Reduced precision tensors are
/// unpacked into an f32 buffer, which [`Promoted::finish`] packs back
/// with stochastic rounding.
pub struct Promoted<'a> {
    target: &'a mut Tensor,
    buffer: Option<Vec<f32>>,
}

impl<'a> Promoted<'a> {
    /// Unpack target into full precision, if needed.
    pub fn new(target: &'a mut Tensor) -> Promoted<'a> {
        let buffer = target.dtype().is_reduced().then(|| target.to_f32_vec());
        Promoted { target, buffer }
    }

    /// Whether the target is stored in reduced precision
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.buffer.is_some()
    }

    /// Full precision values
    pub fn as_slice(&self) -> &[f32] {
        match &self.buffer {
            Some(buffer) => buffer,
            None => self.target.as_f32().unwrap_or(&[]),
        }
    }

    /// Full precision values, writes go to the target directly for f32
    /// tensors and to the working buffer otherwise.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        match &mut self.buffer {
            Some(buffer) => buffer,
            None => self.target.as_f32_mut().unwrap_or(&mut []),
        }
    }

    /// Write the working buffer back into the target.
    pub fn finish(self, rng: &mut impl Rng) -> Result<(), BeliefError> {
        match self.buffer {
            Some(buffer) => copy_stochastic(self.target, &buffer, rng),
            None => Ok(()),
        }
    }
}
