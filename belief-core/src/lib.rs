//! # belief-core
//!
//! belief-core is core part of belief optimizers.
//! belief-core contains definitions and functions for dense tensor,
//! dtype, shape, scalar, gradient layout, parameter store and the
//! stochastic rounding used to pack full precision values into
//! reduced precision storage.
//!
#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![warn(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]
#![forbid(rustdoc::unescaped_backticks)]
#![forbid(rustdoc::redundant_explicit_links)]

/// See [DType](dtype::DType)
pub mod dtype;
/// See [BeliefError](error::BeliefError)
pub mod error;
/// See [Gradient](grad::Gradient)
pub mod grad;
pub mod param;
pub mod rounding;
/// See [Scalar](scalar::Scalar)
pub mod scalar;
/// See [Shape](shape::Shape)
pub mod shape;
/// See [Tensor](tensor::Tensor)
pub mod tensor;

pub use dtype::DType;
pub use error::BeliefError;
pub use grad::{Gradient, Layout, SparseTensor};
pub use param::{ParamId, ParamStore, Parameter};
pub use rounding::{copy_stochastic, round_stochastic_bf16, round_stochastic_f16, Promoted};
pub use scalar::Scalar;
pub use shape::Shape;
pub use tensor::{Storage, Tensor};
