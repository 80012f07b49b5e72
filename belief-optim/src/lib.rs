//! # belief-optim
//!
//! AdaBelief optimizer for belief-core parameter stores.
//!
//! AdaBelief adapts step sizes by the belief in observed gradients,
//! it divides the running average of the gradient by the square root of
//! the running average of the squared deviation of the gradient from it.
//! Per group, it can be combined with RAdam style rectification,
//! AMSBound, AdaNorm and cautious masking.
//!
//! Parameters stored in bf16 or f16 are updated in f32 and packed back
//! with stochastic rounding, as is all optimizer state.
//!
//! Optional feature `parallel` (on by default) updates parameters of
//! one group on the rayon thread pool.

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

mod adabelief;
pub use adabelief::{AdaBelief, ParamGroup};

mod config;
pub use config::AdaBeliefConfig;

// Per step quantities and per parameter state
mod plan;
pub use plan::{StepPlan, Update};

mod state;
pub use state::Moments;

mod schema;
pub use schema::{FieldKind, FieldSchema, FieldValue};
