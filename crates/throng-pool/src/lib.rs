//! Social pooling for Throng.
//!
//! Two stages run once per frame, before any recurrent update:
//!
//! - [`frame_mask`] assigns each (agent, neighbor) pair to at most one
//!   bin of a `G×G` grid centred on the agent ([`GridMask`]).
//! - [`social_tensor`] sums, per agent and bin, the hidden states of the
//!   neighbors in that bin, producing a `[N, G²·H]` tensor.
//!
//! [`social_tensor_backward`] is the adjoint of the aggregation, used by
//! backpropagation through time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod mask;
pub mod social;

pub use mask::{frame_mask, sequence_masks, GridMask, PoolingGrid};
pub use social::{social_tensor, social_tensor_backward};
