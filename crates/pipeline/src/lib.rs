//! The message pipeline: classify → extract → aggregate → dispatch → send.
//!
//! One [`Pipeline`] per running gateway. Inbound messages go in, replies
//! come out through the channel's outbound adapter; everything in between
//! (debouncing, retries, fallbacks) is this crate's callees' business.

pub mod gating;
pub mod pipeline;

pub use pipeline::{Pipeline, PipelineOptions};
