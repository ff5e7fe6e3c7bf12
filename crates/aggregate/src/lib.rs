//! Per-conversation message coalescing.
//!
//! Rapid-fire messages from one conversation are buffered and flushed as a
//! single query once the conversation has been quiet for the debounce
//! window. Each conversation is independent; there is no ordering across
//! conversations.

pub mod aggregator;

pub use aggregator::{Aggregator, FlushSink};
