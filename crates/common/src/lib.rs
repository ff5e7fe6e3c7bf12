//! Shared types and error definitions used across all quickreply crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{ChannelOutbound, InboundMessage, MessageKind, QuotedMessage},
};
