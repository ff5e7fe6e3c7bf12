//! Resilient dispatch to the answer-generation service.
//!
//! One dispatch is one question for one conversation: the client retries
//! transient failures with linear backoff, and when every attempt is spent
//! it degrades to a fixed apology instead of surfacing an error — a failed
//! dispatch is terminal for that request, never for the process.

pub mod client;
pub mod normalize;
pub mod policy;
pub mod retry;

pub use {
    client::{AnswerClient, FALLBACK_REPLY},
    normalize::normalize_reply,
    policy::{RetryPolicy, Sleeper, TokioSleeper},
};
