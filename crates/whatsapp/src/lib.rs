//! WhatsApp channel via a Baileys sidecar.
//!
//! The wire protocol itself lives in a Node.js sidecar process; this crate
//! speaks newline-free JSON frames to it over a local WebSocket — inbound
//! messages and credential updates come in, sends and lifecycle commands go
//! out. Credential updates are persisted through the session store so a
//! restart resumes the session without re-pairing.

pub mod client;
pub mod outbound;
pub mod types;

pub use {
    client::SidecarClient,
    outbound::SidecarOutbound,
    types::{GatewayFrame, SidecarFrame, WireMessage},
};
