//! Durable session/credential storage.
//!
//! One SQLite row holds the whole WhatsApp session: credentials, signal
//! keys, and whatever protocol sub-documents the sidecar hands back on a
//! credentials update. The store survives restarts; losing it means
//! re-scanning the QR code.

pub mod error;
pub mod record;
pub mod store;

pub use {
    error::{Error, Result},
    record::SessionRecord,
    store::AuthStore,
};
