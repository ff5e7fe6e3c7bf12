//! Configuration schema and file loading.
//!
//! Everything is optional in the file: absent fields take their defaults so
//! a minimal `quickreply.toml` with just an answer endpoint is a valid
//! config.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::QuickreplyConfig,
};
