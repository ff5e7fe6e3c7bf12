use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The underlying database could not be reached or prepared. Raised
    /// only from [`crate::AuthStore::init`]; startup policy (abort or
    /// retry) belongs to the caller.
    #[error("session store unavailable: {source}")]
    Unavailable {
        #[source]
        source: sqlx::Error,
    },

    /// The store was closed; construct a fresh one to continue.
    #[error("session store is closed")]
    Closed,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
