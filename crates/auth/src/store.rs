use std::{
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use {
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    record::SessionRecord,
};

/// Durable store for the singleton [`SessionRecord`].
///
/// Lifecycle is `Uninitialized → Loading → Ready` inside [`AuthStore::init`];
/// after [`AuthStore::close`] the store stays closed — there is no reopen
/// path, construct a fresh one. Mutations go through [`AuthStore::update`],
/// which rewrites the whole row; concurrent updates serialize on the record
/// mutex, so partial writes cannot interleave. Last write wins.
pub struct AuthStore {
    pool: SqlitePool,
    record: Mutex<SessionRecord>,
    closed: AtomicBool,
}

impl AuthStore {
    /// Connect, create the `auth` table if absent, and load the singleton
    /// row. A missing row is written with empty defaults; an unparseable
    /// row is reset to defaults with a warning (fresh-start, the sidecar
    /// re-pairs). A connection that cannot be established is
    /// [`Error::Unavailable`] and is not retried here.
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|source| Error::Unavailable { source })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|source| Error::Unavailable { source })?;

        sqlx::query("CREATE TABLE IF NOT EXISTS auth (id INTEGER PRIMARY KEY, state TEXT NOT NULL)")
            .execute(&pool)
            .await
            .map_err(|source| Error::Unavailable { source })?;

        let record = Self::load_or_insert(&pool).await?;
        debug!(registered = record.is_registered(), "session store ready");

        Ok(Self {
            pool,
            record: Mutex::new(record),
            closed: AtomicBool::new(false),
        })
    }

    async fn load_or_insert(pool: &SqlitePool) -> Result<SessionRecord> {
        let row = sqlx::query("SELECT state FROM auth WHERE id = 1")
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("state");
                match serde_json::from_str(&raw) {
                    Ok(record) => Ok(record),
                    Err(e) => {
                        warn!(error = %e, "stored session record is corrupt, resetting to defaults");
                        let record = SessionRecord::default();
                        Self::persist(pool, &record).await?;
                        Ok(record)
                    },
                }
            },
            None => {
                let record = SessionRecord::default();
                Self::persist(pool, &record).await?;
                Ok(record)
            },
        }
    }

    async fn persist(pool: &SqlitePool, record: &SessionRecord) -> Result<()> {
        let state = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO auth (id, state) VALUES (1, ?)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state",
        )
        .bind(&state)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Clone of the current in-memory record.
    pub async fn snapshot(&self) -> Result<SessionRecord> {
        self.ensure_open()?;
        Ok(self.record.lock().await.clone())
    }

    /// Mutate the record and rewrite the stored row wholesale.
    ///
    /// This is the single write path: the mutex is held across the write,
    /// so a credentials-update burst becomes a sequence of full-row writes,
    /// never an interleaving.
    pub async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SessionRecord),
    {
        self.ensure_open()?;
        let mut record = self.record.lock().await;
        mutate(&mut record);
        Self::persist(&self.pool, &record).await
    }

    /// Release the connection pool. Idempotent; all later operations fail
    /// with [`Error::Closed`].
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close().await;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
