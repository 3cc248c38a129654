//! Shared application state.
//!
//! Holds the song store and metadata provider handles. Both are read-only
//! after construction and shared by every request.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use anyhow::anyhow;

use crate::metadata_client::SongDetailsProvider;
use crate::song_db::SongDb;

pub struct AppState {
    /// Song persistence.
    pub db: SongDb,
    /// Enrichment lookups for new songs.
    pub metadata: Arc<dyn SongDetailsProvider>,
    db_timeout: Duration,
}

impl AppState {
    pub fn new(db: SongDb, metadata: Arc<dyn SongDetailsProvider>, db_timeout: Duration) -> Self {
        Self {
            db,
            metadata,
            db_timeout,
        }
    }

    /// Run a store call on the blocking pool, bounded by the DB timeout.
    pub async fn with_db<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&SongDb) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        match tokio::time::timeout(self.db_timeout, web::block(move || f(&db))).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(anyhow!("song db task failed: {err}")),
            Err(_) => Err(anyhow!(
                "song db call timed out after {}ms",
                self.db_timeout.as_millis()
            )),
        }
    }
}
