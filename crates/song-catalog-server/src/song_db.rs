//! SQLite song store.
//!
//! Provides pooled connections, schema bootstrap, and the queries behind
//! the song API, including filtered/paginated listing.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use song_catalog_types::Song;

const SCHEMA_VERSION: i32 = 1;
const SONG_COLUMNS: &str = r#"id, "group", song, release_date, text, link"#;

#[derive(Clone)]
pub struct SongDb {
    pool: Pool<SqliteConnectionManager>,
}

/// Pool tuning for [`SongDb::open`].
#[derive(Debug, Clone, Copy)]
pub struct DbOptions {
    /// Bounds both waiting for a pooled connection and SQLite lock waits.
    pub timeout: Duration,
    pub pool_size: u32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            pool_size: 8,
        }
    }
}

/// Columns a listing may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    Group,
    Song,
    ReleaseDate,
    Link,
}

impl FilterField {
    /// Filter key as used in the filter map (`release_date`, not `releaseDate`).
    pub fn key(self) -> &'static str {
        match self {
            FilterField::Group => "group",
            FilterField::Song => "song",
            FilterField::ReleaseDate => "release_date",
            FilterField::Link => "link",
        }
    }

    fn column(self) -> &'static str {
        match self {
            FilterField::Group => r#""group""#,
            FilterField::Song => "song",
            FilterField::ReleaseDate => "release_date",
            FilterField::Link => "link",
        }
    }
}

/// Exact-match filter for [`SongDb::list_songs`].
///
/// Empty values mean "no constraint" and are never stored, so every
/// entry contributes one `column = ?` predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    entries: BTreeMap<FilterField, String>,
}

impl SongFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.entries.remove(&field);
        } else {
            self.entries.insert(field, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the `WHERE` clause and its bound values. Placeholders are
    /// numbered from `?1`; values are never spliced into the SQL text.
    fn where_clause(&self) -> (String, Vec<Value>) {
        if self.entries.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut conditions = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());
        for (idx, (field, value)) in self.entries.iter().enumerate() {
            conditions.push(format!("{} = ?{}", field.column(), idx + 1));
            values.push(Value::Text(value.clone()));
        }
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn map_song_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        group: row.get(1)?,
        song: row.get(2)?,
        release_date: row.get(3)?,
        text: row.get(4)?,
        link: row.get(5)?,
    })
}

/// Per-row decode failures, as opposed to errors from SQLite itself.
fn is_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::Utf8Error(..)
    )
}

/// Offset of the first row on `page` (1-based).
pub fn page_offset(page: u32, limit: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(limit)
}

impl SongDb {
    pub fn open(db_path: &Path, options: DbOptions) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create song db dir {:?}", parent))?;
        }

        let busy_timeout = options.timeout;
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(options.pool_size)
            .connection_timeout(options.timeout)
            .build(manager)
            .context("create song db pool")?;

        {
            let conn = pool.get().context("open song db")?;
            init_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().context("open song db")
    }

    /// Insert a song and return it with the assigned id.
    pub fn create_song(&self, song: &Song) -> Result<Song> {
        let conn = self.conn()?;
        let id: i64 = conn
            .query_row(
                r#"
                INSERT INTO songs ("group", song, release_date, text, link)
                VALUES (?1, ?2, ?3, ?4, ?5)
                RETURNING id
                "#,
                params![song.group, song.song, song.release_date, song.text, song.link],
                |row| row.get(0),
            )
            .context("insert song")?;
        Ok(Song { id, ..song.clone() })
    }

    /// Update `group` and `song` only. Returns `false` when no row has `id`.
    pub fn update_song(&self, id: i64, song: &Song) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                r#"UPDATE songs SET "group" = ?1, song = ?2 WHERE id = ?3"#,
                params![song.group, song.song, id],
            )
            .context("update song")?;
        Ok(changed > 0)
    }

    /// Returns `false` when no row has `id`.
    pub fn delete_song(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM songs WHERE id = ?1", params![id])
            .context("delete song")?;
        Ok(changed > 0)
    }

    pub fn song_by_id(&self, id: i64) -> Result<Option<Song>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
            params![id],
            map_song_row,
        )
        .optional()
        .context("select song by id")
    }

    /// One page of songs matching every filter entry, ordered by id.
    ///
    /// Rows that cannot be decoded are logged and left out of the page. Any
    /// other failure while stepping through the result fails the listing.
    pub fn list_songs(&self, filter: &SongFilter, page: u32, limit: u32) -> Result<Vec<Song>> {
        tracing::debug!(
            filters = ?filter.entries.keys().map(|f| f.key()).collect::<Vec<_>>(),
            page,
            limit,
            "listing songs"
        );
        let conn = self.conn()?;
        let (where_clause, mut values) = filter.where_clause();
        let limit_idx = values.len() + 1;
        let sql = format!(
            "SELECT {SONG_COLUMNS} FROM songs{where_clause} ORDER BY id LIMIT ?{} OFFSET ?{}",
            limit_idx,
            limit_idx + 1
        );
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(page_offset(page, limit)));

        let mut stmt = conn.prepare(&sql).context("prepare song listing")?;
        let mut rows = stmt
            .query_map(params_from_iter(values.iter()), map_song_row)
            .context("query song listing")?;

        let (songs, skipped) =
            rows.try_fold((Vec::new(), 0usize), |(mut songs, skipped), row| match row {
                Ok(song) => {
                    songs.push(song);
                    Ok((songs, skipped))
                }
                Err(err) if is_decode_error(&err) => {
                    tracing::warn!(error = %err, "skipping undecodable song row");
                    Ok((songs, skipped + 1))
                }
                Err(err) => Err(err),
            })
            .context("read song listing")?;
        if skipped > 0 {
            tracing::warn!(skipped, returned = songs.len(), "song listing returned partial page");
        }
        Ok(songs)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            "group" TEXT NOT NULL,
            song TEXT NOT NULL,
            release_date TEXT NOT NULL,
            text TEXT NOT NULL,
            link TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_songs_group_song ON songs("group", song);
        "#,
    )
    .context("create song schema")?;

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("read schema version")?;
    match version.as_deref().and_then(|v| v.parse::<i32>().ok()) {
        None => {
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )
            .context("insert schema version")?;
        }
        Some(found) if found > SCHEMA_VERSION => {
            anyhow::bail!(
                "song db schema version {found} is newer than supported version {SCHEMA_VERSION}"
            );
        }
        Some(_) => {}
    }

    Ok(())
}
