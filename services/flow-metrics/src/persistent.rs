//!
//! src/persistent.rs
//!
//! Sqlite backed document store for artist documents. Each row holds one
//! json document keyed by (collection, spotify_id)
//!

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::document::{timestamp, ArtistDocument};
use crate::errors::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Inserted(String),
    Updated(String)
}

impl Upsert {
    pub fn id(&self) -> &str {
        match self {
            Upsert::Inserted(id) | Upsert::Updated(id) => id
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Upsert::Inserted(_) => "insert",
            Upsert::Updated(_) => "update"
        }
    }
}

/// Stored row as read back for cleanup
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: String,
    pub name: String,
    pub raw: Value
}

pub struct Persistent {
    pool: Pool<Sqlite>,
    collection: String
}

/// File path behind a sqlite url, None for in-memory databases
fn database_path(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Persistent {

    async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), FlowError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS artist_documents (
              id            TEXT PRIMARY KEY,
              collection    TEXT NOT NULL,
              spotify_id    TEXT NOT NULL,
              name          TEXT NOT NULL,
              document      TEXT NOT NULL,
              created_at    INTEGER NOT NULL,
              updated_at    INTEGER NOT NULL,
              UNIQUE (collection, spotify_id)
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_artist_documents_name ON artist_documents(collection, name);"
        ).execute(pool).await?;

        Ok(())
    }

    pub async fn init(database_url: &str, collection: &str) -> Result<Self, FlowError> {
        let is_memory = database_path(database_url).is_none();

        if let Some(parent) = database_path(database_url).and_then(|p| Path::new(p).parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true);

        // WAL is file-only
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory {1} else {4})
            .connect_with(opts)
            .await?;

        Self::ensure_schema(&pool).await?;
        debug!(database_url, collection, "persistent.ready");

        Ok(Self { pool, collection: collection.to_string() })
    }

    pub async fn from_config(cfg: &PersistenceConfig) -> Result<Self, FlowError> {
        Self::init(&cfg.db_url, &cfg.collection).await
    }

    pub fn collection(&self) -> &str { &self.collection }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn decode(document: &str) -> Result<ArtistDocument, FlowError> {
        Ok( serde_json::from_str(document)? )
    }

    /// Inserts the document or replaces the stored one for the same
    /// Spotify id. The stored `last_updated` survives an update whose
    /// document leaves it unset
    pub async fn upsert_artist(&self, doc: &ArtistDocument) -> Result<Upsert, FlowError> {
        if doc.spotify_id.is_empty() {
            return Err(FlowError::Db("missing spotify_id".into()));
        }

        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(
            "SELECT id, document FROM artist_documents WHERE collection = ?1 AND spotify_id = ?2;"
        )
        .bind(&self.collection)
        .bind(&doc.spotify_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut doc = doc.clone();
        let now = Self::now();

        let outcome = match existing {
            Some(row) => {
                let id = row.get::<String, _>("id");
                if doc.last_updated.is_none() {
                    let stored = Self::decode(&row.get::<String, _>("document"))?;
                    doc.last_updated = stored.last_updated;
                }
                let last_updated = doc.last_updated.get_or_insert_with(|| timestamp(Utc::now()));
                debug!(%id, last_updated = %last_updated, "persistent.update");

                sqlx::query(
                    r"
                    UPDATE artist_documents
                       SET name = ?1,
                           document = ?2,
                           updated_at = ?3
                     WHERE id = ?4;
                    "
                )
                .bind(&doc.name)
                .bind(doc.to_json()?)
                .bind(now)
                .bind(&id)
                .execute(&mut *tx)
                .await?;
                Upsert::Updated(id)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                doc.last_updated.get_or_insert_with(|| timestamp(Utc::now()));

                sqlx::query(
                    r"
                    INSERT INTO artist_documents (
                        id, collection, spotify_id, name, document, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);
                    "
                )
                .bind(&id)
                .bind(&self.collection)
                .bind(&doc.spotify_id)
                .bind(&doc.name)
                .bind(doc.to_json()?)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                Upsert::Inserted(id)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn find_by_spotify_id(&self, spotify_id: &str) ->
        Result<Option<ArtistDocument>, FlowError> {
        let row = sqlx::query(
            "SELECT document FROM artist_documents WHERE collection = ?1 AND spotify_id = ?2 LIMIT 1;"
        )
        .bind(&self.collection)
        .bind(spotify_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::decode(&r.get::<String, _>("document"))).transpose()
    }

    pub async fn exists(&self, spotify_id: &str) -> Result<bool, FlowError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM artist_documents WHERE collection = ?1 AND spotify_id = ?2;"
        )
        .bind(&self.collection)
        .bind(spotify_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    fn decode_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<ArtistDocument>, FlowError> {
        rows.iter()
            .map(|r| Self::decode(&r.get::<String, _>("document")))
            .collect()
    }

    /// Case-insensitive substring match on the artist name
    pub async fn find_by_name(&self, name: &str) -> Result<Vec<ArtistDocument>, FlowError> {
        let rows = sqlx::query(
            r"
            SELECT document FROM artist_documents
             WHERE collection = ?1 AND name LIKE ?2 ESCAPE '\'
             ORDER BY name;
            "
        )
        .bind(&self.collection)
        .bind(like_pattern(name))
        .fetch_all(&self.pool)
        .await?;
        Self::decode_rows(rows)
    }

    /// Case-insensitive substring match on any of the artist's genres
    pub async fn find_by_genre(&self, genre: &str) -> Result<Vec<ArtistDocument>, FlowError> {
        let rows = sqlx::query(
            r"
            SELECT document FROM artist_documents
             WHERE collection = ?1
               AND EXISTS (
                   SELECT 1 FROM json_each(artist_documents.document, '$.genres')
                    WHERE json_each.value LIKE ?2 ESCAPE '\'
               )
             ORDER BY name;
            "
        )
        .bind(&self.collection)
        .bind(like_pattern(genre))
        .fetch_all(&self.pool)
        .await?;
        Self::decode_rows(rows)
    }

    pub async fn count(&self) -> Result<i64, FlowError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM artist_documents WHERE collection = ?1;"
        )
        .bind(&self.collection)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn all(&self, limit: Option<i64>) -> Result<Vec<ArtistDocument>, FlowError> {
        let rows = sqlx::query(
            "SELECT document FROM artist_documents WHERE collection = ?1 ORDER BY name LIMIT ?2;"
        )
        .bind(&self.collection)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Self::decode_rows(rows)
    }

    /// Every stored document as raw json, including ones that no longer
    /// decode into the current shape
    pub async fn all_raw(&self) -> Result<Vec<StoredRow>, FlowError> {
        let rows = sqlx::query(
            "SELECT id, name, document FROM artist_documents WHERE collection = ?1 ORDER BY name;"
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| Ok( StoredRow {
                id: r.get::<String, _>("id"),
                name: r.get::<String, _>("name"),
                raw: serde_json::from_str(&r.get::<String, _>("document"))?
            }))
            .collect()
    }

    /// Overwrites the row's document as is. Returns false when the row is
    /// gone or already held an identical document
    pub async fn replace(&self, id: &str, doc: &ArtistDocument) -> Result<bool, FlowError> {
        let json = doc.to_json()?;
        let result = sqlx::query(
            r"
            UPDATE artist_documents
               SET name = ?1,
                   spotify_id = ?2,
                   document = ?3,
                   updated_at = ?4
             WHERE id = ?5 AND collection = ?6 AND document <> ?3;
            "
        )
        .bind(&doc.name)
        .bind(&doc.spotify_id)
        .bind(&json)
        .bind(Self::now())
        .bind(id)
        .bind(&self.collection)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stores a raw document, bypassing normalization
    pub async fn insert_raw(&self, spotify_id: &str, name: &str, raw: &Value) ->
        Result<String, FlowError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r"
            INSERT INTO artist_documents (
                id, collection, spotify_id, name, document, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);
            "
        )
        .bind(&id)
        .bind(&self.collection)
        .bind(spotify_id)
        .bind(name)
        .bind(raw.to_string())
        .bind(Self::now())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}
