//! SQLite saved-state storage
//!
//! Three tables hold one saved session:
//! - `playback_state`: a single row (id 0) with index, position and parent
//! - `queue_heap`: song id per heap slot
//! - `queue_mapping`: heap index per position, for each mapping kind
//!
//! A save replaces all three inside one transaction.

use crate::db::saved_state::{PersistenceRepository, SavedState};
use crate::error::{Error, Result};
use crate::playback::types::RepeatMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_common::{ParentId, ParentKind, SongId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

const ORDERED: &str = "ordered";
const SHUFFLED: &str = "shuffled";

#[derive(Debug, Clone)]
pub struct SqlitePersistence {
    pool: Pool<Sqlite>,
}

impl SqlitePersistence {
    /// Open (creating if missing) a database file
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Opened playback state database {}", path.display());
        Self::with_pool(pool).await
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // One connection, since every :memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating tables as needed
    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

async fn init_tables(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playback_state (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            queue_index INTEGER NOT NULL,
            song_id TEXT,
            position_ms INTEGER NOT NULL,
            repeat_mode TEXT NOT NULL,
            parent_kind TEXT,
            parent_id TEXT,
            saved_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_heap (
            heap_index INTEGER PRIMARY KEY,
            song_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_mapping (
            kind TEXT NOT NULL,
            position INTEGER NOT NULL,
            heap_index INTEGER NOT NULL,
            PRIMARY KEY (kind, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Playback state tables ready");
    Ok(())
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::Persistence(format!("Invalid {} '{}': {}", what, raw, e)))
}

fn parse_parent_kind(raw: &str) -> Result<ParentKind> {
    match raw {
        "album" => Ok(ParentKind::Album),
        "artist" => Ok(ParentKind::Artist),
        "genre" => Ok(ParentKind::Genre),
        "playlist" => Ok(ParentKind::Playlist),
        other => Err(Error::Persistence(format!("Invalid parent kind '{}'", other))),
    }
}

fn to_index(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Persistence(format!("Invalid index {}", value)))
}

type StateRow = (i64, Option<String>, i64, String, Option<String>, Option<String>, DateTime<Utc>);

#[async_trait]
impl PersistenceRepository for SqlitePersistence {
    async fn load(&self) -> Result<Option<SavedState>> {
        let row: Option<StateRow> = sqlx::query_as(
            "SELECT queue_index, song_id, position_ms, repeat_mode, parent_kind, parent_id, \
             saved_at FROM playback_state WHERE id = 0",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some((index, song_id, position_ms, repeat_mode, parent_kind, parent_id, saved_at)) = row
        else {
            return Ok(None);
        };

        let heap_rows: Vec<(String,)> =
            sqlx::query_as("SELECT song_id FROM queue_heap ORDER BY heap_index")
                .fetch_all(&self.pool)
                .await?;
        let heap = heap_rows
            .iter()
            .map(|(raw,)| parse_uuid(raw, "song id").map(SongId))
            .collect::<Result<Vec<_>>>()?;

        let mapping_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, heap_index FROM queue_mapping ORDER BY kind, position")
                .fetch_all(&self.pool)
                .await?;
        let mut ordered_mapping = Vec::new();
        let mut shuffled_mapping = Vec::new();
        for (kind, heap_index) in mapping_rows {
            let heap_index = to_index(heap_index)?;
            match kind.as_str() {
                ORDERED => ordered_mapping.push(heap_index),
                SHUFFLED => shuffled_mapping.push(heap_index),
                other => {
                    return Err(Error::Persistence(format!("Invalid mapping kind '{}'", other)))
                }
            }
        }

        let parent = match (parent_kind, parent_id) {
            (Some(kind), Some(id)) => Some(ParentId {
                kind: parse_parent_kind(&kind)?,
                id: parse_uuid(&id, "parent id")?,
            }),
            _ => None,
        };

        let song_id = song_id
            .as_deref()
            .map(|raw| parse_uuid(raw, "song id").map(SongId))
            .transpose()?;
        let state = SavedState {
            parent,
            heap,
            ordered_mapping,
            shuffled_mapping,
            index: to_index(index)?,
            song_id,
            position_ms: u64::try_from(position_ms).unwrap_or(0),
            repeat_mode: repeat_mode.parse::<RepeatMode>().map_err(Error::Persistence)?,
            saved_at,
        };
        debug!(heap = state.heap.len(), "Loaded playback state");
        Ok(Some(state))
    }

    async fn save(&self, state: Option<&SavedState>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM playback_state").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM queue_heap").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM queue_mapping").execute(&mut *tx).await?;

        if let Some(state) = state {
            sqlx::query(
                "INSERT INTO playback_state \
                 (id, queue_index, song_id, position_ms, repeat_mode, parent_kind, parent_id, \
                 saved_at) \
                 VALUES (0, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(state.index as i64)
            .bind(state.song_id.map(|id| id.to_string()))
            .bind(i64::try_from(state.position_ms).unwrap_or(i64::MAX))
            .bind(state.repeat_mode.to_string())
            .bind(state.parent.map(|p| p.kind.to_string()))
            .bind(state.parent.map(|p| p.id.to_string()))
            .bind(state.saved_at)
            .execute(&mut *tx)
            .await?;

            for (heap_index, song_id) in state.heap.iter().enumerate() {
                sqlx::query("INSERT INTO queue_heap (heap_index, song_id) VALUES (?, ?)")
                    .bind(heap_index as i64)
                    .bind(song_id.to_string())
                    .execute(&mut *tx)
                    .await?;
            }

            let mappings = [
                (ORDERED, &state.ordered_mapping),
                (SHUFFLED, &state.shuffled_mapping),
            ];
            for (kind, mapping) in mappings {
                for (position, heap_index) in mapping.iter().enumerate() {
                    sqlx::query(
                        "INSERT INTO queue_mapping (kind, position, heap_index) VALUES (?, ?, ?)",
                    )
                    .bind(kind)
                    .bind(position as i64)
                    .bind(*heap_index as i64)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        debug!(cleared = state.is_none(), "Wrote playback state");
        Ok(())
    }
}
