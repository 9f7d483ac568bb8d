//! SQLite-backed graph store.

use super::models::{ArtistNode, ArtistQuery, GraphSnapshot, GraphSummary, RelatedLink};
use super::schema::GRAPH_VERSIONED_SCHEMAS;
use super::trait_def::GraphStore;
use crate::cache::{SyncToken, SyncTokenSource};
use crate::genre_map::GenreEntry;
use crate::reconcile::ArtistId;
use crate::sqlite_persistence::open_versioned;
use crate::top_genres::TopGenreEntry;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const META_LAST_SYNC: &str = "last_sync";
const META_CHECKSUM: &str = "checksum";
const META_EXPORTED_AT: &str = "exported_at";

const ARTIST_COLUMNS: &str =
    "a.id, a.name, a.genres, a.popularity, a.spotify_id, a.spotify_url, a.mbid, a.image_url, a.color, a.x, a.y";

#[derive(Clone)]
pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraphStore {
    /// Open the graph database, creating it if missing.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, GRAPH_VERSIONED_SCHEMAS, "graph")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        GRAPH_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Graph store connection mutex poisoned"))
    }

    fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT value FROM graph_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO graph_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn count(conn: &Connection, table: &str) -> Result<usize> {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn artist_from_row(row: &Row) -> rusqlite::Result<ArtistNode> {
    let genres_json: String = row.get(2)?;
    let genres: Vec<String> = serde_json::from_str(&genres_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ArtistNode {
        id: row.get(0)?,
        name: row.get(1)?,
        genres,
        popularity: row.get(3)?,
        spotify_id: row.get(4)?,
        spotify_url: row.get(5)?,
        mbid: row.get(6)?,
        image_url: row.get(7)?,
        color: row.get(8)?,
        x: row.get(9)?,
        y: row.get(10)?,
    })
}

impl SyncTokenSource for SqliteGraphStore {
    fn current_sync_token(&self) -> Result<Option<SyncToken>> {
        let conn = self.lock()?;
        Ok(Self::get_meta(&conn, META_LAST_SYNC)?.map(SyncToken::new))
    }
}

impl GraphStore for SqliteGraphStore {
    fn publish(&self, snapshot: &GraphSnapshot) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM related_links;
             DELETE FROM artist_genres;
             DELETE FROM artists;
             DELETE FROM top_genres;
             DELETE FROM genres;",
        )
        .context("Failed to clear previous graph")?;

        {
            let mut insert_artist = tx.prepare(
                "INSERT INTO artists (id, name, genres, popularity, spotify_id, spotify_url, mbid, image_url, color, x, y)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            let mut insert_genre =
                tx.prepare("INSERT OR IGNORE INTO artist_genres (artist_id, genre, genre_rank) VALUES (?1, ?2, ?3)")?;
            for artist in &snapshot.artists {
                insert_artist.execute(params![
                    artist.id,
                    artist.name,
                    serde_json::to_string(&artist.genres)?,
                    artist.popularity,
                    artist.spotify_id,
                    artist.spotify_url,
                    artist.mbid,
                    artist.image_url,
                    artist.color,
                    artist.x,
                    artist.y,
                ])?;
                for (rank, genre) in artist.genres.iter().enumerate() {
                    insert_genre.execute(params![artist.id, genre, rank as i64])?;
                }
            }

            let mut insert_link =
                tx.prepare("INSERT OR IGNORE INTO related_links (source_id, target_id) VALUES (?1, ?2)")?;
            for link in &snapshot.links {
                insert_link.execute(params![link.source, link.target])?;
            }

            let mut insert_top = tx.prepare(
                "INSERT INTO top_genres (position, name, x, y, color, count) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, genre) in snapshot.top_genres.iter().enumerate() {
                insert_top.execute(params![
                    position as i64,
                    genre.name,
                    genre.x,
                    genre.y,
                    genre.color,
                    genre.count.map(|c| c as i64),
                ])?;
            }

            let mut insert_genre_entry = tx.prepare(
                "INSERT INTO genres (name, x, y, color, count) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for genre in &snapshot.genres {
                insert_genre_entry.execute(params![
                    genre.name,
                    genre.x,
                    genre.y,
                    genre.color,
                    genre.count as i64,
                ])?;
            }
        }

        Self::set_meta(&tx, META_LAST_SYNC, snapshot.sync_token.as_str())?;
        Self::set_meta(&tx, META_CHECKSUM, &snapshot.checksum)?;
        Self::set_meta(
            &tx,
            META_EXPORTED_AT,
            &chrono::Utc::now().timestamp().to_string(),
        )?;

        tx.commit().context("Failed to commit graph snapshot")?;

        info!(
            "Published graph: {} artists, {} links, {} top genres, sync token {}",
            snapshot.artists.len(),
            snapshot.links.len(),
            snapshot.top_genres.len(),
            snapshot.sync_token
        );
        Ok(())
    }

    fn summary(&self) -> Result<GraphSummary> {
        let conn = self.lock()?;
        Ok(GraphSummary {
            sync_token: Self::get_meta(&conn, META_LAST_SYNC)?.map(SyncToken::new),
            checksum: Self::get_meta(&conn, META_CHECKSUM)?,
            exported_at: Self::get_meta(&conn, META_EXPORTED_AT)?.and_then(|v| v.parse().ok()),
            artists_count: Self::count(&conn, "artists")?,
            links_count: Self::count(&conn, "related_links")?,
            genres_count: Self::count(&conn, "genres")?,
        })
    }

    fn get_artists(&self, query: &ArtistQuery) -> Result<Vec<ArtistNode>> {
        let conn = self.lock()?;
        let genre = query.genre.as_ref().map(|g| g.to_lowercase());
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artists a
             WHERE (?1 IS NULL OR EXISTS (
                    SELECT 1 FROM artist_genres g WHERE g.artist_id = a.id AND g.genre = ?1))
               AND (?2 IS NULL OR a.popularity >= ?2)
             ORDER BY COALESCE(a.popularity, -1) DESC, a.id ASC
             LIMIT ?3",
            ARTIST_COLUMNS
        ))?;

        let artists = stmt
            .query_map(
                params![genre, query.min_popularity, query.limit as i64],
                artist_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn get_artist(&self, id: ArtistId) -> Result<Option<ArtistNode>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM artists a WHERE a.id = ?1", ARTIST_COLUMNS),
                params![id],
                artist_from_row,
            )
            .optional()?)
    }

    fn get_links_among(&self, ids: &[ArtistId]) -> Result<Vec<RelatedLink>> {
        let wanted: HashSet<ArtistId> = ids.iter().copied().collect();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id FROM related_links ORDER BY source_id, target_id",
        )?;
        let links = stmt
            .query_map([], |row| {
                Ok(RelatedLink {
                    source: row.get(0)?,
                    target: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links
            .into_iter()
            .filter(|l| wanted.contains(&l.source) && wanted.contains(&l.target))
            .collect())
    }

    fn get_related_artists(&self, id: ArtistId) -> Result<Vec<ArtistNode>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artists a
             JOIN related_links l
               ON (l.source_id = ?1 AND a.id = l.target_id)
               OR (l.target_id = ?1 AND a.id = l.source_id)
             ORDER BY a.id",
            ARTIST_COLUMNS
        ))?;
        let artists = stmt
            .query_map(params![id], artist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn get_top_genres(&self) -> Result<Vec<TopGenreEntry>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT name, x, y, color, count FROM top_genres ORDER BY position")?;
        let genres = stmt
            .query_map([], |row| {
                Ok(TopGenreEntry {
                    name: row.get(0)?,
                    x: row.get(1)?,
                    y: row.get(2)?,
                    color: row.get(3)?,
                    count: row.get::<_, Option<i64>>(4)?.map(|c| c as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(genres)
    }

    fn get_genres(&self) -> Result<Vec<GenreEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name, x, y, color, count FROM genres ORDER BY name")?;
        let genres = stmt
            .query_map([], |row| {
                Ok(GenreEntry {
                    name: row.get(0)?,
                    x: row.get(1)?,
                    y: row.get(2)?,
                    color: row.get(3)?,
                    count: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(genres)
    }
}
