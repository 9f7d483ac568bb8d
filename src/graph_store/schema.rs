//! Database schema for graph.db.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

/// Key/value metadata: sync token, checksum, export time.
const GRAPH_META_TABLE_V0: Table = Table {
    name: "graph_meta",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    primary_key: &[],
};

const ARTISTS_TABLE_V0: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("genres", &SqlType::Text, non_null = true),
        sqlite_column!("popularity", &SqlType::Integer),
        sqlite_column!("spotify_id", &SqlType::Text),
        sqlite_column!("spotify_url", &SqlType::Text),
        sqlite_column!("mbid", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("color", &SqlType::Text, non_null = true),
        sqlite_column!("x", &SqlType::Real),
        sqlite_column!("y", &SqlType::Real),
    ],
    indices: &[("idx_artists_popularity", "popularity")],
    primary_key: &[],
};

const ARTIST_ID_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    cascade: true,
};

/// One row per (artist, genre), for genre filtering.
const ARTIST_GENRES_TABLE_V0: Table = Table {
    name: "artist_genres",
    columns: &[
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_ID_FK)
        ),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("genre_rank", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_artist_genres_genre", "genre")],
    primary_key: &["artist_id", "genre"],
};

/// Undirected similarity links, stored with `source_id < target_id`.
const RELATED_LINKS_TABLE_V0: Table = Table {
    name: "related_links",
    columns: &[
        sqlite_column!(
            "source_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_ID_FK)
        ),
        sqlite_column!(
            "target_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_ID_FK)
        ),
    ],
    indices: &[("idx_related_links_target", "target_id")],
    primary_key: &["source_id", "target_id"],
};

const TOP_GENRES_TABLE_V0: Table = Table {
    name: "top_genres",
    columns: &[
        sqlite_column!("position", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("x", &SqlType::Real, non_null = true),
        sqlite_column!("y", &SqlType::Real, non_null = true),
        sqlite_column!("color", &SqlType::Text, non_null = true),
        sqlite_column!("count", &SqlType::Integer),
    ],
    indices: &[],
    primary_key: &[],
};

const GENRES_TABLE_V0: Table = Table {
    name: "genres",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("x", &SqlType::Real, non_null = true),
        sqlite_column!("y", &SqlType::Real, non_null = true),
        sqlite_column!("color", &SqlType::Text, non_null = true),
        sqlite_column!(
            "count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_genres_count", "count")],
    primary_key: &[],
};

pub const GRAPH_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        GRAPH_META_TABLE_V0,
        ARTISTS_TABLE_V0,
        ARTIST_GENRES_TABLE_V0,
        RELATED_LINKS_TABLE_V0,
        TOP_GENRES_TABLE_V0,
        GENRES_TABLE_V0,
    ],
    migration: None,
}];
