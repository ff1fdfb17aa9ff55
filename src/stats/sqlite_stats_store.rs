use crate::server::metrics;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};
use crate::stats::capabilities::FieldCapabilities;
use crate::stats::models::{
    AlbumSale, ArtistRatingAggregate, Playback, PlaybackCounts, PlaybackFilter, Rating,
    RatingSummary, SalesSummary, SongRatingAggregate, TimeWindow,
};
use crate::stats::stats_store::{PlaybackStore, RatingStore, SalesStore};
use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// V 0
const PLAYBACKS_TABLE_V_0: Table = Table {
    name: "playbacks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "seconds",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "valid",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "played_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_playbacks_song", "song_id, played_at")],
};
const ALBUM_SALES_TABLE_V_0: Table = Table {
    name: "album_sales",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("album_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "purchased_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "units",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "amount_cents",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "currency",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'EUR'")
        ),
        sqlite_column!(
            "refunded",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_album_sales_album", "album_id, purchased_at")],
};
const RATINGS_TABLE_V_0: Table = Table {
    name: "ratings",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text),
        sqlite_column!("stars", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "comment",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "rated_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "song_id"]],
    indices: &[("idx_ratings_song", "song_id, artist_id, rated_at")],
};

/// V 1, playbacks gain optional attribution columns
const PLAYBACKS_TABLE_V_1: Table = Table {
    name: "playbacks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "seconds",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "valid",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "played_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("label_id", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Text),
    ],
    unique_constraints: &[],
    indices: &[("idx_playbacks_song", "song_id, played_at")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            PLAYBACKS_TABLE_V_0,
            ALBUM_SALES_TABLE_V_0,
            RATINGS_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            PLAYBACKS_TABLE_V_1,
            ALBUM_SALES_TABLE_V_0,
            RATINGS_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute("ALTER TABLE playbacks ADD COLUMN label_id TEXT", [])?;
            conn.execute("ALTER TABLE playbacks ADD COLUMN artist_id TEXT", [])?;
            Ok(())
        }),
    },
];

/// A positional bind value for dynamically assembled statements.
enum SqlParam {
    Int(i64),
    Text(String),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            SqlParam::Int(value) => value.to_sql(),
            SqlParam::Text(value) => value.to_sql(),
        }
    }
}

fn where_sql(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn push_window_conditions(
    column: &str,
    window: &TimeWindow,
    enabled: bool,
    conditions: &mut Vec<String>,
    bind_params: &mut Vec<SqlParam>,
) {
    if !enabled {
        return;
    }
    if let Some(from) = window.from {
        conditions.push(format!("{} >= ?", column));
        bind_params.push(SqlParam::Int(from));
    }
    if let Some(to) = window.to {
        conditions.push(format!("{} < ?", column));
        bind_params.push(SqlParam::Int(to));
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn validate_capability_columns(
    conn: &Connection,
    capabilities: &FieldCapabilities,
) -> Result<()> {
    for (table_name, column_name) in capabilities.required_columns() {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table_name))?;
        let column_names: Vec<String> = stmt
            .query_map([], |row| row.get(1))?
            .collect::<Result<Vec<String>, _>>()?;
        if !column_names.iter().any(|name| name == column_name) {
            bail!(
                "Enabled capability needs column {}.{} which is missing from the database",
                table_name,
                column_name
            );
        }
    }
    Ok(())
}

fn rating_from_row(row: &Row) -> rusqlite::Result<Rating> {
    Ok(Rating {
        id: Some(row.get::<usize, i64>(0)? as usize),
        user_id: row.get::<usize, i64>(1)? as usize,
        song_id: row.get(2)?,
        artist_id: row.get(3)?,
        stars: row.get::<usize, i64>(4)? as u8,
        comment: row.get(5)?,
        rated_at: row.get(6)?,
    })
}

#[derive(Clone)]
pub struct SqliteStatsStore {
    conn: Arc<Mutex<Connection>>,
    capabilities: FieldCapabilities,
}

impl SqliteStatsStore {
    pub fn new<T: AsRef<Path>>(db_path: T, capabilities: FieldCapabilities) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        // Read the database version
        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if db_version >= VERSIONED_SCHEMAS.len() as i64 {
            bail!("Database version {} is too new", db_version);
        } else {
            VERSIONED_SCHEMAS
                .get(version)
                .context("Failed to get schema")?
                .validate(&conn)?;
        }

        Self::migrate_if_needed(&conn, version)?;
        validate_capability_columns(&conn, &capabilities)?;

        Ok(SqliteStatsStore {
            conn: Arc::new(Mutex::new(conn)),
            capabilities,
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating stats db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;

        Ok(())
    }

    fn query_count(&self, sql: &str, bind_params: &[SqlParam]) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(sql, params_from_iter(bind_params.iter()), |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    fn query_rating_summary(&self, sql: &str, bind_params: &[SqlParam]) -> Result<RatingSummary> {
        let conn = self.conn.lock().unwrap();
        let (count, average): (i64, Option<f64>) =
            conn.query_row(sql, params_from_iter(bind_params.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        Ok(RatingSummary {
            count: count as u64,
            average,
        })
    }

    fn query_sales_summary(&self, conditions: &[String], bind_params: &[SqlParam]) -> Result<SalesSummary> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(units), 0), COALESCE(SUM(amount_cents), 0), MAX(purchased_at) FROM {}{}",
            ALBUM_SALES_TABLE_V_0.name,
            where_sql(conditions)
        );
        let (orders, units, amount_cents, last_purchase): (i64, i64, i64, Option<i64>) =
            conn.query_row(&sql, params_from_iter(bind_params.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
        Ok(SalesSummary {
            orders: orders as u64,
            units: units as u64,
            amount_cents,
            last_purchase,
        })
    }
}

impl PlaybackStore for SqliteStatsStore {
    fn record_playbacks(&self, playback: &Playback, copies: u32) -> Result<u64> {
        let mut columns = vec!["song_id", "seconds"];
        let mut values = vec![
            SqlParam::Text(playback.song_id.clone()),
            SqlParam::Int(playback.seconds as i64),
        ];
        if self.capabilities.playback_validity {
            columns.push("valid");
            values.push(SqlParam::Int(playback.valid as i64));
        }
        if self.capabilities.playback_timestamps {
            columns.push("played_at");
            values.push(SqlParam::Int(playback.played_at));
        }
        if self.capabilities.playback_artists {
            if let Some(artist_id) = &playback.artist_id {
                columns.push("artist_id");
                values.push(SqlParam::Text(artist_id.clone()));
            }
        }
        if self.capabilities.playback_labels {
            if let Some(label_id) = &playback.label_id {
                columns.push("label_id");
                values.push(SqlParam::Text(label_id.clone()));
            }
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            PLAYBACKS_TABLE_V_1.name,
            columns.join(", "),
            placeholders(columns.len())
        );

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for _ in 0..copies {
            tx.execute(&sql, params_from_iter(values.iter()))
                .with_context(|| format!("Failed to record playback of {}", playback.song_id))?;
        }
        tx.commit()?;
        Ok(copies as u64)
    }

    fn count_playbacks(&self, song_id: &str, filter: &PlaybackFilter) -> Result<u64> {
        let mut conditions = vec!["song_id = ?".to_string()];
        let mut bind_params = vec![SqlParam::Text(song_id.to_string())];

        if self.capabilities.playback_validity {
            if let Some(valid) = filter.valid {
                conditions.push("valid = ?".to_string());
                bind_params.push(SqlParam::Int(valid as i64));
            }
        }
        push_window_conditions(
            "played_at",
            &filter.window,
            self.capabilities.playback_timestamps,
            &mut conditions,
            &mut bind_params,
        );
        if self.capabilities.playback_artists {
            if let Some(artist_ids) = &filter.artist_ids {
                // An empty allow-list means no constraint
                if !artist_ids.is_empty() {
                    conditions.push(format!("artist_id IN ({})", placeholders(artist_ids.len())));
                    bind_params.extend(artist_ids.iter().map(|id| SqlParam::Text(id.clone())));
                }
            }
        }
        if self.capabilities.playback_labels {
            if let Some(label_id) = &filter.label_id {
                conditions.push("label_id = ?".to_string());
                bind_params.push(SqlParam::Text(label_id.clone()));
            }
        }

        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            PLAYBACKS_TABLE_V_1.name,
            where_sql(&conditions)
        );
        self.query_count(&sql, &bind_params)
    }

    fn delete_latest_playback(&self, song_id: &str) -> Result<bool> {
        let order = if self.capabilities.playback_timestamps {
            "played_at DESC, id DESC"
        } else {
            "id DESC"
        };
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = (SELECT id FROM {} WHERE song_id = ?1 ORDER BY {} LIMIT 1)",
                PLAYBACKS_TABLE_V_1.name, PLAYBACKS_TABLE_V_1.name, order
            ),
            params![song_id],
        )?;
        Ok(deleted > 0)
    }

    fn global_playback_counts(&self, window: &TimeWindow) -> Result<PlaybackCounts> {
        let mut conditions = Vec::new();
        let mut bind_params = Vec::new();
        push_window_conditions(
            "played_at",
            window,
            self.capabilities.playback_timestamps,
            &mut conditions,
            &mut bind_params,
        );

        let conn = self.conn.lock().unwrap();
        if self.capabilities.playback_validity {
            let sql = format!(
                "SELECT COUNT(*), COALESCE(SUM(valid <> 0), 0) FROM {}{}",
                PLAYBACKS_TABLE_V_1.name,
                where_sql(&conditions)
            );
            let (total, valid): (i64, i64) =
                conn.query_row(&sql, params_from_iter(bind_params.iter()), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
            Ok(PlaybackCounts {
                total: total as u64,
                valid: valid as u64,
            })
        } else {
            let sql = format!(
                "SELECT COUNT(*) FROM {}{}",
                PLAYBACKS_TABLE_V_1.name,
                where_sql(&conditions)
            );
            let total: i64 = conn.query_row(&sql, params_from_iter(bind_params.iter()), |row| {
                row.get(0)
            })?;
            Ok(PlaybackCounts {
                total: total as u64,
                valid: total as u64,
            })
        }
    }
}

impl SalesStore for SqliteStatsStore {
    fn record_album_sale(&self, sale: &AlbumSale) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (album_id, purchased_at, units, amount_cents, currency, refunded) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                ALBUM_SALES_TABLE_V_0.name
            ),
            params![
                sale.album_id,
                sale.purchased_at,
                sale.units,
                sale.amount_cents,
                sale.currency,
                sale.refunded
            ],
        )
        .with_context(|| format!("Failed to record sale of {}", sale.album_id))?;
        metrics::record_album_sale(&sale.currency);
        Ok(conn.last_insert_rowid() as usize)
    }

    fn album_sales_summary(
        &self,
        album_id: &str,
        window: &TimeWindow,
        include_refunds: bool,
    ) -> Result<SalesSummary> {
        let mut conditions = vec!["album_id = ?".to_string()];
        let mut bind_params = vec![SqlParam::Text(album_id.to_string())];
        if !include_refunds {
            conditions.push("refunded = 0".to_string());
        }
        push_window_conditions("purchased_at", window, true, &mut conditions, &mut bind_params);
        self.query_sales_summary(&conditions, &bind_params)
    }

    fn global_sales_summary(
        &self,
        window: &TimeWindow,
        include_refunds: bool,
    ) -> Result<SalesSummary> {
        let mut conditions = Vec::new();
        let mut bind_params = Vec::new();
        if !include_refunds {
            conditions.push("refunded = 0".to_string());
        }
        push_window_conditions("purchased_at", window, true, &mut conditions, &mut bind_params);
        self.query_sales_summary(&conditions, &bind_params)
    }
}

impl RatingStore for SqliteStatsStore {
    fn upsert_rating(
        &self,
        user_id: usize,
        song_id: &str,
        stars: u8,
        comment: &str,
        artist_id: Option<&str>,
    ) -> Result<(Rating, bool)> {
        let stored_artist_id = if self.capabilities.rating_artists {
            artist_id
        } else {
            None
        };

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Option<(i64, i64)> = tx
            .query_row(
                &format!(
                    "SELECT id, rated_at FROM {} WHERE user_id = ?1 AND song_id = ?2",
                    RATINGS_TABLE_V_0.name
                ),
                params![user_id, song_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (rating, created) = match existing {
            Some((id, rated_at)) => {
                if self.capabilities.rating_artists {
                    tx.execute(
                        &format!(
                            "UPDATE {} SET stars = ?1, comment = ?2, artist_id = ?3 WHERE id = ?4",
                            RATINGS_TABLE_V_0.name
                        ),
                        params![stars, comment, stored_artist_id, id],
                    )?;
                } else {
                    tx.execute(
                        &format!(
                            "UPDATE {} SET stars = ?1, comment = ?2 WHERE id = ?3",
                            RATINGS_TABLE_V_0.name
                        ),
                        params![stars, comment, id],
                    )?;
                }
                (
                    Rating {
                        id: Some(id as usize),
                        user_id,
                        song_id: song_id.to_string(),
                        artist_id: stored_artist_id.map(|s| s.to_string()),
                        stars,
                        comment: comment.to_string(),
                        rated_at,
                    },
                    false,
                )
            }
            None => {
                let mut columns = vec!["user_id", "song_id", "stars", "comment"];
                let mut values = vec![
                    SqlParam::Int(user_id as i64),
                    SqlParam::Text(song_id.to_string()),
                    SqlParam::Int(stars as i64),
                    SqlParam::Text(comment.to_string()),
                ];
                if let Some(artist_id) = stored_artist_id {
                    columns.push("artist_id");
                    values.push(SqlParam::Text(artist_id.to_string()));
                }
                tx.execute(
                    &format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        RATINGS_TABLE_V_0.name,
                        columns.join(", "),
                        placeholders(columns.len())
                    ),
                    params_from_iter(values.iter()),
                )
                .with_context(|| format!("Failed to store rating of {}", song_id))?;
                let id = tx.last_insert_rowid();
                let rated_at: i64 = tx.query_row(
                    &format!("SELECT rated_at FROM {} WHERE id = ?1", RATINGS_TABLE_V_0.name),
                    params![id],
                    |row| row.get(0),
                )?;
                (
                    Rating {
                        id: Some(id as usize),
                        user_id,
                        song_id: song_id.to_string(),
                        artist_id: stored_artist_id.map(|s| s.to_string()),
                        stars,
                        comment: comment.to_string(),
                        rated_at,
                    },
                    true,
                )
            }
        };

        tx.commit()?;
        Ok((rating, created))
    }

    fn get_user_rating(&self, user_id: usize, song_id: &str) -> Result<Option<Rating>> {
        let conn = self.conn.lock().unwrap();
        let rating = conn
            .query_row(
                &format!(
                    "SELECT id, user_id, song_id, artist_id, stars, comment, rated_at FROM {} WHERE user_id = ?1 AND song_id = ?2",
                    RATINGS_TABLE_V_0.name
                ),
                params![user_id, song_id],
                rating_from_row,
            )
            .optional()?;
        Ok(rating)
    }

    fn delete_user_rating(&self, user_id: usize, song_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND song_id = ?2",
                RATINGS_TABLE_V_0.name
            ),
            params![user_id, song_id],
        )?;
        Ok(deleted > 0)
    }

    fn song_ratings(&self, song_id: &str) -> Result<Vec<Rating>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, song_id, artist_id, stars, comment, rated_at FROM {} WHERE song_id = ?1 ORDER BY rated_at DESC, id DESC",
            RATINGS_TABLE_V_0.name
        ))?;
        let ratings = stmt
            .query_map(params![song_id], rating_from_row)?
            .collect::<Result<Vec<Rating>, _>>()?;
        Ok(ratings)
    }

    fn song_rating_summary(&self, song_id: &str) -> Result<RatingSummary> {
        self.query_rating_summary(
            &format!(
                "SELECT COUNT(*), AVG(stars) FROM {} WHERE song_id = ?",
                RATINGS_TABLE_V_0.name
            ),
            &[SqlParam::Text(song_id.to_string())],
        )
    }

    fn songs_rating_summary(&self, song_ids: &[String]) -> Result<RatingSummary> {
        if song_ids.is_empty() {
            return Ok(RatingSummary {
                count: 0,
                average: None,
            });
        }
        let bind_params: Vec<SqlParam> = song_ids
            .iter()
            .map(|id| SqlParam::Text(id.clone()))
            .collect();
        self.query_rating_summary(
            &format!(
                "SELECT COUNT(*), AVG(stars) FROM {} WHERE song_id IN ({})",
                RATINGS_TABLE_V_0.name,
                placeholders(song_ids.len())
            ),
            &bind_params,
        )
    }

    fn artist_rating_summary(&self, artist_id: &str) -> Result<RatingSummary> {
        if !self.capabilities.rating_artists {
            return Ok(RatingSummary {
                count: 0,
                average: None,
            });
        }
        self.query_rating_summary(
            &format!(
                "SELECT COUNT(*), AVG(stars) FROM {} WHERE artist_id = ?",
                RATINGS_TABLE_V_0.name
            ),
            &[SqlParam::Text(artist_id.to_string())],
        )
    }

    fn known_artist_aggregates(&self, window: &TimeWindow) -> Result<Vec<ArtistRatingAggregate>> {
        if !self.capabilities.rating_artists {
            return Ok(Vec::new());
        }
        let mut conditions = vec!["artist_id IS NOT NULL".to_string()];
        let mut bind_params = Vec::new();
        push_window_conditions(
            "rated_at",
            window,
            self.capabilities.rating_timestamps,
            &mut conditions,
            &mut bind_params,
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT artist_id, COUNT(*), AVG(stars) FROM {}{} GROUP BY artist_id ORDER BY artist_id",
            RATINGS_TABLE_V_0.name,
            where_sql(&conditions)
        ))?;
        let aggregates = stmt
            .query_map(params_from_iter(bind_params.iter()), |row| {
                Ok(ArtistRatingAggregate {
                    artist_id: row.get(0)?,
                    count: row.get::<usize, i64>(1)? as u64,
                    average: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aggregates)
    }

    fn unattributed_song_aggregates(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<SongRatingAggregate>> {
        let mut conditions = Vec::new();
        let mut bind_params = Vec::new();
        if self.capabilities.rating_artists {
            conditions.push("artist_id IS NULL".to_string());
        }
        push_window_conditions(
            "rated_at",
            window,
            self.capabilities.rating_timestamps,
            &mut conditions,
            &mut bind_params,
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id, COUNT(*), COALESCE(SUM(stars), 0) FROM {}{} GROUP BY song_id ORDER BY song_id",
            RATINGS_TABLE_V_0.name,
            where_sql(&conditions)
        ))?;
        let aggregates = stmt
            .query_map(params_from_iter(bind_params.iter()), |row| {
                Ok(SongRatingAggregate {
                    song_id: row.get(0)?,
                    count: row.get::<usize, i64>(1)? as u64,
                    sum_stars: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aggregates)
    }

    fn global_rating_summary(&self, window: &TimeWindow) -> Result<RatingSummary> {
        let mut conditions = Vec::new();
        let mut bind_params = Vec::new();
        push_window_conditions(
            "rated_at",
            window,
            self.capabilities.rating_timestamps,
            &mut conditions,
            &mut bind_params,
        );
        self.query_rating_summary(
            &format!(
                "SELECT COUNT(*), AVG(stars) FROM {}{}",
                RATINGS_TABLE_V_0.name,
                where_sql(&conditions)
            ),
            &bind_params,
        )
    }
}
