//! Stats API routes: playback counts, album sales, song ratings and artist
//! aggregates.

use crate::server::metrics;
use crate::stats::attribution::{
    enrich_aggregates, normalize_song_id, paginate, resolve_artist_aggregates, sort_aggregates,
};
use crate::stats::models::{format_cents, round_to};
use crate::stats::{
    ArtistAggregate, Playback, PlaybackCounts, PlaybackFilter, RatingSummary, SalesSummary,
    SortKey, TimeWindow,
};
use crate::user::Permission;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::error;

use super::session::Session;
use super::state::ServerState;

/// Header consulted for the label id when the playback body carries none.
const LABEL_ID_HEADER: &str = "X-Label-Id";

/// Maximum accepted rating comment length, in characters.
const MAX_RATING_COMMENT_LENGTH: usize = 512;

/// Page size of the artist ratings listing when the request names none.
const DEFAULT_ARTIST_PAGE_LIMIT: usize = 20;

/// How many artists the global stats breakdown reports.
const GLOBAL_TOP_ARTISTS: usize = 10;

// =============================================================================
// Query parameter parsing
// =============================================================================

/// Parses a query flag. Truthy values are 1/true/yes/y/t, falsy ones
/// 0/false/no/n/f, case insensitive. Anything else counts as absent, not false.
fn parse_bool_param(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC assumed) and `YYYY-MM-DD`
/// (midnight UTC).
fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp())
}

/// Time window from the `from`/`to` query params. Bounds that fail to parse
/// are ignored on read endpoints.
fn window_from_params(params: &HashMap<String, String>) -> TimeWindow {
    TimeWindow {
        from: params.get("from").and_then(|value| parse_timestamp(value)),
        to: params.get("to").and_then(|value| parse_timestamp(value)),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|datetime| datetime.to_rfc3339())
        .unwrap_or_default()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

// =============================================================================
// Playbacks
// =============================================================================

#[derive(Serialize)]
struct SongPlaysResponse {
    song_id: String,
    plays: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_song_plays(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let filter = PlaybackFilter {
        valid: params.get("valid").and_then(|value| parse_bool_param(value)),
        window: window_from_params(&params),
        ..Default::default()
    };
    match state.stats_store.count_playbacks(&song_id, &filter) {
        Ok(plays) => Json(SongPlaysResponse {
            song_id,
            plays,
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to count playbacks of {}: {}", song_id, err);
            metrics::record_error("store", "song_plays");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SongPlaysResponse {
                    song_id,
                    plays: 0,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct RecordPlaysBody {
    /// Number of identical playback rows to insert, default 1.
    count: Option<serde_json::Value>,

    valid: Option<bool>,

    /// Unix seconds or any timestamp format the query params accept.
    played_at: Option<serde_json::Value>,

    seconds: Option<u32>,
    artist_id: Option<String>,
    label_id: Option<String>,
}

#[derive(Serialize)]
struct RecordPlaysResponse {
    ok: bool,
    song_id: String,
    added: u64,
    total: u64,
}

async fn record_song_plays(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RecordPlaysBody>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::RecordEvents) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let count = match &body.count {
        None => 1,
        Some(value) => match value.as_u64() {
            Some(count) if count >= 1 && count <= u32::MAX as u64 => count as u32,
            _ => return bad_request("count must be a positive integer"),
        },
    };
    let played_at = match &body.played_at {
        None | Some(serde_json::Value::Null) => Utc::now().timestamp(),
        Some(serde_json::Value::Number(unix)) => match unix.as_i64() {
            Some(played_at) => played_at,
            None => return bad_request("played_at is not a valid timestamp"),
        },
        Some(serde_json::Value::String(raw)) => match parse_timestamp(raw) {
            Some(played_at) => played_at,
            None => return bad_request("played_at is not a valid timestamp"),
        },
        Some(_) => return bad_request("played_at is not a valid timestamp"),
    };

    let mut artist_id = body.artist_id.clone();
    let mut label_id = body.label_id.clone().or_else(|| {
        headers
            .get(LABEL_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    });
    if label_id.is_none() && state.capabilities.playback_labels {
        // Best effort, a failed catalog lookup leaves the fields null.
        if let Some(track) = state.catalog.get_track(&song_id).await.ok().flatten() {
            label_id = track.label_id();
            if artist_id.is_none() && state.capabilities.playback_artists {
                artist_id = track.resolved_artist_id();
            }
        }
    }

    let playback = Playback {
        id: None,
        song_id: song_id.clone(),
        seconds: body.seconds.unwrap_or(0),
        valid: body.valid.unwrap_or(true),
        artist_id,
        label_id,
        played_at,
    };
    let added = match state.stats_store.record_playbacks(&playback, count) {
        Ok(added) => added,
        Err(err) => {
            error!("Failed to record playbacks of {}: {}", song_id, err);
            metrics::record_error("store", "record_plays");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    metrics::record_playbacks(playback.valid, added);
    match state
        .stats_store
        .count_playbacks(&song_id, &PlaybackFilter::default())
    {
        Ok(total) => (
            StatusCode::CREATED,
            Json(RecordPlaysResponse {
                ok: true,
                song_id,
                added,
                total,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to count playbacks of {}: {}", song_id, err);
            metrics::record_error("store", "record_plays");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
struct DeletePlayResponse {
    song_id: String,
    plays: u64,
    changed: i64,
}

async fn delete_latest_song_play(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::RecordEvents) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let deleted = match state.stats_store.delete_latest_playback(&song_id) {
        Ok(deleted) => deleted,
        Err(err) => {
            error!("Failed to delete latest playback of {}: {}", song_id, err);
            metrics::record_error("store", "delete_play");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match state
        .stats_store
        .count_playbacks(&song_id, &PlaybackFilter::default())
    {
        Ok(plays) => Json(DeletePlayResponse {
            song_id,
            plays,
            changed: if deleted { -1 } else { 0 },
        })
        .into_response(),
        Err(err) => {
            error!("Failed to count playbacks of {}: {}", song_id, err);
            metrics::record_error("store", "delete_play");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Album sales
// =============================================================================

#[derive(Serialize)]
struct AlbumSalesResponse {
    album_id: String,
    orders: u64,
    sales: u64,
    last_purchase: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    revenue: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_album_sales(
    session: Session,
    State(state): State<ServerState>,
    Path(album_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let include_refunds = params
        .get("include_refunds")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    let with_revenue = params
        .get("revenue")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    let window = window_from_params(&params);
    match state
        .stats_store
        .album_sales_summary(&album_id, &window, include_refunds)
    {
        Ok(summary) => Json(AlbumSalesResponse {
            album_id,
            orders: summary.orders,
            sales: summary.units,
            last_purchase: summary.last_purchase.map(format_timestamp),
            revenue: with_revenue.then(|| format_cents(summary.amount_cents)),
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to summarize sales of album {}: {}", album_id, err);
            metrics::record_error("store", "album_sales");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AlbumSalesResponse {
                    album_id,
                    orders: 0,
                    sales: 0,
                    last_purchase: None,
                    revenue: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Ratings
// =============================================================================

#[derive(Serialize)]
struct ArtistRatingsResponse {
    total: usize,
    limit: usize,
    offset: usize,
    items: Vec<ArtistAggregate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_artist_ratings(
    session: Session,
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let limit = params
        .get("limit")
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_ARTIST_PAGE_LIMIT);
    let offset = params
        .get("offset")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let sort = params
        .get("sort")
        .map(|value| SortKey::parse(value))
        .unwrap_or(SortKey::Count);
    let enrich = params
        .get("enrich")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    let window = window_from_params(&params);

    let loaded = state
        .stats_store
        .known_artist_aggregates(&window)
        .and_then(|known| {
            let unknown = state.stats_store.unattributed_song_aggregates(&window)?;
            Ok((known, unknown))
        });
    let (known, unknown) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("Failed to load artist rating aggregates: {}", err);
            metrics::record_error("store", "artist_ratings");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ArtistRatingsResponse {
                    total: 0,
                    limit,
                    offset,
                    items: vec![],
                    error: Some(err.to_string()),
                }),
            )
                .into_response();
        }
    };

    let mut merged = resolve_artist_aggregates(state.catalog.as_ref(), known, unknown).await;
    sort_aggregates(&mut merged, sort);
    let (total, mut items) = paginate(merged, limit, offset);
    if enrich {
        enrich_aggregates(state.catalog.as_ref(), &mut items).await;
    }
    Json(ArtistRatingsResponse {
        total,
        limit,
        offset,
        items,
        error: None,
    })
    .into_response()
}

#[derive(Serialize)]
struct ArtistAggregateResponse {
    artist_id: String,
    ratings_count: u64,
    ratings_average: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_artist_aggregate(
    session: Session,
    State(state): State<ServerState>,
    Path(artist_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let mut summary = match state.stats_store.artist_rating_summary(&artist_id) {
        Ok(summary) => summary,
        Err(err) => {
            error!("Failed to aggregate ratings of artist {}: {}", artist_id, err);
            metrics::record_error("store", "artist_aggregate");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ArtistAggregateResponse {
                    artist_id,
                    ratings_count: 0,
                    ratings_average: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response();
        }
    };
    if summary.count == 0 {
        // No rating names this artist directly, fall back to the track list.
        let tracks = state
            .catalog
            .get_artist_tracks(&artist_id)
            .await
            .unwrap_or_default();
        let song_ids: Vec<String> = tracks.into_iter().map(|track| track.id).collect();
        if !song_ids.is_empty() {
            match state.stats_store.songs_rating_summary(&song_ids) {
                Ok(fallback) => summary = fallback,
                Err(err) => {
                    error!("Failed to aggregate ratings of artist {}: {}", artist_id, err);
                    metrics::record_error("store", "artist_aggregate");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ArtistAggregateResponse {
                            artist_id,
                            ratings_count: 0,
                            ratings_average: None,
                            error: Some(err.to_string()),
                        }),
                    )
                        .into_response();
                }
            }
        }
    }
    Json(ArtistAggregateResponse {
        artist_id,
        ratings_count: summary.count,
        ratings_average: summary.average.map(|average| round_to(average, 4)),
        error: None,
    })
    .into_response()
}

#[derive(Serialize)]
struct SongAggregateResponse {
    song_id: String,
    ratings_count: u64,
    ratings_average: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_song_aggregate(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.stats_store.song_rating_summary(&song_id) {
        Ok(summary) => Json(SongAggregateResponse {
            song_id,
            ratings_count: summary.count,
            ratings_average: summary.average.map(|average| round_to(average, 4)),
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to aggregate ratings of {}: {}", song_id, err);
            metrics::record_error("store", "song_aggregate");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SongAggregateResponse {
                    song_id,
                    ratings_count: 0,
                    ratings_average: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct RatingItem {
    user_id: usize,
    stars: u8,
    comment: String,
    rated_at: String,
}

#[derive(Serialize)]
struct SongRatingsResponse {
    song_id: String,
    total: usize,
    items: Vec<RatingItem>,
}

async fn get_song_ratings(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.stats_store.song_ratings(&song_id) {
        Ok(ratings) => {
            let items: Vec<RatingItem> = ratings
                .into_iter()
                .map(|rating| RatingItem {
                    user_id: rating.user_id,
                    stars: rating.stars,
                    comment: rating.comment,
                    rated_at: format_timestamp(rating.rated_at),
                })
                .collect();
            Json(SongRatingsResponse {
                song_id,
                total: items.len(),
                items,
            })
            .into_response()
        }
        Err(err) => {
            error!("Failed to list ratings of {}: {}", song_id, err);
            metrics::record_error("store", "song_ratings");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
struct UserRatingItem {
    stars: u8,
    comment: String,
    rated_at: String,
}

#[derive(Serialize)]
struct SongRatingResponse {
    song_id: String,
    count: u64,
    average: Option<f64>,
    user_rating: Option<UserRatingItem>,
}

async fn get_song_rating(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewStats) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let loaded = state
        .stats_store
        .song_rating_summary(&song_id)
        .and_then(|summary| {
            let own = state.stats_store.get_user_rating(session.user_id, &song_id)?;
            Ok((summary, own))
        });
    match loaded {
        Ok((summary, own)) => Json(SongRatingResponse {
            song_id,
            count: summary.count,
            average: summary.average.map(|average| round_to(average, 2)),
            user_rating: own.map(|rating| UserRatingItem {
                stars: rating.stars,
                comment: rating.comment,
                rated_at: format_timestamp(rating.rated_at),
            }),
        })
        .into_response(),
        Err(err) => {
            error!("Failed to load rating of {}: {}", song_id, err);
            metrics::record_error("store", "song_rating");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize, Debug)]
struct UpsertRatingBody {
    stars: Option<serde_json::Value>,
    comment: Option<String>,
    artist_id: Option<String>,
}

#[derive(Serialize)]
struct UpsertRatingResponse {
    song_id: String,
    stars: u8,
    comment: String,
    rated_at: String,
    created: bool,
}

async fn upsert_song_rating(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
    Json(body): Json<UpsertRatingBody>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::SubmitRatings) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let stars = match body.stars.as_ref().and_then(|value| value.as_i64()) {
        Some(stars) if (1..=5).contains(&stars) => stars as u8,
        _ => return bad_request("stars must be an integer between 1 and 5"),
    };
    let comment = body.comment.unwrap_or_default();
    if comment.chars().count() > MAX_RATING_COMMENT_LENGTH {
        return bad_request("comment is too long");
    }

    let canonical_id = normalize_song_id(state.catalog.as_ref(), &song_id).await;
    match state.stats_store.upsert_rating(
        session.user_id,
        &canonical_id,
        stars,
        &comment,
        body.artist_id.as_deref(),
    ) {
        Ok((rating, created)) => {
            metrics::record_rating_upsert(created);
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(UpsertRatingResponse {
                    song_id: rating.song_id,
                    stars: rating.stars,
                    comment: rating.comment,
                    rated_at: format_timestamp(rating.rated_at),
                    created,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to store rating of {}: {}", canonical_id, err);
            metrics::record_error("store", "rating_upsert");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
struct DeleteRatingResponse {
    song_id: String,
    deleted: bool,
}

async fn delete_song_rating(
    session: Session,
    State(state): State<ServerState>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::SubmitRatings) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state
        .stats_store
        .delete_user_rating(session.user_id, &song_id)
    {
        Ok(deleted) => Json(DeleteRatingResponse { song_id, deleted }).into_response(),
        Err(err) => {
            error!("Failed to delete rating of {}: {}", song_id, err);
            metrics::record_error("store", "rating_delete");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Global stats
// =============================================================================

#[derive(Serialize)]
struct Timeframe {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Serialize)]
struct GlobalPlays {
    total: u64,
    valid: u64,
}

#[derive(Serialize)]
struct GlobalSales {
    orders: u64,
    units: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    revenue: Option<String>,
}

#[derive(Serialize)]
struct GlobalRatings {
    count: u64,
    average: Option<f64>,
}

#[derive(Serialize)]
struct GlobalStatsResponse {
    timeframe: Timeframe,
    plays: GlobalPlays,
    sales: GlobalSales,
    ratings: GlobalRatings,

    #[serde(skip_serializing_if = "Option::is_none")]
    by_artist: Option<Vec<ArtistAggregate>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl GlobalStatsResponse {
    fn zeroed(timeframe: Timeframe, error: String) -> Self {
        Self {
            timeframe,
            plays: GlobalPlays { total: 0, valid: 0 },
            sales: GlobalSales {
                orders: 0,
                units: 0,
                revenue: None,
            },
            ratings: GlobalRatings {
                count: 0,
                average: None,
            },
            by_artist: None,
            error: Some(error),
        }
    }
}

async fn collect_global_stats(
    state: &ServerState,
    window: &TimeWindow,
    include_refunds: bool,
    by_artist: bool,
) -> anyhow::Result<(
    PlaybackCounts,
    SalesSummary,
    RatingSummary,
    Option<Vec<ArtistAggregate>>,
)> {
    let plays = state.stats_store.global_playback_counts(window)?;
    let sales = state.stats_store.global_sales_summary(window, include_refunds)?;
    let ratings = state.stats_store.global_rating_summary(window)?;
    let top_artists = if by_artist {
        let known = state.stats_store.known_artist_aggregates(window)?;
        let unknown = state.stats_store.unattributed_song_aggregates(window)?;
        let mut merged = resolve_artist_aggregates(state.catalog.as_ref(), known, unknown).await;
        sort_aggregates(&mut merged, SortKey::Count);
        merged.truncate(GLOBAL_TOP_ARTISTS);
        Some(merged)
    } else {
        None
    };
    Ok((plays, sales, ratings, top_artists))
}

async fn get_global_stats(
    session: Session,
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !session.has_permission(Permission::ViewLabelAnalytics) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let window = window_from_params(&params);
    let include_refunds = params
        .get("include_refunds")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    let with_revenue = params
        .get("revenue")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    let by_artist = params
        .get("by_artist")
        .and_then(|value| parse_bool_param(value))
        .unwrap_or(false);
    // The timeframe echoes the raw parameters, parsed or not.
    let timeframe = Timeframe {
        from: params.get("from").cloned(),
        to: params.get("to").cloned(),
    };
    match collect_global_stats(&state, &window, include_refunds, by_artist).await {
        Ok((plays, sales, ratings, top_artists)) => Json(GlobalStatsResponse {
            timeframe,
            plays: GlobalPlays {
                total: plays.total,
                valid: plays.valid,
            },
            sales: GlobalSales {
                orders: sales.orders,
                units: sales.units,
                revenue: with_revenue.then(|| format_cents(sales.amount_cents)),
            },
            ratings: GlobalRatings {
                count: ratings.count,
                average: ratings.average.map(|average| round_to(average, 4)),
            },
            by_artist: top_artists,
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to collect global stats: {}", err);
            metrics::record_error("store", "global");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GlobalStatsResponse::zeroed(timeframe, err.to_string())),
            )
                .into_response()
        }
    }
}

pub fn make_stats_routes(state: ServerState) -> Router {
    Router::new()
        .route("/songs/{song_id}/plays", get(get_song_plays))
        .route("/songs/{song_id}/plays", post(record_song_plays))
        .route("/songs/{song_id}/plays", delete(delete_latest_song_play))
        .route("/songs/{song_id}/aggregate", get(get_song_aggregate))
        .route("/songs/{song_id}/ratings", get(get_song_ratings))
        .route("/songs/{song_id}/rating", get(get_song_rating))
        .route("/songs/{song_id}/rating", post(upsert_song_rating))
        .route("/songs/{song_id}/rating", put(upsert_song_rating))
        .route("/songs/{song_id}/rating", delete(delete_song_rating))
        .route("/albums/{album_id}/sales", get(get_album_sales))
        .route("/artists/ratings", get(get_artist_ratings))
        .route("/artists/{artist_id}/aggregate", get(get_artist_aggregate))
        .route("/global", get(get_global_stats))
        .with_state(state)
}
