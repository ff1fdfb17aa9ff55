//! Stats domain models

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogArtist;

/// One recorded play event of a song.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Playback {
    pub id: Option<usize>,
    pub song_id: String,
    /// Listening time in seconds
    pub seconds: u32,
    pub valid: bool,
    pub artist_id: Option<String>,
    pub label_id: Option<String>,
    /// Unix timestamp of the play event
    pub played_at: i64,
}

/// One recorded purchase transaction of an album.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AlbumSale {
    pub id: Option<usize>,
    pub album_id: String,
    /// Unix timestamp of the purchase
    pub purchased_at: i64,
    pub units: u32,
    /// Fixed-precision monetary amount in cents
    pub amount_cents: i64,
    /// ISO 4217 code, e.g. "EUR"
    pub currency: String,
    pub refunded: bool,
}

/// One user's 1-5 star score for a song. At most one per (user, song).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Rating {
    pub id: Option<usize>,
    pub user_id: usize,
    pub song_id: String,
    pub artist_id: Option<String>,
    pub stars: u8,
    pub comment: String,
    /// Unix timestamp, set on creation and kept unchanged on update
    pub rated_at: i64,
}

/// Half-open time window [from, to) over an entity's timestamp field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        TimeWindow::default()
    }

    pub fn contains(&self, ts: i64) -> bool {
        if let Some(from) = self.from {
            if ts < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if ts >= to {
                return false;
            }
        }
        true
    }
}

/// Filters for playback counting. Fields covered by a disabled capability
/// are ignored by the store.
#[derive(Debug, Clone, Default)]
pub struct PlaybackFilter {
    pub valid: Option<bool>,
    pub window: TimeWindow,
    /// Allow-list of artist ids
    pub artist_ids: Option<Vec<String>>,
    pub label_id: Option<String>,
}

// ============================================================================
// Aggregate Rows
// ============================================================================

/// Count and unrounded mean over a set of ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    pub average: Option<f64>,
}

/// Playback counts, total and valid-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCounts {
    pub total: u64,
    pub valid: u64,
}

/// Rollup over a set of album sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    /// Number of purchase transactions
    pub orders: u64,
    /// Total units sold
    pub units: u64,
    pub amount_cents: i64,
    /// Unix timestamp of the newest matching purchase
    pub last_purchase: Option<i64>,
}

/// Store-side aggregate for ratings that carry a direct artist id.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRatingAggregate {
    pub artist_id: String,
    pub count: u64,
    pub average: Option<f64>,
}

/// Store-side aggregate for artist-less ratings, grouped by song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRatingAggregate {
    pub song_id: String,
    pub count: u64,
    pub sum_stars: i64,
}

/// Merged per-artist rollup, the response item of the artists listing.
/// Derived per request, never persisted.
#[derive(Serialize, Debug, Clone)]
pub struct ArtistAggregate {
    pub artist_id: String,
    pub ratings_count: u64,
    pub ratings_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<CatalogArtist>,
}

/// Sort key for artist aggregate listings, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Count,
    Average,
}

impl SortKey {
    /// Unknown values fall back to Count.
    pub fn parse(s: &str) -> SortKey {
        match s.trim().trim_start_matches('-').to_lowercase().as_str() {
            "average" => SortKey::Average,
            _ => SortKey::Count,
        }
    }
}

// ============================================================================
// Numeric Helpers
// ============================================================================

/// Rounds half away from zero to the given number of decimals.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Renders integer cents as a fixed two-decimal string, e.g. 1234 -> "12.34".
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
