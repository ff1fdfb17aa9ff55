use super::models::{
    AlbumSale, ArtistRatingAggregate, Playback, PlaybackCounts, PlaybackFilter, Rating,
    RatingSummary, SalesSummary, SongRatingAggregate, TimeWindow,
};
use anyhow::Result;

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait PlaybackStore: Send + Sync {
    /// Records `copies` identical playback rows from the given template.
    /// Returns the number of rows inserted.
    fn record_playbacks(&self, playback: &Playback, copies: u32) -> Result<u64>;

    /// Counts a song's playbacks. Filters on fields whose capability is
    /// disabled are silently ignored.
    fn count_playbacks(&self, song_id: &str, filter: &PlaybackFilter) -> Result<u64>;

    /// Deletes the song's most recent playback (played_at desc, id desc).
    /// Returns whether a row was deleted.
    fn delete_latest_playback(&self, song_id: &str) -> Result<bool>;

    /// Total and valid-only playback counts within the window.
    /// With the validity capability disabled, valid equals total.
    fn global_playback_counts(&self, window: &TimeWindow) -> Result<PlaybackCounts>;
}

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait SalesStore: Send + Sync {
    /// Records one purchase transaction. Returns the row id.
    fn record_album_sale(&self, sale: &AlbumSale) -> Result<usize>;

    /// Rollup over one album's sales within the window. Refunded rows are
    /// excluded unless `include_refunds` is set.
    fn album_sales_summary(
        &self,
        album_id: &str,
        window: &TimeWindow,
        include_refunds: bool,
    ) -> Result<SalesSummary>;

    /// Rollup over all sales within the window.
    fn global_sales_summary(
        &self,
        window: &TimeWindow,
        include_refunds: bool,
    ) -> Result<SalesSummary>;
}

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait RatingStore: Send + Sync {
    /// Creates or updates the user's rating for a song, keyed on
    /// (user_id, song_id). An update keeps the original rated_at.
    /// Returns the stored rating and whether it was created.
    fn upsert_rating(
        &self,
        user_id: usize,
        song_id: &str,
        stars: u8,
        comment: &str,
        artist_id: Option<&str>,
    ) -> Result<(Rating, bool)>;

    /// Returns the user's rating for a song, if any.
    fn get_user_rating(&self, user_id: usize, song_id: &str) -> Result<Option<Rating>>;

    /// Deletes the user's rating for a song. Returns whether one existed.
    fn delete_user_rating(&self, user_id: usize, song_id: &str) -> Result<bool>;

    /// All ratings of one song, newest first.
    fn song_ratings(&self, song_id: &str) -> Result<Vec<Rating>>;

    /// Count and unrounded mean over one song's ratings.
    fn song_rating_summary(&self, song_id: &str) -> Result<RatingSummary>;

    /// Count and unrounded mean over the ratings of a set of songs.
    fn songs_rating_summary(&self, song_ids: &[String]) -> Result<RatingSummary>;

    /// Count and unrounded mean over ratings carrying this artist id directly.
    fn artist_rating_summary(&self, artist_id: &str) -> Result<RatingSummary>;

    /// Per-artist rollups over ratings with a direct artist id, within the
    /// window. Empty when the rating-artist capability is disabled.
    fn known_artist_aggregates(&self, window: &TimeWindow) -> Result<Vec<ArtistRatingAggregate>>;

    /// Per-song rollups over artist-less ratings within the window, ordered
    /// by song id. With the rating-artist capability disabled this covers
    /// every rating.
    fn unattributed_song_aggregates(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<SongRatingAggregate>>;

    /// Count and unrounded mean over all ratings within the window.
    fn global_rating_summary(&self, window: &TimeWindow) -> Result<RatingSummary>;
}

/// Combined trait for stats storage
pub trait StatsStore: PlaybackStore + SalesStore + RatingStore {}

// Blanket implementation for any type that implements the three stores
impl<T: PlaybackStore + SalesStore + RatingStore> StatsStore for T {}
