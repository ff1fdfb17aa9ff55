pub mod attribution;
mod capabilities;
pub mod models;
mod sqlite_stats_store;
mod stats_store;

pub use capabilities::FieldCapabilities;
pub use models::{
    AlbumSale, ArtistAggregate, ArtistRatingAggregate, Playback, PlaybackCounts, PlaybackFilter,
    Rating, RatingSummary, SalesSummary, SongRatingAggregate, SortKey, TimeWindow,
};
pub use sqlite_stats_store::SqliteStatsStore;
pub use stats_store::{PlaybackStore, RatingStore, SalesStore, StatsStore};

#[cfg(feature = "mock")]
pub use stats_store::{MockPlaybackStore, MockRatingStore, MockSalesStore};
