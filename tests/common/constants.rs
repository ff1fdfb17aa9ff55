//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, catalog IDs, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user handle
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Admin test user handle
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

/// Label analyst test user handle
pub const LABEL_USER: &str = "labeluser";

/// Label analyst test user password
pub const LABEL_PASS: &str = "labelpass123";

/// Test user without any role, and so without any permission
pub const NOROLE_USER: &str = "norole";

/// Password of the role-less test user
pub const NOROLE_PASS: &str = "norolepass123";

// ============================================================================
// Test Catalog IDs
// ============================================================================

/// Artist ID for "The Test Band"
pub const ARTIST_1_ID: &str = "artist-1";

/// Artist ID for "Jazz Ensemble"
pub const ARTIST_2_ID: &str = "artist-2";

/// Album ID for the album holding songs 1-3
pub const ALBUM_1_ID: &str = "album-1";

/// Album ID for the album holding songs 4-5
pub const ALBUM_2_ID: &str = "album-2";

/// Song by artist-1, carries a label in the catalog
pub const SONG_1_ID: &str = "song-1";

/// Song by artist-1
pub const SONG_2_ID: &str = "song-2";

/// Song by artist-2
pub const SONG_3_ID: &str = "song-3";

/// Song the catalog attributes to nobody
pub const SONG_4_ID: &str = "song-4";

/// Song the catalog does not know at all
pub const UNKNOWN_SONG_ID: &str = "song-unknown";

/// Label ID attached to song-1 in the catalog
pub const LABEL_1_ID: &str = "label-1";

// ============================================================================
// Test Catalog Metadata
// ============================================================================

/// Artist 1 name
pub const ARTIST_1_NAME: &str = "The Test Band";

/// Artist 2 name
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

/// Song 1 title, searchable alias of song-1
pub const SONG_1_TITLE: &str = "Opening Track";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
