//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases and a fake
//! catalog seeded with a small, well-known set of tracks and artists.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use stats_server::catalog::FakeCatalogClient;
use stats_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use stats_server::stats::{FieldCapabilities, SqliteStatsStore};
use stats_server::user::SqliteUserStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases and a fake catalog
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Stats store for seeding and asserting directly against the database
    pub stats_store: Arc<SqliteStatsStore>,

    /// Fake catalog for controlling attribution lookups per test
    pub catalog: Arc<FakeCatalogClient>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server with every capability enabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(FieldCapabilities::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates a temporary database with the standard test users
    /// 2. Seeds a fake catalog with the well-known test tracks and artists
    /// 3. Binds to a random port (127.0.0.1:0)
    /// 4. Spawns the server in a background task
    /// 5. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - Database creation fails
    /// - Port binding fails
    /// - Server fails to start
    /// - Server doesn't become ready within timeout
    pub async fn spawn_with(capabilities: FieldCapabilities) -> Self {
        // Create temporary test resources
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let user_db_path = temp_db_dir.path().join("users.db");
        create_test_db_with_users(&user_db_path).expect("Failed to create test database");

        let stats_store = Arc::new(
            SqliteStatsStore::new(temp_db_dir.path().join("stats.db"), capabilities)
                .expect("Failed to open stats store"),
        );

        let catalog = Arc::new(seeded_fake_catalog());

        let user_store =
            Box::new(SqliteUserStore::new(&user_db_path).expect("Failed to open user store"));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0, // Unused, the metrics listener only exists in run_server
            dev_role_header: None,
        };

        let app = make_app(
            config,
            capabilities,
            stats_store.clone(),
            catalog.clone(),
            user_store,
        )
        .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        // Wait for server to be ready
        let server = Self {
            base_url,
            port,
            stats_store,
            catalog,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    // Server is ready
                    return;
                }
                _ => {
                    // Server not ready yet, wait and retry
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}

/// Builds the fake catalog every test server starts with:
/// song-1 (artist-1, label-1), song-2 (artist-1), song-3 (artist-2),
/// song-4 (no artist). Song 1 is also findable by its title.
fn seeded_fake_catalog() -> FakeCatalogClient {
    let catalog = FakeCatalogClient::new();
    catalog.add_track_with_label(SONG_1_ID, ARTIST_1_ID, LABEL_1_ID);
    catalog.add_track(SONG_2_ID, Some(ARTIST_1_ID));
    catalog.add_track(SONG_3_ID, Some(ARTIST_2_ID));
    catalog.add_track(SONG_4_ID, None);
    catalog.add_artist(ARTIST_1_ID, ARTIST_1_NAME);
    catalog.add_artist(ARTIST_2_ID, ARTIST_2_NAME);
    catalog.set_artist_tracks(ARTIST_1_ID, &[SONG_1_ID, SONG_2_ID]);
    catalog.set_artist_tracks(ARTIST_2_ID, &[SONG_3_ID]);
    catalog.add_search_hit(SONG_1_TITLE, SONG_1_ID, Some(ARTIST_1_ID));
    catalog
}
