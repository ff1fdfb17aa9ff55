//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all stats-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as a regular user
    ///
    /// This is the most common way to create a test client.
    /// The client is ready to make authenticated requests.
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as an admin user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_admin(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(ADMIN_USER, ADMIN_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Admin authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as a label analyst
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_label(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(LABEL_USER, LABEL_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Label user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "user_handle": handle,
                "password": password
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    // ========================================================================
    // Playback Endpoints
    // ========================================================================

    /// GET /v1/stats/songs/{id}/plays
    pub async fn get_song_plays(&self, song_id: &str, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/v1/stats/songs/{}/plays", self.base_url, song_id))
            .query(params)
            .send()
            .await
            .expect("Get song plays request failed")
    }

    /// POST /v1/stats/songs/{id}/plays
    pub async fn record_plays(&self, song_id: &str, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/stats/songs/{}/plays", self.base_url, song_id))
            .json(&body)
            .send()
            .await
            .expect("Record plays request failed")
    }

    /// POST /v1/stats/songs/{id}/plays with an X-Label-Id header
    pub async fn record_plays_with_label_header(
        &self,
        song_id: &str,
        body: serde_json::Value,
        label_id: &str,
    ) -> Response {
        self.client
            .post(format!("{}/v1/stats/songs/{}/plays", self.base_url, song_id))
            .header("X-Label-Id", label_id)
            .json(&body)
            .send()
            .await
            .expect("Record plays request failed")
    }

    /// DELETE /v1/stats/songs/{id}/plays
    pub async fn delete_latest_play(&self, song_id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/stats/songs/{}/plays", self.base_url, song_id))
            .send()
            .await
            .expect("Delete latest play request failed")
    }

    // ========================================================================
    // Sales Endpoints
    // ========================================================================

    /// GET /v1/stats/albums/{id}/sales
    pub async fn get_album_sales(&self, album_id: &str, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!(
                "{}/v1/stats/albums/{}/sales",
                self.base_url, album_id
            ))
            .query(params)
            .send()
            .await
            .expect("Get album sales request failed")
    }

    // ========================================================================
    // Rating Endpoints
    // ========================================================================

    /// GET /v1/stats/songs/{id}/rating
    pub async fn get_song_rating(&self, song_id: &str) -> Response {
        self.client
            .get(format!(
                "{}/v1/stats/songs/{}/rating",
                self.base_url, song_id
            ))
            .send()
            .await
            .expect("Get song rating request failed")
    }

    /// POST /v1/stats/songs/{id}/rating
    pub async fn post_song_rating(&self, song_id: &str, body: serde_json::Value) -> Response {
        self.client
            .post(format!(
                "{}/v1/stats/songs/{}/rating",
                self.base_url, song_id
            ))
            .json(&body)
            .send()
            .await
            .expect("Post song rating request failed")
    }

    /// PUT /v1/stats/songs/{id}/rating
    pub async fn put_song_rating(&self, song_id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!(
                "{}/v1/stats/songs/{}/rating",
                self.base_url, song_id
            ))
            .json(&body)
            .send()
            .await
            .expect("Put song rating request failed")
    }

    /// DELETE /v1/stats/songs/{id}/rating
    pub async fn delete_song_rating(&self, song_id: &str) -> Response {
        self.client
            .delete(format!(
                "{}/v1/stats/songs/{}/rating",
                self.base_url, song_id
            ))
            .send()
            .await
            .expect("Delete song rating request failed")
    }

    /// GET /v1/stats/songs/{id}/ratings
    pub async fn get_song_ratings(&self, song_id: &str) -> Response {
        self.client
            .get(format!(
                "{}/v1/stats/songs/{}/ratings",
                self.base_url, song_id
            ))
            .send()
            .await
            .expect("Get song ratings request failed")
    }

    /// GET /v1/stats/songs/{id}/aggregate
    pub async fn get_song_aggregate(&self, song_id: &str) -> Response {
        self.client
            .get(format!(
                "{}/v1/stats/songs/{}/aggregate",
                self.base_url, song_id
            ))
            .send()
            .await
            .expect("Get song aggregate request failed")
    }

    // ========================================================================
    // Artist Endpoints
    // ========================================================================

    /// GET /v1/stats/artists/ratings
    pub async fn get_artist_ratings(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/v1/stats/artists/ratings", self.base_url))
            .query(params)
            .send()
            .await
            .expect("Get artist ratings request failed")
    }

    /// GET /v1/stats/artists/{id}/aggregate
    pub async fn get_artist_aggregate(&self, artist_id: &str) -> Response {
        self.client
            .get(format!(
                "{}/v1/stats/artists/{}/aggregate",
                self.base_url, artist_id
            ))
            .send()
            .await
            .expect("Get artist aggregate request failed")
    }

    // ========================================================================
    // Global Stats / System Endpoints
    // ========================================================================

    /// GET /v1/stats/global
    pub async fn get_global_stats(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/v1/stats/global", self.base_url))
            .query(params)
            .send()
            .await
            .expect("Get global stats request failed")
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Get home request failed")
    }
}
