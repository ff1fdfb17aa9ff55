//! HTTP client for the content catalog service.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{ArtistListBody, CatalogArtist, CatalogTrack, TrackListBody};
use crate::server::metrics::record_catalog_lookup;

// Bulk fetches get a little more headroom than single lookups; the search
// endpoint is the slowest on the catalog side so it stays short.
const TRACKS_BULK_TIMEOUT: Duration = Duration::from_secs(5);
const TRACK_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
const TRACK_SEARCH_TIMEOUT: Duration = Duration::from_secs(3);
const ARTISTS_BULK_TIMEOUT: Duration = Duration::from_secs(5);
const ARTIST_LOOKUP_TIMEOUT: Duration = Duration::from_secs(4);
const ARTIST_TRACKS_TIMEOUT: Duration = Duration::from_secs(5);

/// Read access to the content catalog. Every method is one short-lived
/// request; callers treat failures as missing data, never as fatal.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetches one track. Ok(None) when the catalog does not know the id.
    async fn get_track(&self, track_id: &str) -> Result<Option<CatalogTrack>>;

    /// Bulk track fetch. The response may cover only a subset of the ids.
    async fn get_tracks_by_ids(&self, track_ids: &[String]) -> Result<Vec<CatalogTrack>>;

    /// Free-text track search.
    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>>;

    /// Fetches one artist. Ok(None) when the catalog does not know the id.
    async fn get_artist(&self, artist_id: &str) -> Result<Option<CatalogArtist>>;

    /// Bulk artist fetch. The response may cover only a subset of the ids.
    async fn get_artists_by_ids(&self, artist_ids: &[String]) -> Result<Vec<CatalogArtist>>;

    /// The tracks the catalog attributes to an artist.
    async fn get_artist_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>>;
}

/// Client for the content catalog HTTP API.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Create a new HttpCatalogClient.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog API (e.g., "http://localhost:8001/api/v1")
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_json<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<T> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Catalog request {} failed with status: {}",
                url,
                response.status()
            ));
        }
        Ok(response.json().await?)
    }

    async fn request_optional_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Option<T>> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "Catalog request {} failed with status: {}",
                url,
                response.status()
            ));
        }
        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_track(&self, track_id: &str) -> Result<Option<CatalogTrack>> {
        let url = format!("{}/tracks/{}", self.base_url, track_id);
        let result = self.request_optional_json(&url, TRACK_LOOKUP_TIMEOUT).await;
        record_catalog_lookup("track_lookup", result.is_ok());
        result
    }

    async fn get_tracks_by_ids(&self, track_ids: &[String]) -> Result<Vec<CatalogTrack>> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/tracks?ids={}",
            self.base_url,
            urlencoding::encode(&track_ids.join(","))
        );
        let result = self
            .request_json::<TrackListBody>(&url, TRACKS_BULK_TIMEOUT)
            .await;
        record_catalog_lookup("tracks_bulk", result.is_ok());
        Ok(result?.into_tracks())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>> {
        let url = format!(
            "{}/tracks/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let result = self
            .request_json::<TrackListBody>(&url, TRACK_SEARCH_TIMEOUT)
            .await;
        record_catalog_lookup("track_search", result.is_ok());
        Ok(result?.into_tracks())
    }

    async fn get_artist(&self, artist_id: &str) -> Result<Option<CatalogArtist>> {
        let url = format!("{}/artists/{}", self.base_url, artist_id);
        let result = self.request_optional_json(&url, ARTIST_LOOKUP_TIMEOUT).await;
        record_catalog_lookup("artist_lookup", result.is_ok());
        result
    }

    async fn get_artists_by_ids(&self, artist_ids: &[String]) -> Result<Vec<CatalogArtist>> {
        if artist_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/artists?ids={}",
            self.base_url,
            urlencoding::encode(&artist_ids.join(","))
        );
        let result = self
            .request_json::<ArtistListBody>(&url, ARTISTS_BULK_TIMEOUT)
            .await;
        record_catalog_lookup("artists_bulk", result.is_ok());
        Ok(result?.into_artists())
    }

    async fn get_artist_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>> {
        let url = format!("{}/artists/{}/tracks", self.base_url, artist_id);
        let result = self
            .request_json::<TrackListBody>(&url, ARTIST_TRACKS_TIMEOUT)
            .await;
        record_catalog_lookup("artist_tracks", result.is_ok());
        Ok(result?.into_tracks())
    }
}
