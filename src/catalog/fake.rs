//! In-memory catalog implementation, used by unit tests and injectable into
//! the server for e2e coverage of the attribution flow.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::client::CatalogClient;
use super::models::{CatalogArtist, CatalogTrack};

/// Catalog endpoints that can be toggled into a failing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEndpoint {
    TracksBulk,
    TrackLookup,
    TrackSearch,
    ArtistsBulk,
    ArtistLookup,
    ArtistTracks,
}

#[derive(Default)]
pub struct FakeCatalogClient {
    tracks: Mutex<HashMap<String, CatalogTrack>>,
    search_results: Mutex<HashMap<String, Vec<CatalogTrack>>>,
    artists: Mutex<HashMap<String, CatalogArtist>>,
    artist_tracks: Mutex<HashMap<String, Vec<CatalogTrack>>>,
    failing: Mutex<HashSet<CatalogEndpoint>>,
    bulk_track_requests: Mutex<Vec<Vec<String>>>,
    track_lookup_requests: Mutex<Vec<String>>,
    search_requests: Mutex<Vec<String>>,
}

fn make_track(track_id: &str, artist_id: Option<&str>, label_id: Option<&str>) -> CatalogTrack {
    CatalogTrack {
        id: track_id.to_string(),
        title: None,
        artist: artist_id.map(|id| CatalogArtist {
            id: id.to_string(),
            name: None,
            label_id: label_id.map(|l| l.to_string()),
        }),
        artist_id: None,
    }
}

impl FakeCatalogClient {
    pub fn new() -> Self {
        FakeCatalogClient::default()
    }

    /// Seeds a track, optionally attributed to an artist.
    pub fn add_track(&self, track_id: &str, artist_id: Option<&str>) {
        self.tracks
            .lock()
            .unwrap()
            .insert(track_id.to_string(), make_track(track_id, artist_id, None));
    }

    /// Seeds a track whose artist carries a label id.
    pub fn add_track_with_label(&self, track_id: &str, artist_id: &str, label_id: &str) {
        self.tracks.lock().unwrap().insert(
            track_id.to_string(),
            make_track(track_id, Some(artist_id), Some(label_id)),
        );
    }

    /// Appends a result to the hit list of a search query.
    pub fn add_search_hit(&self, query: &str, track_id: &str, artist_id: Option<&str>) {
        self.search_results
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_default()
            .push(make_track(track_id, artist_id, None));
    }

    pub fn add_artist(&self, artist_id: &str, name: &str) {
        self.artists.lock().unwrap().insert(
            artist_id.to_string(),
            CatalogArtist {
                id: artist_id.to_string(),
                name: Some(name.to_string()),
                label_id: None,
            },
        );
    }

    pub fn set_artist_tracks(&self, artist_id: &str, track_ids: &[&str]) {
        let tracks = track_ids
            .iter()
            .map(|id| make_track(id, Some(artist_id), None))
            .collect();
        self.artist_tracks
            .lock()
            .unwrap()
            .insert(artist_id.to_string(), tracks);
    }

    /// Makes one endpoint return errors until re-enabled.
    pub fn fail_endpoint(&self, endpoint: CatalogEndpoint) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn restore_endpoint(&self, endpoint: CatalogEndpoint) {
        self.failing.lock().unwrap().remove(&endpoint);
    }

    /// The id lists of every bulk track request made so far.
    pub fn bulk_track_requests(&self) -> Vec<Vec<String>> {
        self.bulk_track_requests.lock().unwrap().clone()
    }

    /// Ids of every single-track lookup made so far.
    pub fn track_lookup_requests(&self) -> Vec<String> {
        self.track_lookup_requests.lock().unwrap().clone()
    }

    /// Queries of every track search made so far.
    pub fn search_requests(&self) -> Vec<String> {
        self.search_requests.lock().unwrap().clone()
    }

    fn check(&self, endpoint: CatalogEndpoint) -> Result<()> {
        if self.failing.lock().unwrap().contains(&endpoint) {
            bail!("catalog endpoint {:?} is unavailable", endpoint);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for FakeCatalogClient {
    async fn get_track(&self, track_id: &str) -> Result<Option<CatalogTrack>> {
        self.check(CatalogEndpoint::TrackLookup)?;
        self.track_lookup_requests
            .lock()
            .unwrap()
            .push(track_id.to_string());
        Ok(self.tracks.lock().unwrap().get(track_id).cloned())
    }

    async fn get_tracks_by_ids(&self, track_ids: &[String]) -> Result<Vec<CatalogTrack>> {
        self.check(CatalogEndpoint::TracksBulk)?;
        self.bulk_track_requests
            .lock()
            .unwrap()
            .push(track_ids.to_vec());
        let tracks = self.tracks.lock().unwrap();
        Ok(track_ids
            .iter()
            .filter_map(|id| tracks.get(id).cloned())
            .collect())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>> {
        self.check(CatalogEndpoint::TrackSearch)?;
        self.search_requests.lock().unwrap().push(query.to_string());
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_artist(&self, artist_id: &str) -> Result<Option<CatalogArtist>> {
        self.check(CatalogEndpoint::ArtistLookup)?;
        Ok(self.artists.lock().unwrap().get(artist_id).cloned())
    }

    async fn get_artists_by_ids(&self, artist_ids: &[String]) -> Result<Vec<CatalogArtist>> {
        self.check(CatalogEndpoint::ArtistsBulk)?;
        let artists = self.artists.lock().unwrap();
        Ok(artist_ids
            .iter()
            .filter_map(|id| artists.get(id).cloned())
            .collect())
    }

    async fn get_artist_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>> {
        self.check(CatalogEndpoint::ArtistTracks)?;
        Ok(self
            .artist_tracks
            .lock()
            .unwrap()
            .get(artist_id)
            .cloned()
            .unwrap_or_default())
    }
}
