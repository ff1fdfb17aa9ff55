//! Payload shapes of the content catalog API.
//!
//! The catalog has grown several response dialects: list endpoints answer
//! either a bare JSON array or an `{items}`/`{results}` (for artists also
//! `{artists}`) wrapper, track entries carry their artist either nested or as
//! a flat id, and ids show up as strings or numbers. Everything is folded
//! into one canonical shape with string ids here.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Str(String),
    Num(i64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> String {
        match value {
            IdValue::Str(s) => s,
            IdValue::Num(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(IdValue::deserialize(deserializer)?.into())
}

fn optional_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<IdValue>::deserialize(deserializer)?.map(String::from))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogArtist {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_id_string"
    )]
    pub label_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogTrack {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<CatalogArtist>,
    #[serde(default, alias = "artistId", deserialize_with = "optional_id_string")]
    pub artist_id: Option<String>,
}

impl CatalogTrack {
    /// The track's artist id, preferring the nested artist object over the
    /// flat field.
    pub fn resolved_artist_id(&self) -> Option<String> {
        self.artist
            .as_ref()
            .map(|artist| artist.id.clone())
            .or_else(|| self.artist_id.clone())
    }

    /// The label id of the track's artist, when the nested object carries one.
    pub fn label_id(&self) -> Option<String> {
        self.artist.as_ref().and_then(|artist| artist.label_id.clone())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TrackListBody {
    Bare(Vec<CatalogTrack>),
    Items { items: Vec<CatalogTrack> },
    Results { results: Vec<CatalogTrack> },
}

impl TrackListBody {
    pub(crate) fn into_tracks(self) -> Vec<CatalogTrack> {
        match self {
            TrackListBody::Bare(tracks) => tracks,
            TrackListBody::Items { items } => items,
            TrackListBody::Results { results } => results,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ArtistListBody {
    Bare(Vec<CatalogArtist>),
    Items { items: Vec<CatalogArtist> },
    Results { results: Vec<CatalogArtist> },
    Artists { artists: Vec<CatalogArtist> },
}

impl ArtistListBody {
    pub(crate) fn into_artists(self) -> Vec<CatalogArtist> {
        match self {
            ArtistListBody::Bare(artists) => artists,
            ArtistListBody::Items { items } => items,
            ArtistListBody::Results { results } => results,
            ArtistListBody::Artists { artists } => artists,
        }
    }
}
