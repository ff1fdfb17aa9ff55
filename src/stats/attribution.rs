//! Artist attribution for ratings that lack a direct artist reference.
//!
//! Ratings are split into a known set (artist id stored with the rating) and
//! an unknown set (grouped per song). Unknown songs are resolved against the
//! catalog in three escalating passes, then folded into the known aggregates
//! with a weighted merge. Catalog trouble only ever shrinks the result, it
//! never fails a request.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::CatalogClient;
use crate::stats::models::{
    round_to, ArtistAggregate, ArtistRatingAggregate, SongRatingAggregate, SortKey,
};

/// Resolves song to artist-id mappings in three passes: one bulk fetch, then
/// per-id lookups for the ids the bulk response missed, then a unique-match
/// text search for whatever is still unknown.
///
/// A song that maps to Some(None) was found but carries no artist; it is
/// settled and must not be retried. Absent keys stay unresolved.
async fn resolve_song_artists(
    catalog: &dyn CatalogClient,
    song_ids: &[String],
) -> HashMap<String, Option<String>> {
    let mut resolved: HashMap<String, Option<String>> = HashMap::new();

    match catalog.get_tracks_by_ids(song_ids).await {
        Ok(tracks) => {
            for track in tracks {
                resolved.insert(track.id.clone(), track.resolved_artist_id());
            }
        }
        Err(e) => debug!("Bulk track resolution failed: {e:#}"),
    }

    let missing: Vec<&String> = song_ids
        .iter()
        .filter(|id| !resolved.contains_key(*id))
        .collect();
    for song_id in missing {
        match catalog.get_track(song_id).await {
            Ok(Some(track)) => {
                resolved.insert(song_id.clone(), track.resolved_artist_id());
            }
            Ok(None) => {}
            Err(e) => debug!("Track lookup of {song_id} failed: {e:#}"),
        }
    }

    let searchable: Vec<&String> = song_ids
        .iter()
        .filter(|id| !resolved.contains_key(*id))
        .filter(|id| !id.chars().all(|c| c.is_ascii_digit()))
        .collect();
    for song_id in searchable {
        match catalog.search_tracks(song_id).await {
            Ok(hits) if hits.len() == 1 => {
                if let Some(artist_id) = hits[0].resolved_artist_id() {
                    resolved.insert(song_id.clone(), Some(artist_id));
                }
            }
            Ok(_) => {}
            Err(e) => debug!("Track search of {song_id} failed: {e:#}"),
        }
    }

    resolved
}

/// Builds the merged per-artist aggregate set: the known aggregates seed the
/// result, then every resolvable unknown song folds in with
/// `new_count = c0 + c`, `new_sum = avg0 * c0 + s`, `new_avg =
/// round(new_sum / new_count, 2)`. Unresolved songs contribute nothing.
pub async fn resolve_artist_aggregates(
    catalog: &dyn CatalogClient,
    known: Vec<ArtistRatingAggregate>,
    unknown: Vec<SongRatingAggregate>,
) -> Vec<ArtistAggregate> {
    let mut aggregates: Vec<ArtistAggregate> = known
        .into_iter()
        .map(|k| ArtistAggregate {
            artist_id: k.artist_id,
            ratings_count: k.count,
            ratings_average: k.average.map(|avg| round_to(avg, 2)),
            artist: None,
        })
        .collect();

    if unknown.is_empty() {
        return aggregates;
    }

    let mut positions: HashMap<String, usize> = aggregates
        .iter()
        .enumerate()
        .map(|(index, aggregate)| (aggregate.artist_id.clone(), index))
        .collect();

    let song_ids: Vec<String> = unknown.iter().map(|row| row.song_id.clone()).collect();
    let song_artists = resolve_song_artists(catalog, &song_ids).await;

    for row in unknown {
        let artist_id = match song_artists.get(&row.song_id) {
            Some(Some(artist_id)) => artist_id.clone(),
            _ => continue,
        };
        match positions.get(&artist_id) {
            Some(&index) => {
                let aggregate = &mut aggregates[index];
                let c0 = aggregate.ratings_count;
                let avg0 = aggregate.ratings_average.unwrap_or(0.0);
                let new_count = c0 + row.count;
                let new_sum = avg0 * c0 as f64 + row.sum_stars as f64;
                aggregate.ratings_count = new_count;
                aggregate.ratings_average = Some(round_to(new_sum / new_count as f64, 2));
            }
            None => {
                positions.insert(artist_id.clone(), aggregates.len());
                aggregates.push(ArtistAggregate {
                    artist_id,
                    ratings_count: row.count,
                    ratings_average: Some(round_to(
                        row.sum_stars as f64 / row.count as f64,
                        2,
                    )),
                    artist: None,
                });
            }
        }
    }

    aggregates
}

/// Sorts descending by the chosen key. The sort is stable, ties keep their
/// merge order.
pub fn sort_aggregates(aggregates: &mut [ArtistAggregate], sort: SortKey) {
    match sort {
        SortKey::Count => aggregates.sort_by(|a, b| b.ratings_count.cmp(&a.ratings_count)),
        SortKey::Average => aggregates.sort_by(|a, b| {
            b.ratings_average
                .unwrap_or(0.0)
                .total_cmp(&a.ratings_average.unwrap_or(0.0))
        }),
    }
}

/// In-memory pagination. Returns the pre-pagination total and the page.
pub fn paginate(
    aggregates: Vec<ArtistAggregate>,
    limit: usize,
    offset: usize,
) -> (usize, Vec<ArtistAggregate>) {
    let total = aggregates.len();
    let page = aggregates.into_iter().skip(offset).take(limit).collect();
    (total, page)
}

/// Attaches artist metadata to the page items: one bulk fetch, then a per-id
/// patch for the ids the bulk response missed. Failures leave metadata off.
pub async fn enrich_aggregates(catalog: &dyn CatalogClient, aggregates: &mut [ArtistAggregate]) {
    if aggregates.is_empty() {
        return;
    }
    let artist_ids: Vec<String> = aggregates
        .iter()
        .map(|aggregate| aggregate.artist_id.clone())
        .collect();

    let mut by_id = match catalog.get_artists_by_ids(&artist_ids).await {
        Ok(artists) => artists
            .into_iter()
            .map(|artist| (artist.id.clone(), artist))
            .collect(),
        Err(e) => {
            debug!("Bulk artist enrichment failed: {e:#}");
            HashMap::new()
        }
    };

    for aggregate in aggregates.iter_mut() {
        aggregate.artist = by_id.remove(&aggregate.artist_id);
        if aggregate.artist.is_none() {
            aggregate.artist = catalog.get_artist(&aggregate.artist_id).await.ok().flatten();
        }
    }
}

/// Canonicalizes a song id against the catalog: a by-id hit wins, else a
/// search with exactly one hit. Everything else leaves the id unchanged.
pub async fn normalize_song_id(catalog: &dyn CatalogClient, song_id: &str) -> String {
    if let Ok(Some(track)) = catalog.get_track(song_id).await {
        return track.id;
    }
    if let Ok(hits) = catalog.search_tracks(song_id).await {
        if hits.len() == 1 {
            return hits[0].id.clone();
        }
    }
    song_id.to_string()
}
