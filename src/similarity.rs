//! Feature normalization and nearest-neighbor search over a track snapshot.
//!
//! The audio and market feature groups are min-max normalized independently
//! across the whole snapshot, then each candidate is scored by a 50/50 blend
//! of the Euclidean distances within each group. Nothing here is cached: the
//! dataset is replaced wholesale by ingestion, so every search builds its
//! [`FeatureSpace`] from a fresh snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AUDIO_DIMS, MARKET_DIMS, Track};

/// How many comparables a search returns at most.
pub const DEFAULT_LIMIT: usize = 10;

pub const AUDIO_WEIGHT: f64 = 0.5;
pub const MARKET_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("track dataset is empty, run ingest_dataset first")]
    DatasetEmpty,

    #[error("track '{0}' not found in dataset")]
    TrackNotFound(String),
}

/// One ranked neighbor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub rank: usize,
    pub track_name: String,
    pub artists: String,
    pub distance: f64,
}

/// Search output: the query as given plus the ranked neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparables {
    pub query: String,
    pub comparables: Vec<Comparable>,
}

/// Rescale each dimension to [0, 1] using its min and max across `vectors`.
/// A dimension with zero range maps to 0.0 for every vector.
pub fn min_max_normalize<const N: usize>(vectors: &[[f64; N]]) -> Vec<[f64; N]> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };

    let mut mins = *first;
    let mut maxs = *first;
    for v in &vectors[1..] {
        for d in 0..N {
            mins[d] = mins[d].min(v[d]);
            maxs[d] = maxs[d].max(v[d]);
        }
    }

    vectors
        .iter()
        .map(|v| {
            let mut out = [0.0; N];
            for d in 0..N {
                let span = maxs[d] - mins[d];
                if span > 0.0 {
                    out[d] = (v[d] - mins[d]) / span;
                }
            }
            out
        })
        .collect()
}

/// Standard L2 distance.
pub fn euclidean<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Round to 6 decimal digits for reporting.
pub fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

/// Normalized feature vectors for one snapshot, in snapshot order.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    audio: Vec<[f64; AUDIO_DIMS]>,
    market: Vec<[f64; MARKET_DIMS]>,
}

impl FeatureSpace {
    pub fn build(tracks: &[Track]) -> Self {
        let audio: Vec<_> = tracks.iter().map(|t| t.audio).collect();
        let market: Vec<_> = tracks.iter().map(|t| t.market).collect();
        Self {
            audio: min_max_normalize(&audio),
            market: min_max_normalize(&market),
        }
    }

    pub fn len(&self) -> usize {
        self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    /// Blended distance between the tracks at positions `i` and `j`.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        AUDIO_WEIGHT * euclidean(&self.audio[i], &self.audio[j])
            + MARKET_WEIGHT * euclidean(&self.market[i], &self.market[j])
    }

    /// Positions of the `limit` nearest tracks to `query`, excluding `query`
    /// itself. Equal distances keep snapshot order.
    pub fn nearest(&self, query: usize, limit: usize) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = (0..self.len())
            .filter(|&i| i != query)
            .map(|i| (i, self.distance(i, query)))
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(limit);
        scored
    }
}

/// Position of the first track whose name matches `name` case-insensitively.
pub fn locate(tracks: &[Track], name: &str) -> Option<usize> {
    let wanted = name.to_lowercase();
    tracks.iter().position(|t| t.name.to_lowercase() == wanted)
}

/// Find the tracks most similar to `query` in `tracks`.
pub fn find_comparables(
    tracks: &[Track],
    query: &str,
    limit: usize,
) -> Result<Comparables, SearchError> {
    if tracks.is_empty() {
        return Err(SearchError::DatasetEmpty);
    }

    let query = query.trim();
    let query_idx =
        locate(tracks, query).ok_or_else(|| SearchError::TrackNotFound(query.to_string()))?;

    let space = FeatureSpace::build(tracks);
    let comparables = space
        .nearest(query_idx, limit)
        .into_iter()
        .enumerate()
        .map(|(rank, (i, distance))| Comparable {
            rank: rank + 1,
            track_name: tracks[i].name.clone(),
            artists: tracks[i].artists.clone(),
            distance: round6(distance),
        })
        .collect();

    Ok(Comparables {
        query: query.to_string(),
        comparables,
    })
}
