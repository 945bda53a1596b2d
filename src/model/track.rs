//! Track records: what ingestion writes and what the similarity engine reads.

use serde::{Deserialize, Serialize};

/// Number of audio feature dimensions.
pub const AUDIO_DIMS: usize = 8;

/// Number of market feature dimensions.
pub const MARKET_DIMS: usize = 4;

/// Audio dimension names, in vector order.
pub const AUDIO_FEATURES: [&str; AUDIO_DIMS] = [
    "danceability",
    "valence",
    "energy",
    "acousticness",
    "instrumentalness",
    "liveness",
    "speechiness",
    "bpm",
];

/// Market dimension names, in vector order.
pub const MARKET_FEATURES: [&str; MARKET_DIMS] = [
    "streams",
    "in_spotify_playlists",
    "in_apple_playlists",
    "in_deezer_playlists",
];

/// A validated record ready to be inserted into the track table.
///
/// Numeric columns are `None` when the source value was missing or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub track_name: String,
    pub artists: String,
    pub artist_count: Option<i64>,
    pub released_year: Option<i64>,
    pub released_month: Option<i64>,
    pub released_day: Option<i64>,
    pub streams: Option<i64>,
    pub in_spotify_playlists: Option<i64>,
    pub in_spotify_charts: Option<i64>,
    pub in_apple_playlists: Option<i64>,
    pub in_apple_charts: Option<i64>,
    pub in_deezer_playlists: Option<i64>,
    pub in_deezer_charts: Option<i64>,
    pub in_shazam_charts: Option<i64>,
    pub bpm: Option<i64>,
    pub key: Option<String>,
    pub mode: Option<String>,
    pub danceability: Option<i64>,
    pub valence: Option<i64>,
    pub energy: Option<i64>,
    pub acousticness: Option<i64>,
    pub instrumentalness: Option<i64>,
    pub liveness: Option<i64>,
    pub speechiness: Option<i64>,
}

/// A track as seen by the similarity engine. Missing values are already zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub artists: String,
    pub audio: [f64; AUDIO_DIMS],
    pub market: [f64; MARKET_DIMS],
}

impl Track {
    pub fn new(
        name: impl Into<String>,
        artists: impl Into<String>,
        audio: [f64; AUDIO_DIMS],
        market: [f64; MARKET_DIMS],
    ) -> Self {
        Self {
            name: name.into(),
            artists: artists.into(),
            audio,
            market,
        }
    }
}

/// Result of a dataset replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCounts {
    pub rows_inserted: u64,
    pub rows_skipped: u64,
}
