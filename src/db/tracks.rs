//! Track dataset store: atomic wholesale replace and full-scan snapshot read.

use crate::error::Result;
use crate::model::track::*;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use sqlx::Acquire;
use tracing::warn;

impl super::Db {
    /// Replace the whole track table with `tracks`.
    ///
    /// Truncate and inserts share one transaction, so concurrent readers see
    /// either the previous dataset or the new one. Each insert runs in its own
    /// savepoint: a row the database rejects is skipped and counted, while any
    /// other failure aborts the replace and keeps the previous dataset.
    pub async fn replace_tracks(&self, tracks: &[NewTrack]) -> Result<IngestCounts> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("TRUNCATE tracks RESTART IDENTITY")
            .execute(&mut *tx)
            .await?;

        let mut counts = IngestCounts::default();
        for track in tracks {
            let mut savepoint = (&mut *tx).begin().await?;
            match insert_track(&mut *savepoint, track).await {
                Ok(()) => {
                    savepoint.commit().await?;
                    counts.rows_inserted += 1;
                }
                Err(sqlx::Error::Database(e)) => {
                    warn!(track = %track.track_name, error = %e, "track rejected, skipping");
                    savepoint.rollback().await?;
                    counts.rows_skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;

        metrics::tracks_ingested().add(counts.rows_inserted, &[KeyValue::new("outcome", "inserted")]);
        metrics::tracks_ingested().add(counts.rows_skipped, &[KeyValue::new("outcome", "skipped")]);

        Ok(counts)
    }

    /// Read every track in insertion order. Missing numeric values become 0.
    pub async fn load_tracks(&self) -> Result<Vec<Track>> {
        let rows: Vec<TrackRow> = sqlx::query_as(
            "SELECT track_name, artists,
                    danceability, valence, energy, acousticness,
                    instrumentalness, liveness, speechiness, bpm,
                    streams, in_spotify_playlists, in_apple_playlists, in_deezer_playlists
             FROM tracks
             ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Track::from).collect())
    }

    pub async fn count_tracks(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}

async fn insert_track(
    conn: &mut sqlx::PgConnection,
    track: &NewTrack,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tracks (
            track_name, artists, artist_count,
            released_year, released_month, released_day,
            streams,
            in_spotify_playlists, in_spotify_charts,
            in_apple_playlists, in_apple_charts,
            in_deezer_playlists, in_deezer_charts,
            in_shazam_charts,
            bpm, key, mode,
            danceability, valence, energy,
            acousticness, instrumentalness, liveness, speechiness
         ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
            $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
         )",
    )
    .bind(&track.track_name)
    .bind(&track.artists)
    .bind(track.artist_count)
    .bind(track.released_year)
    .bind(track.released_month)
    .bind(track.released_day)
    .bind(track.streams)
    .bind(track.in_spotify_playlists)
    .bind(track.in_spotify_charts)
    .bind(track.in_apple_playlists)
    .bind(track.in_apple_charts)
    .bind(track.in_deezer_playlists)
    .bind(track.in_deezer_charts)
    .bind(track.in_shazam_charts)
    .bind(track.bpm)
    .bind(&track.key)
    .bind(&track.mode)
    .bind(track.danceability)
    .bind(track.valence)
    .bind(track.energy)
    .bind(track.acousticness)
    .bind(track.instrumentalness)
    .bind(track.liveness)
    .bind(track.speechiness)
    .execute(conn)
    .await?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct TrackRow {
    track_name: String,
    artists: String,
    danceability: Option<i64>,
    valence: Option<i64>,
    energy: Option<i64>,
    acousticness: Option<i64>,
    instrumentalness: Option<i64>,
    liveness: Option<i64>,
    speechiness: Option<i64>,
    bpm: Option<i64>,
    streams: Option<i64>,
    in_spotify_playlists: Option<i64>,
    in_apple_playlists: Option<i64>,
    in_deezer_playlists: Option<i64>,
}

fn feature(v: Option<i64>) -> f64 {
    v.unwrap_or(0) as f64
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        Self {
            name: row.track_name,
            artists: row.artists,
            audio: [
                feature(row.danceability),
                feature(row.valence),
                feature(row.energy),
                feature(row.acousticness),
                feature(row.instrumentalness),
                feature(row.liveness),
                feature(row.speechiness),
                feature(row.bpm),
            ],
            market: [
                feature(row.streams),
                feature(row.in_spotify_playlists),
                feature(row.in_apple_playlists),
                feature(row.in_deezer_playlists),
            ],
        }
    }
}
