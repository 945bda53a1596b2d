//! Dataset source: reads the track CSV into validated records.
//!
//! Parsing is lenient per field and per record. A record missing its name or
//! artists is skipped and counted; a numeric field that is blank, `-`, or not
//! a number becomes `None`, and a record that is not valid UTF-8 is skipped.
//! Only an unreadable source is an error.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::NewTrack;

/// Validated records read from one source, plus the count rejected up front.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub tracks: Vec<NewTrack>,
    pub skipped: u64,
}

/// Read and validate a CSV file off the async executor.
pub async fn load(path: PathBuf) -> Result<SourceBatch> {
    tokio::task::spawn_blocking(move || read_path(&path))
        .await
        .map_err(|e| Error::Other(format!("dataset reader task failed: {e}")))?
}

/// Read and validate a CSV file.
pub fn read_path(path: &Path) -> Result<SourceBatch> {
    let file = std::fs::File::open(path)?;
    debug!(path = %path.display(), "reading dataset");
    read_from(file)
}

/// Read and validate CSV from any reader. The first row must be the header.
pub fn read_from<R: Read>(reader: R) -> Result<SourceBatch> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let columns = Columns::new(rdr.headers()?);
    let mut batch = SourceBatch::default();

    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                warn!(error = %e, "record is not valid utf-8, skipping");
                batch.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        match columns.to_track(&record) {
            Some(track) => batch.tracks.push(track),
            None => batch.skipped += 1,
        }
    }

    Ok(batch)
}

/// Parse a count-like field. Strips thousands separators; blank, `-`, and
/// non-numeric content are all treated as missing.
pub fn parse_count(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Header name → column position.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self { index }
    }

    /// Empty when the column is absent or the record is short.
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }

    fn count(&self, record: &StringRecord, name: &str) -> Option<i64> {
        parse_count(self.get(record, name))
    }

    fn to_track(&self, record: &StringRecord) -> Option<NewTrack> {
        let track_name = self.get(record, "track_name").trim();
        let artists = self.get(record, "artist(s)_name").trim();
        if track_name.is_empty() || artists.is_empty() {
            return None;
        }

        Some(NewTrack {
            track_name: track_name.to_string(),
            artists: artists.to_string(),
            artist_count: self.count(record, "artist_count"),
            released_year: self.count(record, "released_year"),
            released_month: self.count(record, "released_month"),
            released_day: self.count(record, "released_day"),
            streams: self.count(record, "streams"),
            in_spotify_playlists: self.count(record, "in_spotify_playlists"),
            in_spotify_charts: self.count(record, "in_spotify_charts"),
            in_apple_playlists: self.count(record, "in_apple_playlists"),
            in_apple_charts: self.count(record, "in_apple_charts"),
            in_deezer_playlists: self.count(record, "in_deezer_playlists"),
            in_deezer_charts: self.count(record, "in_deezer_charts"),
            in_shazam_charts: self.count(record, "in_shazam_charts"),
            bpm: self.count(record, "bpm"),
            key: parse_text(self.get(record, "key")),
            mode: parse_text(self.get(record, "mode")),
            danceability: self.count(record, "danceability_%"),
            valence: self.count(record, "valence_%"),
            energy: self.count(record, "energy_%"),
            acousticness: self.count(record, "acousticness_%"),
            instrumentalness: self.count(record, "instrumentalness_%"),
            liveness: self.count(record, "liveness_%"),
            speechiness: self.count(record, "speechiness_%"),
        })
    }
}
