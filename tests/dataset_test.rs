//! CSV source mapping and the per-record skip policy.

use trackq::dataset::{read_from, read_path};

const HEADER: &str = "track_name,artist(s)_name,artist_count,released_year,released_month,released_day,in_spotify_playlists,in_spotify_charts,streams,in_apple_playlists,in_apple_charts,in_deezer_playlists,in_deezer_charts,in_shazam_charts,bpm,key,mode,danceability_%,valence_%,energy_%,acousticness_%,instrumentalness_%,liveness_%,speechiness_%";

fn csv(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

#[test]
fn maps_columns_and_parses_counts_leniently() {
    let data = csv(&[
        r#"Flowers,Miley Cyrus,1,2023,1,12,"12,211",115,1316855716,300,215,"1,745",58,"1,021",118,,Major,71,65,68,6,0,3,7"#,
    ]);

    let batch = read_from(data.as_bytes()).unwrap();
    assert_eq!(batch.skipped, 0);
    assert_eq!(batch.tracks.len(), 1);

    let t = &batch.tracks[0];
    assert_eq!(t.track_name, "Flowers");
    assert_eq!(t.artists, "Miley Cyrus");
    assert_eq!(t.in_spotify_playlists, Some(12_211));
    assert_eq!(t.streams, Some(1_316_855_716));
    assert_eq!(t.in_deezer_playlists, Some(1_745));
    assert_eq!(t.in_shazam_charts, Some(1_021));
    assert_eq!(t.bpm, Some(118));
    assert_eq!(t.key, None);
    assert_eq!(t.mode.as_deref(), Some("Major"));
    assert_eq!(t.danceability, Some(71));
    assert_eq!(t.speechiness, Some(7));
}

#[test]
fn dash_and_garbage_numbers_become_missing() {
    let data = csv(&[
        "Song,Artist,1,2022,5,6,100,-,BPM110KeyAModeMajor,4,-,-,0,-,120,A,Minor,50,50,50,50,0,10,5",
    ]);

    let batch = read_from(data.as_bytes()).unwrap();
    let t = &batch.tracks[0];
    assert_eq!(t.in_spotify_charts, None);
    assert_eq!(t.streams, None);
    assert_eq!(t.in_apple_charts, None);
    assert_eq!(t.in_deezer_playlists, None);
    assert_eq!(t.in_shazam_charts, None);
    assert_eq!(t.in_deezer_charts, Some(0));
}

#[test]
fn records_without_name_or_artists_are_skipped_and_counted() {
    let data = csv(&[
        "Keep Me,Someone,1,2020,1,1,1,1,1,1,1,1,1,1,100,C,Major,1,1,1,1,1,1,1",
        "   ,Someone,1,2020,1,1,1,1,1,1,1,1,1,1,100,C,Major,1,1,1,1,1,1,1",
        "No Artist,,1,2020,1,1,1,1,1,1,1,1,1,1,100,C,Major,1,1,1,1,1,1,1",
    ]);

    let batch = read_from(data.as_bytes()).unwrap();
    assert_eq!(batch.tracks.len(), 1);
    assert_eq!(batch.tracks[0].track_name, "Keep Me");
    assert_eq!(batch.skipped, 2);
}

#[test]
fn short_records_leave_trailing_fields_missing() {
    let data = csv(&["Short Row,Band,2,2019"]);

    let batch = read_from(data.as_bytes()).unwrap();
    let t = &batch.tracks[0];
    assert_eq!(t.artist_count, Some(2));
    assert_eq!(t.released_year, Some(2019));
    assert_eq!(t.released_month, None);
    assert_eq!(t.speechiness, None);
}

#[test]
fn header_with_byte_order_mark_is_recognized() {
    let data = format!(
        "\u{feff}{}",
        csv(&["Bom Song,Bom Band,1,2021,2,3,1,1,1,1,1,1,1,1,90,D,Minor,1,1,1,1,1,1,1"])
    );

    let batch = read_from(data.as_bytes()).unwrap();
    assert_eq!(batch.tracks.len(), 1);
    assert_eq!(batch.tracks[0].track_name, "Bom Song");
}

#[test]
fn missing_source_is_an_error() {
    let path = std::env::temp_dir()
        .join("trackq-test")
        .join(uuid::Uuid::new_v4().to_string())
        .join("missing.csv");
    assert!(read_path(&path).is_err());
}

#[test]
fn record_with_invalid_utf8_is_skipped_and_reading_continues() {
    let data: &[u8] =
        b"track_name,artist(s)_name,streams\nGood,Artist,1\nBad \xE9 Name,Artist,2\nAlso Good,Artist,3\n";

    let batch = read_from(data).unwrap();
    let names: Vec<&str> = batch.tracks.iter().map(|t| t.track_name.as_str()).collect();
    assert_eq!(names, ["Good", "Also Good"]);
    assert_eq!(batch.skipped, 1);
    assert_eq!(batch.tracks[1].streams, Some(3));
}
