//! Integration tests for the lazily caching facade: idempotence,
//! warning surfacing and concurrent access.

mod common;

use std::sync::Arc;

use common::{assemble, duel_file, BodyFixture, HeaderFixture, KIND_HUMAN};
use mgx_parser::{DecodeWarning, RecordedGame};

#[test]
fn test_each_stage_parses_exactly_once() {
    let body = BodyFixture::new().sync(1000).chat("Alice: hi").bytes();
    let game = RecordedGame::new(duel_file(&body));

    assert_eq!(game.header_parse_count(), 0);
    assert_eq!(game.body_parse_count(), 0);

    for _ in 0..5 {
        game.header().unwrap();
        game.body().unwrap();
        game.outcome().unwrap();
    }

    assert_eq!(game.header_parse_count(), 1);
    assert_eq!(game.body_parse_count(), 1);
}

#[test]
fn test_repeated_calls_return_identical_results() {
    let body = BodyFixture::new().sync(1000).bytes();
    let game = RecordedGame::new(duel_file(&body));

    let first = game.outcome().unwrap().clone();
    let second = game.outcome().unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn test_body_from_cached_per_offset() {
    let body = BodyFixture::new().sync(1000).sync(2000).bytes();
    let game = RecordedGame::new(duel_file(&body));

    game.body_from(0).unwrap();
    game.body_from(0).unwrap();
    assert_eq!(game.body_parse_count(), 1);

    game.body_from(12).unwrap();
    assert_eq!(game.body_parse_count(), 2);

    // The cached decode at offset 0 matches a fresh full decode
    assert_eq!(game.body_from(0).unwrap().duration_ms, 3000);
}

#[test]
fn test_concurrent_access_single_parse() {
    let body = BodyFixture::new().sync(1000).bytes();
    let game = Arc::new(RecordedGame::new(duel_file(&body)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let game = Arc::clone(&game);
            std::thread::spawn(move || {
                game.outcome().unwrap().fingerprint.clone()
            })
        })
        .collect();

    let fingerprints: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(fingerprints.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(game.header_parse_count(), 1);
    assert_eq!(game.body_parse_count(), 1);
}

#[test]
fn test_unknown_stamp_surfaces_as_warning() {
    // A community-modded stamp in the Conquerors numeric range
    let mut header = HeaderFixture::aoc()
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    header[..8].copy_from_slice(b"VER 9.5\x00");
    let game = RecordedGame::new(assemble(&header, &[]));

    // Decoding still works
    assert_eq!(game.players().unwrap().len(), 2);
    assert!(!game.version().unwrap().recognized);

    let warnings = game.warnings().unwrap();
    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        DecodeWarning::UnknownFormatVersion { stamp } => assert_eq!(stamp, "VER 9.5"),
        other => panic!("Expected UnknownFormatVersion, got {other:?}"),
    }
}

#[test]
fn test_streams_error_propagates_everywhere() {
    let game = RecordedGame::new(vec![0x01, 0x02, 0x03]);
    assert!(game.streams().is_err());
    assert!(game.version().is_err());
    assert!(game.header().is_err());
    assert!(game.body().is_err());
    assert!(game.outcome().is_err());
    assert!(game.warnings().is_err());
    assert_eq!(game.header_parse_count(), 0);
}
