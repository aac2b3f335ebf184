//! Integration tests for outcome resolution and fingerprinting over
//! complete synthetic files.

mod common;

use common::{assemble, duel_file, BodyFixture, HeaderFixture, KIND_HUMAN};
use mgx_parser::RecordedGame;

#[test]
fn test_resignation_decides_a_duel() {
    let body = BodyFixture::new().sync(600_000).resign(2).bytes();
    let game = RecordedGame::new(duel_file(&body));

    let outcome = game.outcome().unwrap();
    assert_eq!(outcome.battle_mode, "1v1");

    // Unallied players become synthetic singleton sides keyed index + 5
    let keys: Vec<usize> = outcome.teams.iter().map(|t| t.index).collect();
    assert_eq!(keys, vec![5, 6]);

    assert!(outcome.player(0).unwrap().is_winner);
    let bob = outcome.player(1).unwrap();
    assert!(!bob.is_winner);
    assert_eq!(bob.resign_ms, Some(600_000));
}

#[test]
fn test_team_game_fallback_fraction() {
    // 2v3 where one member of each team resigns: 0.5 beats 0.33
    #[rustfmt::skip]
    let stances = [
        0, 0, 3, 3, 3,
        0, 0, 3, 3, 3,
        3, 3, 0, 0, 0,
        3, 3, 0, 0, 0,
        3, 3, 0, 0, 0,
    ];
    let header = HeaderFixture::aoc()
        .player((1, "A", 1, 0, KIND_HUMAN, false))
        .player((2, "B", 2, 1, KIND_HUMAN, false))
        .player((3, "C", 3, 2, KIND_HUMAN, false))
        .player((4, "D", 4, 3, KIND_HUMAN, false))
        .player((5, "E", 5, 4, KIND_HUMAN, false))
        .stances(&stances)
        .bytes();
    let body = BodyFixture::new()
        .sync(1_000_000)
        .resign(1)
        .resign(3)
        .bytes();
    let game = RecordedGame::new(assemble(&header, &body));

    let outcome = game.outcome().unwrap();
    assert_eq!(outcome.battle_mode, "2v3");

    let pair = outcome.teams.iter().find(|t| t.members.len() == 2).unwrap();
    let trio = outcome.teams.iter().find(|t| t.members.len() == 3).unwrap();
    assert!(!pair.is_winner);
    assert!(trio.is_winner);
}

#[test]
fn test_melee_label() {
    let header = HeaderFixture::aoc()
        .player((1, "A", 1, 0, KIND_HUMAN, false))
        .player((2, "B", 2, 1, KIND_HUMAN, false))
        .player((3, "C", 3, 2, KIND_HUMAN, false))
        .player((4, "D", 4, 3, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    let game = RecordedGame::new(assemble(&header, &[]));

    assert_eq!(game.outcome().unwrap().battle_mode, "melee");
}

#[test]
fn test_postgame_summary_overrides_heuristic() {
    let header = HeaderFixture::userpatch14()
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    // Alice resigned on record, but the scoreboard says she won: the
    // summary is authoritative
    let body = BodyFixture::new()
        .sync(1000)
        .resign(1)
        .postgame(
            3600,
            &[
                ("Alice", 1, 5, 1, 2, true, [600, 0, 0]),
                ("Bob", 2, 8, 2, 3, false, [700, 0, 0]),
            ],
        )
        .bytes();
    let game = RecordedGame::new(assemble(&header, &body));

    let outcome = game.outcome().unwrap();
    assert!(outcome.player(0).unwrap().is_winner);
    assert!(!outcome.player(1).unwrap().is_winner);
}

#[test]
fn test_cut_short_userpatch_body_keeps_heuristic() {
    let header = HeaderFixture::userpatch14()
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    // A transfer cut mid-record leaves record debris where the summary
    // block would sit; the debris must not be read as a scoreboard
    let mut body = BodyFixture::new().sync(1000).resign(2).bytes();
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(&60_000u32.to_le_bytes());
    body.resize(body.len() + 292, 0x5A);

    let game = RecordedGame::new(assemble(&header, &body));
    let decoded = game.body().unwrap();
    assert!(decoded.truncation.is_some());
    assert!(decoded.postgame.is_none());

    // Bob's recorded resignation decides the game
    let outcome = game.outcome().unwrap();
    assert!(outcome.player(0).unwrap().is_winner);
    assert!(!outcome.player(1).unwrap().is_winner);
}

#[test]
fn test_corrupted_stats_take_summary_values() {
    let header = HeaderFixture::userpatch15(true)
        .player((1, "Alice", 0, 0, KIND_HUMAN, true))
        .player((2, "Bob", 0, 0, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    let body = BodyFixture::new()
        .sync(1000)
        .resign(1)
        .postgame(
            3600,
            &[
                ("Alice", 1, 17, 3, 2, true, [620, 1400, 0]),
                ("Bob", 2, 23, 4, 3, false, [700, 0, 0]),
            ],
        )
        .bytes();
    let game = RecordedGame::new(assemble(&header, &body));

    let outcome = game.outcome().unwrap();
    let alice = outcome.player(0).unwrap();
    assert_eq!(alice.civilization_id, 17);
    assert_eq!(alice.color_id, 2); // summary color 3 is 1-based
    assert_eq!(alice.ages.feudal_ms, Some(620_000));
    assert_eq!(alice.ages.castle_ms, Some(1_400_000));
    assert_eq!(alice.ages.imperial_ms, None);
    assert_eq!(alice.resign_ms, None);
}

#[test]
fn test_fingerprint_is_stable_across_reparses() {
    let body = BodyFixture::new().sync(1000).bytes();
    let file = duel_file(&body);

    let first = RecordedGame::new(file.clone());
    let second = RecordedGame::new(file);

    assert_eq!(
        first.outcome().unwrap().fingerprint,
        second.outcome().unwrap().fingerprint
    );
}

#[test]
fn test_fingerprint_ignores_roster_order() {
    let body = BodyFixture::new().sync(1000).bytes();
    // Same players, same indices encoded, different record order in the
    // file: the salt is sorted so the fingerprint matches. Index is part
    // of the salt, so the entries keep their index/name pairing.
    let forward = HeaderFixture::aoc()
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    let game_a = RecordedGame::new(assemble(&forward, &body));

    let game_b = RecordedGame::new(duel_file(&body));

    assert_eq!(
        game_a.outcome().unwrap().fingerprint,
        game_b.outcome().unwrap().fingerprint
    );
}

#[test]
fn test_fingerprint_distinguishes_maps() {
    let body = BodyFixture::new().sync(1000).bytes();
    let arabia = HeaderFixture::aoc()
        .map_id(9)
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    let arena = HeaderFixture::aoc()
        .map_id(29)
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();

    let a = RecordedGame::new(assemble(&arabia, &body));
    let b = RecordedGame::new(assemble(&arena, &body));
    assert_ne!(
        a.outcome().unwrap().fingerprint,
        b.outcome().unwrap().fingerprint
    );
}

#[test]
fn test_no_evidence_means_everyone_wins() {
    let body = BodyFixture::new().sync(1000).bytes();
    let game = RecordedGame::new(duel_file(&body));

    let outcome = game.outcome().unwrap();
    assert!(outcome.teams.iter().all(|t| t.is_winner));
    assert_eq!(outcome.winners().len(), 2);
}
