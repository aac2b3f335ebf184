//! Shared synthetic fixture builders for the integration tests.
//!
//! Real recorded games are large and version-scattered, so the suites
//! build byte-exact synthetic files instead: a header fixture serialized
//! to the structured layout, deflate-compressed and framed, plus a body
//! fixture assembled record by record.

// Each integration binary uses a different subset of the builders.
#![allow(dead_code)]

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

pub const REGION_PREFIX_SIZE: usize = 8;

/// One roster entry: `(number, name, civilization, color, kind, owner)`.
pub type RosterEntry = (u32, &'static str, u8, u8, u8, bool);

pub const KIND_HUMAN: u8 = 1;
pub const KIND_SPECTATOR: u8 = 2;

/// Builds the decompressed header region byte by byte.
pub struct HeaderFixture {
    stamp: &'static [u8],
    sub_version: Option<f32>,
    map_id: u32,
    game_type: u32,
    corruption_flag: Option<u8>,
    players: Vec<RosterEntry>,
    stances: Vec<u8>,
    pregame: Vec<&'static str>,
    scenario: Option<(&'static str, &'static str)>,
}

impl HeaderFixture {
    /// A Conquerors header with no players yet.
    pub fn aoc() -> Self {
        HeaderFixture {
            stamp: b"VER 9.4",
            sub_version: Some(9.4),
            map_id: 9,
            game_type: 0,
            corruption_flag: None,
            players: Vec::new(),
            stances: Vec::new(),
            pregame: Vec::new(),
            scenario: None,
        }
    }

    /// A UserPatch 1.4 header (post-game summary, no corruption flag).
    pub fn userpatch14() -> Self {
        HeaderFixture {
            stamp: b"VER 9.A",
            sub_version: Some(12.97),
            ..Self::aoc()
        }
    }

    /// A UserPatch 1.5 header (summary plus corruption flag byte).
    pub fn userpatch15(corrupted: bool) -> Self {
        HeaderFixture {
            stamp: b"VER 9.B",
            sub_version: Some(12.97),
            corruption_flag: Some(u8::from(corrupted)),
            ..Self::aoc()
        }
    }

    pub fn map_id(mut self, map_id: u32) -> Self {
        self.map_id = map_id;
        self
    }

    pub fn scenario(mut self, filename: &'static str, objectives: &'static str) -> Self {
        self.game_type = 3;
        self.scenario = Some((filename, objectives));
        self
    }

    pub fn player(mut self, entry: RosterEntry) -> Self {
        self.players.push(entry);
        self
    }

    /// Row-major stance matrix; must be `players^2` bytes.
    pub fn stances(mut self, stances: &[u8]) -> Self {
        self.stances = stances.to_vec();
        self
    }

    /// Everyone enemies with everyone (free for all).
    pub fn all_enemies(mut self) -> Self {
        let n = self.players.len();
        self.stances = (0..n * n)
            .map(|i| if i / n == i % n { 0 } else { 3 })
            .collect();
        self
    }

    pub fn pregame_line(mut self, line: &'static str) -> Self {
        self.pregame.push(line);
        self
    }

    /// Serializes the decompressed header region.
    pub fn bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; 8];
        data[..self.stamp.len()].copy_from_slice(self.stamp);
        if let Some(v) = self.sub_version {
            data.extend_from_slice(&v.to_le_bytes());
        }

        data.extend_from_slice(&0u32.to_le_bytes()); // include_ai

        // Settings block
        data.extend_from_slice(&150u32.to_le_bytes()); // speed
        data.extend_from_slice(&1u16.to_le_bytes()); // owner slot
        data.push(self.players.len() as u8);
        data.push(1); // multiplayer
        data.extend_from_slice(&self.game_type.to_le_bytes());
        data.extend_from_slice(&self.map_id.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes()); // map size
        data.extend_from_slice(&0u32.to_le_bytes()); // map style
        data.extend_from_slice(&1u32.to_le_bytes()); // difficulty
        data.extend_from_slice(&0u32.to_le_bytes()); // reveal map
        data.extend_from_slice(&200u32.to_le_bytes()); // population
        data.push(0); // lock diplomacy
        if let Some(flag) = self.corruption_flag {
            data.push(flag);
        }

        // Victory
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        // 2x2 map, no objects
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0, 0, 1, 0, 2, 1, 3, 1]);
        data.extend_from_slice(&0u32.to_le_bytes());

        // Roster
        for (number, name, civ, color, kind, owner) in &self.players {
            data.extend_from_slice(&number.to_le_bytes());
            data.extend_from_slice(&(name.len() as u32).to_le_bytes());
            data.extend_from_slice(name.as_bytes());
            data.push(*civ);
            data.push(*color);
            data.push(*kind);
            data.push(u8::from(*owner));
        }

        // Diplomacy
        assert_eq!(
            self.stances.len(),
            self.players.len() * self.players.len(),
            "stance matrix must be players^2"
        );
        data.extend_from_slice(&self.stances);

        // Pre-game chat
        data.extend_from_slice(&(self.pregame.len() as u32).to_le_bytes());
        for line in &self.pregame {
            data.extend_from_slice(&(line.len() as u32).to_le_bytes());
            data.extend_from_slice(line.as_bytes());
        }

        if let Some((filename, objectives)) = self.scenario {
            for s in [filename, objectives] {
                data.extend_from_slice(&(s.len() as u32).to_le_bytes());
                data.extend_from_slice(s.as_bytes());
            }
        }

        data
    }
}

/// Builds the uncompressed body region record by record.
#[derive(Default)]
pub struct BodyFixture {
    data: Vec<u8>,
}

impl BodyFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(mut self, delta_ms: u32) -> Self {
        self.data.extend_from_slice(&2u32.to_le_bytes());
        self.data.extend_from_slice(&delta_ms.to_le_bytes());
        self.data.extend_from_slice(&1u32.to_le_bytes());
        self
    }

    pub fn chat(mut self, line: &str) -> Self {
        self.data.extend_from_slice(&4u32.to_le_bytes());
        self.data.extend_from_slice(&(-1i32).to_le_bytes());
        self.data
            .extend_from_slice(&(line.len() as u32).to_le_bytes());
        self.data.extend_from_slice(line.as_bytes());
        self
    }

    pub fn command(mut self, payload: &[u8]) -> Self {
        self.data.extend_from_slice(&1u32.to_le_bytes());
        self.data
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.data.extend_from_slice(payload);
        self
    }

    pub fn resign(self, player_number: u8) -> Self {
        self.command(&[0x0B, player_number, 0])
    }

    pub fn research(self, player_number: u8, tech_id: u16) -> Self {
        let mut payload = vec![0x65, player_number];
        payload.extend_from_slice(&tech_id.to_le_bytes());
        self.command(&payload)
    }

    /// Appends a post-game summary block. `entries` are
    /// `(name, number, civ, color, team, victory, [feudal, castle,
    /// imperial] seconds)`.
    pub fn postgame(
        mut self,
        world_time: u32,
        entries: &[(&str, u8, u8, u8, u8, bool, [u32; 3])],
    ) -> Self {
        let start = self.data.len();
        self.data.extend_from_slice(&world_time.to_le_bytes());
        for (name, number, civ, color, team, victory, ages) in entries {
            let mut field = [0u8; 16];
            field[..name.len()].copy_from_slice(name.as_bytes());
            self.data.extend_from_slice(&field);
            self.data.push(*number);
            self.data.push(*civ);
            self.data.push(*color);
            self.data.push(*team);
            self.data.push(u8::from(*victory));
            self.data.extend_from_slice(&[0, 0, 0]);
            for age in ages {
                self.data.extend_from_slice(&age.to_le_bytes());
            }
        }
        self.data.resize(start + 292, 0);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Deflate-compresses a header payload.
pub fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Frames a header payload and body into a complete recorded game file.
pub fn assemble(header_payload: &[u8], body: &[u8]) -> Vec<u8> {
    let compressed = deflate(header_payload);
    let header_len = (REGION_PREFIX_SIZE + compressed.len()) as u32;

    let mut file = Vec::new();
    file.extend_from_slice(&header_len.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&compressed);
    file.extend_from_slice(body);
    file
}

/// A ready-made 1v1: Alice (owner) against Bob, mutual enemies.
pub fn duel_file(body: &[u8]) -> Vec<u8> {
    let header = HeaderFixture::aoc()
        .player((1, "Alice", 5, 0, KIND_HUMAN, true))
        .player((2, "Bob", 8, 1, KIND_HUMAN, false))
        .all_enemies()
        .bytes();
    assemble(&header, body)
}
