//! Header decoding for recorded game files.
//!
//! The decompressed header region is a deeply nested, version-dependent
//! layout. [`Header::decode`] walks it as a sequence of ordered
//! sub-parses, each gated by the detected [`FormatVersion`]: a field, a
//! whole block, or its byte width may differ or be entirely absent below
//! or above specific sub-version thresholds.
//!
//! Parse order:
//!
//! 1. AI info block (present/absent by flag, not zero-filled)
//! 2. Game and victory settings ([`settings`])
//! 3. Map data: tile grid and initial object placements ([`map`])
//! 4. Player roster ([`players`])
//! 5. Diplomacy matrix and team derivation ([`players`])
//! 6. Pre-game chat block
//! 7. Scenario metadata, only for scenario/campaign games
//!
//! The decoder fails with `HeaderDecodeError { field, offset }` only when
//! a count or length field would read past the end of the header region.
//! Any other inconsistency — an unknown civilization id, a strange map
//! style — is carried through as data, because downstream consumers must
//! still render a best-effort result for anomalous files.

pub mod map;
pub mod players;
pub mod settings;

pub use map::{decode_map, MapData, ObjectPlacement, Tile};
pub use players::{
    decode_diplomacy, decode_roster, derive_teams, DiplomacyMatrix, Player, Team, KIND_AI,
    KIND_HUMAN, KIND_SPECTATOR, SENTINEL_TEAM, STANCE_ALLY, STANCE_ENEMY, STANCE_NEUTRAL,
};
pub use settings::{
    decode_game_settings, decode_victory_settings, GameSettings, VictorySettings,
    GAME_TYPE_SCENARIO,
};

use serde::Serialize;

use crate::binary::SliceCursor;
use crate::chat::ChatMessage;
use crate::error::{ParserError, Result};
use crate::version::FormatVersion;

/// Reads a u8, wrapping EOF into a positioned header error.
pub(crate) fn field_u8(cursor: &mut SliceCursor<'_>, field: &'static str) -> Result<u8> {
    let pos = cursor.position();
    cursor.read_u8().map_err(|e| e.at_field(field, pos))
}

/// Reads a little-endian u16, wrapping EOF into a positioned header error.
pub(crate) fn field_u16(cursor: &mut SliceCursor<'_>, field: &'static str) -> Result<u16> {
    let pos = cursor.position();
    cursor.read_u16().map_err(|e| e.at_field(field, pos))
}

/// Reads a little-endian u32, wrapping EOF into a positioned header error.
pub(crate) fn field_u32(cursor: &mut SliceCursor<'_>, field: &'static str) -> Result<u32> {
    let pos = cursor.position();
    cursor.read_u32().map_err(|e| e.at_field(field, pos))
}

/// Reads a little-endian f32, wrapping EOF into a positioned header error.
pub(crate) fn field_f32(cursor: &mut SliceCursor<'_>, field: &'static str) -> Result<f32> {
    let pos = cursor.position();
    cursor.read_f32().map_err(|e| e.at_field(field, pos))
}

/// Reads a length-prefixed legacy encoded string, wrapping EOF into a
/// positioned header error.
pub(crate) fn field_legacy_string(
    cursor: &mut SliceCursor<'_>,
    field: &'static str,
) -> Result<String> {
    let pos = cursor.position();
    cursor
        .read_legacy_string()
        .map_err(|e| e.at_field(field, pos))
}

/// Skips `len` bytes, wrapping EOF into a positioned header error.
pub(crate) fn field_skip(
    cursor: &mut SliceCursor<'_>,
    len: usize,
    field: &'static str,
) -> Result<()> {
    let pos = cursor.position();
    cursor.skip(len).map_err(|e| e.at_field(field, pos))
}

/// Scenario metadata, present only when the game mode indicates a
/// scenario or campaign rather than a random-map game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    /// Original scenario filename.
    pub filename: String,

    /// Objectives text shown to players.
    pub objectives: String,
}

/// The fully decoded recorded game header.
///
/// Produced once by [`Header::decode`] and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    /// Whether the save embeds AI strategy data.
    pub include_ai: bool,

    /// Lobby settings.
    pub settings: GameSettings,

    /// Victory conditions.
    pub victory: VictorySettings,

    /// Terrain grid and initial object placements.
    pub map: MapData,

    /// Ordered roster. Every player belongs to exactly one team (team
    /// index 0 being the sentinel "no alliance" bucket).
    pub players: Vec<Player>,

    /// Ordered team list; index 0 is always the sentinel bucket.
    pub teams: Vec<Team>,

    /// The raw diplomacy stance matrix the teams were derived from.
    pub diplomacy: DiplomacyMatrix,

    /// Pre-game lobby chat, all at time 0.
    pub pregame_chat: Vec<ChatMessage>,

    /// Scenario metadata for scenario/campaign games.
    pub scenario: Option<ScenarioInfo>,
}

impl Header {
    /// Decodes the structured header from the decompressed header region.
    ///
    /// The cursor starts at `version.header_start`, past the version
    /// prefix and any save-metadata block the sniffer measured.
    ///
    /// # Arguments
    ///
    /// * `header_bytes` - The full decompressed header region
    /// * `version` - The detected format version
    ///
    /// # Errors
    ///
    /// Returns `ParserError::HeaderDecode` when a count or length field
    /// would overrun the region. Terminal for the header only; body
    /// decoding is unaffected.
    pub fn decode(header_bytes: &[u8], version: &FormatVersion) -> Result<Self> {
        let mut cursor = SliceCursor::new(header_bytes);
        cursor.seek(version.header_start);

        let include_ai = field_u32(&mut cursor, "include_ai")? != 0;
        if include_ai {
            skip_ai_block(&mut cursor)?;
        }

        let (settings, num_players) = decode_game_settings(&mut cursor, version)?;
        let victory = decode_victory_settings(&mut cursor)?;
        let map = decode_map(&mut cursor)?;

        let mut players = decode_roster(&mut cursor, num_players)?;
        let diplomacy = decode_diplomacy(&mut cursor, num_players)?;
        let teams = derive_teams(&mut players, &diplomacy);

        let pregame_chat = decode_pregame_chat(&mut cursor)?;

        let scenario = if settings.is_scenario() {
            let filename = field_legacy_string(&mut cursor, "scenario_filename")?;
            let objectives = field_legacy_string(&mut cursor, "scenario_objectives")?;
            Some(ScenarioInfo {
                filename,
                objectives,
            })
        } else {
            None
        };

        Ok(Header {
            include_ai,
            settings,
            victory,
            map,
            players,
            teams,
            diplomacy,
            pregame_chat,
            scenario,
        })
    }

    /// Returns the recording player (point of view), if any roster entry
    /// carries the owner flag.
    #[must_use]
    pub fn pov(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_owner)
    }

    /// Returns a player by its stable roster index.
    #[must_use]
    pub fn player_by_index(&self, index: usize) -> Option<&Player> {
        self.players.iter().find(|p| p.index == index)
    }

    /// Returns a player by its 1-based roster number (the body-stream
    /// command encoding).
    #[must_use]
    pub fn player_by_number(&self, number: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.number == number)
    }
}

/// Skips the embedded AI strategy block: a count of length-prefixed
/// strategy strings followed by an opaque rules blob.
fn skip_ai_block(cursor: &mut SliceCursor<'_>) -> Result<()> {
    let string_count = field_u16(cursor, "ai_string_count")?;
    for _ in 0..string_count {
        let pos = cursor.position();
        let len = field_u32(cursor, "ai_string_len")? as usize;
        cursor
            .skip(len)
            .map_err(|e| e.at_field("ai_string", pos))?;
    }
    let rules_len = field_u32(cursor, "ai_rules_len")? as usize;
    field_skip(cursor, rules_len, "ai_rules")
}

/// Decodes the pre-game chat block: a count of length-prefixed legacy
/// encoded lines, each with the embedded-name micro-format, all at time
/// zero.
fn decode_pregame_chat(cursor: &mut SliceCursor<'_>) -> Result<Vec<ChatMessage>> {
    let count = field_u32(cursor, "pregame_chat_count")? as usize;
    if count > cursor.remaining() {
        // Each line needs at least its length prefix.
        return Err(ParserError::HeaderDecode {
            field: "pregame_chat_count",
            offset: cursor.position(),
        });
    }

    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        let line = field_legacy_string(cursor, "pregame_chat_line")?;
        messages.push(ChatMessage::from_line(0, &line));
    }
    Ok(messages)
}
