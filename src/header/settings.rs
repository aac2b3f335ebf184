//! Game and victory settings parsing from the structured header.
//!
//! These are fixed-width fields, but their *meaning* drifts across
//! sub-versions: the population-limit field stores a small multiplier (in
//! units of 25) in Age of Kings saves and an absolute count everywhere
//! else, and the stats-corruption flag byte only exists in UserPatch 1.5
//! headers. Each gated step is a small pure function of
//! `(cursor, FormatVersion)`, composed in sequence by the header decoder.

use serde::Serialize;

use crate::binary::SliceCursor;
use crate::error::Result;
use crate::header::{field_u16, field_u32, field_u8};
use crate::version::FormatVersion;

/// Game type id that marks a scenario/campaign game. Scenario games carry
/// extra metadata (objectives, original filename) at the end of the
/// header.
pub const GAME_TYPE_SCENARIO: u32 = 3;

/// Settings the match was configured with in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSettings {
    /// Game speed in percent (100, 150, 200).
    pub game_speed: u32,

    /// 1-based roster number of the recording player; 0 when the file was
    /// not recorded by a participant.
    pub owner_slot: u16,

    /// 0 = single player, 1 = multiplayer.
    pub game_mode: u8,

    /// Game type (random map, regicide, scenario, ...).
    pub game_type: u32,

    /// Built-in map id; custom maps use ids outside the built-in table.
    /// Passed through unresolved — name lookup is an external concern.
    pub map_id: u32,

    /// Map size id.
    pub map_size: u32,

    /// Map style id.
    pub map_style: u32,

    /// AI difficulty id.
    pub difficulty: u32,

    /// Reveal-map mode id.
    pub reveal_map: u32,

    /// Effective population limit, normalized across sub-versions.
    pub population_limit: u32,

    /// Whether diplomacy was locked in the lobby.
    pub lock_diplomacy: bool,

    /// Known stats-corruption flag (UserPatch 1.5 headers only). When
    /// set, the outcome resolver prefers the post-game summary's age and
    /// civilization values over the header's.
    pub corrupted_stats: bool,
}

impl GameSettings {
    /// Whether this is a scenario or campaign game.
    #[must_use]
    pub fn is_scenario(&self) -> bool {
        self.game_type == GAME_TYPE_SCENARIO
    }

    /// Whether this is a multiplayer game.
    #[must_use]
    pub fn is_multiplayer(&self) -> bool {
        self.game_mode != 0
    }
}

/// Victory conditions for the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VictorySettings {
    /// Victory mode id (standard, conquest, time limit, score, ...).
    pub mode: u32,

    /// Mode threshold (relic count, score target, time limit); meaning
    /// depends on `mode`.
    pub threshold: u32,
}

/// Decodes the game settings block, re-interpreting drifted fields per
/// version.
///
/// # Errors
///
/// Returns `ParserError::HeaderDecode` when a field would read past the
/// end of the header region.
pub fn decode_game_settings(
    cursor: &mut SliceCursor<'_>,
    version: &FormatVersion,
) -> Result<(GameSettings, u8)> {
    let game_speed = field_u32(cursor, "game_speed")?;
    let owner_slot = field_u16(cursor, "owner_slot")?;
    let num_players = field_u8(cursor, "num_players")?;
    let game_mode = field_u8(cursor, "game_mode")?;
    let game_type = field_u32(cursor, "game_type")?;
    let map_id = field_u32(cursor, "map_id")?;
    let map_size = field_u32(cursor, "map_size")?;
    let map_style = field_u32(cursor, "map_style")?;
    let difficulty = field_u32(cursor, "difficulty")?;
    let reveal_map = field_u32(cursor, "reveal_map")?;

    // Same offset, different meaning: early saves store the limit as a
    // small multiplier, later ones as an absolute count.
    let raw_population = field_u32(cursor, "population_limit")?;
    let population_limit = raw_population.saturating_mul(version.population_multiplier());

    let lock_diplomacy = field_u8(cursor, "lock_diplomacy")? != 0;

    // Flag byte exists only in UserPatch 1.5 headers; absent, not
    // zero-filled, everywhere else.
    let corrupted_stats = if version.has_corruption_flag() {
        field_u8(cursor, "corrupted_stats")? != 0
    } else {
        false
    };

    let settings = GameSettings {
        game_speed,
        owner_slot,
        game_mode,
        game_type,
        map_id,
        map_size,
        map_style,
        difficulty,
        reveal_map,
        population_limit,
        lock_diplomacy,
        corrupted_stats,
    };
    Ok((settings, num_players))
}

/// Decodes the victory settings block.
///
/// # Errors
///
/// Returns `ParserError::HeaderDecode` on overrun.
pub fn decode_victory_settings(cursor: &mut SliceCursor<'_>) -> Result<VictorySettings> {
    let mode = field_u32(cursor, "victory_mode")?;
    let threshold = field_u32(cursor, "victory_threshold")?;
    Ok(VictorySettings { mode, threshold })
}
