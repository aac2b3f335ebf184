//! Post-game summary parsing.
//!
//! UserPatch builds append a fixed-size scoreboard block to the end of the
//! body stream. There is no marker byte; presence is decided entirely by
//! the detected format version, and the block is split off the tail of the
//! body before the record loop runs.
//!
//! # Format
//!
//! | Field | Type |
//! |--------------|-----------------------------------|
//! | world time | u32 LE, seconds |
//! | slot entries | 8 × 36-byte entry (layout below) |
//!
//! Slot entry:
//!
//! | Field | Type |
//! |------------------|---------------------------|
//! | name | 16 bytes, null padded |
//! | number | u8, 1-based; 0 = empty |
//! | civilization id | u8 |
//! | color id | u8, 1-based here |
//! | team | u8; 1 = "no team" |
//! | victory | u8, nonzero = winner |
//! | padding | 3 bytes |
//! | feudal time | u32 LE, seconds |
//! | castle time | u32 LE, seconds |
//! | imperial time | u32 LE, seconds |
//!
//! When present this block is authoritative: the outcome resolver prefers
//! its team and victory data over the resignation heuristic.

use serde::Serialize;

use crate::binary::{transcode_legacy, SliceCursor};
use crate::error::Result;

/// Total size of the summary block in bytes.
pub const POSTGAME_BLOCK_SIZE: usize = 4 + SUMMARY_SLOTS * SLOT_ENTRY_SIZE;

/// Number of slot entries in the block, occupied or not.
pub const SUMMARY_SLOTS: usize = 8;

/// Size of one slot entry in bytes.
pub const SLOT_ENTRY_SIZE: usize = 36;

/// Width of the null-padded name field in a slot entry.
const SLOT_NAME_SIZE: usize = 16;

/// The "no team" sentinel in the summary's team field.
pub const SUMMARY_NO_TEAM: u8 = 1;

/// One occupied slot in the post-game summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    /// Player name as recorded at game end.
    pub name: String,

    /// 1-based roster number.
    pub number: u8,

    /// Civilization id at game end.
    pub civilization_id: u8,

    /// Color id, 1-based in the summary.
    pub color_id: u8,

    /// Team number; [`SUMMARY_NO_TEAM`] means no declared team.
    pub team: u8,

    /// Whether this player won.
    pub victory: bool,

    /// Feudal age reach time in seconds, 0 if never reached.
    pub feudal_time: u32,

    /// Castle age reach time in seconds, 0 if never reached.
    pub castle_time: u32,

    /// Imperial age reach time in seconds, 0 if never reached.
    pub imperial_time: u32,
}

/// The decoded post-game summary: world time plus the occupied slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostGameSummary {
    /// Total game duration in seconds, as the game itself counted it.
    pub world_time: u32,

    /// Occupied slot entries, in slot order. Empty slots (number 0) are
    /// dropped.
    pub entries: Vec<SummaryEntry>,
}

impl PostGameSummary {
    /// Returns the entry for a 1-based roster number.
    #[must_use]
    pub fn entry_for(&self, number: u8) -> Option<&SummaryEntry> {
        self.entries.iter().find(|e| e.number == number)
    }
}

/// Decodes a summary block split off the tail of the body stream.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if `block` is shorter than
/// [`POSTGAME_BLOCK_SIZE`]. Callers split off exactly that many bytes, so
/// in practice this only fires on malformed internal use.
pub fn decode_postgame(block: &[u8]) -> Result<PostGameSummary> {
    let mut cursor = SliceCursor::new(block);
    let world_time = cursor.read_u32()?;

    let mut entries = Vec::new();
    for _ in 0..SUMMARY_SLOTS {
        let name = transcode_legacy(cursor.read_bytes(SLOT_NAME_SIZE)?);
        let number = cursor.read_u8()?;
        let civilization_id = cursor.read_u8()?;
        let color_id = cursor.read_u8()?;
        let team = cursor.read_u8()?;
        let victory = cursor.read_u8()? != 0;
        cursor.skip(3)?;
        let feudal_time = cursor.read_u32()?;
        let castle_time = cursor.read_u32()?;
        let imperial_time = cursor.read_u32()?;

        if number == 0 {
            continue;
        }
        entries.push(SummaryEntry {
            name,
            number,
            civilization_id,
            color_id,
            team,
            victory,
            feudal_time,
            castle_time,
            imperial_time,
        });
    }

    Ok(PostGameSummary {
        world_time,
        entries,
    })
}
