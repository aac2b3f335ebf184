//! Body event stream decoding.
//!
//! The body region is an uncompressed sequence of `u32` opcode records
//! interpreted by a small state machine. The only state carried across
//! records is the game clock, advanced exclusively by Sync records; every
//! extracted event is stamped with the clock value at observation time.
//!
//! # Record layout
//!
//! | Opcode | Record | Layout |
//! |--------|------------|--------|
//! | `0x01` | Command | u32 len, len payload bytes ([`commands`]) |
//! | `0x02` | Sync | u32 time delta ms, u32 marker; marker 0 is followed by 28 bytes of view state |
//! | `0x03` | View lock | 12 bytes |
//! | `0x04` | Chat/start | i32 sentinel; -1 means u32 len + chat text, anything else a game-start variant of 24 bytes |
//! | `0x06` | Savepoint | u32 len, len bytes, not retained |
//!
//! Decoding never fails. A record inconsistent with the remaining bytes
//! stops the loop; everything decoded up to that point is kept and the
//! [`Body`] carries a [`BodyTruncation`] describing where and why. The
//! most valuable data (chat, roster) lives in the header and stays usable
//! even when the body is cut short mid-transfer.

pub mod commands;
pub mod postgame;

pub use commands::{
    decode_command, BuildEvent, Command, ResearchEvent, TributeEvent, CMD_BUILD, CMD_RESEARCH,
    CMD_RESIGN, CMD_TRIBUTE, TECH_CASTLE_AGE, TECH_FEUDAL_AGE, TECH_IMPERIAL_AGE,
};
pub use postgame::{
    decode_postgame, PostGameSummary, SummaryEntry, POSTGAME_BLOCK_SIZE, SUMMARY_NO_TEAM,
};

use std::collections::BTreeMap;

use serde::Serialize;

use crate::binary::{transcode_legacy, SliceCursor};
use crate::chat::ChatMessage;
use crate::error::DecodeWarning;
use crate::version::FormatVersion;

/// Opcode: a player command with a length-prefixed payload.
pub const OPCODE_COMMAND: u32 = 0x01;

/// Opcode: a synchronization record advancing the game clock.
pub const OPCODE_SYNC: u32 = 0x02;

/// Opcode: a view-lock record, skipped.
pub const OPCODE_VIEW_LOCK: u32 = 0x03;

/// Opcode: a chat message or a game-start variant.
pub const OPCODE_CHAT: u32 = 0x04;

/// Opcode: a savepoint blob, skipped by length.
pub const OPCODE_SAVEPOINT: u32 = 0x06;

/// Sentinel distinguishing chat from the game-start variant of opcode 4.
pub const CHAT_SENTINEL: i32 = -1;

/// View-state bytes following a Sync record whose marker is zero.
const SYNC_VIEW_STATE_SIZE: usize = 28;

/// Size of a view-lock record after the opcode.
const VIEW_LOCK_SIZE: usize = 12;

/// Size of the game-start variant of opcode 4 after the sentinel.
const START_VARIANT_SIZE: usize = 24;

/// Age reach times for one player, milliseconds, derived from age-advance
/// research completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerAges {
    /// Feudal Age reach time, if reached.
    pub feudal_ms: Option<u32>,

    /// Castle Age reach time, if reached.
    pub castle_ms: Option<u32>,

    /// Imperial Age reach time, if reached.
    pub imperial_ms: Option<u32>,
}

/// Where and why body decoding stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyTruncation {
    /// Byte offset into the decoded region where the loop stopped.
    pub offset: usize,

    /// A description of the inconsistency.
    pub reason: String,
}

impl BodyTruncation {
    /// Converts into the facade-level warning.
    #[must_use]
    pub fn to_warning(&self) -> DecodeWarning {
        DecodeWarning::PartialBody {
            offset: self.offset,
            reason: self.reason.clone(),
        }
    }
}

/// Everything extracted from the body event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Body {
    /// Total game duration in milliseconds, the exact sum of Sync deltas.
    pub duration_ms: u32,

    /// In-game chat in stream order, stamped with the clock.
    pub chat: Vec<ChatMessage>,

    /// Research completions in stream order.
    pub research: Vec<ResearchEvent>,

    /// Building placements in stream order.
    pub builds: Vec<BuildEvent>,

    /// Resource tributes in stream order.
    pub tributes: Vec<TributeEvent>,

    /// Resignation time per 1-based roster number. A player's first
    /// resignation wins; duplicates are ignored.
    pub resignations: BTreeMap<u8, u32>,

    /// Age reach times per 1-based roster number.
    pub ages: BTreeMap<u8, PlayerAges>,

    /// Post-game summary, UserPatch saves only.
    pub postgame: Option<PostGameSummary>,

    /// Set when decoding stopped before the end of the region.
    pub truncation: Option<BodyTruncation>,
}

impl Body {
    /// Decodes the full body region.
    ///
    /// When the version carries a post-game summary and the region is
    /// large enough, the trailing summary block is split off first and the
    /// record loop runs over the rest. The summary is only attached when
    /// the loop reaches the split point cleanly: a truncated stream means
    /// the tail bytes are record debris sitting where the summary would
    /// be, not a scoreboard.
    #[must_use]
    pub fn decode(body: &[u8], version: &FormatVersion) -> Self {
        let (records, tail) =
            if version.has_postgame_summary() && body.len() >= POSTGAME_BLOCK_SIZE {
                let split = body.len() - POSTGAME_BLOCK_SIZE;
                (&body[..split], Some(&body[split..]))
            } else {
                (body, None)
            };

        let mut decoded = decode_records(records);
        if decoded.truncation.is_none() {
            decoded.postgame = tail.and_then(|block| decode_postgame(block).ok());
        }
        decoded
    }

    /// Re-decodes the body from a byte offset into the region.
    ///
    /// Used for incremental parsing of growing files. The summary split
    /// and truncation offsets are relative to `offset`.
    #[must_use]
    pub fn decode_from(body: &[u8], version: &FormatVersion, offset: usize) -> Self {
        let start = offset.min(body.len());
        Self::decode(&body[start..], version)
    }

    /// Returns the resignation time for a 1-based roster number.
    #[must_use]
    pub fn resign_time(&self, number: u8) -> Option<u32> {
        self.resignations.get(&number).copied()
    }

    /// Returns the age reach times for a 1-based roster number.
    #[must_use]
    pub fn ages_for(&self, number: u8) -> PlayerAges {
        self.ages.get(&number).copied().unwrap_or_default()
    }
}

/// Runs the record loop over the (summary-free) records region.
fn decode_records(records: &[u8]) -> Body {
    let mut cursor = SliceCursor::new(records);
    let mut clock_ms: u32 = 0;
    let mut body = Body {
        duration_ms: 0,
        chat: Vec::new(),
        research: Vec::new(),
        builds: Vec::new(),
        tributes: Vec::new(),
        resignations: BTreeMap::new(),
        ages: BTreeMap::new(),
        postgame: None,
        truncation: None,
    };

    while !cursor.is_at_end() {
        let record_start = cursor.position();
        let Ok(opcode) = cursor.read_u32() else {
            body.truncation = truncation(record_start, "record cut off mid-opcode");
            break;
        };

        let step = match opcode {
            OPCODE_COMMAND => decode_command_record(&mut cursor, clock_ms, &mut body),
            OPCODE_SYNC => decode_sync_record(&mut cursor, &mut clock_ms),
            OPCODE_VIEW_LOCK => cursor.skip(VIEW_LOCK_SIZE).map_err(|_| "view lock cut off"),
            OPCODE_CHAT => decode_chat_record(&mut cursor, clock_ms, &mut body.chat),
            OPCODE_SAVEPOINT => cursor
                .read_length_prefixed()
                .map(|_| ())
                .map_err(|_| "savepoint overruns stream"),
            _ => Err("unknown opcode"),
        };

        if let Err(reason) = step {
            body.truncation = truncation(record_start, reason);
            break;
        }
    }

    body.duration_ms = clock_ms;
    body
}

fn truncation(offset: usize, reason: &str) -> Option<BodyTruncation> {
    Some(BodyTruncation {
        offset,
        reason: reason.to_string(),
    })
}

/// Decodes one Command record and routes the interpreted payload into the
/// body's event collections.
fn decode_command_record(
    cursor: &mut SliceCursor<'_>,
    clock_ms: u32,
    body: &mut Body,
) -> std::result::Result<(), &'static str> {
    let payload = cursor
        .read_length_prefixed()
        .map_err(|_| "command payload overruns stream")?;

    match decode_command(payload) {
        Command::Resign { player_number } => {
            body.resignations.entry(player_number).or_insert(clock_ms);
        }
        Command::Research {
            player_number,
            tech_id,
        } => {
            body.research.push(ResearchEvent {
                time_ms: clock_ms,
                player_number,
                tech_id,
            });
            let ages = body.ages.entry(player_number).or_default();
            let slot = match tech_id {
                TECH_FEUDAL_AGE => Some(&mut ages.feudal_ms),
                TECH_CASTLE_AGE => Some(&mut ages.castle_ms),
                TECH_IMPERIAL_AGE => Some(&mut ages.imperial_ms),
                _ => None,
            };
            if let Some(slot) = slot {
                slot.get_or_insert(clock_ms);
            }
        }
        Command::Build {
            player_number,
            building_type,
            x,
            y,
        } => body.builds.push(BuildEvent {
            time_ms: clock_ms,
            player_number,
            building_type,
            x,
            y,
        }),
        Command::Tribute {
            from_number,
            to_number,
            resource_id,
            amount,
        } => body.tributes.push(TributeEvent {
            time_ms: clock_ms,
            from_number,
            to_number,
            resource_id,
            amount,
        }),
        Command::Other { .. } => {}
    }
    Ok(())
}

/// Decodes one Sync record, advancing the clock.
fn decode_sync_record(
    cursor: &mut SliceCursor<'_>,
    clock_ms: &mut u32,
) -> std::result::Result<(), &'static str> {
    let delta = cursor.read_u32().map_err(|_| "sync cut off")?;
    let marker = cursor.read_u32().map_err(|_| "sync cut off")?;
    if marker == 0 {
        cursor
            .skip(SYNC_VIEW_STATE_SIZE)
            .map_err(|_| "sync view state cut off")?;
    }
    *clock_ms = clock_ms.saturating_add(delta);
    Ok(())
}

/// Decodes one opcode-4 record: a chat line or the game-start variant.
fn decode_chat_record(
    cursor: &mut SliceCursor<'_>,
    clock_ms: u32,
    chat: &mut Vec<ChatMessage>,
) -> std::result::Result<(), &'static str> {
    let sentinel = cursor.read_i32().map_err(|_| "chat sentinel cut off")?;
    if sentinel == CHAT_SENTINEL {
        let text = cursor
            .read_length_prefixed()
            .map_err(|_| "chat text overruns stream")?;
        chat.push(ChatMessage::from_line(clock_ms, &transcode_legacy(text)));
    } else {
        cursor
            .skip(START_VARIANT_SIZE)
            .map_err(|_| "start record cut off")?;
    }
    Ok(())
}
