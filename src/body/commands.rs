//! Command payload decoding for the body event stream.
//!
//! A Command record wraps a length-prefixed payload whose first byte is
//! the command id. Only four ids carry information this crate interprets;
//! everything else (unit moves, attacks, formations) is skipped by its
//! declared length without being understood.
//!
//! Interpreted payloads, after the id byte:
//!
//! | Id | Command | Payload |
//! |--------|----------|-----------------------------------------------|
//! | `0x0B` | Resign | u8 player number |
//! | `0x65` | Research | u8 player number, u16 tech id |
//! | `0x66` | Build | u8 player number, u16 building type, f32 x, f32 y |
//! | `0x6C` | Tribute | u8 from, u8 to, u8 resource id, f32 amount |
//!
//! A payload too short for its own id is treated like an uninterpreted
//! command rather than failing the stream.

use serde::Serialize;

use crate::binary::SliceCursor;

/// Command id: a player resigned.
pub const CMD_RESIGN: u8 = 0x0B;

/// Command id: a technology finished researching.
pub const CMD_RESEARCH: u8 = 0x65;

/// Command id: a building was placed.
pub const CMD_BUILD: u8 = 0x66;

/// Command id: resources were tributed to another player.
pub const CMD_TRIBUTE: u8 = 0x6C;

/// Tech id whose completion marks the Feudal Age.
pub const TECH_FEUDAL_AGE: u16 = 101;

/// Tech id whose completion marks the Castle Age.
pub const TECH_CASTLE_AGE: u16 = 102;

/// Tech id whose completion marks the Imperial Age.
pub const TECH_IMPERIAL_AGE: u16 = 103;

/// A research completion observed in the body stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResearchEvent {
    /// Game clock at observation, milliseconds.
    pub time_ms: u32,

    /// 1-based roster number of the researching player.
    pub player_number: u8,

    /// Tech id, unresolved.
    pub tech_id: u16,
}

/// A building placement observed in the body stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BuildEvent {
    /// Game clock at observation, milliseconds.
    pub time_ms: u32,

    /// 1-based roster number of the building player.
    pub player_number: u8,

    /// Building type id, unresolved.
    pub building_type: u16,

    /// X position in tile units.
    pub x: f32,

    /// Y position in tile units.
    pub y: f32,
}

/// A resource tribute observed in the body stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TributeEvent {
    /// Game clock at observation, milliseconds.
    pub time_ms: u32,

    /// 1-based roster number of the sender.
    pub from_number: u8,

    /// 1-based roster number of the recipient.
    pub to_number: u8,

    /// Resource id (food, wood, stone, gold).
    pub resource_id: u8,

    /// Amount tributed, before market fees.
    pub amount: f32,
}

/// An interpreted command payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// A player resigned.
    Resign {
        /// 1-based roster number.
        player_number: u8,
    },

    /// A technology finished researching.
    Research {
        /// 1-based roster number.
        player_number: u8,
        /// Tech id.
        tech_id: u16,
    },

    /// A building was placed.
    Build {
        /// 1-based roster number.
        player_number: u8,
        /// Building type id.
        building_type: u16,
        /// X position in tile units.
        x: f32,
        /// Y position in tile units.
        y: f32,
    },

    /// Resources were tributed.
    Tribute {
        /// Sender roster number.
        from_number: u8,
        /// Recipient roster number.
        to_number: u8,
        /// Resource id.
        resource_id: u8,
        /// Amount before fees.
        amount: f32,
    },

    /// Any command this crate does not interpret, kept only as its id.
    Other {
        /// The raw command id.
        id: u8,
    },
}

/// Decodes one command payload (id byte included).
///
/// An empty payload or one too short for its declared id decodes to
/// [`Command::Other`]; malformed commands never fail the stream.
#[must_use]
pub fn decode_command(payload: &[u8]) -> Command {
    let mut cursor = SliceCursor::new(payload);
    let Ok(id) = cursor.read_u8() else {
        return Command::Other { id: 0 };
    };

    let decoded = match id {
        CMD_RESIGN => cursor.read_u8().ok().map(|player_number| Command::Resign {
            player_number,
        }),
        CMD_RESEARCH => (|| {
            let player_number = cursor.read_u8().ok()?;
            let tech_id = cursor.read_u16().ok()?;
            Some(Command::Research {
                player_number,
                tech_id,
            })
        })(),
        CMD_BUILD => (|| {
            let player_number = cursor.read_u8().ok()?;
            let building_type = cursor.read_u16().ok()?;
            let x = cursor.read_f32().ok()?;
            let y = cursor.read_f32().ok()?;
            Some(Command::Build {
                player_number,
                building_type,
                x,
                y,
            })
        })(),
        CMD_TRIBUTE => (|| {
            let from_number = cursor.read_u8().ok()?;
            let to_number = cursor.read_u8().ok()?;
            let resource_id = cursor.read_u8().ok()?;
            let amount = cursor.read_f32().ok()?;
            Some(Command::Tribute {
                from_number,
                to_number,
                resource_id,
                amount,
            })
        })(),
        _ => None,
    };

    decoded.unwrap_or(Command::Other { id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_resign() {
        let payload = [CMD_RESIGN, 3, 0xFF, 0xFF];
        assert_eq!(
            decode_command(&payload),
            Command::Resign { player_number: 3 }
        );
    }

    #[test]
    fn test_decode_research() {
        let mut payload = vec![CMD_RESEARCH, 2];
        payload.extend_from_slice(&102u16.to_le_bytes());
        assert_eq!(
            decode_command(&payload),
            Command::Research {
                player_number: 2,
                tech_id: TECH_CASTLE_AGE,
            }
        );
    }

    #[test]
    fn test_decode_build() {
        let mut payload = vec![CMD_BUILD, 1];
        payload.extend_from_slice(&70u16.to_le_bytes());
        payload.extend_from_slice(&12.5f32.to_le_bytes());
        payload.extend_from_slice(&33.0f32.to_le_bytes());

        match decode_command(&payload) {
            Command::Build {
                player_number,
                building_type,
                x,
                y,
            } => {
                assert_eq!(player_number, 1);
                assert_eq!(building_type, 70);
                assert!((x - 12.5).abs() < f32::EPSILON);
                assert!((y - 33.0).abs() < f32::EPSILON);
            }
            other => panic!("Expected Build, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_tribute() {
        let mut payload = vec![CMD_TRIBUTE, 1, 2, 3];
        payload.extend_from_slice(&500.0f32.to_le_bytes());

        match decode_command(&payload) {
            Command::Tribute {
                from_number,
                to_number,
                resource_id,
                amount,
            } => {
                assert_eq!(from_number, 1);
                assert_eq!(to_number, 2);
                assert_eq!(resource_id, 3);
                assert!((amount - 500.0).abs() < f32::EPSILON);
            }
            other => panic!("Expected Tribute, got {other:?}"),
        }
    }

    #[test]
    fn test_uninterpreted_command() {
        let payload = [0x75, 1, 2, 3, 4, 5];
        assert_eq!(decode_command(&payload), Command::Other { id: 0x75 });
    }

    #[test]
    fn test_short_payload_is_other() {
        // A research command cut off before the tech id
        let payload = [CMD_RESEARCH, 2];
        assert_eq!(decode_command(&payload), Command::Other { id: CMD_RESEARCH });
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(decode_command(&[]), Command::Other { id: 0 });
    }
}
