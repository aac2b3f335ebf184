//! A parser for Age of Empires II recorded game files (`.mgl` / `.mgx`).
//!
//! Recorded games are replay files: a compressed header describing the
//! match as it was set up (players, teams, map, settings) followed by an
//! uncompressed stream of the commands the game engine replays. This
//! crate splits the two regions, sniffs the format version, decodes both
//! regions into typed models and resolves the game's outcome — covering
//! Age of Kings, The Conquerors, UserPatch 1.4/1.5 and HD Edition saves.
//!
//! # Quick start
//!
//! ```no_run
//! use mgx_parser::RecordedGame;
//!
//! let data = std::fs::read("game.mgx").unwrap();
//! let game = RecordedGame::new(data);
//!
//! let header = game.header().unwrap();
//! for player in &header.players {
//!     println!("{} (civ {})", player.name, player.civilization_id);
//! }
//!
//! let body = game.body().unwrap();
//! println!("duration: {} ms, {} chat lines", body.duration_ms, body.chat.len());
//!
//! let outcome = game.outcome().unwrap();
//! println!("{}", outcome.battle_mode);
//! ```
//!
//! # Architecture
//!
//! - [`split`] separates the compressed header region from the body and
//!   decompresses the header.
//! - [`version`] sniffs the format version stamp that gates every later
//!   parsing branch.
//! - [`header`] decodes the structured header: settings, map, roster,
//!   diplomacy and teams.
//! - [`body`] interprets the opcode event stream: clock, chat, commands
//!   and the UserPatch post-game summary.
//! - [`outcome`] resolves win/loss, labels the battle mode and computes
//!   the content fingerprint.
//! - [`game`] ties it together behind the lazily caching
//!   [`RecordedGame`] facade.
//!
//! Decoding is deliberately tolerant: unknown ids are carried through as
//! data, unknown version stamps and truncated bodies degrade to warnings
//! ([`error::DecodeWarning`]), and only structurally unusable input (a
//! truncated container, a corrupt deflate stream, a header field
//! overrunning its region) is an error.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod binary;
pub mod body;
pub mod chat;
pub mod error;
pub mod game;
pub mod header;
pub mod outcome;
pub mod split;
pub mod version;

pub use body::Body;
pub use chat::ChatMessage;
pub use error::{DecodeWarning, ParserError, Result};
pub use game::RecordedGame;
pub use header::{Header, Player, Team};
pub use outcome::{resolve, Outcome};
pub use split::Streams;
pub use version::{detect, Family, FormatVersion};
