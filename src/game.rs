//! The aggregate facade over a recorded game file.
//!
//! [`RecordedGame`] owns the file bytes and runs each analysis stage at
//! most once: splitting, version sniffing, header decoding, body decoding
//! and outcome resolution are all computed lazily on first request and
//! cached. The fill is serialized — when two threads request the same
//! uncomputed result, one computes and the other waits — and reads of an
//! already-filled cache take no lock at all. Errors are never cached;
//! a failed stage is retried on the next call.
//!
//! I/O acquisition stays external: callers read the file themselves and
//! hand over the bytes.
//!
//! # Example
//!
//! ```no_run
//! use mgx_parser::game::RecordedGame;
//!
//! let data = std::fs::read("game.mgx").unwrap();
//! let game = RecordedGame::new(data);
//!
//! let header = game.header().unwrap();
//! println!("{} players on map {}", header.players.len(), header.settings.map_id);
//!
//! let outcome = game.outcome().unwrap();
//! println!("{} ({})", outcome.battle_mode, outcome.fingerprint);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;

use crate::body::{Body, PlayerAges};
use crate::error::{DecodeWarning, Result};
use crate::header::{Header, ObjectPlacement, Player, Team, Tile};
use crate::outcome::{resolve, Outcome};
use crate::split::Streams;
use crate::version::{detect, FormatVersion};

/// Number of milliseconds per research-table minute bucket.
const MINUTE_MS: u32 = 60_000;

/// A lazily parsed recorded game.
///
/// All accessors take `&self`; the type is `Sync` and can be shared
/// across threads behind an `Arc`.
pub struct RecordedGame {
    data: Vec<u8>,

    // Serializes cache fills. Cached reads never touch it.
    fill: Mutex<()>,

    streams: OnceLock<Streams>,
    version: OnceLock<FormatVersion>,
    header: OnceLock<Header>,
    body: OnceLock<Body>,
    outcome: OnceLock<Outcome>,
    bodies_from: Mutex<HashMap<usize, Arc<Body>>>,

    header_parses: AtomicUsize,
    body_parses: AtomicUsize,
}

impl RecordedGame {
    /// Wraps raw recorded game bytes. No parsing happens until an
    /// accessor is called.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        RecordedGame {
            data,
            fill: Mutex::new(()),
            streams: OnceLock::new(),
            version: OnceLock::new(),
            header: OnceLock::new(),
            body: OnceLock::new(),
            outcome: OnceLock::new(),
            bodies_from: Mutex::new(HashMap::new()),
            header_parses: AtomicUsize::new(0),
            body_parses: AtomicUsize::new(0),
        }
    }

    /// Returns the raw file bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Splits the file into its regions, decompressing the header.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedFile` or `DecompressionError` for files that
    /// cannot be split.
    pub fn streams(&self) -> Result<&Streams> {
        if let Some(s) = self.streams.get() {
            return Ok(s);
        }
        let _guard = self.fill_guard();
        self.ensure_streams()
    }

    /// Sniffs the format version from the decompressed header.
    ///
    /// # Errors
    ///
    /// Propagates splitting errors; an unknown stamp is a warning, not an
    /// error.
    pub fn version(&self) -> Result<&FormatVersion> {
        if let Some(v) = self.version.get() {
            return Ok(v);
        }
        let _guard = self.fill_guard();
        self.ensure_version()
    }

    /// Decodes the structured header.
    ///
    /// # Errors
    ///
    /// Propagates splitting errors and `HeaderDecode` failures.
    pub fn header(&self) -> Result<&Header> {
        if let Some(h) = self.header.get() {
            return Ok(h);
        }
        let _guard = self.fill_guard();
        self.ensure_header()
    }

    /// Decodes the body event stream.
    ///
    /// # Errors
    ///
    /// Propagates splitting errors. Body truncation is carried on the
    /// returned [`Body`], not raised here.
    pub fn body(&self) -> Result<&Body> {
        if let Some(b) = self.body.get() {
            return Ok(b);
        }
        let _guard = self.fill_guard();
        self.ensure_body()
    }

    /// Resolves win/loss, battle mode and the fingerprint.
    ///
    /// # Errors
    ///
    /// Propagates any upstream failure.
    pub fn outcome(&self) -> Result<&Outcome> {
        if let Some(o) = self.outcome.get() {
            return Ok(o);
        }
        let _guard = self.fill_guard();
        if let Some(o) = self.outcome.get() {
            return Ok(o);
        }
        let version = self.ensure_version()?;
        let header = self.ensure_header()?;
        let body = self.ensure_body()?;
        let outcome = resolve(version, header, body);
        Ok(self.outcome.get_or_init(|| outcome))
    }

    /// Re-decodes the body starting at a byte offset into the body
    /// region, for incremental consumption of growing files. Results are
    /// cached per offset.
    ///
    /// # Errors
    ///
    /// Propagates splitting errors.
    pub fn body_from(&self, offset: usize) -> Result<Arc<Body>> {
        if let Some(cached) = self.cached_body_from(offset) {
            return Ok(cached);
        }

        let _guard = self.fill_guard();
        if let Some(cached) = self.cached_body_from(offset) {
            return Ok(cached);
        }
        let version = self.ensure_version()?;
        let streams = self.ensure_streams()?;
        let body = Arc::new(Body::decode_from(streams.body(&self.data), version, offset));
        self.body_parses.fetch_add(1, Ordering::Relaxed);
        self.lock_bodies_from().insert(offset, Arc::clone(&body));
        Ok(body)
    }

    /// Returns the full roster.
    ///
    /// # Errors
    ///
    /// Propagates header decoding failures.
    pub fn players(&self) -> Result<&[Player]> {
        Ok(&self.header()?.players)
    }

    /// Returns the spectator entries of the roster.
    ///
    /// # Errors
    ///
    /// Propagates header decoding failures.
    pub fn spectators(&self) -> Result<Vec<&Player>> {
        Ok(self
            .header()?
            .players
            .iter()
            .filter(|p| p.is_spectator())
            .collect())
    }

    /// Returns the recording player, if the file was recorded by a
    /// participant.
    ///
    /// # Errors
    ///
    /// Propagates header decoding failures.
    pub fn pov(&self) -> Result<Option<&Player>> {
        Ok(self.header()?.pov())
    }

    /// Returns the derived team list.
    ///
    /// # Errors
    ///
    /// Propagates header decoding failures.
    pub fn teams(&self) -> Result<&[Team]> {
        Ok(&self.header()?.teams)
    }

    /// Builds the per-player research table: tech completions bucketed by
    /// game minute, each bucket annotated with the age the player was in.
    /// Every minute that saw research appears in every row, so a renderer
    /// gets the age background for idle players too. Spectators are
    /// excluded.
    ///
    /// # Errors
    ///
    /// Propagates header and body failures.
    pub fn research_table(&self) -> Result<Vec<ResearchRow>> {
        let header = self.header()?;
        let body = self.body()?;

        let mut rows: Vec<ResearchRow> = header
            .players
            .iter()
            .filter(|p| !p.is_spectator())
            .map(|p| ResearchRow {
                number: p.number,
                name: p.name.clone(),
                minutes: BTreeMap::new(),
            })
            .collect();

        for event in &body.research {
            let Some(row) = rows
                .iter_mut()
                .find(|r| r.number == u32::from(event.player_number))
            else {
                continue;
            };
            let minute = event.time_ms / MINUTE_MS;
            let ages = body.ages_for(event.player_number);
            row.minutes
                .entry(minute)
                .or_insert_with(|| MinuteCell {
                    age: age_at(ages, minute * MINUTE_MS),
                    tech_ids: Vec::new(),
                })
                .tech_ids
                .push(event.tech_id);
        }

        // Fill every row's cells for every minute any player researched
        let minutes: BTreeSet<u32> = rows
            .iter()
            .flat_map(|r| r.minutes.keys().copied())
            .collect();
        for row in &mut rows {
            let ages = body.ages_for(row.number as u8);
            for &minute in &minutes {
                row.minutes.entry(minute).or_insert_with(|| MinuteCell {
                    age: age_at(ages, minute * MINUTE_MS),
                    tech_ids: Vec::new(),
                });
            }
        }

        Ok(rows)
    }

    /// Returns the map data in the shapes an external minimap renderer
    /// consumes: the tile grid, object placements and per-player colors.
    ///
    /// # Errors
    ///
    /// Propagates header decoding failures.
    pub fn map_view(&self) -> Result<MapView<'_>> {
        let header = self.header()?;
        Ok(MapView {
            width: header.map.width,
            height: header.map.height,
            tiles: &header.map.tiles,
            objects: &header.map.objects,
            player_colors: header
                .players
                .iter()
                .filter(|p| !p.is_spectator())
                .map(|p| (p.number, p.color_id))
                .collect(),
        })
    }

    /// Collects the warning-grade conditions encountered so far: an
    /// unknown version stamp and body truncation. Forces the version and
    /// body parses.
    ///
    /// # Errors
    ///
    /// Propagates splitting errors.
    pub fn warnings(&self) -> Result<Vec<DecodeWarning>> {
        let mut warnings = Vec::new();

        let version = self.version()?;
        if !version.recognized {
            warnings.push(DecodeWarning::UnknownFormatVersion {
                stamp: version.stamp.clone(),
            });
        }

        if let Some(truncation) = &self.body()?.truncation {
            warnings.push(truncation.to_warning());
        }
        Ok(warnings)
    }

    /// How many times the header has actually been decoded. Stays at one
    /// no matter how often [`Self::header`] is called.
    #[must_use]
    pub fn header_parse_count(&self) -> usize {
        self.header_parses.load(Ordering::Relaxed)
    }

    /// How many times a body decode has actually run, including
    /// [`Self::body_from`] offsets.
    #[must_use]
    pub fn body_parse_count(&self) -> usize {
        self.body_parses.load(Ordering::Relaxed)
    }

    fn fill_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.fill.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_bodies_from(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Arc<Body>>> {
        self.bodies_from
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn cached_body_from(&self, offset: usize) -> Option<Arc<Body>> {
        self.lock_bodies_from().get(&offset).map(Arc::clone)
    }

    // The ensure_* chain runs with the fill guard held; OnceLock reads
    // stay valid for callers that never take the lock.

    fn ensure_streams(&self) -> Result<&Streams> {
        if let Some(s) = self.streams.get() {
            return Ok(s);
        }
        let streams = Streams::split(&self.data)?;
        Ok(self.streams.get_or_init(|| streams))
    }

    fn ensure_version(&self) -> Result<&FormatVersion> {
        if let Some(v) = self.version.get() {
            return Ok(v);
        }
        let version = detect(self.ensure_streams()?.header())?;
        Ok(self.version.get_or_init(|| version))
    }

    fn ensure_header(&self) -> Result<&Header> {
        if let Some(h) = self.header.get() {
            return Ok(h);
        }
        let version = self.ensure_version()?;
        let streams = self.ensure_streams()?;
        let header = Header::decode(streams.header(), version)?;
        self.header_parses.fetch_add(1, Ordering::Relaxed);
        Ok(self.header.get_or_init(|| header))
    }

    fn ensure_body(&self) -> Result<&Body> {
        if let Some(b) = self.body.get() {
            return Ok(b);
        }
        let version = self.ensure_version()?;
        let streams = self.ensure_streams()?;
        let body = Body::decode(streams.body(&self.data), version);
        self.body_parses.fetch_add(1, Ordering::Relaxed);
        Ok(self.body.get_or_init(|| body))
    }
}

impl std::fmt::Debug for RecordedGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordedGame")
            .field("bytes", &self.data.len())
            .field("header_parsed", &self.header.get().is_some())
            .field("body_parsed", &self.body.get().is_some())
            .finish()
    }
}

/// One player's row of the research table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchRow {
    /// 1-based roster number.
    pub number: u32,

    /// Player name.
    pub name: String,

    /// Minute bucket to completions within that minute.
    pub minutes: BTreeMap<u32, MinuteCell>,
}

/// Research completions within one minute bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinuteCell {
    /// Age the player was in at the start of the minute: 0 dark,
    /// 1 feudal, 2 castle, 3 imperial.
    pub age: u8,

    /// Tech ids completed during the minute, in stream order.
    pub tech_ids: Vec<u16>,
}

/// Map data in renderer-ready shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView<'a> {
    /// Grid width in tiles.
    pub width: u32,

    /// Grid height in tiles.
    pub height: u32,

    /// Row-major tile grid.
    pub tiles: &'a [Tile],

    /// Initial object placements.
    pub objects: &'a [ObjectPlacement],

    /// `(number, color id)` per non-spectator player.
    pub player_colors: Vec<(u32, u8)>,
}

/// Which age a player was in at a point on the game clock.
fn age_at(ages: PlayerAges, time_ms: u32) -> u8 {
    let reached = |t: Option<u32>| t.is_some_and(|t| t <= time_ms);
    u8::from(reached(ages.feudal_ms))
        + u8::from(reached(ages.castle_ms))
        + u8::from(reached(ages.imperial_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_at() {
        let ages = PlayerAges {
            feudal_ms: Some(600_000),
            castle_ms: Some(1_200_000),
            imperial_ms: None,
        };
        assert_eq!(age_at(ages, 0), 0);
        assert_eq!(age_at(ages, 600_000), 1);
        assert_eq!(age_at(ages, 1_500_000), 2);
        assert_eq!(age_at(PlayerAges::default(), 1_000_000), 0);
    }

    #[test]
    fn test_new_parses_nothing() {
        let game = RecordedGame::new(vec![0u8; 4]);
        assert_eq!(game.header_parse_count(), 0);
        assert_eq!(game.body_parse_count(), 0);
        assert_eq!(game.data().len(), 4);
    }

    #[test]
    fn test_split_error_not_cached() {
        let game = RecordedGame::new(vec![0xFF, 0xFF]);
        assert!(game.streams().is_err());
        // Same error again; the failed stage reruns
        assert!(game.streams().is_err());
        assert!(game.version().is_err());
        assert!(game.header().is_err());
    }

    #[test]
    fn test_debug_output() {
        let game = RecordedGame::new(vec![0u8; 10]);
        let debug = format!("{game:?}");
        assert!(debug.contains("RecordedGame"));
        assert!(debug.contains("header_parsed: false"));
    }
}
