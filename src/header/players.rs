//! Player roster, diplomacy matrix, and team derivation.
//!
//! # Roster format
//!
//! A fixed count of player records (the count comes from the settings
//! block):
//!
//! | Field | Type |
//! |---------------|-----------------------------------|
//! | number | u32 LE, 1-based, matches body-stream command encoding |
//! | name | u32 LE length + bytes, legacy GBK encoding |
//! | civilization | u8 |
//! | color | u8 |
//! | kind | u8: 0 AI, 1 human, 2 spectator |
//! | is owner | u8: set on at most one record |
//!
//! # Diplomacy and teams
//!
//! An N×N stance matrix (row-major, `stance[from][to]`) follows the
//! roster. Players *mutually* marked ally are grouped into one team; a
//! non-symmetric pair (A allies B, B does not ally A) is treated as not
//! allied, never resolved by trusting one direction. Players allied with
//! no one land in the sentinel team 0 — the "no team assigned" bucket,
//! which every consumer computing win/loss or grouping must treat
//! specially, because it is not a real alliance.

use serde::Serialize;

use crate::binary::SliceCursor;
use crate::error::{ParserError, Result};
use crate::header::{field_legacy_string, field_u32, field_u8};

/// Stance value meaning "ally" in the diplomacy matrix.
pub const STANCE_ALLY: u8 = 0;

/// Stance value meaning "neutral" in the diplomacy matrix.
pub const STANCE_NEUTRAL: u8 = 1;

/// Stance value meaning "enemy" in the diplomacy matrix.
pub const STANCE_ENEMY: u8 = 3;

/// Index of the sentinel "no team assigned" bucket.
pub const SENTINEL_TEAM: usize = 0;

/// Player kind byte: computer-controlled.
pub const KIND_AI: u8 = 0;

/// Player kind byte: human participant.
pub const KIND_HUMAN: u8 = 1;

/// Player kind byte: spectator (HD Edition saves retain these in the
/// roster but they take no part in gameplay).
pub const KIND_SPECTATOR: u8 = 2;

/// A player slot from the header roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Stable 0-based slot index into the roster.
    pub index: usize,

    /// 1-based in-roster number, as used by body-stream commands.
    pub number: u32,

    /// Player name, transcoded to UTF-8.
    pub name: String,

    /// Civilization id, unresolved (unknown ids are carried, not
    /// rejected).
    pub civilization_id: u8,

    /// Color id, unresolved.
    pub color_id: u8,

    /// Kind byte (AI / human / spectator).
    pub kind: u8,

    /// Whether this player recorded the file. At most one roster entry
    /// carries this; files recorded by casters have none.
    pub is_owner: bool,

    /// Back-reference to the owning team's index. Non-owning: the `Team`
    /// holds the authoritative membership list, this is lookup
    /// convenience only.
    pub team_index: usize,
}

impl Player {
    /// Whether this roster entry is a spectator, excluded from all
    /// gameplay aggregates (team math, research tables, fingerprint).
    #[must_use]
    pub fn is_spectator(&self) -> bool {
        self.kind == KIND_SPECTATOR
    }

    /// Whether this player is computer controlled.
    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.kind == KIND_AI
    }
}

/// A team: an ordered list of member players.
///
/// Team 0 is the sentinel "no alliance" bucket, not a real team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    /// Team index; 0 is the sentinel bucket.
    pub index: usize,

    /// Roster indices of the members, in roster order.
    pub members: Vec<usize>,
}

impl Team {
    /// Whether this is the sentinel "no team assigned" bucket.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_TEAM
    }
}

/// The raw N×N diplomacy stance matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiplomacyMatrix {
    n: usize,
    stances: Vec<u8>,
}

impl DiplomacyMatrix {
    /// Returns the raw stance byte `from` holds towards `to`.
    #[must_use]
    pub fn stance(&self, from: usize, to: usize) -> Option<u8> {
        if from >= self.n || to >= self.n {
            return None;
        }
        Some(self.stances[from * self.n + to])
    }

    /// Whether two players are mutually allied.
    ///
    /// Symmetric-tolerant: a one-directional ally stance does not count.
    /// A player is not "allied with itself" for grouping purposes.
    #[must_use]
    pub fn is_mutual_ally(&self, a: usize, b: usize) -> bool {
        a != b
            && self.stance(a, b) == Some(STANCE_ALLY)
            && self.stance(b, a) == Some(STANCE_ALLY)
    }
}

/// Decodes the roster records. Team back-references are filled in later
/// by [`derive_teams`].
///
/// # Errors
///
/// Returns `ParserError::HeaderDecode` when a record would read past the
/// end of the header region.
pub fn decode_roster(cursor: &mut SliceCursor<'_>, num_players: u8) -> Result<Vec<Player>> {
    let mut players = Vec::with_capacity(num_players as usize);
    for index in 0..num_players as usize {
        let number = field_u32(cursor, "player_number")?;
        let name = field_legacy_string(cursor, "player_name")?;
        let civilization_id = field_u8(cursor, "player_civilization")?;
        let color_id = field_u8(cursor, "player_color")?;
        let kind = field_u8(cursor, "player_kind")?;
        let is_owner = field_u8(cursor, "player_is_owner")? != 0;

        players.push(Player {
            index,
            number,
            name,
            civilization_id,
            color_id,
            kind,
            is_owner,
            team_index: SENTINEL_TEAM,
        });
    }
    Ok(players)
}

/// Decodes the N×N stance matrix following the roster.
///
/// # Errors
///
/// Returns `ParserError::HeaderDecode` on overrun.
pub fn decode_diplomacy(cursor: &mut SliceCursor<'_>, num_players: u8) -> Result<DiplomacyMatrix> {
    let n = num_players as usize;
    let len = n * n;
    let pos = cursor.position();
    let stances = cursor
        .read_bytes(len)
        .map_err(|e| e.at_field("diplomacy_matrix", pos))?
        .to_vec();
    Ok(DiplomacyMatrix { n, stances })
}

/// Reduces the stance matrix to team groupings and writes each player's
/// team back-reference.
///
/// Mutually allied players merge transitively into one group. Groups of
/// one go to the sentinel team 0 (always present, always first); real
/// alliances get indices 1, 2, ... ordered by their lowest member index.
/// Spectators never join a team and stay in the sentinel bucket.
#[must_use]
pub fn derive_teams(players: &mut [Player], diplomacy: &DiplomacyMatrix) -> Vec<Team> {
    let n = players.len();

    // Union-find over roster indices.
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    for a in 0..n {
        if players[a].is_spectator() {
            continue;
        }
        for b in (a + 1)..n {
            if players[b].is_spectator() {
                continue;
            }
            if diplomacy.is_mutual_ally(a, b) {
                let ra = find(&mut parent, a);
                let rb = find(&mut parent, b);
                if ra != rb {
                    parent[rb] = ra;
                }
            }
        }
    }

    // Collect groups in order of their lowest member index.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let root = find(&mut parent, i);
        match group_of_root[root] {
            Some(g) => groups[g].push(i),
            None => {
                group_of_root[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }

    let mut sentinel = Team {
        index: SENTINEL_TEAM,
        members: Vec::new(),
    };
    let mut teams = Vec::new();
    for group in groups {
        if group.len() < 2 {
            sentinel.members.extend(&group);
        } else {
            teams.push(group);
        }
    }
    sentinel.members.sort_unstable();

    let mut result = vec![sentinel];
    for (i, members) in teams.into_iter().enumerate() {
        result.push(Team {
            index: i + 1,
            members,
        });
    }

    for team in &result {
        for &member in &team.members {
            players[member].team_index = team.index;
        }
    }

    result
}
