//! Win/loss resolution, battle-mode labeling, and game fingerprinting.
//!
//! Recorded games carry no explicit "winner" field outside the UserPatch
//! post-game summary, so the resolver works from the best evidence
//! available:
//!
//! 1. When a post-game summary exists and names at least one roster
//!    player it is authoritative: team numbers and victory flags come
//!    straight from the scoreboard.
//! 2. Otherwise resignations drive a heuristic. A team whose members all
//!    resigned definitely lost; failing that, the team with the single
//!    highest resigned fraction above a floor is charged the loss.
//!
//! Teams that cannot be marked losers are all winners. Multiple winners
//! is an accepted outcome: the resolver never guesses beyond the
//! evidence.
//!
//! Sentinel-team players (no declared alliance) are regrouped into
//! synthetic one-player teams so the per-team math treats a free-for-all
//! as N independent sides rather than one giant team.

use serde::Serialize;

use crate::body::{Body, PlayerAges, SUMMARY_NO_TEAM};
use crate::header::{Header, SENTINEL_TEAM};
use crate::version::FormatVersion;

/// Battle-mode label for an all-singleton game with more than two
/// players on more than two sides.
pub const MELEE_LABEL: &str = "melee";

/// Base added to a player's roster index to key its synthetic singleton
/// team. Keeps synthetic keys clear of real team indices.
const SYNTHETIC_TEAM_BASE: usize = 5;

/// Minimum resigned fraction for the fallback loser heuristic. A team
/// at or below the floor is never charged the loss on resignations
/// alone.
const RESIGN_FRACTION_FLOOR: f64 = 0.2;

/// Resolved state of one effective team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamOutcome {
    /// Team key: header team index, or `roster index + 5` for a
    /// synthetic singleton.
    pub index: usize,

    /// Whether this team won.
    pub is_winner: bool,

    /// Members as `(roster index, 1-based number)` pairs.
    pub members: Vec<(usize, u32)>,
}

/// Effective per-player stats after any summary fix-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOutcome {
    /// Stable roster index.
    pub index: usize,

    /// 1-based roster number.
    pub number: u32,

    /// Player name.
    pub name: String,

    /// Effective civilization id.
    pub civilization_id: u8,

    /// Effective color id, 0-based.
    pub color_id: u8,

    /// Effective age reach times, milliseconds.
    pub ages: PlayerAges,

    /// Resignation time in milliseconds, if the player resigned.
    pub resign_ms: Option<u32>,

    /// Whether this player's team won. Always false for spectators.
    pub is_winner: bool,
}

/// The resolved outcome of a recorded game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Effective teams with win flags, sorted by team key.
    pub teams: Vec<TeamOutcome>,

    /// Per-player effective stats, in roster order. Spectators are
    /// included for display but belong to no team.
    pub players: Vec<PlayerOutcome>,

    /// Battle-mode label (`"1v1"`, `"2v2v2"`, [`MELEE_LABEL`]).
    pub battle_mode: String,

    /// Content fingerprint, stable across re-parses and player-list
    /// reordering.
    pub fingerprint: String,
}

impl Outcome {
    /// Returns the winning teams.
    #[must_use]
    pub fn winners(&self) -> Vec<&TeamOutcome> {
        self.teams.iter().filter(|t| t.is_winner).collect()
    }

    /// Returns the outcome entry for a roster index.
    #[must_use]
    pub fn player(&self, index: usize) -> Option<&PlayerOutcome> {
        self.players.iter().find(|p| p.index == index)
    }
}

/// A working team during resolution: key plus roster-index members.
struct EffectiveTeam {
    key: usize,
    members: Vec<usize>,
    is_winner: bool,
}

/// Resolves the outcome of a game from its decoded header and body.
#[must_use]
pub fn resolve(version: &FormatVersion, header: &Header, body: &Body) -> Outcome {
    // A summary whose entries match no roster number is not this game's
    // scoreboard; treat it as absent rather than trusting its win flags.
    let summary_teams = body
        .postgame
        .as_ref()
        .map(|summary| teams_from_summary(header, summary))
        .filter(|teams| !teams.is_empty());

    let mut teams = match summary_teams {
        Some(teams) => teams,
        None => {
            let mut teams = effective_teams(header);
            apply_resign_heuristic(header, body, &mut teams);
            teams
        }
    };
    teams.sort_by_key(|t| t.key);

    let players = effective_players(header, body, &teams);
    let battle_mode = battle_mode_label(&teams);
    let fingerprint = fingerprint(version, header, &battle_mode);

    Outcome {
        teams: teams
            .into_iter()
            .map(|t| TeamOutcome {
                index: t.key,
                is_winner: t.is_winner,
                members: t
                    .members
                    .iter()
                    .map(|&i| (i, header.players[i].number))
                    .collect(),
            })
            .collect(),
        players,
        battle_mode,
        fingerprint,
    }
}

/// Regroups the header teams for outcome math: real teams survive,
/// sentinel members become synthetic singletons, spectators drop out.
fn effective_teams(header: &Header) -> Vec<EffectiveTeam> {
    let mut teams = Vec::new();
    for team in &header.teams {
        if team.index == SENTINEL_TEAM {
            for &member in &team.members {
                if header.players[member].is_spectator() {
                    continue;
                }
                teams.push(EffectiveTeam {
                    key: member + SYNTHETIC_TEAM_BASE,
                    members: vec![member],
                    is_winner: true,
                });
            }
        } else {
            teams.push(EffectiveTeam {
                key: team.index,
                members: team.members.clone(),
                is_winner: true,
            });
        }
    }
    teams
}

/// Builds teams straight from the authoritative post-game summary.
fn teams_from_summary(
    header: &Header,
    summary: &crate::body::PostGameSummary,
) -> Vec<EffectiveTeam> {
    let mut teams: Vec<EffectiveTeam> = Vec::new();
    for player in &header.players {
        if player.is_spectator() {
            continue;
        }
        let Some(entry) = summary.entry_for(player.number as u8) else {
            continue;
        };
        let key = if entry.team == SUMMARY_NO_TEAM {
            player.index + SYNTHETIC_TEAM_BASE
        } else {
            entry.team as usize
        };

        match teams.iter_mut().find(|t| t.key == key) {
            Some(team) => {
                team.members.push(player.index);
                team.is_winner |= entry.victory;
            }
            None => teams.push(EffectiveTeam {
                key,
                members: vec![player.index],
                is_winner: entry.victory,
            }),
        }
    }
    teams
}

/// Marks losing teams from the resignation record.
fn apply_resign_heuristic(header: &Header, body: &Body, teams: &mut [EffectiveTeam]) {
    let resigned = |member: usize| {
        body.resignations
            .contains_key(&(header.players[member].number as u8))
    };

    let mut fractions: Vec<f64> = teams
        .iter()
        .map(|team| {
            let count = team.members.iter().filter(|&&m| resigned(m)).count();
            count as f64 / team.members.len() as f64
        })
        .collect();

    let conclusive = fractions.iter().any(|&f| f >= 1.0);
    if conclusive {
        for (team, &fraction) in teams.iter_mut().zip(&fractions) {
            team.is_winner = fraction < 1.0;
        }
        return;
    }

    // Fallback. The recording usually stops when the owner's side gives
    // up; if the owner's team already bled a resignation and the owner
    // did not resign on record, charge the unrecorded one to that team.
    if let Some(owner) = header.pov() {
        if !resigned(owner.index) {
            if let Some(pos) = teams.iter().position(|t| t.members.contains(&owner.index)) {
                let count = teams[pos].members.iter().filter(|&&m| resigned(m)).count();
                if count >= 1 {
                    fractions[pos] = (count + 1) as f64 / teams[pos].members.len() as f64;
                }
            }
        }
    }

    let max = fractions.iter().copied().fold(0.0_f64, f64::max);
    if max <= RESIGN_FRACTION_FLOOR {
        return;
    }
    for (team, &fraction) in teams.iter_mut().zip(&fractions) {
        if fraction >= max {
            team.is_winner = false;
        }
    }
}

/// Builds the per-player effective stats, applying the summary fix-up
/// for saves with the corruption flag set.
fn effective_players(header: &Header, body: &Body, teams: &[EffectiveTeam]) -> Vec<PlayerOutcome> {
    let fix_up = header.settings.corrupted_stats;

    header
        .players
        .iter()
        .map(|player| {
            let number = player.number as u8;
            let mut civilization_id = player.civilization_id;
            let mut color_id = player.color_id;
            let mut ages = body.ages_for(number);
            let mut resign_ms = body.resign_time(number);

            if fix_up {
                if let Some(entry) = body
                    .postgame
                    .as_ref()
                    .and_then(|summary| summary.entry_for(number))
                {
                    civilization_id = entry.civilization_id;
                    color_id = entry.color_id.saturating_sub(1);
                    ages = PlayerAges {
                        feudal_ms: age_ms(entry.feudal_time),
                        castle_ms: age_ms(entry.castle_time),
                        imperial_ms: age_ms(entry.imperial_time),
                    };
                    resign_ms = None;
                }
            }

            let is_winner = !player.is_spectator()
                && teams
                    .iter()
                    .find(|t| t.members.contains(&player.index))
                    .is_some_and(|t| t.is_winner);

            PlayerOutcome {
                index: player.index,
                number: player.number,
                name: player.name.clone(),
                civilization_id,
                color_id,
                ages,
                resign_ms,
                is_winner,
            }
        })
        .collect()
}

/// Summary age times are seconds; 0 means never reached.
fn age_ms(seconds: u32) -> Option<u32> {
    (seconds != 0).then(|| seconds.saturating_mul(1000))
}

/// Joins the sorted team sizes into the battle-mode label.
fn battle_mode_label(teams: &[EffectiveTeam]) -> String {
    let participant_count = teams.iter().map(|t| t.members.len()).sum::<usize>();
    let all_singletons = teams.iter().all(|t| t.members.len() == 1);
    if all_singletons && participant_count > 2 && teams.len() > 2 {
        return MELEE_LABEL.to_string();
    }

    let mut sizes: Vec<usize> = teams.iter().map(|t| t.members.len()).collect();
    sizes.sort_unstable();
    sizes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("v")
}

/// Computes the content fingerprint over version, mode, map and the
/// sorted per-player salt. Spectators are excluded so caster copies of
/// the same game fingerprint identically.
fn fingerprint(version: &FormatVersion, header: &Header, battle_mode: &str) -> String {
    let mut salts: Vec<String> = header
        .players
        .iter()
        .filter(|p| !p.is_spectator())
        .map(|p| format!("{}{}{}", p.index, p.name, p.civilization_id))
        .collect();
    salts.sort_unstable();

    let input = format!(
        "{}{}{}{}",
        version.family.label(),
        battle_mode,
        header.settings.map_id,
        salts.concat()
    );
    format!("{:x}", md5::compute(input.as_bytes()))
}
