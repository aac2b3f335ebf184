//! Recorded game (.mgl/.mgx) parser CLI
//!
//! A command-line interface for inspecting, parsing, and validating
//! Age of Empires II recorded game files.
//!
//! ## Commands
//!
//! - `info` - Display quick game metadata
//! - `parse` - Full parse with output format options
//! - `validate` - Validate file structure (exit codes for scripting)

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use mgx_parser::game::MinuteCell;
use mgx_parser::RecordedGame;

/// Age of Empires II recorded game (.mgl/.mgx) parser
#[derive(Parser)]
#[command(name = "mgx-parser")]
#[command(about = "Age of Empires II recorded game (.mgl/.mgx) parser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display game information
    Info {
        /// Path to the recorded game file
        file: PathBuf,
    },
    /// Parse a recorded game file
    Parse {
        /// Path to the recorded game file
        file: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Include player details
        #[arg(long)]
        players: bool,
        /// Include chat messages (lobby and in-game)
        #[arg(long)]
        chat: bool,
        /// Include the per-minute research table
        #[arg(long)]
        research: bool,
        /// Include the resolved outcome
        #[arg(long)]
        outcome: bool,
    },
    /// Validate recorded game structure
    Validate {
        /// Path to the recorded game file
        file: PathBuf,
        /// Verbose error reporting
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct ParseOutput {
    game: GameInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    players: Option<Vec<PlayerInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<Vec<ChatInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    research: Option<Vec<ResearchInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<OutcomeInfo>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct GameInfo {
    version: String,
    sub_version: f32,
    file_size: usize,
    duration_ms: u32,
    duration: String,
    map_id: u32,
    map_size: u32,
    population_limit: u32,
    game_speed: u32,
    multiplayer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
}

#[derive(Serialize)]
struct PlayerInfo {
    number: u32,
    name: String,
    civilization_id: u8,
    color_id: u8,
    team: usize,
    spectator: bool,
    owner: bool,
}

#[derive(Serialize)]
struct ChatInfo {
    time_ms: u32,
    group: String,
    name: String,
    text: String,
}

#[derive(Serialize)]
struct ResearchInfo {
    number: u32,
    name: String,
    minutes: BTreeMap<u32, MinuteCell>,
}

#[derive(Serialize)]
struct OutcomeInfo {
    battle_mode: String,
    fingerprint: String,
    winners: Vec<String>,
    losers: Vec<String>,
}

// ============================================================================
// Validation Result Structure
// ============================================================================

struct ValidationResult {
    split_valid: bool,
    version_valid: bool,
    header_valid: bool,
    body_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn is_valid(&self) -> bool {
        self.split_valid && self.version_valid && self.header_valid && self.body_valid
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Parse {
            file,
            output,
            players,
            chat,
            research,
            outcome,
        } => cmd_parse(&file, &output, players, chat, research, outcome),
        Commands::Validate { file, verbose } => cmd_validate(&file, verbose),
    }
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(file: &Path) -> ExitCode {
    let data = match std::fs::read(file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading file: {e}");
            return ExitCode::FAILURE;
        }
    };
    let file_size = data.len();
    let game = RecordedGame::new(data);

    let (header, body) = match (game.header(), game.body()) {
        (Ok(h), Ok(b)) => (h, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let version = match game.version() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("=== Recorded Game ===\n");
    println!("File:");
    println!("  Size: {} bytes ({:.2} KB)", file_size, file_size as f64 / 1024.0);
    println!("  Version: {} ({})", version.stamp, version.family.label());
    println!("  Duration: {}", duration_string(body.duration_ms));
    println!();

    println!("Settings:");
    println!("  Map id: {}", header.settings.map_id);
    println!("  Population limit: {}", header.settings.population_limit);
    println!("  Speed: {}%", header.settings.game_speed);
    println!(
        "  Mode: {}",
        if header.settings.is_multiplayer() {
            "multiplayer"
        } else {
            "single player"
        }
    );
    println!();

    println!("Players:");
    for player in &header.players {
        let role = if player.is_spectator() {
            " (spectator)"
        } else if player.is_owner {
            " (recorded)"
        } else {
            ""
        };
        println!("  {} - civ {}{}", player.name, player.civilization_id, role);
    }

    match game.warnings() {
        Ok(warnings) if !warnings.is_empty() => {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
        _ => {}
    }

    ExitCode::SUCCESS
}

// ============================================================================
// Parse Command Implementation
// ============================================================================

fn cmd_parse(
    file: &Path,
    output: &OutputFormat,
    include_players: bool,
    include_chat: bool,
    include_research: bool,
    include_outcome: bool,
) -> ExitCode {
    let data = match std::fs::read(file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading file: {e}");
            return ExitCode::FAILURE;
        }
    };
    let file_size = data.len();
    let game = RecordedGame::new(data);

    let output_data = match build_output(
        &game,
        file_size,
        include_players,
        include_chat,
        include_research,
        include_outcome,
    ) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Json => print_json(&output_data),
        OutputFormat::Pretty => print_pretty(&output_data),
    }

    ExitCode::SUCCESS
}

fn build_output(
    game: &RecordedGame,
    file_size: usize,
    include_players: bool,
    include_chat: bool,
    include_research: bool,
    include_outcome: bool,
) -> mgx_parser::Result<ParseOutput> {
    let version = game.version()?;
    let header = game.header()?;
    let body = game.body()?;

    let game_info = GameInfo {
        version: format!("{} ({})", version.stamp, version.family.label()),
        sub_version: version.sub_version,
        file_size,
        duration_ms: body.duration_ms,
        duration: duration_string(body.duration_ms),
        map_id: header.settings.map_id,
        map_size: header.settings.map_size,
        population_limit: header.settings.population_limit,
        game_speed: header.settings.game_speed,
        multiplayer: header.settings.is_multiplayer(),
        scenario: header.scenario.as_ref().map(|s| s.filename.clone()),
    };

    let players = include_players.then(|| {
        header
            .players
            .iter()
            .map(|p| PlayerInfo {
                number: p.number,
                name: p.name.clone(),
                civilization_id: p.civilization_id,
                color_id: p.color_id,
                team: p.team_index,
                spectator: p.is_spectator(),
                owner: p.is_owner,
            })
            .collect()
    });

    let chat = include_chat.then(|| {
        header
            .pregame_chat
            .iter()
            .chain(&body.chat)
            .map(|m| ChatInfo {
                time_ms: m.time_ms,
                group: m.group.clone(),
                name: m.name.clone(),
                text: m.text.clone(),
            })
            .collect()
    });

    let research = if include_research {
        Some(
            game.research_table()?
                .into_iter()
                .map(|row| ResearchInfo {
                    number: row.number,
                    name: row.name,
                    minutes: row.minutes,
                })
                .collect(),
        )
    } else {
        None
    };

    let outcome = if include_outcome {
        let outcome = game.outcome()?;
        let side_names = |winner: bool| {
            outcome
                .teams
                .iter()
                .filter(|t| t.is_winner == winner)
                .flat_map(|t| t.members.iter())
                .filter_map(|&(index, _)| outcome.player(index).map(|p| p.name.clone()))
                .collect()
        };
        Some(OutcomeInfo {
            battle_mode: outcome.battle_mode.clone(),
            fingerprint: outcome.fingerprint.clone(),
            winners: side_names(true),
            losers: side_names(false),
        })
    } else {
        None
    };

    let warnings = game
        .warnings()?
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(ParseOutput {
        game: game_info,
        players,
        chat,
        research,
        outcome,
        warnings,
    })
}

fn print_json(output: &ParseOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing to JSON: {e}"),
    }
}

fn print_pretty(output: &ParseOutput) {
    println!("=== Game ===");
    println!("Version: {}", output.game.version);
    println!("File Size: {} bytes", output.game.file_size);
    println!("Duration: {}", output.game.duration);
    println!("Map id: {}", output.game.map_id);
    println!("Population limit: {}", output.game.population_limit);
    if let Some(scenario) = &output.game.scenario {
        println!("Scenario: {scenario}");
    }
    println!();

    if let Some(players) = &output.players {
        println!("=== Players ({}) ===", players.len());
        for player in players {
            let role = if player.spectator {
                " [spectator]"
            } else if player.owner {
                " [recorded]"
            } else {
                ""
            };
            println!(
                "  #{} {} - civ {}, color {}, team {}{}",
                player.number, player.name, player.civilization_id, player.color_id, player.team,
                role
            );
        }
        println!();
    }

    if let Some(chat) = &output.chat {
        println!("=== Chat ({}) ===", chat.len());
        for msg in chat {
            let stamp = duration_string(msg.time_ms);
            if msg.group.is_empty() {
                println!("  [{}] {}: {}", stamp, msg.name, msg.text);
            } else {
                println!("  [{}] {}{}: {}", stamp, msg.group, msg.name, msg.text);
            }
        }
        println!();
    }

    if let Some(research) = &output.research {
        println!("=== Research ===");
        for row in research {
            println!("  {} (#{}):", row.name, row.number);
            for (minute, cell) in &row.minutes {
                println!(
                    "    min {:>3} (age {}): {:?}",
                    minute, cell.age, cell.tech_ids
                );
            }
        }
        println!();
    }

    if let Some(outcome) = &output.outcome {
        println!("=== Outcome ===");
        println!("Battle mode: {}", outcome.battle_mode);
        println!("Winners: {}", outcome.winners.join(", "));
        println!("Losers: {}", outcome.losers.join(", "));
        println!("Fingerprint: {}", outcome.fingerprint);
        println!();
    }

    if !output.warnings.is_empty() {
        println!("=== Warnings ===");
        for warning in &output.warnings {
            println!("  - {warning}");
        }
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

fn cmd_validate(file: &Path, verbose: bool) -> ExitCode {
    let result = validate_game(file);

    if verbose {
        print_validation_details(&result, file);
    } else {
        print_validation_summary(&result, file);
    }

    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate_game(file: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        split_valid: false,
        version_valid: false,
        header_valid: false,
        body_valid: false,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let data = match std::fs::read(file) {
        Ok(d) => d,
        Err(e) => {
            result.errors.push(format!("Failed to read file: {e}"));
            return result;
        }
    };
    let game = RecordedGame::new(data);

    match game.streams() {
        Ok(_) => result.split_valid = true,
        Err(e) => {
            result.errors.push(format!("Stream splitting failed: {e}"));
            return result;
        }
    }

    match game.version() {
        Ok(version) => {
            result.version_valid = true;
            if !version.recognized {
                result
                    .warnings
                    .push(format!("Unknown version stamp {:?}", version.stamp));
            }
        }
        Err(e) => {
            result.errors.push(format!("Version sniffing failed: {e}"));
            return result;
        }
    }

    match game.header() {
        Ok(header) => {
            result.header_valid = true;
            if header.players.is_empty() {
                result.warnings.push("No players in roster".to_string());
            }
        }
        Err(e) => {
            result.errors.push(format!("Header decoding failed: {e}"));
        }
    }

    match game.body() {
        Ok(body) => {
            result.body_valid = true;
            if let Some(truncation) = &body.truncation {
                result.warnings.push(format!(
                    "Body truncated at 0x{:X}: {}",
                    truncation.offset, truncation.reason
                ));
            }
        }
        Err(e) => {
            result.errors.push(format!("Body decoding failed: {e}"));
        }
    }

    result
}

fn print_validation_summary(result: &ValidationResult, file: &Path) {
    let status = if result.is_valid() { "VALID" } else { "INVALID" };
    println!("{}: {}", file.display(), status);
}

fn print_validation_details(result: &ValidationResult, file: &Path) {
    println!("Validating: {}\n", file.display());

    println!("Checks:");
    println!("  Stream splitting:  {}", status_icon(result.split_valid));
    println!("  Version sniffing:  {}", status_icon(result.version_valid));
    println!("  Header decoding:   {}", status_icon(result.header_valid));
    println!("  Body decoding:     {}", status_icon(result.body_valid));

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in &result.errors {
            println!("  - {error}");
        }
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }

    println!(
        "\nResult: {}",
        if result.is_valid() { "VALID" } else { "INVALID" }
    );
}

fn status_icon(valid: bool) -> &'static str {
    if valid {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

/// Formats milliseconds as `h:mm:ss`.
fn duration_string(ms: u32) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
