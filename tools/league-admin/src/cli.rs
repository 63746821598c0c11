//! # Command Line Interface
//!
//! Admin commands for rounds, the player catalog, statistics and lineups.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use league_service::{
    Credits, LeagueService, LineupError, Player, RoundStatus, DEFAULT_RANKING_LIMIT,
};
use rust_decimal::Decimal;
use scoring_engine::{display_points, Role, ScoreCalculator, StatLine};
use std::collections::HashMap;
use uuid::Uuid;

/// Futsal league admin CLI
#[derive(Parser)]
#[command(name = "league-admin")]
#[command(about = "Admin CLI for the futsal league: rounds, players, statistics and lineups")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a stat line without saving it
    Preview {
        /// Player role (GOL, FIX, ALA, PIV)
        #[arg(short, long)]
        role: Role,

        #[command(flatten)]
        stats: StatArgs,
    },
    /// Round administration
    #[command(subcommand)]
    Rounds(RoundCommands),
    /// Player catalog
    #[command(subcommand)]
    Players(PlayerCommands),
    /// User accounts
    #[command(subcommand)]
    Users(UserCommands),
    /// Round statistics
    #[command(subcommand)]
    Stats(StatCommands),
    /// Committed lineups
    #[command(subcommand)]
    Lineup(LineupCommands),
}

#[derive(Subcommand)]
pub enum RoundCommands {
    /// List all rounds, newest first
    List,
    /// Create an upcoming round
    Create { name: String },
    /// Open the market for a round, closing any other active round
    Activate { round_id: Uuid },
    /// Close a round for good
    Finish { round_id: Uuid },
    /// Remove a round that is not active, with its lineups and stats
    Delete { round_id: Uuid },
}

#[derive(Subcommand)]
pub enum PlayerCommands {
    /// List the catalog
    List,
    /// Add a player to the catalog
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        team: String,
        #[arg(long)]
        role: Role,
        /// Price in credits, 0.50 to 10.00
        #[arg(long)]
        price: Credits,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Remove a player no committed lineup fields
    Delete { player_id: Uuid },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a team with the starting credits
    Register { team_name: String },
    /// Show a user's balance
    Balance { user_id: Uuid },
    /// League table by total points
    Ranking {
        #[arg(long, default_value_t = DEFAULT_RANKING_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum StatCommands {
    /// Score and save a player's stat line for a round
    Save {
        #[arg(long)]
        round: Uuid,
        #[arg(long)]
        player: Uuid,

        #[command(flatten)]
        stats: StatArgs,
    },
    /// Remove a player's stat line and take its points out of the lineups
    Delete {
        #[arg(long)]
        round: Uuid,
        #[arg(long)]
        player: Uuid,
    },
    /// Show the scored stat lines of a round
    Sheet {
        #[arg(long)]
        round: Uuid,
    },
}

#[derive(Subcommand)]
pub enum LineupCommands {
    /// Show a user's committed lineup (defaults to the active round)
    Show {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        round: Option<Uuid>,
    },
    /// Draft the given players and commit them for the active round
    Commit {
        #[arg(long)]
        user: Uuid,
        /// Player ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        players: Vec<Uuid>,
    },
    /// List every lineup a user committed, newest round first
    History {
        #[arg(long)]
        user: Uuid,
    },
}

/// Raw match counters
#[derive(Args, Debug, Clone, Default)]
pub struct StatArgs {
    #[arg(long, default_value_t = 0)]
    pub goals: u32,
    #[arg(long, default_value_t = 0)]
    pub assists: u32,
    #[arg(long, default_value_t = 0)]
    pub shots_on_target: u32,
    #[arg(long, default_value_t = 0)]
    pub tackles: u32,
    #[arg(long, default_value_t = 0)]
    pub interceptions: u32,
    #[arg(long, default_value_t = 0)]
    pub blocks: u32,
    #[arg(long, default_value_t = 0)]
    pub saves: u32,
    #[arg(long, default_value_t = 0)]
    pub goals_conceded: u32,
    #[arg(long)]
    pub clean_sheet: bool,
    #[arg(long)]
    pub penalty_saved: bool,
    #[arg(long, default_value_t = 0)]
    pub yellow_cards: u32,
    #[arg(long, default_value_t = 0)]
    pub red_cards: u32,
    #[arg(long, default_value_t = 0)]
    pub fouls_committed: u32,
    #[arg(long, default_value_t = 0)]
    pub fouls_suffered: u32,
    #[arg(long, default_value_t = 0)]
    pub own_goals: u32,
    #[arg(long, default_value_t = 0)]
    pub minutes_played: u32,
}

impl From<StatArgs> for StatLine {
    fn from(args: StatArgs) -> Self {
        StatLine {
            goals: args.goals,
            assists: args.assists,
            shots_on_target: args.shots_on_target,
            tackles: args.tackles,
            interceptions: args.interceptions,
            blocks: args.blocks,
            saves: args.saves,
            goals_conceded: args.goals_conceded,
            clean_sheet: args.clean_sheet,
            penalty_saved: args.penalty_saved,
            yellow_cards: args.yellow_cards,
            red_cards: args.red_cards,
            fouls_committed: args.fouls_committed,
            fouls_suffered: args.fouls_suffered,
            own_goals: args.own_goals,
            minutes_played: args.minutes_played,
        }
    }
}

/// Print the per-term breakdown of a stat line; needs no database
pub fn show_preview(role: Role, stats: StatLine, json: bool) -> Result<()> {
    let breakdown = ScoreCalculator::new().breakdown(role, &stats);
    let total = breakdown.total();

    if json {
        let terms: serde_json::Map<String, serde_json::Value> = breakdown
            .terms()
            .iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value.to_string())))
            .collect();
        let out = serde_json::json!({
            "role": role,
            "terms": terms,
            "total": display_points(total),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "Score preview for".bold(), role.to_string().cyan());
    println!("{}", "=".repeat(32));
    for (name, value) in breakdown.terms().iter().filter(|(_, v)| !v.is_zero()) {
        println!("{:<20} {:>10}", name, colored_points(*value));
    }
    println!("{}", "-".repeat(32));
    println!("{:<20} {:>10}", "total".bold(), colored_points(total));
    Ok(())
}

fn colored_points(points: Decimal) -> ColoredString {
    let text = display_points(points);
    if points.is_sign_negative() && !points.is_zero() {
        text.red()
    } else {
        text.green()
    }
}

/// CLI handler
pub struct CliHandler {
    service: LeagueService,
    json: bool,
}

impl CliHandler {
    pub fn new(service: LeagueService, json: bool) -> Self {
        Self { service, json }
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Preview { role, stats } => show_preview(role, stats.into(), self.json),
            Commands::Rounds(cmd) => self.rounds(cmd).await,
            Commands::Players(cmd) => self.players(cmd).await,
            Commands::Users(cmd) => self.users(cmd).await,
            Commands::Stats(cmd) => self.stats(cmd).await,
            Commands::Lineup(cmd) => self.lineup(cmd).await,
        }
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    async fn rounds(&self, cmd: RoundCommands) -> Result<()> {
        match cmd {
            RoundCommands::List => {
                let rounds = self.service.list_rounds().await.context("Failed to list rounds")?;
                if self.json {
                    return self.print_json(&rounds);
                }
                println!("{}", "Rounds".bold());
                println!("{}", "=".repeat(60));
                for round in rounds {
                    let status = match round.status {
                        RoundStatus::Active => round.status.to_string().green(),
                        RoundStatus::Upcoming => round.status.to_string().yellow(),
                        RoundStatus::Finished => round.status.to_string().dimmed(),
                    };
                    println!("{}  {:<20} {}", round.id, round.name, status);
                }
            }
            RoundCommands::Create { name } => {
                let round = self.service.create_round(&name).await?;
                println!("✅ Created {} ({})", round.name, round.id);
            }
            RoundCommands::Activate { round_id } => {
                let round = self
                    .service
                    .activate_round(round_id)
                    .await
                    .with_context(|| format!("Failed to activate round {}", round_id))?;
                println!("✅ Market open for {}", round.name.green());
            }
            RoundCommands::Finish { round_id } => {
                let round = self
                    .service
                    .finish_round(round_id)
                    .await
                    .with_context(|| format!("Failed to finish round {}", round_id))?;
                println!("🏁 {} finished", round.name);
            }
            RoundCommands::Delete { round_id } => {
                self.service
                    .delete_round(round_id)
                    .await
                    .with_context(|| format!("Failed to delete round {}", round_id))?;
                println!("🗑️  Deleted round {}", round_id);
            }
        }
        Ok(())
    }

    async fn players(&self, cmd: PlayerCommands) -> Result<()> {
        match cmd {
            PlayerCommands::List => {
                let players = self.service.players().await?;
                if self.json {
                    return self.print_json(&players);
                }
                for player in players {
                    let average = player
                        .average_points
                        .map(display_points)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  {:<4} {:<24} {:<16} {:>9}  avg {}",
                        player.id, player.role, player.name, player.team, player.price, average
                    );
                }
            }
            PlayerCommands::Add { name, team, role, price, photo_url } => {
                let mut player = Player::new(name, team, role, price);
                player.photo_url = photo_url;
                self.service.save_player(&player).await?;
                println!("✅ Added {} ({})", player.name, player.id);
            }
            PlayerCommands::Delete { player_id } => {
                self.service
                    .delete_player(player_id)
                    .await
                    .with_context(|| format!("Failed to delete player {}", player_id))?;
                println!("🗑️  Deleted player {}", player_id);
            }
        }
        Ok(())
    }

    async fn users(&self, cmd: UserCommands) -> Result<()> {
        match cmd {
            UserCommands::Register { team_name } => {
                let user_id = self.service.register_user(&team_name).await?;
                println!("✅ Registered {} as {}", team_name, user_id);
            }
            UserCommands::Balance { user_id } => {
                let balance = self.service.balance(user_id).await?;
                println!("{}", balance);
            }
            UserCommands::Ranking { limit } => {
                let table = self.service.ranking(limit).await.context("Failed to load ranking")?;
                if self.json {
                    return self.print_json(&table);
                }
                println!("{}", "🏆 Ranking".bold());
                println!("{}", "=".repeat(52));
                for (position, entry) in table.iter().enumerate() {
                    println!(
                        "{:>3}. {:<28} {:>10}  {}",
                        position + 1,
                        entry.team_name,
                        colored_points(entry.total_points),
                        entry.credits
                    );
                }
            }
        }
        Ok(())
    }

    async fn stats(&self, cmd: StatCommands) -> Result<()> {
        let desk = self.service.stat_desk();
        match cmd {
            StatCommands::Save { round, player, stats } => {
                let points = desk
                    .save(round, player, stats.into())
                    .await
                    .with_context(|| format!("Failed to save stats for player {}", player))?;
                println!("✅ Saved: {} points", colored_points(points));
            }
            StatCommands::Delete { round, player } => {
                let lineups = desk
                    .delete(round, player)
                    .await
                    .with_context(|| format!("Failed to delete stats for player {}", player))?;
                println!("🗑️  Deleted stats, {} lineups updated", lineups);
            }
            StatCommands::Sheet { round } => {
                let sheet = desk.round_sheet(round).await?;
                if self.json {
                    return self.print_json(&sheet);
                }
                let names: HashMap<Uuid, String> = self
                    .service
                    .players()
                    .await?
                    .into_iter()
                    .map(|p| (p.id, p.name))
                    .collect();
                println!("{}", "Round sheet".bold());
                println!("{}", "=".repeat(40));
                for line in sheet {
                    let name = names.get(&line.player_id).map(String::as_str).unwrap_or("?");
                    println!("{:<28} {:>10}", name, colored_points(line.total_points));
                }
            }
        }
        Ok(())
    }

    async fn lineup(&self, cmd: LineupCommands) -> Result<()> {
        match cmd {
            LineupCommands::Show { user, round } => {
                let round_id = match round {
                    Some(id) => id,
                    None => match self.service.active_round().await? {
                        Some(active) => active.id,
                        None => bail!("No active round; pass --round"),
                    },
                };
                let Some(lineup) = self.service.lineup(user, round_id).await? else {
                    println!("No lineup committed for round {}", round_id);
                    return Ok(());
                };
                if self.json {
                    return self.print_json(&lineup);
                }
                for entry in &lineup.entries {
                    println!("{}  {:>10}", entry.player_id, colored_points(entry.points));
                }
                println!("Spent {}  Total {}", lineup.spent, colored_points(lineup.total_points));
            }
            LineupCommands::Commit { user, players } => {
                let mut session = self.service.open_market(user).await?;
                session.builder_mut().clear();
                for player_id in players {
                    match session.builder_mut().add(player_id) {
                        Ok(_) => {}
                        Err(LineupError::AlreadyInLineup { .. }) => {}
                        Err(err) => return Err(err).context("Draft rejected"),
                    }
                }
                let balance = self.service.commit(&mut session).await.context("Commit failed")?;
                println!(
                    "✅ Lineup committed for {}, balance {}",
                    session.round().name,
                    balance.to_string().green()
                );
            }
            LineupCommands::History { user } => {
                let history = self.service.lineup_history(user).await?;
                if self.json {
                    return self.print_json(&history);
                }
                if history.is_empty() {
                    println!("No lineups committed yet");
                    return Ok(());
                }
                for summary in history {
                    println!(
                        "{:<20} {:<9} {:>10}  spent {}",
                        summary.round_name,
                        summary.round_status.as_str(),
                        colored_points(summary.total_points),
                        summary.spent
                    );
                }
            }
        }
        Ok(())
    }
}
