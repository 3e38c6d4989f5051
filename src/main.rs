//! riftload - collect League of Legends match data into a warehouse
//!
//! Resolves players, fetches their recent or live matches from the Riot Games
//! API under a shared request budget, and loads the transformed matches as
//! newline-delimited JSON tables that can then be queried.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use riftload::cli::{CacheCommand, Cli, Command};
use riftload::config::Config;
use riftload::data::RiotClient;
use riftload::pipeline::{Collector, WatchConfig};
use riftload::query::MatchQuery;
use riftload::warehouse::NdjsonWarehouse;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs to stderr so stdout carries only command output
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_cli(&cli)?;

    match cli.command {
        Command::Collect {
            riot_id,
            count,
            queue,
        } => {
            let collector = build_collector(&config).await?;
            let summary = collector
                .collect_player(&riot_id.game_name, &riot_id.tag_line, count, queue)
                .await?;
            println!(
                "Loaded {} matches for {} ({} failed)",
                summary.loaded.len(),
                riot_id,
                summary.failed.len()
            );
        }
        Command::Match { match_id } => {
            let collector = build_collector(&config).await?;
            let record = collector.load_match(&match_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Watch {
            riot_ids,
            interval_secs,
            polls,
            max_match_attempts,
        } => {
            let collector = build_collector(&config).await?;
            let players: Vec<(String, String)> = riot_ids
                .into_iter()
                .map(|id| (id.game_name, id.tag_line))
                .collect();
            let watch = WatchConfig {
                interval: Duration::from_secs(interval_secs),
                polls,
                max_match_attempts,
            };
            let summary = collector.watch(&players, &watch).await?;
            println!(
                "Saw {} games start, loaded {} ({} failed, {} still unpublished)",
                summary.started.len(),
                summary.loaded.len(),
                summary.failed.len(),
                summary.pending.len()
            );
        }
        Command::Stats { player, limit } => {
            let warehouse = NdjsonWarehouse::open(config.output_dir.clone()).await?;
            print_stats(&MatchQuery::load(&warehouse).await?, &player, limit);
        }
        Command::Cache { action } => {
            let cache = config.cache();
            match action {
                CacheCommand::Cleanup => {
                    let removed = cache.cleanup_expired();
                    println!("Removed {} expired cache entries", removed);
                }
                CacheCommand::Clear { key: Some(key) } => {
                    cache.clear(Some(&key));
                    println!("Cleared cache entry '{}'", key);
                }
                CacheCommand::Clear { key: None } => {
                    cache.clear(None);
                    println!("Cleared cache at {}", cache.cache_dir().display());
                }
            }
        }
    }

    Ok(())
}

fn print_stats(query: &MatchQuery, player: &str, limit: usize) {
    let Some(stats) = query.player_stats(player) else {
        println!("No loaded matches for {}", player);
        return;
    };

    println!(
        "{}: {} games, {} wins ({:.1}%), KDA {:.2} ({:.1}/{:.1}/{:.1}), {:.0} gold/min, {:.2} vision/min",
        player,
        stats.games,
        stats.wins,
        stats.win_rate * 100.0,
        stats.kda,
        stats.avg_kills,
        stats.avg_deaths,
        stats.avg_assists,
        stats.gold_per_minute,
        stats.vision_per_minute
    );

    println!("\nChampions:");
    for champion in query.champion_performance(player) {
        println!(
            "  {:<16} {:>3} games  {:>5.1}% wins  KDA {:.2}",
            champion.champion_name,
            champion.games,
            champion.win_rate * 100.0,
            champion.kda
        );
    }

    println!("\nRecent matches:");
    for game in query.match_history(player, limit) {
        println!(
            "  {:<18} {:<16} {}/{}/{}  {}",
            game.match_id,
            game.champion_name,
            game.kills,
            game.deaths,
            game.assists,
            if game.win { "Win" } else { "Loss" }
        );
    }
}

/// Wires the governed client, warehouse and webhooks for API commands
async fn build_collector(config: &Config) -> Result<Collector, Box<dyn Error>> {
    let api_key = config.require_api_key()?;

    let client = RiotClient::new(
        api_key,
        config.region,
        Arc::new(config.cache()),
        Arc::new(config.rate_limiter()),
        config.retry_policy(),
    );
    let warehouse = NdjsonWarehouse::open(config.output_dir.clone()).await?;

    Ok(Collector::new(
        client,
        Arc::new(warehouse),
        config.webhook_manager(),
    ))
}
