//! Command-line interface parsing for riftload
//!
//! Global options configure the API client, cache and warehouse; each
//! subcommand runs one job. Options with an environment fallback can also be
//! set from a `.env` file, which is loaded before parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::DEFAULT_TTL;
use crate::request::{DEFAULT_MAX_RETRIES, DEFAULT_REQUESTS_PER_SECOND};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The Riot ID is not of the form `game_name#tag_line`
    #[error("Invalid Riot ID: '{0}'. Expected GAME_NAME#TAG, e.g. Faker#KR1")]
    InvalidRiotId(String),
}

/// riftload - collect League of Legends match data into a warehouse
#[derive(Parser, Debug)]
#[command(name = "riftload")]
#[command(about = "Collect League of Legends match data into a warehouse")]
#[command(version)]
pub struct Cli {
    /// Riot Games API key
    #[arg(long, env = "RIOT_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Platform region (TR1, KR1, EUW1, EUN1, NA1)
    #[arg(long, env = "REGION", default_value = "TR1", global = true)]
    pub region: String,

    /// Directory for cached API responses
    #[arg(long, env = "RIFTLOAD_CACHE_DIR", value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a cached response stays fresh
    #[arg(long, default_value_t = DEFAULT_TTL.as_secs(), global = true)]
    pub cache_ttl_secs: u64,

    /// Maximum API requests per one-second window
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND, global = true)]
    pub requests_per_second: u32,

    /// Total attempts per API request
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, global = true)]
    pub max_retries: u32,

    /// Wait before the first retry, in milliseconds (doubles each retry)
    #[arg(long, default_value_t = 1000, global = true)]
    pub initial_wait_ms: u64,

    /// Directory holding the warehouse tables
    #[arg(
        long,
        env = "RIFTLOAD_OUTPUT_DIR",
        default_value = "data",
        value_name = "DIR",
        global = true
    )]
    pub output_dir: PathBuf,

    /// Webhook to notify of collection events (repeatable)
    #[arg(long = "webhook", value_name = "URL", global = true)]
    pub webhooks: Vec<String>,

    /// Shared secret sent to every webhook
    #[arg(
        long,
        env = "RIFTLOAD_WEBHOOK_SECRET",
        hide_env_values = true,
        global = true
    )]
    pub webhook_secret: Option<String>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Collect a player's recent matches
    ///
    /// Examples:
    ///   riftload collect Faker#KR1
    ///   riftload collect "Hide on bush#KR1" --count 50 --queue 420
    Collect {
        /// Player as GAME_NAME#TAG
        #[arg(value_parser = parse_riot_id)]
        riot_id: RiotId,

        /// Number of recent matches to collect
        #[arg(long, default_value_t = 20)]
        count: u32,

        /// Only collect matches from this queue (e.g., 420 for ranked solo)
        #[arg(long)]
        queue: Option<u32>,
    },

    /// Fetch a single match, print it and load it
    Match {
        /// Match id, e.g. TR1_1587340154
        match_id: String,
    },

    /// Watch players for live games and load each game when it ends
    ///
    /// Examples:
    ///   riftload watch Faker#KR1
    ///   riftload watch Faker#KR1 "Hide on bush#KR1" --interval-secs 30 --polls 120
    Watch {
        /// Players as GAME_NAME#TAG
        #[arg(value_parser = parse_riot_id, required = true)]
        riot_ids: Vec<RiotId>,

        /// Seconds between two polls
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,

        /// Stop after this many polls (default: run until interrupted)
        #[arg(long)]
        polls: Option<u64>,

        /// Polls on which a finished game's match is looked up before giving up
        #[arg(long, default_value_t = 5)]
        max_match_attempts: u32,
    },

    /// Show a player's loaded matches and aggregate statistics
    ///
    /// Reads the warehouse only; no API key is needed.
    Stats {
        /// PUUID or summoner name
        player: String,

        /// Number of recent matches to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Delete expired cache entries
    Cleanup,

    /// Delete one cache entry, or every entry when no key is given
    Clear {
        key: Option<String>,
    },
}

/// A player identifier of the form `game_name#tag_line`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiotId {
    pub game_name: String,
    pub tag_line: String,
}

impl std::fmt::Display for RiotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag_line)
    }
}

/// Parses a Riot ID argument.
///
/// Game names may contain spaces; the tag is whatever follows the last `#`.
///
/// # Returns
/// * `Ok(RiotId)` if both parts are non-empty
/// * `Err(CliError::InvalidRiotId)` otherwise
pub fn parse_riot_id(s: &str) -> Result<RiotId, CliError> {
    let invalid = || CliError::InvalidRiotId(s.to_string());
    let (game_name, tag_line) = s.rsplit_once('#').ok_or_else(invalid)?;
    let (game_name, tag_line) = (game_name.trim(), tag_line.trim());
    if game_name.is_empty() || tag_line.is_empty() {
        return Err(invalid());
    }
    Ok(RiotId {
        game_name: game_name.to_string(),
        tag_line: tag_line.to_string(),
    })
}
