//! Queries over the loaded `matches` table
//!
//! A player is identified by PUUID or, case-insensitively, by summoner name.
//! Rows are read once into a `MatchQuery`; if a match was loaded more than
//! once, its last row wins.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::data::{per_minute, MatchRecord, ParticipantRow};
use crate::warehouse::{Warehouse, WarehouseError, MATCHES_TABLE};

/// Errors that can occur when loading the table for queries
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// A row does not have the shape of a match record
    #[error("Invalid match row: {0}")]
    InvalidRow(#[from] serde_json::Error),
}

/// One match from a player's point of view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMatch {
    pub match_id: String,
    /// Creation time in milliseconds since the epoch
    pub game_creation: i64,
    /// Duration in seconds
    pub game_duration: u64,
    pub game_mode: String,
    pub queue_id: i64,
    pub champion_name: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub win: bool,
}

/// Aggregate statistics over every loaded match of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub games: u64,
    pub wins: u64,
    /// Share of games won (0.0 to 1.0)
    pub win_rate: f64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    /// (kills + assists) / max(deaths, 1), over all games
    pub kda: f64,
    pub gold_per_minute: f64,
    pub vision_per_minute: f64,
}

/// A player's results on one champion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChampionPerformance {
    pub champion_name: String,
    pub games: u64,
    pub wins: u64,
    pub win_rate: f64,
    pub kda: f64,
}

/// Read-only view of the matches table
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    matches: Vec<MatchRecord>,
}

impl MatchQuery {
    /// Reads the matches table of `warehouse`
    pub async fn load(warehouse: &dyn Warehouse) -> Result<Self, QueryError> {
        let rows = warehouse.read_rows(MATCHES_TABLE).await?;
        let records = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<MatchRecord>, _>>()?;
        Ok(Self::from_records(records))
    }

    /// Builds a view over `records`, keeping the last record of each match id
    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        let mut position: HashMap<String, usize> = HashMap::new();
        let mut matches: Vec<MatchRecord> = Vec::with_capacity(records.len());
        for record in records {
            match position.get(&record.match_id) {
                Some(&index) => matches[index] = record,
                None => {
                    position.insert(record.match_id.clone(), matches.len());
                    matches.push(record);
                }
            }
        }
        Self { matches }
    }

    /// Number of distinct matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The player's most recent matches, newest first
    pub fn match_history(&self, player: &str, limit: usize) -> Vec<PlayerMatch> {
        let mut history: Vec<PlayerMatch> = self
            .appearances(player)
            .map(|(record, p)| PlayerMatch {
                match_id: record.match_id.clone(),
                game_creation: record.game_creation,
                game_duration: record.game_duration,
                game_mode: record.game_mode.clone(),
                queue_id: record.queue_id,
                champion_name: p.champion_name.clone(),
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                win: p.win,
            })
            .collect();
        history.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
        history.truncate(limit);
        history
    }

    /// Aggregates over every match of the player, `None` if they have none
    pub fn player_stats(&self, player: &str) -> Option<PlayerStats> {
        let mut totals = Totals::default();
        let mut gold = 0u64;
        let mut vision = 0u64;
        let mut duration = 0u64;
        for (record, p) in self.appearances(player) {
            totals.add(p);
            gold = gold.saturating_add(p.gold_earned);
            vision = vision.saturating_add(u64::from(p.vision_score));
            duration = duration.saturating_add(record.game_duration);
        }

        if totals.games == 0 {
            return None;
        }
        let games = totals.games as f64;
        Some(PlayerStats {
            games: totals.games,
            wins: totals.wins,
            win_rate: totals.win_rate(),
            avg_kills: totals.kills as f64 / games,
            avg_deaths: totals.deaths as f64 / games,
            avg_assists: totals.assists as f64 / games,
            kda: totals.kda(),
            gold_per_minute: per_minute(gold, duration),
            vision_per_minute: per_minute(vision, duration),
        })
    }

    /// Per-champion results of the player, most played first
    ///
    /// Ties are ordered by champion name.
    pub fn champion_performance(&self, player: &str) -> Vec<ChampionPerformance> {
        let mut by_champion: HashMap<&str, Totals> = HashMap::new();
        for (_, p) in self.appearances(player) {
            by_champion
                .entry(p.champion_name.as_str())
                .or_default()
                .add(p);
        }

        let mut performance: Vec<ChampionPerformance> = by_champion
            .into_iter()
            .map(|(champion_name, totals)| ChampionPerformance {
                champion_name: champion_name.to_string(),
                games: totals.games,
                wins: totals.wins,
                win_rate: totals.win_rate(),
                kda: totals.kda(),
            })
            .collect();
        performance.sort_by(|a, b| {
            b.games
                .cmp(&a.games)
                .then_with(|| a.champion_name.cmp(&b.champion_name))
        });
        performance
    }

    fn appearances<'a>(
        &'a self,
        player: &'a str,
    ) -> impl Iterator<Item = (&'a MatchRecord, &'a ParticipantRow)> + 'a {
        self.matches.iter().filter_map(move |record| {
            record
                .participants
                .iter()
                .find(|p| is_player(p, player))
                .map(|p| (record, p))
        })
    }
}

fn is_player(participant: &ParticipantRow, player: &str) -> bool {
    participant.puuid == player || participant.summoner_name.eq_ignore_ascii_case(player)
}

#[derive(Debug, Default)]
struct Totals {
    games: u64,
    wins: u64,
    kills: u64,
    deaths: u64,
    assists: u64,
}

impl Totals {
    fn add(&mut self, p: &ParticipantRow) {
        self.games += 1;
        self.wins += u64::from(p.win);
        self.kills += u64::from(p.kills);
        self.deaths += u64::from(p.deaths);
        self.assists += u64::from(p.assists);
    }

    fn win_rate(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games as f64
    }

    fn kda(&self) -> f64 {
        (self.kills + self.assists) as f64 / self.deaths.max(1) as f64
    }
}
