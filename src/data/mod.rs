//! Core data models for riftload
//!
//! This module contains the validated game records built from Riot match
//! payloads, the warehouse row format, and the API client that fetches them.

pub mod matches;
pub mod riot;

pub use matches::{MatchRecord, ObjectiveCounts, ParticipantRow, TeamRow, TransformError};
pub use riot::{
    Account, CurrentGame, CurrentGameParticipant, Region, RiotApiError, RiotClient, Summoner,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum items a participant can hold (six slots plus a trinket)
const MAX_ITEMS: usize = 7;

/// Maximum summoner spells per participant
const MAX_SPELLS: usize = 2;

/// Maximum participants on one team
const MAX_TEAM_SIZE: usize = 5;

/// Errors raised when a record violates a field constraint
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A numeric field is outside its allowed range
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// A list field has too few or too many elements
    #[error("{field} must have between {min} and {max} entries, got {len}")]
    BadLength {
        field: &'static str,
        min: usize,
        max: usize,
        len: usize,
    },
}

/// Side of the map a team plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamSide {
    Blue,
    Red,
}

impl TeamSide {
    /// Maps a Riot team id (100 = blue, 200 = red)
    pub fn from_team_id(team_id: i64) -> Option<Self> {
        match team_id {
            100 => Some(TeamSide::Blue),
            200 => Some(TeamSide::Red),
            _ => None,
        }
    }
}

/// Game mode reported by the API
///
/// Modes this crate does not know about are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameMode {
    Classic,
    Aram,
    Urf,
    Cherry,
    Tft,
    Other(String),
}

impl From<String> for GameMode {
    fn from(mode: String) -> Self {
        match mode.as_str() {
            "CLASSIC" => GameMode::Classic,
            "ARAM" => GameMode::Aram,
            "URF" => GameMode::Urf,
            "CHERRY" => GameMode::Cherry,
            "TFT" => GameMode::Tft,
            _ => GameMode::Other(mode),
        }
    }
}

impl From<GameMode> for String {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Classic => "CLASSIC".to_string(),
            GameMode::Aram => "ARAM".to_string(),
            GameMode::Urf => "URF".to_string(),
            GameMode::Cherry => "CHERRY".to_string(),
            GameMode::Tft => "TFT".to_string(),
            GameMode::Other(mode) => mode,
        }
    }
}

/// Map objectives a team can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectiveType {
    Tower,
    Inhibitor,
    Herald,
    Dragon,
    Baron,
}

/// End-of-game statistics for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    /// Champion level, 1 to 18
    pub champion_level: u32,
    pub total_damage_dealt: u64,
    pub gold_earned: u64,
    pub creep_score: u32,
    pub vision_score: u32,
}

impl ParticipantStats {
    /// (kills + assists) / deaths, with zero deaths counted as one
    pub fn kda_ratio(&self) -> f64 {
        (u64::from(self.kills) + u64::from(self.assists)) as f64 / f64::from(self.deaths.max(1))
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(1..=18).contains(&self.champion_level) {
            return Err(ModelError::OutOfRange {
                field: "champion_level",
                value: self.champion_level.to_string(),
            });
        }
        Ok(())
    }
}

/// One player in a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantData {
    /// Player-unique id; empty when the payload does not carry one
    #[serde(default)]
    pub puuid: String,
    pub summoner_name: String,
    pub summoner_id: String,
    pub champion_name: String,
    pub team: TeamSide,
    pub role: Option<String>,
    pub stats: ParticipantStats,
    /// Item ids, six slots plus a trinket
    pub items: Vec<u32>,
    pub spells: Vec<u32>,
}

impl ParticipantData {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.stats.validate()?;
        check_len("items", self.items.len(), 0, MAX_ITEMS)?;
        check_len("spells", self.spells.len(), 0, MAX_SPELLS)
    }
}

/// One side of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamData {
    pub side: TeamSide,
    pub participants: Vec<ParticipantData>,
    pub total_kills: u32,
    pub total_gold: u64,
    #[serde(default)]
    pub objectives_taken: Vec<ObjectiveType>,
    pub is_winner: Option<bool>,
}

impl TeamData {
    /// Mean KDA ratio across the team, 0 for an empty team
    pub fn average_kda(&self) -> f64 {
        if self.participants.is_empty() {
            return 0.0;
        }
        let total: f64 = self.participants.iter().map(|p| p.stats.kda_ratio()).sum();
        total / self.participants.len() as f64
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_len("participants", self.participants.len(), 1, MAX_TEAM_SIZE)?;
        self.participants.iter().try_for_each(ParticipantData::validate)
    }
}

/// A complete, validated game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub game_id: String,
    pub platform_id: String,
    pub game_mode: GameMode,
    pub game_type: String,
    pub game_version: String,
    pub game_start_time: DateTime<Utc>,
    /// Duration in seconds
    pub game_duration: u64,
    pub teams: Vec<TeamData>,
}

impl GameData {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_len("teams", self.teams.len(), 2, 2)?;
        self.teams.iter().try_for_each(TeamData::validate)
    }

    /// Returns the team playing on `side`, if present
    pub fn team(&self, side: TeamSide) -> Option<&TeamData> {
        self.teams.iter().find(|t| t.side == side)
    }
}

/// Per-minute and share statistics for one participant in one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformanceMetrics {
    pub game_id: String,
    pub summoner_id: String,
    pub summoner_name: String,
    pub champion_name: String,
    pub team: TeamSide,
    pub stats: ParticipantStats,
    pub gold_per_minute: f64,
    pub damage_per_minute: f64,
    pub cs_per_minute: f64,
    pub vision_score_per_minute: f64,
    /// Share of the team's kills the player took part in, 0 to 1
    pub kill_participation: f64,
    /// Share of the team's damage the player dealt, 0 to 1
    pub damage_share: f64,
}

impl PlayerPerformanceMetrics {
    /// Computes metrics for `participant` within `game`
    pub fn compute(game: &GameData, participant: &ParticipantData) -> Result<Self, ModelError> {
        let stats = &participant.stats;
        let duration = game.game_duration;

        let (team_kills, team_damage) = game
            .team(participant.team)
            .map(|team| {
                let damage = team
                    .participants
                    .iter()
                    .fold(0u64, |sum, p| sum.saturating_add(p.stats.total_damage_dealt));
                (team.total_kills, damage)
            })
            .unwrap_or((0, 0));

        let metrics = Self {
            game_id: game.game_id.clone(),
            summoner_id: participant.summoner_id.clone(),
            summoner_name: participant.summoner_name.clone(),
            champion_name: participant.champion_name.clone(),
            team: participant.team,
            stats: stats.clone(),
            gold_per_minute: per_minute(stats.gold_earned, duration),
            damage_per_minute: per_minute(stats.total_damage_dealt, duration),
            cs_per_minute: per_minute(u64::from(stats.creep_score), duration),
            vision_score_per_minute: per_minute(u64::from(stats.vision_score), duration),
            kill_participation: ratio(
                u64::from(stats.kills) + u64::from(stats.assists),
                u64::from(team_kills),
            ),
            damage_share: ratio(stats.total_damage_dealt, team_damage),
        };
        metrics.validate()?;
        Ok(metrics)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_unit("kill_participation", self.kill_participation)?;
        check_unit("damage_share", self.damage_share)
    }
}

/// Rate of `amount` per minute over `duration_secs`, 0 for a zero-length game
pub fn per_minute(amount: u64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    amount as f64 / duration_secs as f64 * 60.0
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

fn check_len(field: &'static str, len: usize, min: usize, max: usize) -> Result<(), ModelError> {
    if len < min || len > max {
        return Err(ModelError::BadLength {
            field,
            min,
            max,
            len,
        });
    }
    Ok(())
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ModelError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ModelError::OutOfRange {
            field,
            value: format!("{:.3}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(kills: u32, deaths: u32, assists: u32, damage: u64) -> ParticipantStats {
        ParticipantStats {
            kills,
            deaths,
            assists,
            champion_level: 16,
            total_damage_dealt: damage,
            gold_earned: 12_000,
            creep_score: 180,
            vision_score: 30,
        }
    }

    fn participant(name: &str, team: TeamSide, stats: ParticipantStats) -> ParticipantData {
        ParticipantData {
            puuid: format!("puuid-{}", name),
            summoner_name: name.to_string(),
            summoner_id: format!("id-{}", name),
            champion_name: "Ahri".to_string(),
            team,
            role: Some("MIDDLE".to_string()),
            stats,
            items: vec![1001, 3020, 0, 0, 0, 0, 3340],
            spells: vec![4, 14],
        }
    }

    fn team(side: TeamSide, participants: Vec<ParticipantData>) -> TeamData {
        let total_kills = participants.iter().map(|p| p.stats.kills).sum();
        let total_gold = participants.iter().map(|p| p.stats.gold_earned).sum();
        TeamData {
            side,
            participants,
            total_kills,
            total_gold,
            objectives_taken: vec![ObjectiveType::Tower],
            is_winner: Some(side == TeamSide::Blue),
        }
    }

    fn game() -> GameData {
        GameData {
            game_id: "TR1_1".to_string(),
            platform_id: "TR1".to_string(),
            game_mode: GameMode::Classic,
            game_type: "MATCHED_GAME".to_string(),
            game_version: "14.1.1".to_string(),
            game_start_time: Utc::now(),
            game_duration: 1800,
            teams: vec![
                team(
                    TeamSide::Blue,
                    vec![
                        participant("a", TeamSide::Blue, stats(6, 2, 4, 20_000)),
                        participant("b", TeamSide::Blue, stats(4, 3, 8, 10_000)),
                    ],
                ),
                team(
                    TeamSide::Red,
                    vec![participant("c", TeamSide::Red, stats(5, 10, 1, 15_000))],
                ),
            ],
        }
    }

    #[test]
    fn test_kda_ratio_counts_zero_deaths_as_one() {
        assert!((stats(3, 0, 2, 0).kda_ratio() - 5.0).abs() < f64::EPSILON);
        assert!((stats(3, 2, 1, 0).kda_ratio() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kda_ratio_with_extreme_counts_does_not_overflow() {
        let extreme = stats(u32::MAX, 0, u32::MAX, 0);
        let expected = 2.0 * f64::from(u32::MAX);
        assert!((extreme.kda_ratio() - expected).abs() < 1.0);
    }

    #[test]
    fn test_metrics_with_extreme_counts_do_not_overflow() {
        let mut g = game();
        g.teams[0].participants[0].stats = stats(u32::MAX, 1, u32::MAX, u64::MAX);
        g.teams[0].total_kills = u32::MAX;
        let player = g.teams[0].participants[0].clone();

        // Twice the team's kills is out of range, but must be reported, not panic
        assert!(matches!(
            PlayerPerformanceMetrics::compute(&g, &player),
            Err(ModelError::OutOfRange { field: "kill_participation", .. })
        ));
    }

    #[test]
    fn test_average_kda() {
        let g = game();
        let blue = g.team(TeamSide::Blue).unwrap();
        // (10/2 + 12/3) / 2
        assert!((blue.average_kda() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_valid_game_passes() {
        assert_eq!(game().validate(), Ok(()));
    }

    #[test]
    fn test_game_requires_two_teams() {
        let mut g = game();
        g.teams.pop();
        assert_eq!(
            g.validate(),
            Err(ModelError::BadLength {
                field: "teams",
                min: 2,
                max: 2,
                len: 1
            })
        );
    }

    #[test]
    fn test_team_size_limits() {
        let mut g = game();
        g.teams[1].participants.clear();
        assert!(matches!(
            g.validate(),
            Err(ModelError::BadLength { field: "participants", .. })
        ));

        let mut g = game();
        let extra = g.teams[0].participants[0].clone();
        g.teams[0].participants = vec![extra; 6];
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_champion_level_bounds() {
        let mut s = stats(1, 1, 1, 1);
        s.champion_level = 0;
        assert!(s.validate().is_err());
        s.champion_level = 19;
        assert!(s.validate().is_err());
        s.champion_level = 18;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_item_and_spell_limits() {
        let mut p = participant("x", TeamSide::Red, stats(0, 0, 0, 0));
        p.items.push(9999);
        assert!(matches!(p.validate(), Err(ModelError::BadLength { field: "items", .. })));

        let mut p = participant("x", TeamSide::Red, stats(0, 0, 0, 0));
        p.spells.push(7);
        assert!(matches!(p.validate(), Err(ModelError::BadLength { field: "spells", .. })));
    }

    #[test]
    fn test_game_mode_serialization() {
        assert_eq!(serde_json::to_string(&GameMode::Aram).unwrap(), "\"ARAM\"");
        let mode: GameMode = serde_json::from_str("\"NEXUSBLITZ\"").unwrap();
        assert_eq!(mode, GameMode::Other("NEXUSBLITZ".to_string()));
        let mode: GameMode = serde_json::from_str("\"CLASSIC\"").unwrap();
        assert_eq!(mode, GameMode::Classic);
    }

    #[test]
    fn test_team_side_from_team_id() {
        assert_eq!(TeamSide::from_team_id(100), Some(TeamSide::Blue));
        assert_eq!(TeamSide::from_team_id(200), Some(TeamSide::Red));
        assert_eq!(TeamSide::from_team_id(300), None);
    }

    #[test]
    fn test_per_minute_handles_zero_duration() {
        assert_eq!(per_minute(1000, 0), 0.0);
        assert!((per_minute(12_000, 1800) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_player_performance_metrics() {
        let g = game();
        let player = &g.teams[0].participants[0];

        let metrics = PlayerPerformanceMetrics::compute(&g, player).unwrap();

        assert!((metrics.gold_per_minute - 400.0).abs() < 1e-9);
        assert!((metrics.cs_per_minute - 6.0).abs() < 1e-9);
        assert!((metrics.vision_score_per_minute - 1.0).abs() < 1e-9);
        // 6 kills + 4 assists out of 10 team kills
        assert!((metrics.kill_participation - 1.0).abs() < 1e-9);
        // 20k of 30k team damage
        assert!((metrics.damage_share - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_kill_participation_above_one_is_rejected() {
        let mut g = game();
        g.teams[1].total_kills = 2;
        let player = g.teams[1].participants[0].clone();
        // 5 kills + 1 assist against a team total of 2
        assert!(matches!(
            PlayerPerformanceMetrics::compute(&g, &player),
            Err(ModelError::OutOfRange { field: "kill_participation", .. })
        ));
    }
}
