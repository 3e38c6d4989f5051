//! Transform match-v5 payloads into warehouse rows and validated game records
//!
//! The API payload is parsed into explicit structs first, so a missing required
//! field fails with a clear error instead of surfacing later as a bad row.
//! Optional keys fall back to defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{
    GameData, GameMode, ModelError, ObjectiveType, ParticipantData, ParticipantStats, TeamData,
    TeamSide,
};

/// Errors that can occur when transforming a match payload
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required field is missing or has the wrong type
    #[error("Invalid match payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A team id other than 100 (blue) or 200 (red)
    #[error("Unknown team id: {0}")]
    UnknownTeam(i64),

    /// A timestamp that cannot be represented
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// The transformed record violates a model constraint
    #[error("Invalid game record: {0}")]
    Invalid(#[from] ModelError),
}

/// Row loaded into the `matches` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    /// Creation time in milliseconds since the epoch
    pub game_creation: i64,
    /// Duration in seconds
    pub game_duration: u64,
    pub game_mode: String,
    pub game_type: String,
    pub game_version: String,
    pub map_id: i64,
    pub queue_id: i64,
    pub platform_id: String,
    pub season_id: i64,
    pub teams: Vec<TeamRow>,
    pub participants: Vec<ParticipantRow>,
}

/// Team entry of a `MatchRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRow {
    pub team_id: i64,
    pub win: bool,
    pub objectives: ObjectiveCounts,
}

/// Objective kill counts for one team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveCounts {
    pub baron: u32,
    pub champion: u32,
    pub dragon: u32,
    pub inhibitor: u32,
    pub rift_herald: u32,
    pub tower: u32,
}

impl ObjectiveCounts {
    /// Map objectives taken at least once, with how often
    pub fn taken(&self) -> Vec<(ObjectiveType, u32)> {
        [
            (ObjectiveType::Tower, self.tower),
            (ObjectiveType::Inhibitor, self.inhibitor),
            (ObjectiveType::Herald, self.rift_herald),
            (ObjectiveType::Dragon, self.dragon),
            (ObjectiveType::Baron, self.baron),
        ]
        .into_iter()
        .filter(|(_, kills)| *kills > 0)
        .collect()
    }
}

/// Participant entry of a `MatchRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub participant_id: i64,
    #[serde(default)]
    pub puuid: String,
    #[serde(default)]
    pub summoner_name: String,
    pub team_id: i64,
    pub champion_id: i64,
    pub champion_name: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub gold_earned: u64,
    pub total_damage_dealt: u64,
    pub total_damage_taken: u64,
    pub vision_score: u32,
    pub win: bool,
}

impl MatchRecord {
    /// Builds a warehouse row from a raw match-v5 payload
    pub fn from_api(payload: &Value) -> Result<Self, TransformError> {
        let dto = MatchDto::deserialize(payload)?;
        let info = dto.info;
        let match_id = dto.metadata.match_id;

        let teams = info
            .teams
            .iter()
            .map(|team| TeamRow {
                team_id: team.team_id,
                win: team.win,
                objectives: team.objectives.counts(),
            })
            .collect();

        let participants = info
            .participants
            .iter()
            .map(|p| ParticipantRow {
                participant_id: p.participant_id,
                puuid: p.puuid.clone().unwrap_or_default(),
                summoner_name: p.display_name(),
                team_id: p.team_id,
                champion_id: p.champion_id,
                champion_name: p.champion_name.clone(),
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                gold_earned: p.gold_earned,
                total_damage_dealt: p.total_damage_dealt_to_champions,
                total_damage_taken: p.total_damage_taken,
                vision_score: p.vision_score,
                win: p.win,
            })
            .collect();

        Ok(Self {
            platform_id: platform_of(&match_id),
            match_id,
            game_creation: info.game_creation,
            game_duration: info.game_duration,
            game_mode: info.game_mode,
            game_type: info.game_type,
            game_version: info.game_version,
            map_id: info.map_id,
            queue_id: info.queue_id,
            season_id: info.season_id,
            teams,
            participants,
        })
    }

    /// Serializes the record as a warehouse row
    pub fn to_row(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl GameData {
    /// Builds and validates a game record from a raw match-v5 payload
    pub fn from_api(payload: &Value) -> Result<Self, TransformError> {
        let dto = MatchDto::deserialize(payload)?;
        let info = dto.info;

        let start_millis = info.game_start_timestamp.unwrap_or(info.game_creation);
        let game_start_time = DateTime::<Utc>::from_timestamp_millis(start_millis)
            .ok_or(TransformError::InvalidTimestamp(start_millis))?;

        let mut teams = Vec::with_capacity(info.teams.len());
        for team in &info.teams {
            let side = TeamSide::from_team_id(team.team_id)
                .ok_or(TransformError::UnknownTeam(team.team_id))?;

            let participants: Vec<ParticipantData> = info
                .participants
                .iter()
                .filter(|p| p.team_id == team.team_id)
                .map(|p| p.to_participant(side))
                .collect();

            teams.push(TeamData {
                side,
                total_kills: participants
                    .iter()
                    .fold(0u32, |sum, p| sum.saturating_add(p.stats.kills)),
                total_gold: participants
                    .iter()
                    .fold(0u64, |sum, p| sum.saturating_add(p.stats.gold_earned)),
                objectives_taken: team.objectives.taken(),
                is_winner: Some(team.win),
                participants,
            });
        }

        let game = GameData {
            platform_id: info
                .platform_id
                .unwrap_or_else(|| platform_of(&dto.metadata.match_id)),
            game_id: dto.metadata.match_id,
            game_mode: GameMode::from(info.game_mode),
            game_type: info.game_type,
            game_version: info.game_version,
            game_start_time,
            game_duration: info.game_duration,
            teams,
        };
        game.validate()?;
        Ok(game)
    }
}

/// Platform prefix of a match id (`TR1_123` -> `TR1`)
fn platform_of(match_id: &str) -> String {
    match_id.split('_').next().unwrap_or_default().to_string()
}

#[derive(Debug, Deserialize)]
struct MatchDto {
    metadata: MetadataDto,
    info: InfoDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataDto {
    match_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoDto {
    game_creation: i64,
    game_duration: u64,
    #[serde(default)]
    game_start_timestamp: Option<i64>,
    game_mode: String,
    game_type: String,
    game_version: String,
    map_id: i64,
    queue_id: i64,
    #[serde(default)]
    platform_id: Option<String>,
    #[serde(default)]
    season_id: i64,
    teams: Vec<TeamDto>,
    participants: Vec<ParticipantDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamDto {
    team_id: i64,
    win: bool,
    #[serde(default)]
    objectives: ObjectivesDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ObjectivesDto {
    baron: ObjectiveDto,
    champion: ObjectiveDto,
    dragon: ObjectiveDto,
    inhibitor: ObjectiveDto,
    rift_herald: ObjectiveDto,
    tower: ObjectiveDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ObjectiveDto {
    kills: u32,
}

impl ObjectivesDto {
    fn counts(&self) -> ObjectiveCounts {
        ObjectiveCounts {
            baron: self.baron.kills,
            champion: self.champion.kills,
            dragon: self.dragon.kills,
            inhibitor: self.inhibitor.kills,
            rift_herald: self.rift_herald.kills,
            tower: self.tower.kills,
        }
    }

    fn taken(&self) -> Vec<ObjectiveType> {
        self.counts()
            .taken()
            .into_iter()
            .map(|(objective, _)| objective)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantDto {
    participant_id: i64,
    team_id: i64,
    champion_id: i64,
    champion_name: String,
    kills: u32,
    deaths: u32,
    assists: u32,
    gold_earned: u64,
    total_damage_dealt_to_champions: u64,
    total_damage_taken: u64,
    vision_score: u32,
    win: bool,
    #[serde(default)]
    puuid: Option<String>,
    #[serde(default)]
    summoner_name: Option<String>,
    #[serde(default)]
    riot_id_game_name: Option<String>,
    #[serde(default)]
    summoner_id: Option<String>,
    #[serde(default)]
    team_position: Option<String>,
    #[serde(default = "default_champ_level")]
    champ_level: u32,
    #[serde(default)]
    total_minions_killed: u32,
    #[serde(default)]
    neutral_minions_killed: u32,
    #[serde(default)]
    item0: u32,
    #[serde(default)]
    item1: u32,
    #[serde(default)]
    item2: u32,
    #[serde(default)]
    item3: u32,
    #[serde(default)]
    item4: u32,
    #[serde(default)]
    item5: u32,
    #[serde(default)]
    item6: u32,
    #[serde(default)]
    summoner1_id: Option<u32>,
    #[serde(default)]
    summoner2_id: Option<u32>,
}

fn default_champ_level() -> u32 {
    1
}

impl ParticipantDto {
    /// Summoner name, falling back to the Riot ID game name
    fn display_name(&self) -> String {
        self.summoner_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| self.riot_id_game_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn to_participant(&self, team: TeamSide) -> ParticipantData {
        ParticipantData {
            puuid: self.puuid.clone().unwrap_or_default(),
            summoner_name: self.display_name(),
            summoner_id: self.summoner_id.clone().unwrap_or_default(),
            champion_name: self.champion_name.clone(),
            team,
            role: self.team_position.clone().filter(|role| !role.is_empty()),
            stats: ParticipantStats {
                kills: self.kills,
                deaths: self.deaths,
                assists: self.assists,
                champion_level: self.champ_level,
                total_damage_dealt: self.total_damage_dealt_to_champions,
                gold_earned: self.gold_earned,
                creep_score: self
                    .total_minions_killed
                    .saturating_add(self.neutral_minions_killed),
                vision_score: self.vision_score,
            },
            items: vec![
                self.item0, self.item1, self.item2, self.item3, self.item4, self.item5, self.item6,
            ],
            spells: [self.summoner1_id, self.summoner2_id]
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}
