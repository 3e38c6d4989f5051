//! Match collection pipeline
//!
//! Fetches matches through the governed `RiotClient`, transforms them into
//! warehouse rows, loads them and notifies webhooks. Matches come from a
//! player's history (`collect_player`), a single id (`load_match`) or from
//! games seen ending while watching players (`watch`).

mod watch;

pub use watch::{WatchConfig, WatchSummary};

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::data::{
    Account, GameData, MatchRecord, PlayerPerformanceMetrics, RiotApiError, RiotClient,
    TransformError,
};
use crate::warehouse::{Warehouse, WarehouseError, MATCHES_TABLE};
use crate::webhook::WebhookManager;

/// Errors that stop processing of a player or a match
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Api(#[from] RiotApiError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Failed to serialize row: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of collecting one player's matches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub puuid: String,
    /// Matches loaded into the warehouse, in API order
    pub loaded: Vec<String>,
    /// Matches that failed to fetch, transform or load
    pub failed: Vec<String>,
}

/// Runs collection jobs against one client, warehouse and set of webhooks
pub struct Collector {
    client: RiotClient,
    warehouse: Arc<dyn Warehouse>,
    webhooks: WebhookManager,
}

impl Collector {
    pub fn new(client: RiotClient, warehouse: Arc<dyn Warehouse>, webhooks: WebhookManager) -> Self {
        Self {
            client,
            warehouse,
            webhooks,
        }
    }

    /// Collects the most recent matches of a player
    ///
    /// A match that fails is logged, reported to `error` webhooks and skipped.
    /// Failing to resolve the player or list their matches fails the job.
    ///
    /// # Arguments
    /// * `game_name`, `tag_line` - The player's Riot ID
    /// * `count` - Number of recent matches to collect
    /// * `queue` - Optional queue id filter
    pub async fn collect_player(
        &self,
        game_name: &str,
        tag_line: &str,
        count: u32,
        queue: Option<u32>,
    ) -> Result<CollectSummary, PipelineError> {
        let account = self.client.account_by_riot_id(game_name, tag_line).await?;
        let match_ids = self.client.match_ids(&account.puuid, count, queue).await?;
        tracing::info!(
            player = %format!("{}#{}", game_name, tag_line),
            matches = match_ids.len(),
            "Collecting matches"
        );

        let mut summary = CollectSummary {
            puuid: account.puuid.clone(),
            ..CollectSummary::default()
        };

        for match_id in match_ids {
            match self.process_match(&match_id, std::slice::from_ref(&account)).await {
                Ok(_) => summary.loaded.push(match_id),
                Err(e) => {
                    tracing::error!(match_id = %match_id, "Failed to process match: {}", e);
                    self.webhooks
                        .notify_error(json!({
                            "match_id": match_id,
                            "error": e.to_string(),
                        }))
                        .await;
                    summary.failed.push(match_id);
                }
            }
        }

        tracing::info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "Collection finished"
        );
        Ok(summary)
    }

    /// Fetches, transforms and loads a single match
    pub async fn load_match(&self, match_id: &str) -> Result<MatchRecord, PipelineError> {
        self.process_match(match_id, &[]).await
    }

    /// Loads a match and sends its events, with performance events for `players`
    async fn process_match(
        &self,
        match_id: &str,
        players: &[Account],
    ) -> Result<MatchRecord, PipelineError> {
        let payload = self.client.match_details(match_id).await?;
        let record = match MatchRecord::from_api(&payload) {
            Ok(record) => record,
            Err(e) => {
                // A payload that is not a match must not be served again
                self.client.forget_match(match_id);
                return Err(e.into());
            }
        };
        self.warehouse
            .insert_rows(MATCHES_TABLE, &[record.to_row()?])
            .await?;

        self.webhooks.notify_game_end(game_end_event(&record)).await;

        for account in players {
            self.notify_performance(&payload, account).await;
        }
        Ok(record)
    }

    /// Sends the player's metrics for a match; a game that fails validation is
    /// still loaded, it just gets no metrics
    async fn notify_performance(&self, payload: &Value, account: &Account) {
        let game = match GameData::from_api(payload) {
            Ok(game) => game,
            Err(e) => {
                tracing::debug!("No performance metrics: {}", e);
                return;
            }
        };

        let participant = game
            .teams
            .iter()
            .flat_map(|team| &team.participants)
            .find(|p| p.puuid == account.puuid);
        let Some(participant) = participant else {
            return;
        };

        match PlayerPerformanceMetrics::compute(&game, participant) {
            Ok(metrics) => match serde_json::to_value(&metrics) {
                Ok(data) => {
                    self.webhooks.notify_player_performance(data).await;
                }
                Err(e) => tracing::warn!("Failed to serialize metrics: {}", e),
            },
            Err(e) => tracing::debug!("No performance metrics: {}", e),
        }
    }
}

fn game_end_event(record: &MatchRecord) -> Value {
    let winner = record
        .teams
        .iter()
        .find(|team| team.win)
        .map(|team| team.team_id);
    json!({
        "match_id": record.match_id,
        "game_mode": record.game_mode,
        "game_duration": record.game_duration,
        "queue_id": record.queue_id,
        "winning_team_id": winner,
    })
}
