//! Live game watching
//!
//! Polls the spectator endpoint for each watched player. A game seen for the
//! first time sends `game_start`. Once the game is no longer live its match is
//! loaded like any other, followed by one `objective_taken` event per team and
//! objective. A finished game is usually published to match-v5 with some
//! delay, so a match that is not found yet is looked up again on later polls.

use std::time::Duration;

use serde_json::{json, Value};

use super::{Collector, PipelineError};
use crate::data::{Account, CurrentGame, MatchRecord, RiotApiError, Summoner};

/// Settings of a watch job
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Wait between two polls
    pub interval: Duration,
    /// Polls to run before returning, `None` to watch until stopped
    pub polls: Option<u64>,
    /// Polls on which a finished game's match is looked up before giving up
    pub max_match_attempts: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            polls: None,
            max_match_attempts: 5,
        }
    }
}

/// Outcome of a watch job, as match ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Games seen starting
    pub started: Vec<String>,
    /// Finished games loaded into the warehouse
    pub loaded: Vec<String>,
    /// Finished games that could not be loaded
    pub failed: Vec<String>,
    /// Finished games still unpublished when the job returned
    pub pending: Vec<String>,
}

struct WatchedPlayer {
    riot_id: String,
    account: Account,
    summoner: Summoner,
    /// Match id of the game the player was last seen in
    active: Option<String>,
}

struct FinishedGame {
    match_id: String,
    players: Vec<Account>,
    attempts: u32,
}

impl Collector {
    /// Watches players for live games and loads each game once it ends
    ///
    /// Failing to resolve a player fails the job. A failed poll or a match
    /// that cannot be loaded is logged, reported to `error` webhooks and
    /// skipped.
    ///
    /// # Arguments
    /// * `players` - Riot IDs as `(game_name, tag_line)`
    /// * `config` - Poll interval, poll count and match lookup attempts
    pub async fn watch(
        &self,
        players: &[(String, String)],
        config: &WatchConfig,
    ) -> Result<WatchSummary, PipelineError> {
        let mut watched = Vec::with_capacity(players.len());
        for (game_name, tag_line) in players {
            let account = self.client.account_by_riot_id(game_name, tag_line).await?;
            let summoner = self.client.summoner_by_puuid(&account.puuid).await?;
            watched.push(WatchedPlayer {
                riot_id: format!("{}#{}", game_name, tag_line),
                account,
                summoner,
                active: None,
            });
        }
        tracing::info!(
            players = watched.len(),
            interval_secs = config.interval.as_secs(),
            "Watching for live games"
        );

        let mut summary = WatchSummary::default();
        let mut finished = Vec::new();
        let mut poll = 0u64;
        loop {
            poll += 1;
            for player in &mut watched {
                self.poll_player(player, &mut finished, &mut summary).await;
            }
            self.load_finished(&mut finished, config.max_match_attempts, &mut summary)
                .await;

            if config.polls.is_some_and(|polls| poll >= polls) {
                break;
            }
            tokio::time::sleep(config.interval).await;
        }

        summary.pending = finished.into_iter().map(|game| game.match_id).collect();
        tracing::info!(
            started = summary.started.len(),
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            pending = summary.pending.len(),
            "Watch finished"
        );
        Ok(summary)
    }

    async fn poll_player(
        &self,
        player: &mut WatchedPlayer,
        finished: &mut Vec<FinishedGame>,
        summary: &mut WatchSummary,
    ) {
        let game = match self.client.current_game(&player.account.puuid).await {
            Ok(game) => game,
            Err(e) => {
                tracing::warn!(player = %player.riot_id, "Failed to poll live game: {}", e);
                self.webhooks
                    .notify_error(json!({
                        "player": player.riot_id,
                        "error": e.to_string(),
                    }))
                    .await;
                return;
            }
        };

        let current = game.as_ref().map(|game| self.live_match_id(game));
        if current == player.active {
            return;
        }

        if let Some(match_id) = player.active.take() {
            tracing::info!(player = %player.riot_id, match_id = %match_id, "Game finished");
            queue_finished(finished, match_id, &player.account);
        }

        if let (Some(game), Some(match_id)) = (game, current) {
            tracing::info!(player = %player.riot_id, match_id = %match_id, "Game started");
            self.webhooks
                .notify_game_start(game_start_event(&match_id, &game, player))
                .await;
            if !summary.started.contains(&match_id) {
                summary.started.push(match_id.clone());
            }
            player.active = Some(match_id);
        }
    }

    /// Tries to load every finished game; unpublished ones stay queued
    async fn load_finished(
        &self,
        finished: &mut Vec<FinishedGame>,
        max_attempts: u32,
        summary: &mut WatchSummary,
    ) {
        let mut waiting = Vec::with_capacity(finished.len());
        for mut game in finished.drain(..) {
            game.attempts += 1;
            match self.process_match(&game.match_id, &game.players).await {
                Ok(record) => {
                    self.notify_objectives(&record).await;
                    summary.loaded.push(game.match_id);
                }
                Err(e) if is_not_found(&e) && game.attempts < max_attempts.max(1) => {
                    tracing::debug!(
                        match_id = %game.match_id,
                        attempts = game.attempts,
                        "Match not published yet"
                    );
                    waiting.push(game);
                }
                Err(e) => {
                    tracing::error!(match_id = %game.match_id, "Failed to load finished game: {}", e);
                    self.webhooks
                        .notify_error(json!({
                            "match_id": game.match_id,
                            "error": e.to_string(),
                        }))
                        .await;
                    summary.failed.push(game.match_id);
                }
            }
        }
        *finished = waiting;
    }

    async fn notify_objectives(&self, record: &MatchRecord) {
        for team in &record.teams {
            for (objective, count) in team.objectives.taken() {
                self.webhooks
                    .notify_objective(json!({
                        "match_id": record.match_id,
                        "team_id": team.team_id,
                        "objective": objective,
                        "count": count,
                    }))
                    .await;
            }
        }
    }

    /// Match-v5 id of a live game, `<platform>_<game id>`
    fn live_match_id(&self, game: &CurrentGame) -> String {
        let platform = if game.platform_id.is_empty() {
            self.client.region().code()
        } else {
            game.platform_id.as_str()
        };
        format!("{}_{}", platform, game.game_id)
    }
}

/// Queues a finished game once, collecting every watched player who was in it
fn queue_finished(finished: &mut Vec<FinishedGame>, match_id: String, account: &Account) {
    match finished.iter_mut().find(|game| game.match_id == match_id) {
        Some(game) => {
            if !game.players.iter().any(|p| p.puuid == account.puuid) {
                game.players.push(account.clone());
            }
        }
        None => finished.push(FinishedGame {
            match_id,
            players: vec![account.clone()],
            attempts: 0,
        }),
    }
}

fn is_not_found(error: &PipelineError) -> bool {
    matches!(
        error,
        PipelineError::Api(RiotApiError::Status { status: 404, .. })
    )
}

fn game_start_event(match_id: &str, game: &CurrentGame, player: &WatchedPlayer) -> Value {
    let participant = game
        .participants
        .iter()
        .find(|p| p.puuid == player.account.puuid);
    json!({
        "match_id": match_id,
        "game_id": game.game_id,
        "platform_id": game.platform_id,
        "game_mode": game.game_mode,
        "game_type": game.game_type,
        "game_start_time": game.game_start_time,
        "player": player.riot_id,
        "puuid": player.account.puuid,
        "summoner_level": player.summoner.summoner_level,
        "champion_id": participant.map(|p| p.champion_id),
        "team_id": participant.map(|p| p.team_id),
    })
}
