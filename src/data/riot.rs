//! Riot Games API client
//!
//! Fetches accounts, summoners, matches and live games. Every request goes
//! through the shared `RateLimiter` and `RetryPolicy`, and each attempt first
//! acquires a slot from the limiter. Everything except live game state is also
//! memoized in the `ResponseCache`, so a cache hit skips the network entirely.

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cache::ResponseCache;
use crate::request::{RateLimiter, RetryPolicy};

/// Header carrying the API key
const TOKEN_HEADER: &str = "X-Riot-Token";

/// Errors that can occur when talking to the Riot API
#[derive(Debug, Error)]
pub enum RiotApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Riot API returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Failed to parse the response body
    #[error("Failed to parse API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Platform a summoner plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Tr1,
    Kr1,
    Euw1,
    Eun1,
    Na1,
}

impl Region {
    /// Parses a region code such as `TR1` or `euw1`
    ///
    /// # Returns
    /// * `Some(Region)` if the code is known
    /// * `None` otherwise
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "TR1" => Some(Region::Tr1),
            "KR1" | "KR" => Some(Region::Kr1),
            "EUW1" => Some(Region::Euw1),
            "EUN1" => Some(Region::Eun1),
            "NA1" => Some(Region::Na1),
            _ => None,
        }
    }

    /// Upper-case region code
    pub fn code(&self) -> &'static str {
        match self {
            Region::Tr1 => "TR1",
            Region::Kr1 => "KR1",
            Region::Euw1 => "EUW1",
            Region::Eun1 => "EUN1",
            Region::Na1 => "NA1",
        }
    }

    /// Host prefix for platform-scoped endpoints (summoner)
    pub fn platform_host(&self) -> &'static str {
        match self {
            Region::Tr1 => "tr1",
            Region::Kr1 => "kr",
            Region::Euw1 => "euw1",
            Region::Eun1 => "eun1",
            Region::Na1 => "na1",
        }
    }

    /// Host prefix for regionally routed endpoints (account, match)
    pub fn routing_host(&self) -> &'static str {
        match self {
            Region::Tr1 | Region::Euw1 | Region::Eun1 => "europe",
            Region::Kr1 => "asia",
            Region::Na1 => "americas",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Riot account resolved from a Riot ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub puuid: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

/// League of Legends summoner profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summoner {
    pub puuid: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub profile_icon_id: i64,
    #[serde(default)]
    pub summoner_level: i64,
    #[serde(default)]
    pub revision_date: i64,
}

/// A game in progress, as reported by the spectator endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGame {
    pub game_id: i64,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub game_type: String,
    /// Start time in milliseconds since the epoch, 0 while in loading screen
    #[serde(default)]
    pub game_start_time: i64,
    /// Seconds elapsed since the game started
    #[serde(default)]
    pub game_length: i64,
    #[serde(default)]
    pub participants: Vec<CurrentGameParticipant>,
}

/// A player in a game in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameParticipant {
    #[serde(default)]
    pub puuid: String,
    #[serde(default)]
    pub team_id: i64,
    #[serde(default)]
    pub champion_id: i64,
    #[serde(default)]
    pub riot_id: Option<String>,
}

/// Which host family an endpoint lives on
#[derive(Debug, Clone, Copy)]
enum Host {
    Platform,
    Routing,
}

/// Client for the Riot Games REST API
#[derive(Debug, Clone)]
pub struct RiotClient {
    http_client: Client,
    api_key: String,
    region: Region,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    /// Replaces both API hosts when set (allows override for testing)
    base_url: Option<String>,
}

impl RiotClient {
    /// Creates a client that shares the given cache and rate limiter
    pub fn new(
        api_key: impl Into<String>,
        region: Region,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            region,
            cache,
            limiter,
            retry,
            base_url: None,
        }
    }

    /// Sends every request to `base_url` instead of the Riot hosts
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Resolves a Riot ID (`game_name#tag_line`) to an account
    pub async fn account_by_riot_id(
        &self,
        game_name: &str,
        tag_line: &str,
    ) -> Result<Account, RiotApiError> {
        let url = self.url(
            Host::Routing,
            &["riot", "account", "v1", "accounts", "by-riot-id", game_name, tag_line],
        )?;
        let key = format!("account_{}_{}", game_name, tag_line);
        self.fetch_typed(&key, url).await
    }

    /// Fetches the summoner profile of a player
    pub async fn summoner_by_puuid(&self, puuid: &str) -> Result<Summoner, RiotApiError> {
        let url = self.url(
            Host::Platform,
            &["lol", "summoner", "v4", "summoners", "by-puuid", puuid],
        )?;
        let key = format!("summoner_{}", puuid);
        self.fetch_typed(&key, url).await
    }

    /// Fetches the ids of a player's most recent matches, newest first
    ///
    /// # Arguments
    /// * `puuid` - Player to look up
    /// * `count` - Number of match ids to return
    /// * `queue` - Optional queue id filter (e.g., 420 for ranked solo)
    pub async fn match_ids(
        &self,
        puuid: &str,
        count: u32,
        queue: Option<u32>,
    ) -> Result<Vec<String>, RiotApiError> {
        let mut url = self.url(
            Host::Routing,
            &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"],
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("start", "0");
            query.append_pair("count", &count.to_string());
            if let Some(queue) = queue {
                query.append_pair("queue", &queue.to_string());
            }
        }

        let queue_part = queue.map(|q| q.to_string()).unwrap_or_else(|| "all".to_string());
        let key = format!("matchids_{}_{}_{}", puuid, count, queue_part);
        self.fetch_typed(&key, url).await
    }

    /// Fetches the raw match-v5 payload for a match
    pub async fn match_details(&self, match_id: &str) -> Result<Value, RiotApiError> {
        let url = self.url(Host::Routing, &["lol", "match", "v5", "matches", match_id])?;
        let key = format!("match_{}", match_id);
        self.fetch_json(&key, url).await
    }

    /// Drops the cached payload of a match, so the next lookup refetches it
    pub fn forget_match(&self, match_id: &str) {
        self.cache.clear(Some(&format!("match_{}", match_id)));
    }

    /// Fetches the game a player is currently in
    ///
    /// Live state is never cached. A 404 means the player is not in a game and
    /// is returned as `Ok(None)` without retrying.
    pub async fn current_game(&self, puuid: &str) -> Result<Option<CurrentGame>, RiotApiError> {
        let url = self.url(
            Host::Platform,
            &["lol", "spectator", "v5", "active-games", "by-summoner", puuid],
        )?;

        let url = &url;
        self.retry
            .run(|| async move {
                let response = self.send(url).await?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                let response = check_status(response, url)?;
                Ok::<_, RiotApiError>(Some(response.json::<CurrentGame>().await?))
            })
            .await
    }

    /// Builds an endpoint URL, percent-encoding each path segment
    fn url(&self, host: Host, segments: &[&str]) -> Result<Url, RiotApiError> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => {
                let prefix = match host {
                    Host::Platform => self.region.platform_host(),
                    Host::Routing => self.region.routing_host(),
                };
                format!("https://{}.api.riotgames.com", prefix)
            }
        };

        let mut url = Url::parse(&base).map_err(|e| RiotApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RiotApiError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        cache_key: &str,
        url: Url,
    ) -> Result<T, RiotApiError> {
        let value = self.fetch_json(cache_key, url).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the cached payload for `cache_key`, or fetches and caches it
    async fn fetch_json(&self, cache_key: &str, url: Url) -> Result<Value, RiotApiError> {
        if let Some(value) = self.cache.get(cache_key) {
            tracing::debug!(key = cache_key, "Cache hit");
            return Ok(value);
        }

        let url = &url;
        let value = self
            .retry
            .run(|| async move {
                let response = check_status(self.send(url).await?, url)?;
                Ok::<_, RiotApiError>(response.json::<Value>().await?)
            })
            .await?;

        self.cache.set(cache_key, value.clone());
        Ok(value)
    }

    /// One attempt: waits for a limiter slot, then sends the GET
    async fn send(&self, url: &Url) -> Result<Response, RiotApiError> {
        self.limiter.acquire().await;
        tracing::debug!(%url, "GET");

        Ok(self
            .http_client
            .get(url.clone())
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await?)
    }
}

fn check_status(response: Response, url: &Url) -> Result<Response, RiotApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RiotApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}
