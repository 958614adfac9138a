//! Runeward HTTP client

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client, Response, StatusCode,
};
use runeward_core::{
    Error, GrantCollaborator, GrantOutcome, Result, RewardGrant, RunesBalance,
    SessionBonusRequest, SessionBonusResponse, UserId,
};
use std::time::Duration;
use tracing::{debug, error, instrument};

const USER_AGENT_VALUE: &str = concat!("runeward/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// HTTP client for a Runeward server
///
/// Implements [`GrantCollaborator`] so a session timer can run against a
/// remote ledger.
#[derive(Clone)]
pub struct RunesClient {
    http: Client,
    base_url: String,
}

impl RunesClient {
    /// Create a new client for the server at `base_url` (e.g. `http://127.0.0.1:9877`)
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Turn a non-2xx response into an API error carrying the body
    async fn check_status(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!("{} request failed: HTTP {}: {}", what, status, body);
            return Err(Error::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }

    /// Server liveness check
    #[instrument(skip(self))]
    pub async fn get_status(&self) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(self.api_url("status"))
            .headers(Self::default_headers())
            .send()
            .await?;

        let response = Self::check_status(response, "status").await?;
        response.json().await.map_err(|e| Error::InvalidData(e.to_string()))
    }

    /// Check-and-grant the session bonus for `user_id`
    #[instrument(skip(self))]
    pub async fn claim_session_bonus(&self, user_id: &UserId) -> Result<SessionBonusResponse> {
        debug!("Requesting session bonus");

        let request = SessionBonusRequest {
            user_id: user_id.clone(),
        };

        let response = self
            .http
            .post(self.api_url("session-bonus"))
            .headers(Self::default_headers())
            .json(&request)
            .send()
            .await?;

        let response = Self::check_status(response, "session bonus").await?;

        let bonus: SessionBonusResponse = response.json().await.map_err(|e| {
            error!("Failed to parse session bonus response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Session bonus response: success={}, awarded={}",
            bonus.success, bonus.awarded
        );
        Ok(bonus)
    }

    /// Get a user's Runes balance
    #[instrument(skip(self))]
    pub async fn get_runes(&self, user_id: &UserId) -> Result<RunesBalance> {
        let response = self
            .http
            .get(self.api_url(&format!("runes/{}", user_id)))
            .headers(Self::default_headers())
            .send()
            .await?;

        let response = Self::check_status(response, user_id.as_str()).await?;
        response.json().await.map_err(|e| {
            error!("Failed to parse runes response: {}", e);
            Error::InvalidData(e.to_string())
        })
    }

    /// Get a user's most recent grants
    #[instrument(skip(self))]
    pub async fn list_grants(&self, user_id: &UserId, limit: u32) -> Result<Vec<RewardGrant>> {
        let response = self
            .http
            .get(self.api_url(&format!("runes/{}/grants", user_id)))
            .query(&[("limit", limit)])
            .headers(Self::default_headers())
            .send()
            .await?;

        let response = Self::check_status(response, user_id.as_str()).await?;
        response.json().await.map_err(|e| {
            error!("Failed to parse grants response: {}", e);
            Error::InvalidData(e.to_string())
        })
    }
}

impl GrantCollaborator for RunesClient {
    async fn check_and_award(&self, user_id: &UserId) -> Result<GrantOutcome> {
        crate::api::claim_session_bonus(self, user_id).await
    }
}
