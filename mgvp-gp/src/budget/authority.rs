//! Remote watch-budget authority
//!
//! `start-session`, `heartbeat` and `end-session` over JSON/HTTP. Responses
//! saying the budget is used up are reported as [`Error::BudgetExhausted`],
//! distinct from [`Error::Network`] for transient failures.

use crate::error::{Error, Result};
use async_trait::async_trait;
use mgvp_common::api::{
    AuthorityErrorBody, EndSessionRequest, HeartbeatRequest, HeartbeatResponse,
    StartSessionRequest, StartSessionResponse,
};
use mgvp_common::events::SessionEndReason;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait BudgetAuthority: Send + Sync {
    /// Open a session for `profile_id` starting with `item_id`
    async fn start_session(&self, profile_id: &str, item_id: &str)
        -> Result<StartSessionResponse>;

    /// Report the current position and receive the authoritative budget
    async fn heartbeat(&self, session_id: &str, position_seconds: f64)
        -> Result<HeartbeatResponse>;

    /// Close the session
    async fn end_session(
        &self,
        session_id: &str,
        reason: SessionEndReason,
        final_position_seconds: f64,
    ) -> Result<()>;
}

/// Budget authority reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBudgetAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBudgetAuthority {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST `body` and fail on any non-success status
    async fn send<B>(&self, path: &str, body: &B) -> Result<reqwest::Response>
    where
        B: serde::Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: AuthorityErrorBody = response.json().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }
        Ok(response)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + ?Sized + Sync,
        R: serde::de::DeserializeOwned,
    {
        Ok(self.send(path, body).await?.json().await?)
    }
}

/// Map a non-success authority response to an error
pub fn classify_failure(status: StatusCode, body: &AuthorityErrorBody) -> Error {
    let refusal = matches!(
        status,
        StatusCode::PAYMENT_REQUIRED | StatusCode::FORBIDDEN | StatusCode::CONFLICT
    );
    if refusal && (body.limit_reached || status == StatusCode::PAYMENT_REQUIRED) {
        return Error::BudgetExhausted;
    }
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(format!("budget authority: {}", body.error));
    }
    Error::Network(format!("budget authority returned {}: {}", status, body.error))
}

#[async_trait]
impl BudgetAuthority for HttpBudgetAuthority {
    async fn start_session(
        &self,
        profile_id: &str,
        item_id: &str,
    ) -> Result<StartSessionResponse> {
        let request = StartSessionRequest {
            profile_id: profile_id.to_string(),
            item_id: item_id.to_string(),
        };
        self.post("/sessions", &request).await
    }

    async fn heartbeat(
        &self,
        session_id: &str,
        position_seconds: f64,
    ) -> Result<HeartbeatResponse> {
        let request = HeartbeatRequest { position_seconds };
        self.post(&format!("/sessions/{}/heartbeat", session_id), &request)
            .await
    }

    async fn end_session(
        &self,
        session_id: &str,
        reason: SessionEndReason,
        final_position_seconds: f64,
    ) -> Result<()> {
        let request = EndSessionRequest {
            reason,
            final_position_seconds,
        };
        // Acknowledgement body, if any, carries nothing we use
        self.send(&format!("/sessions/{}/end", session_id), &request)
            .await?;
        Ok(())
    }
}
