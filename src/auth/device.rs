use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::AuthError;
use crate::api::{ApiClient, ensure_success, join_url};

pub const CLIENT_ID: &str = "atomemo_plugin_cli";
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

const DEVICE_CODE_PATH: &str = "/v1/auth/device/code";
const DEVICE_TOKEN_PATH: &str = "/v1/auth/device/token";

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
}

/// Successful token response. Fields other than `access_token` are kept as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    device_code: &'a str,
}

/// Server's answer to one poll, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResponse {
    Granted(TokenGrant),
    Pending,
    SlowDown,
    Denied,
    Expired,
    Failed(String),
}

impl PollResponse {
    /// Classify a token endpoint body. The HTTP status is ignored: pending
    /// states arrive as 400 with an `error` field.
    pub fn classify(body: serde_json::Value) -> Self {
        let error = body.get("error").and_then(|e| e.as_str());
        let Some(error) = error else {
            return match serde_json::from_value::<TokenGrant>(body) {
                Ok(grant) => PollResponse::Granted(grant),
                Err(e) => PollResponse::Failed(format!("invalid token response: {e}")),
            };
        };

        match error {
            "authorization_pending" => PollResponse::Pending,
            "slow_down" => PollResponse::SlowDown,
            "access_denied" => PollResponse::Denied,
            "expired_token" => PollResponse::Expired,
            other => {
                let description = body
                    .get("error_description")
                    .and_then(|d| d.as_str())
                    .unwrap_or(other);
                PollResponse::Failed(description.to_string())
            }
        }
    }
}

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub initial: Duration,
    pub slow_down_step: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            slow_down_step: Duration::from_secs(5),
        }
    }
}

/// What the loop does next.
#[derive(Debug)]
pub enum PollStep {
    Wait(Duration),
    Done(Result<TokenGrant, AuthError>),
}

/// Loop-local state. The interval never shrinks.
#[derive(Debug, Clone)]
pub struct PollState {
    interval: Duration,
    slow_down_step: Duration,
    attempts: u32,
}

impl PollState {
    pub fn new(schedule: PollSchedule) -> Self {
        Self {
            interval: schedule.initial,
            slow_down_step: schedule.slow_down_step,
            attempts: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn advance(&mut self, response: PollResponse) -> PollStep {
        self.attempts += 1;
        match response {
            PollResponse::Granted(grant) => PollStep::Done(Ok(grant)),
            PollResponse::Pending => PollStep::Wait(self.interval),
            PollResponse::SlowDown => {
                self.interval += self.slow_down_step;
                PollStep::Wait(self.interval)
            }
            PollResponse::Denied => PollStep::Done(Err(AuthError::AccessDenied)),
            PollResponse::Expired => PollStep::Done(Err(AuthError::Expired)),
            PollResponse::Failed(description) => PollStep::Done(Err(AuthError::Server(description))),
        }
    }
}

pub struct DeviceFlow {
    api: ApiClient,
    endpoint: String,
    schedule: PollSchedule,
}

impl DeviceFlow {
    pub fn new(api: ApiClient, endpoint: impl Into<String>) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
            schedule: PollSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Ask the server for a device/user code pair. Not retried.
    pub async fn request_device_code(&self) -> Result<DeviceAuthorization, AuthError> {
        let url = join_url(&self.endpoint, DEVICE_CODE_PATH);
        let response = self
            .api
            .post_json(&url, &serde_json::json!({ "client_id": CLIENT_ID }))
            .await?;
        let response = ensure_success(response)?;
        let payload = response
            .json::<DeviceAuthorization>()
            .await
            .map_err(crate::api::ApiError::from)?;

        tracing::debug!(user_code = %payload.user_code, "device code issued");
        Ok(payload)
    }

    /// Poll until the server grants, denies or expires the code.
    ///
    /// There is no attempt limit: termination is left to the server's
    /// `expired_token` answer or to `cancel`.
    pub async fn poll_for_token(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> Result<TokenGrant, AuthError> {
        let url = join_url(&self.endpoint, DEVICE_TOKEN_PATH);
        let request = TokenRequest {
            grant_type: DEVICE_CODE_GRANT,
            client_id: CLIENT_ID,
            device_code,
        };

        let mut state = PollState::new(self.schedule);
        let mut wait = state.interval();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            let response = self.api.post_json(&url, &request).await?;
            let status = response.status();
            let body = match response.json::<serde_json::Value>().await {
                Ok(body) => body,
                Err(e) => {
                    return Err(AuthError::Server(format!(
                        "unexpected token response ({status}): {e}"
                    )));
                }
            };

            let classified = PollResponse::classify(body);
            tracing::debug!(attempt = state.attempts() + 1, response = ?classified, "token poll");

            match state.advance(classified) {
                PollStep::Wait(next) => wait = next,
                PollStep::Done(result) => return result,
            }
        }
    }
}
