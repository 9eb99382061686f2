//! Thin wrapper over `reqwest` shared by every remote call.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};

pub const USER_AGENT: &str = "Choiceform (Atomemo Plugin CLI)";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("Access token is invalid or expired, please login again")]
    Unauthorized,

    #[error("API request failed: {} {reason}", .status.as_u16())]
    Status { status: StatusCode, reason: String },

    #[error("API response format error: missing {0} field")]
    MissingField(&'static str),
}

impl ApiError {
    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        ApiError::Status {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { http })
    }

    /// POST a JSON body, returning the raw response whatever its status.
    pub async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, ApiError> {
        tracing::debug!(%url, "POST");
        Ok(self.http.post(url).json(body).send().await?)
    }

    /// GET with a bearer token; non-2xx statuses become errors.
    pub async fn get_authorized(&self, url: &str, token: &str) -> Result<Response, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).bearer_auth(token).send().await?;
        ensure_success(response)
    }
}

/// Map 401 to `Unauthorized` and other non-2xx statuses to `Status`.
pub fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_status(status))
    }
}

/// Join a base URL and an absolute path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
