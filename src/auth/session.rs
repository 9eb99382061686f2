use serde::Deserialize;

use crate::api::{ApiClient, ApiError, join_url};

const SESSION_PATH: &str = "/v1/auth/get-session";
const DEBUG_API_KEY_PATH: &str = "/api/v1/debug_api_key";

/// `GET /v1/auth/get-session` payload. Missing fields deserialize as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub expires_at: String,
}

pub async fn fetch_session(
    api: &ApiClient,
    endpoint: &str,
    access_token: &str,
) -> Result<Session, ApiError> {
    let url = join_url(endpoint, SESSION_PATH);
    let response = api.get_authorized(&url, access_token).await?;
    Ok(response.json::<Session>().await?)
}

#[derive(Deserialize)]
struct DebugApiKey {
    #[serde(default)]
    api_key: Option<String>,
}

pub async fn fetch_debug_api_key(
    api: &ApiClient,
    hub_endpoint: &str,
    access_token: &str,
) -> Result<String, ApiError> {
    let url = join_url(hub_endpoint, DEBUG_API_KEY_PATH);
    let response = api.get_authorized(&url, access_token).await?;
    let payload = response.json::<DebugApiKey>().await?;

    payload
        .api_key
        .filter(|key| !key.is_empty())
        .ok_or(ApiError::MissingField("api_key"))
}
