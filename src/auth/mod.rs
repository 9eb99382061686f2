//! Authentication against the Choiceform identity service.
//!
//! Device flow:
//! 1. POST /v1/auth/device/code → { device_code, user_code, verification_uri, ... }
//! 2. Show the code, optionally open verification_uri_complete in a browser
//! 3. Poll POST /v1/auth/device/token until granted, denied or expired
//! 4. Caller saves the token to the config store

pub mod device;
pub mod session;


pub use device::{
    DeviceAuthorization, DeviceFlow, PollResponse, PollSchedule, PollState, PollStep, TokenGrant,
};
pub use session::{Session, SessionInfo, User, fetch_debug_api_key, fetch_session};

use crate::api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access was denied by the user")]
    AccessDenied,

    #[error("The device code has expired. Please try again.")]
    Expired,

    #[error("{0}")]
    Server(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Authorization cancelled")]
    Cancelled,
}

impl AuthError {
    /// Outcomes the user chose or let lapse; not failures of the tool.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            AuthError::AccessDenied | AuthError::Expired | AuthError::Cancelled
        )
    }
}
