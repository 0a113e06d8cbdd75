use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::CreateUserRequest;
use thiserror::Error;

/// Shown when a call never produced a response to take a message from.
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Unable to reach the server; check your connection and try again";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiCallError {
    #[error("request failed before a response arrived: {0}")]
    Transport(String),
    #[error("server responded with status {status}: {message}")]
    Application { status: u16, message: String },
}

impl ApiCallError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Application { status, .. } => Some(*status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The text placed in a form field for this failure.
    pub fn field_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_MESSAGE.to_string(),
            Self::Application { status, message } if message.trim().is_empty() => {
                fallback_status_message(*status)
            }
            Self::Application { message, .. } => message.clone(),
        }
    }
}

pub fn fallback_status_message(status: u16) -> String {
    format!("The server returned an error (status {status})")
}

/// The three backend calls the account forms depend on.
#[async_trait]
pub trait SignupApi: Send + Sync {
    /// `GET /user/{username}`; `Ok` means the name is taken.
    async fn get_user(&self, username: &str) -> Result<Value, ApiCallError>;

    /// `POST /password`; `Ok` means the password meets the server's policy.
    async fn check_password(&self, password: &str) -> Result<(), ApiCallError>;

    /// `POST /user`; returns the created resource (or `Value::Null` for an empty body).
    async fn create_user(&self, request: &CreateUserRequest) -> Result<Value, ApiCallError>;
}
