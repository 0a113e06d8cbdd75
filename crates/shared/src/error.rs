use serde::Deserialize;

/// Failure bodies the backend is known to send: either a bare JSON string or
/// an object carrying the message under one of a few keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        data: Option<String>,
    },
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            ErrorBody::Text(text) => Some(text.as_str()),
            ErrorBody::Object {
                message,
                error,
                data,
            } => message.as_deref().or(error.as_deref()).or(data.as_deref()),
        };
        message.map(str::trim).filter(|m| !m.is_empty())
    }
}

/// Pulls a human-readable message out of an error response body.
///
/// Returns `None` for an empty body or a JSON body without any usable message.
pub fn message_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message().map(str::to_string),
        Err(_) if body.starts_with('{') || body.starts_with('[') => None,
        Err(_) => Some(body.to_string()),
    }
}
