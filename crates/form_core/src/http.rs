use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use shared::{
    error::message_from_body,
    protocol::{CreateUserRequest, PasswordCheckRequest, PASSWORD_PATH, USER_PATH},
};
use tracing::debug;
use url::Url;

use crate::{
    api::{fallback_status_message, ApiCallError, SignupApi},
    config::{normalize_server_url, Settings},
};

/// [`SignupApi`] over HTTP/JSON.
pub struct HttpSignupApi {
    http: Client,
    base_url: Url,
}

impl HttpSignupApi {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = normalize_server_url(&settings.server_url)?;
        Self::new(base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiCallError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ApiCallError::Transport(format!("server url cannot carry a path: {}", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiCallError> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiCallError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = message_from_body(&body)
            .unwrap_or_else(|| fallback_status_message(status.as_u16()));
        debug!(status = status.as_u16(), %message, "http: request rejected");
        Err(ApiCallError::Application {
            status: status.as_u16(),
            message,
        })
    }
}

async fn json_body(response: Response) -> Result<Value, ApiCallError> {
    let text = response
        .text()
        .await
        .map_err(|err| ApiCallError::Transport(format!("failed to read response body: {err}")))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[async_trait]
impl SignupApi for HttpSignupApi {
    async fn get_user(&self, username: &str) -> Result<Value, ApiCallError> {
        let url = self.endpoint(&[USER_PATH, username])?;
        let response = self.send(self.http.get(url)).await?;
        json_body(response).await
    }

    async fn check_password(&self, password: &str) -> Result<(), ApiCallError> {
        let url = self.endpoint(&[PASSWORD_PATH])?;
        self.send(self.http.post(url).json(&PasswordCheckRequest {
            password: password.to_string(),
        }))
        .await?;
        Ok(())
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<Value, ApiCallError> {
        let url = self.endpoint(&[USER_PATH])?;
        let response = self.send(self.http.post(url).json(request)).await?;
        json_body(response).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
