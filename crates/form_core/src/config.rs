use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "signup.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub sticky_confirmation_error: bool,
    pub completion_location: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            request_timeout_secs: 10,
            sticky_confirmation_error: true,
            completion_location: "/".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    sticky_confirmation_error: Option<bool>,
    completion_location: Option<String>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

/// Defaults, then the toml file at `path` if it exists, then the environment.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file_settings(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.sticky_confirmation_error {
        settings.sticky_confirmation_error = v;
    }
    if let Some(v) = file_cfg.completion_location {
        settings.completion_location = v;
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SIGNUP_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = lookup("APP__STICKY_CONFIRMATION_ERROR") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.sticky_confirmation_error = true,
            "0" | "false" | "no" => settings.sticky_confirmation_error = false,
            _ => warn!(value = %v, "ignoring invalid APP__STICKY_CONFIRMATION_ERROR"),
        }
    }

    if let Some(v) = lookup("APP__COMPLETION_LOCATION") {
        settings.completion_location = v;
    }
}

pub fn normalize_server_url(raw_server_url: &str) -> anyhow::Result<Url> {
    let raw_server_url = raw_server_url.trim().trim_end_matches('/');
    let raw_server_url = if raw_server_url.is_empty() {
        Settings::default().server_url
    } else {
        raw_server_url.to_string()
    };

    let url = Url::parse(&raw_server_url)
        .with_context(|| format!("invalid server url '{raw_server_url}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("server url must start with http:// or https://, got '{raw_server_url}'");
    }
    if url.cannot_be_a_base() {
        bail!("server url '{raw_server_url}' cannot carry a path");
    }
    Ok(url)
}
