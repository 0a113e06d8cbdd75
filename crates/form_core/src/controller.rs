use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shared::domain::{Field, FormKind};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::SignupApi,
    config::Settings,
    diff::{diff, StateChange},
    reducer::{self, Availability, SubmitStart},
    state::FormState,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Values a form starts with, e.g. from an embedded payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InitialValues {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone)]
pub struct FormConfig {
    pub kind: FormKind,
    /// Field that asks for focus when the form is mounted.
    pub autofocus: Option<Field>,
    pub initial: InitialValues,
    /// Keep a confirmation mismatch error until the form is rebuilt, even
    /// after both password inputs match again.
    pub sticky_confirmation_error: bool,
    /// Redirect target after a successful signup.
    pub completion_location: String,
}

impl FormConfig {
    pub fn new(kind: FormKind) -> Self {
        Self::from_settings(kind, &Settings::default())
    }

    pub fn from_settings(kind: FormKind, settings: &Settings) -> Self {
        Self {
            kind,
            autofocus: Some(Field::Username),
            initial: InitialValues::default(),
            sticky_confirmation_error: settings.sticky_confirmation_error,
            completion_location: settings.completion_location.clone(),
        }
    }

    pub fn with_initial(mut self, initial: InitialValues) -> Self {
        self.initial = initial;
        self
    }
}

/// What the surrounding view should do once the account exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Redirect { location: String },
    RevealSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    StateChanged(Vec<StateChange>),
    FocusRequested(Field),
    Completed(Completion),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Ignored,
    Rejected,
    Failed { field: Field, message: String },
    Completed { completion: Completion, account: Value },
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed { .. })
    }
}

pub struct FormController {
    config: FormConfig,
    api: Arc<dyn SignupApi>,
    state: Mutex<FormState>,
    events: broadcast::Sender<FormEvent>,
}

impl FormController {
    pub fn new(config: FormConfig, api: Arc<dyn SignupApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = FormState {
            username: config.initial.username.clone(),
            password: config.initial.password.clone(),
            password_confirm: config.initial.password_confirm.clone(),
            ..FormState::default()
        };
        Arc::new(Self {
            config,
            api,
            state: Mutex::new(state),
            events,
        })
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> FormState {
        self.state.lock().await.clone()
    }

    /// Called once the form is visible; requests focus for the configured field.
    pub fn mount(&self) {
        if let Some(field) = self.config.autofocus {
            let _ = self.events.send(FormEvent::FocusRequested(field));
        }
    }

    pub async fn on_username_input(&self, value: impl Into<String>) {
        let value = value.into();
        self.update(|state| reducer::on_username_input(state, value))
            .await;
    }

    pub async fn on_password_input(&self, value: impl Into<String>) {
        let value = value.into();
        let sticky = self.config.sticky_confirmation_error;
        self.update(|state| reducer::on_password_input(state, value, sticky))
            .await;
    }

    pub async fn on_password_confirm_input(&self, value: impl Into<String>) {
        let value = value.into();
        let sticky = self.config.sticky_confirmation_error;
        self.update(|state| reducer::on_password_confirm_input(state, value, sticky))
            .await;
    }

    pub async fn validate_confirmation(&self) {
        let sticky = self.config.sticky_confirmation_error;
        self.update(|state| reducer::validate_confirmation(state, sticky))
            .await;
    }

    /// Live availability check; a no-op on the first-run form.
    pub async fn check_username_available(&self) {
        if !self.config.kind.checks_username_availability() {
            return;
        }

        let username = {
            let state = self.state.lock().await;
            if state.username.is_empty() || state.field_errors.is_set(Field::Username) {
                return;
            }
            state.username.clone()
        };

        let result = match self.api.get_user(&username).await {
            Ok(_) => Availability::Taken,
            Err(err) if err.is_not_found() => Availability::Available,
            Err(err) => {
                warn!(username = %username, error = %err, "username availability check failed");
                Availability::Failed(err.field_message())
            }
        };

        let applied = self
            .update(|state| reducer::apply_username_check(state, &username, result))
            .await;
        if !applied {
            debug!(username = %username, "discarding stale username availability result");
        }
    }

    /// Live strength check; the policy itself lives on the server.
    pub async fn check_password_strength(&self) {
        let password = {
            let state = self.state.lock().await;
            if state.password.is_empty() || state.field_errors.is_set(Field::Password) {
                return;
            }
            state.password.clone()
        };

        let result = self
            .api
            .check_password(&password)
            .await
            .map_err(|err| err.field_message());

        let applied = self
            .update(|state| reducer::apply_password_check(state, &password, result))
            .await;
        if !applied {
            debug!("discarding stale password strength result");
        }
    }

    /// Runs local checks, then the password check and account creation in
    /// that order. Step two never starts unless step one succeeded.
    pub async fn submit(&self) -> SubmitOutcome {
        let request = match self.update(reducer::begin_submit).await {
            SubmitStart::Ignored => {
                debug!(kind = %self.config.kind, "submit ignored");
                return SubmitOutcome::Ignored;
            }
            SubmitStart::Rejected => return SubmitOutcome::Rejected,
            SubmitStart::Started(request) => request,
        };

        info!(kind = %self.config.kind, username = %request.username, "submit: checking password");
        if let Err(err) = self.api.check_password(&request.password).await {
            let message = err.field_message();
            warn!(kind = %self.config.kind, error = %err, "submit: password rejected");
            self.update(|state| reducer::password_rejected(state, message.clone()))
                .await;
            return SubmitOutcome::Failed {
                field: Field::Password,
                message,
            };
        }
        self.update(reducer::password_accepted).await;

        info!(kind = %self.config.kind, username = %request.username, "submit: creating account");
        match self.api.create_user(&request).await {
            Ok(account) => {
                self.update(reducer::account_created).await;
                let completion = self.completion();
                info!(kind = %self.config.kind, username = %request.username, "submit: account created");
                let _ = self.events.send(FormEvent::Completed(completion.clone()));
                SubmitOutcome::Completed {
                    completion,
                    account,
                }
            }
            Err(err) => {
                let field = self.config.kind.account_error_field();
                let message = err.field_message();
                warn!(kind = %self.config.kind, error = %err, "submit: account creation failed");
                self.update(|state| reducer::account_rejected(state, field, message.clone()))
                    .await;
                SubmitOutcome::Failed { field, message }
            }
        }
    }

    fn completion(&self) -> Completion {
        match self.config.kind {
            FormKind::FirstRun => Completion::RevealSettings,
            FormKind::Signup => Completion::Redirect {
                location: self.config.completion_location.clone(),
            },
        }
    }

    /// Applies `apply` under the state lock and publishes the resulting diff.
    async fn update<R>(&self, apply: impl FnOnce(&mut FormState) -> R) -> R {
        let (out, changes) = {
            let mut state = self.state.lock().await;
            let before = state.clone();
            let out = apply(&mut *state);
            (out, diff(&before, &state))
        };
        if !changes.is_empty() {
            let _ = self.events.send(FormEvent::StateChanged(changes));
        }
        out
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
