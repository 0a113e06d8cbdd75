use super::*;
use crate::{
    api::{ApiCallError, TRANSPORT_FAILURE_MESSAGE},
    reducer::{PASSWORDS_DO_NOT_MATCH, USERNAME_REQUIRED, USERNAME_TAKEN},
    state::SubmitPhase,
};
use async_trait::async_trait;
use serde_json::json;
use shared::protocol::CreateUserRequest;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    GetUser(String),
    CheckPassword(String),
    CreateUser(String),
}

/// Holds a call open until the test releases it.
#[derive(Clone, Default)]
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

struct FakeSignupApi {
    calls: Arc<Mutex<Vec<Call>>>,
    user_lookup: Result<Value, ApiCallError>,
    password_check: Result<(), ApiCallError>,
    create_user: Result<Value, ApiCallError>,
    get_user_gate: Option<Gate>,
    check_password_gate: Option<Gate>,
}

impl FakeSignupApi {
    fn accepting() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            user_lookup: Err(ApiCallError::application(404, "Resource not found")),
            password_check: Ok(()),
            create_user: Ok(json!({ "username": "created" })),
            get_user_gate: None,
            check_password_gate: None,
        }
    }

    fn with_user_lookup(mut self, result: Result<Value, ApiCallError>) -> Self {
        self.user_lookup = result;
        self
    }

    fn with_password_check(mut self, result: Result<(), ApiCallError>) -> Self {
        self.password_check = result;
        self
    }

    fn with_create_user(mut self, result: Result<Value, ApiCallError>) -> Self {
        self.create_user = result;
        self
    }

    fn gating_get_user(mut self, gate: Gate) -> Self {
        self.get_user_gate = Some(gate);
        self
    }

    fn gating_check_password(mut self, gate: Gate) -> Self {
        self.check_password_gate = Some(gate);
        self
    }
}

#[async_trait]
impl SignupApi for FakeSignupApi {
    async fn get_user(&self, username: &str) -> Result<Value, ApiCallError> {
        self.calls
            .lock()
            .await
            .push(Call::GetUser(username.to_string()));
        if let Some(gate) = &self.get_user_gate {
            gate.pass().await;
        }
        self.user_lookup.clone()
    }

    async fn check_password(&self, password: &str) -> Result<(), ApiCallError> {
        self.calls
            .lock()
            .await
            .push(Call::CheckPassword(password.to_string()));
        if let Some(gate) = &self.check_password_gate {
            gate.pass().await;
        }
        self.password_check.clone()
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<Value, ApiCallError> {
        self.calls
            .lock()
            .await
            .push(Call::CreateUser(request.username.clone()));
        self.create_user.clone()
    }
}

fn build(kind: FormKind, api: FakeSignupApi) -> (Arc<FormController>, Arc<Mutex<Vec<Call>>>) {
    let calls = api.calls.clone();
    (
        FormController::new(FormConfig::new(kind), Arc::new(api)),
        calls,
    )
}

async fn fill(controller: &FormController, username: &str, password: &str, confirm: &str) {
    controller.on_username_input(username).await;
    controller.on_password_input(password).await;
    controller.on_password_confirm_input(confirm).await;
}

#[tokio::test]
async fn confirmation_mismatch_stays_set_after_inputs_match() {
    let (controller, calls) = build(FormKind::Signup, FakeSignupApi::accepting());
    fill(&controller, "alice", "correct horse", "correct hors").await;

    controller.validate_confirmation().await;
    assert_eq!(
        controller.snapshot().await.error(Field::PasswordConfirm),
        Some(PASSWORDS_DO_NOT_MATCH)
    );

    controller.on_password_confirm_input("correct horse").await;
    controller.validate_confirmation().await;
    let state = controller.snapshot().await;
    assert_eq!(state.password, state.password_confirm);
    assert_eq!(state.error(Field::PasswordConfirm), Some(PASSWORDS_DO_NOT_MATCH));

    assert_eq!(controller.submit().await, SubmitOutcome::Ignored);
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn non_sticky_confirmation_clears_once_inputs_match() {
    let api = FakeSignupApi::accepting();
    let mut config = FormConfig::new(FormKind::Signup);
    config.sticky_confirmation_error = false;
    let controller = FormController::new(config, Arc::new(api));

    fill(&controller, "alice", "correct horse", "correct hors").await;
    controller.validate_confirmation().await;
    assert!(controller
        .snapshot()
        .await
        .field_errors
        .is_set(Field::PasswordConfirm));

    controller.on_password_confirm_input("correct horse").await;
    assert_eq!(controller.snapshot().await.error(Field::PasswordConfirm), None);
}

#[tokio::test]
async fn submit_while_submitting_is_a_noop() {
    let gate = Gate::default();
    let api = FakeSignupApi::accepting().gating_check_password(gate.clone());
    let (controller, calls) = build(FormKind::Signup, api);
    fill(&controller, "alice", "pw", "pw").await;

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit().await })
    };
    gate.entered.notified().await;

    let before = controller.snapshot().await;
    assert!(before.submitting);
    assert_eq!(controller.submit().await, SubmitOutcome::Ignored);
    assert_eq!(controller.snapshot().await, before);
    assert_eq!(
        calls.lock().await.clone(),
        vec![Call::CheckPassword("pw".into())]
    );

    gate.release.notify_one();
    let outcome = first.await.expect("join");
    assert!(outcome.is_completed());
}

#[tokio::test]
async fn empty_username_is_rejected_without_network_calls() {
    let (controller, calls) = build(FormKind::Signup, FakeSignupApi::accepting());
    fill(&controller, "", "pw", "pw").await;

    assert_eq!(controller.submit().await, SubmitOutcome::Rejected);

    let state = controller.snapshot().await;
    assert_eq!(state.error(Field::Username), Some(USERNAME_REQUIRED));
    assert!(!state.submitting);
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn account_conflict_lands_on_username_after_password_check() {
    let api = FakeSignupApi::accepting()
        .with_create_user(Err(ApiCallError::application(409, "username taken")));
    let (controller, calls) = build(FormKind::Signup, api);
    fill(&controller, "alice", "pw", "pw").await;

    let outcome = controller.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            field: Field::Username,
            message: "username taken".into(),
        }
    );

    let state = controller.snapshot().await;
    assert_eq!(state.error(Field::Username), Some("username taken"));
    assert!(!state.submitting);
    assert_eq!(state.phase, SubmitPhase::Idle);
    assert_eq!(
        calls.lock().await.clone(),
        vec![
            Call::CheckPassword("pw".into()),
            Call::CreateUser("alice".into())
        ]
    );
}

#[tokio::test]
async fn first_run_account_failure_is_a_general_error() {
    let api = FakeSignupApi::accepting()
        .with_create_user(Err(ApiCallError::application(400, "setup already completed")));
    let (controller, _calls) = build(FormKind::FirstRun, api);
    fill(&controller, "admin", "pw", "pw").await;

    let outcome = controller.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            field: Field::General,
            message: "setup already completed".into(),
        }
    );
    let state = controller.snapshot().await;
    assert_eq!(state.error(Field::General), Some("setup already completed"));
    assert_eq!(state.error(Field::Username), None);

    // A general error does not block the next attempt, and is cleared by it.
    let mut events = controller.subscribe_events();
    let _ = controller.submit().await;
    let first = events.recv().await.expect("event");
    match first {
        FormEvent::StateChanged(changes) => assert!(changes.contains(&StateChange::Error {
            field: Field::General,
            message: None,
        })),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn password_rejection_stops_before_account_creation() {
    let api = FakeSignupApi::accepting()
        .with_password_check(Err(ApiCallError::application(400, "Password is too short")));
    let (controller, calls) = build(FormKind::Signup, api);
    fill(&controller, "alice", "pw", "pw").await;

    let outcome = controller.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            field: Field::Password,
            message: "Password is too short".into(),
        }
    );
    assert!(!controller.snapshot().await.submitting);
    assert_eq!(
        calls.lock().await.clone(),
        vec![Call::CheckPassword("pw".into())]
    );
}

#[tokio::test]
async fn transport_failure_uses_generic_message() {
    let api = FakeSignupApi::accepting()
        .with_password_check(Err(ApiCallError::Transport("connection refused".into())));
    let (controller, _calls) = build(FormKind::Signup, api);
    fill(&controller, "alice", "pw", "pw").await;

    controller.submit().await;
    assert_eq!(
        controller.snapshot().await.error(Field::Password),
        Some(TRANSPORT_FAILURE_MESSAGE)
    );
}

#[tokio::test]
async fn successful_submit_completes_exactly_once() {
    let (controller, calls) = build(FormKind::Signup, FakeSignupApi::accepting());
    let mut events = controller.subscribe_events();
    fill(&controller, "alice", "pw", "pw").await;

    let outcome = controller.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Completed {
            completion: Completion::Redirect {
                location: "/".into()
            },
            account: json!({ "username": "created" }),
        }
    );
    assert_eq!(controller.submit().await, SubmitOutcome::Ignored);

    let state = controller.snapshot().await;
    assert_eq!(state.phase, SubmitPhase::Done);
    assert!(!state.submitting);
    assert_eq!(calls.lock().await.len(), 2);

    let mut completions = 0;
    while let Ok(event) = events.try_recv() {
        if let FormEvent::Completed(_) = event {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn first_run_completion_reveals_settings() {
    let (controller, _calls) = build(FormKind::FirstRun, FakeSignupApi::accepting());
    fill(&controller, "admin", "pw", "pw").await;

    match controller.submit().await {
        SubmitOutcome::Completed { completion, .. } => {
            assert_eq!(completion, Completion::RevealSettings)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn username_lookup_maps_found_and_not_found() {
    let api = FakeSignupApi::accepting().with_user_lookup(Ok(json!({ "username": "alice" })));
    let (controller, _calls) = build(FormKind::Signup, api);
    controller.on_username_input("alice").await;
    controller.check_username_available().await;
    assert_eq!(
        controller.snapshot().await.error(Field::Username),
        Some(USERNAME_TAKEN)
    );

    let (controller, calls) = controller_with_default_lookup();
    controller.on_username_input("bob").await;
    controller.check_username_available().await;
    assert_eq!(controller.snapshot().await.error(Field::Username), None);
    assert_eq!(calls.lock().await.clone(), vec![Call::GetUser("bob".into())]);
}

fn controller_with_default_lookup() -> (Arc<FormController>, Arc<Mutex<Vec<Call>>>) {
    build(FormKind::Signup, FakeSignupApi::accepting())
}

#[tokio::test]
async fn username_lookup_failure_surfaces_server_message() {
    let api = FakeSignupApi::accepting()
        .with_user_lookup(Err(ApiCallError::application(500, "database unavailable")));
    let (controller, _calls) = build(FormKind::Signup, api);
    controller.on_username_input("alice").await;
    controller.check_username_available().await;
    assert_eq!(
        controller.snapshot().await.error(Field::Username),
        Some("database unavailable")
    );
}

#[tokio::test]
async fn username_lookup_is_skipped_when_blocked_or_first_run() {
    let (controller, calls) = build(FormKind::Signup, FakeSignupApi::accepting());
    controller.check_username_available().await;
    assert!(calls.lock().await.is_empty());

    let (controller, calls) = build(FormKind::FirstRun, FakeSignupApi::accepting());
    controller.on_username_input("admin").await;
    controller.check_username_available().await;
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn stale_username_lookup_is_discarded() {
    let gate = Gate::default();
    let api = FakeSignupApi::accepting()
        .with_user_lookup(Ok(json!({ "username": "alice" })))
        .gating_get_user(gate.clone());
    let (controller, _calls) = build(FormKind::Signup, api);
    controller.on_username_input("alice").await;

    let check = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.check_username_available().await })
    };
    gate.entered.notified().await;
    controller.on_username_input("alice2").await;
    gate.release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), check)
        .await
        .expect("check finished")
        .expect("join");

    let state = controller.snapshot().await;
    assert_eq!(state.username, "alice2");
    assert_eq!(state.error(Field::Username), None);
}

#[tokio::test]
async fn password_strength_check_sets_and_clears_error() {
    let api = FakeSignupApi::accepting()
        .with_password_check(Err(ApiCallError::application(400, "Password is too common")));
    let (controller, calls) = build(FormKind::FirstRun, api);
    controller.on_password_input("password").await;
    controller.check_password_strength().await;
    assert_eq!(
        controller.snapshot().await.error(Field::Password),
        Some("Password is too common")
    );

    // Existing error: no second request until the input changes.
    controller.check_password_strength().await;
    assert_eq!(calls.lock().await.len(), 1);

    let (controller, _calls) = controller_with_default_lookup();
    controller.on_password_input("a much better passphrase 7#").await;
    controller.check_password_strength().await;
    assert_eq!(controller.snapshot().await.error(Field::Password), None);
}

#[tokio::test]
async fn mount_requests_focus_for_autofocus_field() {
    let (controller, _calls) = build(FormKind::FirstRun, FakeSignupApi::accepting());
    let mut events = controller.subscribe_events();
    controller.mount();
    assert_eq!(
        events.recv().await.expect("event"),
        FormEvent::FocusRequested(Field::Username)
    );
}

#[tokio::test]
async fn initial_values_seed_the_form() {
    let config = FormConfig::new(FormKind::Signup).with_initial(InitialValues {
        username: "prefilled".into(),
        ..InitialValues::default()
    });
    let controller = FormController::new(config, Arc::new(FakeSignupApi::accepting()));
    assert_eq!(controller.snapshot().await.username, "prefilled");
}
