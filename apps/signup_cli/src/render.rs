//! Text rendering of controller events.

use form_core::{diff::StateChange, Completion, FormEvent, SubmitPhase};
use shared::domain::Field;

pub fn render_event(event: &FormEvent) -> Vec<String> {
    match event {
        FormEvent::StateChanged(changes) => changes.iter().filter_map(render_change).collect(),
        FormEvent::FocusRequested(field) => vec![format!("> {}", label(*field))],
        FormEvent::Completed(completion) => vec![describe_completion(completion)],
    }
}

fn render_change(change: &StateChange) -> Option<String> {
    match change {
        StateChange::Value { field, value } if field.is_secret() => Some(format!(
            "  {}: {}",
            label(*field),
            "*".repeat(value.chars().count())
        )),
        StateChange::Value { field, value } => Some(format!("  {}: {value}", label(*field))),
        StateChange::Error {
            field,
            message: Some(message),
        } => Some(format!("! {}: {message}", label(*field))),
        StateChange::Error {
            field,
            message: None,
        } => Some(format!("  {}: ok", label(*field))),
        StateChange::Submitting(_) => None,
        StateChange::Phase(phase) => phase_line(*phase).map(str::to_string),
    }
}

fn phase_line(phase: SubmitPhase) -> Option<&'static str> {
    match phase {
        SubmitPhase::Idle | SubmitPhase::Validating => None,
        SubmitPhase::SubmittingPassword => Some("… checking password"),
        SubmitPhase::CreatingAccount => Some("… creating account"),
        SubmitPhase::Done => Some("✓ account created"),
    }
}

fn label(field: Field) -> &'static str {
    match field {
        Field::Username => "Username",
        Field::Password => "Password",
        Field::PasswordConfirm => "Confirm password",
        Field::General => "Form",
    }
}

pub fn describe_completion(completion: &Completion) -> String {
    match completion {
        Completion::Redirect { location } => format!("continue at {location}"),
        Completion::RevealSettings => "continue with instance settings".to_string(),
    }
}
