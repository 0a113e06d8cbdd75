//! State transitions for the account forms.
//!
//! Every function here is synchronous and free of I/O: it takes the current
//! [`FormState`] plus whatever the triggering action carries and updates the
//! state in place. The controller owns sequencing and network calls.

use shared::{domain::Field, protocol::CreateUserRequest};

use crate::state::{FormState, SubmitPhase};

pub const USERNAME_TAKEN: &str = "This username is already taken";
pub const USERNAME_REQUIRED: &str = "A username is required";
pub const PASSWORD_REQUIRED: &str = "A password is required";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";

/// Result of a username lookup, already mapped from the HTTP outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Taken,
    Available,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStart {
    /// Blocked by an existing field error, an in-flight submission, or a
    /// form that already completed. Nothing changed.
    Ignored,
    /// A required-field or confirmation check failed locally.
    Rejected,
    Started(CreateUserRequest),
}

pub fn on_username_input(state: &mut FormState, value: String) {
    state.username = value;
    state.field_errors.clear(Field::Username);
}

pub fn on_password_input(state: &mut FormState, value: String, sticky_confirmation: bool) {
    state.password = value;
    state.field_errors.clear(Field::Password);
    if !sticky_confirmation {
        validate_confirmation(state, false);
    }
}

pub fn on_password_confirm_input(state: &mut FormState, value: String, sticky_confirmation: bool) {
    state.password_confirm = value;
    if !sticky_confirmation {
        validate_confirmation(state, false);
    }
}

/// With `sticky` set, a mismatch error stays until something else clears it.
pub fn validate_confirmation(state: &mut FormState, sticky: bool) {
    if sticky && state.field_errors.is_set(Field::PasswordConfirm) {
        return;
    }
    if state.password_confirm.is_empty() {
        if !sticky {
            state.field_errors.clear(Field::PasswordConfirm);
        }
        return;
    }
    if state.password != state.password_confirm {
        state
            .field_errors
            .set(Field::PasswordConfirm, PASSWORDS_DO_NOT_MATCH);
    } else if !sticky {
        state.field_errors.clear(Field::PasswordConfirm);
    }
}

/// Applies a lookup for `checked`. Returns false when the username has
/// changed since the lookup started and the result was dropped.
pub fn apply_username_check(state: &mut FormState, checked: &str, result: Availability) -> bool {
    if state.username != checked {
        return false;
    }
    match result {
        Availability::Taken => state.field_errors.set(Field::Username, USERNAME_TAKEN),
        Availability::Available => state.field_errors.clear(Field::Username),
        Availability::Failed(message) => state.field_errors.set(Field::Username, message),
    }
    true
}

/// Same staleness rule as [`apply_username_check`], keyed on the password.
pub fn apply_password_check(
    state: &mut FormState,
    checked: &str,
    result: Result<(), String>,
) -> bool {
    if state.password != checked {
        return false;
    }
    match result {
        Ok(()) => state.field_errors.clear(Field::Password),
        Err(message) => state.field_errors.set(Field::Password, message),
    }
    true
}

pub fn begin_submit(state: &mut FormState) -> SubmitStart {
    if state.submitting || state.phase == SubmitPhase::Done || state.field_errors.has_blocking() {
        return SubmitStart::Ignored;
    }

    state.phase = SubmitPhase::Validating;
    state.field_errors.clear(Field::General);

    let mut rejected = false;
    if state.username.is_empty() {
        state.field_errors.set(Field::Username, USERNAME_REQUIRED);
        rejected = true;
    }
    if state.password.is_empty() {
        state.field_errors.set(Field::Password, PASSWORD_REQUIRED);
        rejected = true;
    }
    if state.password != state.password_confirm {
        state
            .field_errors
            .set(Field::PasswordConfirm, PASSWORDS_DO_NOT_MATCH);
        rejected = true;
    }
    if rejected {
        state.phase = SubmitPhase::Idle;
        return SubmitStart::Rejected;
    }

    state.submitting = true;
    state.phase = SubmitPhase::SubmittingPassword;
    SubmitStart::Started(CreateUserRequest {
        username: state.username.clone(),
        password: state.password.clone(),
    })
}

pub fn password_accepted(state: &mut FormState) {
    state.phase = SubmitPhase::CreatingAccount;
}

pub fn password_rejected(state: &mut FormState, message: String) {
    state.field_errors.set(Field::Password, message);
    state.submitting = false;
    state.phase = SubmitPhase::Idle;
}

pub fn account_created(state: &mut FormState) {
    state.submitting = false;
    state.phase = SubmitPhase::Done;
}

pub fn account_rejected(state: &mut FormState, field: Field, message: String) {
    state.field_errors.set(field, message);
    state.submitting = false;
    state.phase = SubmitPhase::Idle;
}
