use std::collections::BTreeMap;

use shared::domain::Field;

/// Where a form is in its submit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
    #[default]
    Idle,
    Validating,
    SubmittingPassword,
    CreatingAccount,
    Done,
}

/// At most one message per field; an absent entry means "no error".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    /// True when any error that blocks submission is present.
    pub fn has_blocking(&self) -> bool {
        Field::BLOCKING.iter().any(|field| self.is_set(*field))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub field_errors: FieldErrors,
    pub submitting: bool,
    pub phase: SubmitPhase,
}

impl FormState {
    /// The input value behind `field`; `General` has none.
    pub fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => Some(&self.username),
            Field::Password => Some(&self.password),
            Field::PasswordConfirm => Some(&self.password_confirm),
            Field::General => None,
        }
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.field_errors.get(field)
    }
}
