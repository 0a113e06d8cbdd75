use std::fmt;

use serde::{Deserialize, Serialize};

/// An input slot on an account form that can carry an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Username,
    Password,
    PasswordConfirm,
    /// Errors that belong to the form as a whole rather than one input.
    General,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Username,
        Field::Password,
        Field::PasswordConfirm,
        Field::General,
    ];

    /// Fields whose error blocks a submission outright.
    pub const BLOCKING: [Field; 3] = [Field::Username, Field::Password, Field::PasswordConfirm];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Password => "password",
            Field::PasswordConfirm => "password_confirm",
            Field::General => "general",
        }
    }

    /// Whether the field holds a secret that must not be echoed back.
    pub fn is_secret(self) -> bool {
        matches!(self, Field::Password | Field::PasswordConfirm)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    /// Creates the initial administrator account of a fresh instance.
    FirstRun,
    #[default]
    Signup,
}

impl FormKind {
    pub fn checks_username_availability(self) -> bool {
        matches!(self, FormKind::Signup)
    }

    /// Slot that receives an account-creation failure.
    pub fn account_error_field(self) -> Field {
        match self {
            FormKind::FirstRun => Field::General,
            FormKind::Signup => Field::Username,
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::FirstRun => f.write_str("first_run"),
            FormKind::Signup => f.write_str("signup"),
        }
    }
}
