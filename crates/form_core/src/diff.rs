use shared::domain::Field;

use crate::state::{FormState, SubmitPhase};

/// One observable difference between two form states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Value { field: Field, value: String },
    Error { field: Field, message: Option<String> },
    Submitting(bool),
    Phase(SubmitPhase),
}

/// Changes that turn `before` into `after`, in field order.
pub fn diff(before: &FormState, after: &FormState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    for field in Field::ALL {
        if let (Some(old), Some(new)) = (before.value(field), after.value(field)) {
            if old != new {
                changes.push(StateChange::Value {
                    field,
                    value: new.to_string(),
                });
            }
        }
    }

    for field in Field::ALL {
        let new = after.error(field);
        if before.error(field) != new {
            changes.push(StateChange::Error {
                field,
                message: new.map(str::to_string),
            });
        }
    }

    if before.submitting != after.submitting {
        changes.push(StateChange::Submitting(after.submitting));
    }
    if before.phase != after.phase {
        changes.push(StateChange::Phase(after.phase));
    }

    changes
}
