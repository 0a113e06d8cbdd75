//! Controller for the first-run setup and signup account forms.
//!
//! State lives in [`state::FormState`], transitions are the pure functions in
//! [`reducer`], and [`controller::FormController`] drives them against a
//! [`api::SignupApi`] backend while publishing [`diff::StateChange`]s to
//! whatever renders the form.

pub mod api;
pub mod config;
pub mod controller;
pub mod diff;
pub mod http;
pub mod payload;
pub mod reducer;
pub mod state;

pub use api::{ApiCallError, SignupApi};
pub use controller::{
    Completion, FormConfig, FormController, FormEvent, InitialValues, SubmitOutcome,
};
pub use http::HttpSignupApi;
pub use shared::domain::{Field, FormKind};
pub use state::{FieldErrors, FormState, SubmitPhase};
