//! crates/stichelbuch_core/src/error.rs
//!
//! Recoverable failures the core reports back to the rendering layer.
//! None of them leave the state in an unrenderable shape.

/// An editor save that is missing required fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Why an action was refused without a state change (beyond transient flags).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Access denied")]
    InvalidPassword,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
