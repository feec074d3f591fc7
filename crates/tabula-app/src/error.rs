// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Problems caught before a request is built. These never reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a date like 2026-01-31, got {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("date range starts {from} which is after its end {to}")]
    ReversedRange { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("container {0:?} is not mounted in the document")]
    MissingContainer(String),

    #[error("container {0:?} already has a claim on the table slot")]
    AlreadyHeld(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid filter: {0}")]
    Validation(#[from] ValidationError),

    #[error("render slot unavailable: {0}")]
    Slot(#[from] SlotError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("step-up authentication required for scope {scope:?}")]
    StepUp { scope: String, redirect: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("decode response: {0}")]
    Decode(String),

    #[error("render table: {0}")]
    Render(String),
}

impl QueryError {
    /// Text shown in the failed panel. Conflict messages come from the
    /// server verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::Slot(_) | Self::Render(_) => {
                "could not display results; press r to retry".to_owned()
            }
            Self::Transport(_) | Self::Decode(_) | Self::Http { .. } => {
                "could not load data from the server; press r to retry".to_owned()
            }
            Self::StepUp { redirect, .. } => {
                format!("re-authentication required; continue at {redirect}")
            }
            Self::Conflict(message) => message.clone(),
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::StepUp { redirect, .. } => Some(redirect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryError, ValidationError};

    #[test]
    fn conflict_message_is_passed_through() {
        let error = QueryError::Conflict("role name already taken".to_owned());
        assert_eq!(error.user_message(), "role name already taken");
        assert_eq!(error.redirect(), None);
    }

    #[test]
    fn step_up_exposes_redirect() {
        let error = QueryError::StepUp {
            scope: "admins.write".to_owned(),
            redirect: "https://panel.example/auth/step-up?scope=admins.write".to_owned(),
        };
        assert_eq!(
            error.redirect(),
            Some("https://panel.example/auth/step-up?scope=admins.write")
        );
        assert!(error.user_message().contains("re-authentication required"));
    }

    #[test]
    fn validation_errors_convert_into_query_errors() {
        let error: QueryError = ValidationError::InvalidDate {
            field: "date.from",
            value: "yesterday".to_owned(),
        }
        .into();
        assert!(error.user_message().contains("date.from"));
        assert!(error.to_string().starts_with("invalid filter"));
    }

    #[test]
    fn transport_failures_offer_retry() {
        let error = QueryError::Transport("connection refused".to_owned());
        assert!(error.user_message().contains("retry"));
    }
}
