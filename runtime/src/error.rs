// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for session flows.

use serde::{Deserialize, Serialize};

/// Why a sign-in attempt ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuthFailure {
    #[error("no credentials")]
    NoCredentials,

    #[error("failed to load login page")]
    LoginPageUnavailable,

    #[error("login form not found")]
    FormNotFound,

    #[error("submit button not found")]
    SubmitNotFound,

    #[error("second factor required")]
    SecondFactorRequired,

    #[error("{0}")]
    InlineError(String),

    #[error("login timeout")]
    Timeout,
}

/// Errors scoped to a single orchestrator operation.
///
/// None of these are fatal; each maps to one `OperationFailed` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoutError {
    #[error("authentication failed: {0}")]
    Authentication(AuthFailure),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("details fetch timeout")]
    DetailFetchTimeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("credential store error: {0}")]
    Credentials(String),
}

impl ScoutError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication(_) => FailureKind::Authentication,
            Self::Navigation(_) => FailureKind::Navigation,
            Self::Extraction(_) => FailureKind::Extraction,
            Self::DetailFetchTimeout => FailureKind::DetailFetchTimeout,
            Self::Network(_) => FailureKind::Network,
            Self::Credentials(_) => FailureKind::Credentials,
        }
    }
}

impl From<AuthFailure> for ScoutError {
    fn from(f: AuthFailure) -> Self {
        Self::Authentication(f)
    }
}

/// Serializable discriminant of [`ScoutError`], carried on failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Authentication,
    Navigation,
    Extraction,
    DetailFetchTimeout,
    Network,
    Credentials,
}

/// Convenience result type.
pub type ScoutResult<T> = Result<T, ScoutError>;
