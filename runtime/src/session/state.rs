// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-flow state machines owned by the orchestrator actor.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogFilters;
use crate::error::AuthFailure;

/// Sign-in state machine.
///
/// `Unauthenticated → CheckingSession → FillingCredentials →
/// AwaitingSubmitResult → VerifyingSuccess → Authenticated`, with `Failed`
/// reachable from every in-progress state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unauthenticated,
    CheckingSession,
    FillingCredentials,
    AwaitingSubmitResult,
    VerifyingSuccess,
    Authenticated,
    Failed(AuthFailure),
}

impl AuthState {
    /// An attempt is underway; new attempts are ignored.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::CheckingSession
                | Self::FillingCredentials
                | Self::AwaitingSubmitResult
                | Self::VerifyingSuccess
        )
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Catalog page flow. Only one load runs at a time.
#[derive(Debug, Clone, Default)]
pub(crate) enum PageFlow {
    #[default]
    Idle,
    Loading {
        query_url: String,
        filters: CatalogFilters,
    },
}

impl PageFlow {
    pub(crate) fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// The filters of the load in flight for `query_url`, if it is current.
    pub(crate) fn matching(&self, query_url: &str) -> Option<&CatalogFilters> {
        match self {
            Self::Loading {
                query_url: current,
                filters,
            } if current == query_url => Some(filters),
            _ => None,
        }
    }
}

/// Detail flow. A new request supersedes the one in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum DetailFlow {
    #[default]
    Idle,
    Fetching { item_id: String, request_id: u64 },
}

impl DetailFlow {
    pub(crate) fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching { .. })
    }

    pub(crate) fn is_current(&self, request_id: u64) -> bool {
        matches!(self, Self::Fetching { request_id: current, .. } if *current == request_id)
    }
}
