// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scout event bus: typed events from the session orchestrator.
//!
//! The EventBus is a `tokio::sync::broadcast` channel that carries
//! [`ScoutEvent`] values. Presentation code, the CLI and log sinks can
//! subscribe independently. When no subscribers exist, events are silently
//! dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::catalog::{CatalogItem, CatalogPage};
use crate::error::{FailureKind, ScoutError};
use crate::session::AuthState;

/// Which flow an [`ScoutEvent::OperationFailed`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Authenticate,
    LoadPage,
    LoadDetails,
}

/// Every event Scout emits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScoutEvent {
    // ── Session Events ────────────────────
    /// The sign-in state machine moved.
    AuthStateChanged { state: AuthState },
    /// The session is signed in (also sent when already signed in).
    LoginSucceeded,

    // ── Catalog Events ────────────────────
    /// A catalog page is being fetched through the browser.
    PageLoadingStarted { query_url: String },
    /// A catalog page is available.
    PageLoaded { page: CatalogPage, from_cache: bool },

    // ── Detail Events ─────────────────────
    /// A detail fetch was issued.
    DetailsLoadingStarted { item_id: String, request_id: u64 },
    /// An enriched item record is available.
    DetailsLoaded { item: CatalogItem, from_cache: bool },

    // ── Failures ──────────────────────────
    /// One failed operation. Emitted exactly once per failure.
    OperationFailed {
        operation: Operation,
        kind: FailureKind,
        message: String,
        timestamp: String,
    },
}

impl ScoutEvent {
    pub fn failed(operation: Operation, error: &ScoutError) -> Self {
        Self::OperationFailed {
            operation,
            kind: error.kind(),
            message: error.to_string(),
            timestamp: now_timestamp(),
        }
    }
}

/// The central event bus.
///
/// Cloning yields another handle onto the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScoutEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: ScoutEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScoutEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// RFC 3339 timestamp for the current time.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
