// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog session orchestrator.
//!
//! One actor task owns the auth, page and detail state machines together
//! with the [`CatalogCache`](crate::catalog::CatalogCache). Browser work
//! runs in short-lived flow tasks that share the single browser context
//! behind a mutex and report back over an internal completion channel.
//! Public entry points only post commands, so none of them waits on the
//! browser.

pub mod details;
pub mod login;
pub mod orchestrator;
pub mod page;
pub mod scripts;
pub mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::catalog::ItemDetails;
use crate::config::{PortalEndpoints, SessionTimings};
use crate::error::{AuthFailure, ScoutResult};
use crate::extraction::BrowseResult;
use crate::renderer::RenderContext;

pub use orchestrator::{CatalogSession, CatalogSessionBuilder};
pub use state::AuthState;

/// The single browser context, used by one flow at a time.
pub type SharedContext = Arc<Mutex<Box<dyn RenderContext>>>;

/// Flow outcomes delivered back to the actor.
#[derive(Debug)]
pub(crate) enum Completion {
    AuthProgress(AuthState),
    AuthFinished(Result<(), AuthFailure>),
    PageFinished {
        query_url: String,
        result: ScoutResult<BrowseResult>,
    },
    /// `Ok(None)` marks a superseded request and is dropped silently.
    DetailsFinished {
        item_id: String,
        request_id: u64,
        result: ScoutResult<Option<ItemDetails>>,
    },
}

/// Everything a flow task needs, cloned into each one.
#[derive(Clone)]
pub(crate) struct FlowContext {
    pub browser: SharedContext,
    pub endpoints: PortalEndpoints,
    pub timings: SessionTimings,
    pub completions: mpsc::UnboundedSender<Completion>,
}

impl FlowContext {
    pub fn complete(&self, completion: Completion) {
        if self.completions.send(completion).is_err() {
            tracing::debug!("session actor gone; dropping flow completion");
        }
    }

    pub fn navigation_timeout_ms(&self) -> u64 {
        self.timings.navigation_timeout.as_millis() as u64
    }
}
