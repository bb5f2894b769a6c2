// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Item detail flow.
//!
//! Two phases: an injected script starts the detail request inside the
//! page, then a poll loop reads its outcome back. Each request carries an
//! id; once a newer request is issued every check against the shared
//! counter fails and the older flow returns `Ok(None)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::debug;

use super::scripts::{self, DetailPoll};
use super::FlowContext;
use crate::catalog::ItemDetails;
use crate::error::{ScoutError, ScoutResult};
use crate::extraction::Extractors;

/// The in-page abort reports itself with this error text.
const ABORT_TOKEN: &str = "Timeout";

pub(crate) struct DetailRequest {
    pub item_id: String,
    pub request_id: u64,
    pub current: Arc<AtomicU64>,
    /// No page load was running when the request was issued.
    pub page_idle: bool,
}

impl DetailRequest {
    fn is_stale(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.request_id
    }
}

pub(crate) async fn fetch(
    flow: &FlowContext,
    extractors: &Extractors,
    request: &DetailRequest,
) -> ScoutResult<Option<ItemDetails>> {
    let mut browser = flow.browser.lock().await;
    if request.is_stale() {
        return Ok(None);
    }

    let details_url = flow.endpoints.details_url(&request.item_id);
    let location = browser.get_url().await.unwrap_or_default();

    if !(request.page_idle && flow.endpoints.is_on_site(&location)) {
        debug!("navigating to {details_url} before detail request");
        browser
            .navigate(&details_url, flow.navigation_timeout_ms())
            .await
            .map_err(|e| ScoutError::Navigation(format!("failed to load details page: {e:#}")))?;
        sleep(flow.timings.detail_settle).await;
        if request.is_stale() {
            return Ok(None);
        }
    }

    let start = scripts::detail_fetch(&details_url, request.request_id, flow.timings.detail_fetch_abort);
    browser
        .execute_js(&start)
        .await
        .map_err(|e| ScoutError::Extraction(format!("failed to start detail request: {e:#}")))?;

    let poll = scripts::detail_poll(request.request_id);
    let attempts = flow.timings.detail_poll_attempts().max(1);
    for tick in 1..=attempts {
        if request.is_stale() {
            return Ok(None);
        }

        let value = browser
            .execute_js(&poll)
            .await
            .map_err(|e| ScoutError::Extraction(format!("detail poll failed: {e:#}")))?;

        match DetailPoll::from_value(&value) {
            DetailPoll::Pending => {
                debug!("detail request {} pending (tick {tick})", request.request_id);
                sleep(flow.timings.detail_poll_interval).await;
            }
            DetailPoll::Cancelled => return Ok(None),
            DetailPoll::Failed(message) if message == ABORT_TOKEN => {
                return Err(ScoutError::DetailFetchTimeout)
            }
            DetailPoll::Failed(message) => return Err(ScoutError::Network(message)),
            DetailPoll::Document(html) => {
                drop(browser);
                let extractor = Arc::clone(&extractors.details);
                return tokio::task::spawn_blocking(move || extractor.extract(&html, &details_url))
                    .await
                    .map_err(|e| ScoutError::Extraction(format!("extraction task failed: {e}")))?
                    .map(Some);
            }
            DetailPoll::Malformed => {
                return Err(ScoutError::Extraction("malformed detail result".into()))
            }
        }
    }

    Err(ScoutError::DetailFetchTimeout)
}
