// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog page flow: navigate, settle, extract.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::debug;

use super::FlowContext;
use crate::config::PortalEndpoints;
use crate::error::{ScoutError, ScoutResult};
use crate::extraction::{BrowseResult, Extractors};

pub(crate) async fn load(
    flow: &FlowContext,
    extractors: &Extractors,
    query_url: &str,
) -> ScoutResult<BrowseResult> {
    let mut browser = flow.browser.lock().await;

    let nav = browser
        .navigate(query_url, flow.navigation_timeout_ms())
        .await
        .map_err(|e| ScoutError::Navigation(format!("failed to load page: {e:#}")))?;

    if PortalEndpoints::is_sign_in(&nav.final_url) {
        return Err(ScoutError::Navigation("sign-in required".into()));
    }
    debug!("catalog page loaded in {}ms", nav.load_time_ms);

    sleep(flow.timings.page_settle).await;

    let html = browser
        .get_html()
        .await
        .map_err(|e| ScoutError::Extraction(format!("failed to read page: {e:#}")))?;
    let location = browser.get_url().await.unwrap_or(nav.final_url);
    drop(browser);

    let extractor = Arc::clone(&extractors.browse);
    tokio::task::spawn_blocking(move || extractor.extract(&html, &location))
        .await
        .map_err(|e| ScoutError::Extraction(format!("extraction task failed: {e}")))?
}
