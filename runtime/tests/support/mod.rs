// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scripted in-memory portal used by the session flow tests.
//!
//! Documents are keyed by URL. In-page scripts are recognised by a marker
//! string and answered from the configured login form and detail replies.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use scout_runtime::config::{PortalEndpoints, ScoutConfig, SessionTimings};
use scout_runtime::renderer::{NavigationResult, RenderContext};
use scout_runtime::ScoutEvent;

pub const SITE: &str = "https://portal.test";

pub fn endpoints() -> PortalEndpoints {
    PortalEndpoints::new(SITE, "1")
}

/// Millisecond timings so the flows finish quickly.
pub fn fast_timings() -> SessionTimings {
    SessionTimings {
        navigation_timeout: Duration::from_millis(1000),
        login_settle: Duration::from_millis(1),
        login_form_attempts: 20,
        login_form_retry: Duration::from_millis(1),
        login_submit_wait: Duration::from_millis(1),
        login_check_interval: Duration::from_millis(1),
        login_timeout: Duration::from_millis(40),
        page_settle: Duration::from_millis(1),
        detail_settle: Duration::from_millis(1),
        detail_fetch_abort: Duration::from_millis(8000),
        detail_poll_interval: Duration::from_millis(1),
        detail_timeout: Duration::from_millis(400),
    }
}

pub fn test_config() -> ScoutConfig {
    ScoutConfig {
        endpoints: endpoints(),
        timings: fast_timings(),
        ..ScoutConfig::default()
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn card(id: &str, title: &str) -> String {
    format!(
        r#"<div class="workshopItem">
             <a href="/sharedfiles/filedetails/?id={id}&searchtext=">
               <img class="workshopItemPreviewImage" src="https://cdn.test/{id}.jpg">
             </a>
             <div class="workshopItemTitle">{title}</div>
             <div class="workshopItemAuthorName">by&nbsp;<a href="{SITE}/id/ann/myworkshopfiles">ann</a></div>
           </div>"#
    )
}

/// A catalog document with one card per id and an optional paging caption.
pub fn catalog_page(ids: &[&str], caption: Option<&str>) -> String {
    let cards: String = ids.iter().map(|id| card(id, &format!("Item {id}"))).collect();
    let caption = caption
        .map(|c| format!(r#"<div class="workshopBrowsePagingInfo">Showing {c} entries</div>"#))
        .unwrap_or_default();
    format!("<html><body><div id=\"workshopItems\">{cards}</div>{caption}</body></html>")
}

pub fn detail_page(title: &str) -> String {
    format!(
        r#"<html><body><div id="mainContents">
             <div class="workshopItemTitle">{title}</div>
             <div class="workshopItemDescription">Rainy night scene.</div>
             <div class="col_right responsive_local_menu">
               <div class="workshopTags">Type: Scene</div>
               <div class="detailsStatsContainerLeft"><div>File Size</div><div>Posted</div></div>
               <div class="detailsStatsContainerRight"><div>48.213 MB</div><div>5 Mar, 2023 @ 4:12pm</div></div>
             </div>
           </div></body></html>"#
    )
}

// ── Scripted behaviour ───────────────────────────────────────────────────────

/// What the sign-in form does when the fill script runs.
#[derive(Debug, Clone)]
pub enum LoginForm {
    Missing,
    NoSubmit,
    Submits(SubmitOutcome),
}

/// What the portal does after submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Redirect(String),
    Guard,
    InlineError(String),
    Stay,
}

/// How the in-page detail request settles.
#[derive(Debug, Clone)]
pub enum DetailReply {
    Html(String),
    Error(String),
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    Fill,
    Check,
    Inject(String),
    Poll,
}

struct PendingDetail {
    request_id: u64,
    item_id: String,
    polls: u32,
}

struct PortalState {
    location: String,
    documents: HashMap<String, String>,
    redirects: HashMap<String, String>,
    failing: HashSet<String>,
    login_form: LoginForm,
    submitted: Option<SubmitOutcome>,
    detail_replies: HashMap<String, DetailReply>,
    detail_delay_polls: u32,
    hold_polls: bool,
    pending: Option<PendingDetail>,
    calls: Vec<Call>,
    closed: bool,
}

/// Shared handle onto the scripted portal; clones see the same state.
#[derive(Clone)]
pub struct MockPortal {
    state: Arc<Mutex<PortalState>>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PortalState {
                location: "about:blank".into(),
                documents: HashMap::new(),
                redirects: HashMap::new(),
                failing: HashSet::new(),
                login_form: LoginForm::Missing,
                submitted: None,
                detail_replies: HashMap::new(),
                detail_delay_polls: 0,
                hold_polls: false,
                pending: None,
                calls: Vec::new(),
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    pub fn browser(&self) -> Box<dyn RenderContext> {
        Box::new(ScriptedBrowser {
            portal: self.clone(),
        })
    }

    pub fn document(&self, url: impl Into<String>, html: impl Into<String>) -> &Self {
        self.lock().documents.insert(url.into(), html.into());
        self
    }

    pub fn redirect(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        self.lock().redirects.insert(from.into(), to.into());
        self
    }

    pub fn fail_navigation(&self, url: impl Into<String>) -> &Self {
        self.lock().failing.insert(url.into());
        self
    }

    pub fn login_form(&self, form: LoginForm) -> &Self {
        self.lock().login_form = form;
        self
    }

    pub fn detail_reply(&self, item_id: impl Into<String>, reply: DetailReply) -> &Self {
        self.lock().detail_replies.insert(item_id.into(), reply);
        self
    }

    /// Polls answer "pending" this many times before the reply is visible.
    pub fn detail_delay(&self, polls: u32) -> &Self {
        self.lock().detail_delay_polls = polls;
        self
    }

    /// While held, every poll answers "pending".
    pub fn hold_polls(&self, hold: bool) -> &Self {
        self.lock().hold_polls = hold;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Navigate(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Poll until `pred` holds for the call log, or panic after two seconds.
    pub async fn wait_until(&self, pred: impl Fn(&[Call]) -> bool) {
        for _ in 0..400 {
            if pred(&self.lock().calls) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached; calls: {:?}", self.calls());
    }

    fn run_script(&self, script: &str) -> Value {
        let mut state = self.lock();
        if script.contains("AbortController") {
            inject_detail(&mut state, script)
        } else if script.contains("__scoutDetails") {
            poll_detail(&mut state, script)
        } else if script.contains("HTMLInputElement") {
            fill_login(&mut state)
        } else if script.contains("hasGuard") {
            check_login(&mut state)
        } else {
            Value::Null
        }
    }
}

fn capture(script: &str, pattern: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(script)
        .map(|c| c[1].to_string())
}

fn inject_detail(state: &mut PortalState, script: &str) -> Value {
    let request_id = capture(script, r"const requestId = (\d+);")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let item_id = capture(script, r"id=(\d+)").unwrap_or_default();
    state.calls.push(Call::Inject(item_id.clone()));
    state.pending = Some(PendingDetail {
        request_id,
        item_id,
        polls: 0,
    });
    json!(true)
}

fn poll_detail(state: &mut PortalState, script: &str) -> Value {
    state.calls.push(Call::Poll);
    if state.hold_polls {
        return Value::Null;
    }
    let polled: u64 = capture(script, r"!== (\d+)")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let delay = state.detail_delay_polls;

    let Some(pending) = state.pending.as_mut() else {
        return Value::Null;
    };
    if pending.request_id != polled {
        return json!({ "cancelled": true });
    }
    pending.polls += 1;
    if pending.polls <= delay {
        return Value::Null;
    }

    let reply = state
        .detail_replies
        .get(&pending.item_id)
        .cloned()
        .unwrap_or(DetailReply::Never);
    let value = match reply {
        DetailReply::Html(html) => json!({ "html": html }),
        DetailReply::Error(error) => json!({ "error": error }),
        DetailReply::Never => return Value::Null,
    };
    state.pending = None;
    value
}

fn fill_login(state: &mut PortalState) -> Value {
    state.calls.push(Call::Fill);
    match state.login_form.clone() {
        LoginForm::Missing => json!({ "ready": false }),
        LoginForm::NoSubmit => json!({ "ready": true, "clicked": false }),
        LoginForm::Submits(outcome) => {
            if let SubmitOutcome::Redirect(url) = &outcome {
                state.location = url.clone();
            }
            state.submitted = Some(outcome);
            json!({ "ready": true, "clicked": true })
        }
    }
}

fn check_login(state: &mut PortalState) -> Value {
    state.calls.push(Call::Check);
    match &state.submitted {
        Some(SubmitOutcome::Guard) => {
            json!({ "hasError": false, "errorText": "", "hasGuard": true })
        }
        Some(SubmitOutcome::InlineError(text)) => {
            json!({ "hasError": true, "errorText": text, "hasGuard": false })
        }
        _ => json!({ "hasError": false, "errorText": "", "hasGuard": false }),
    }
}

struct ScriptedBrowser {
    portal: MockPortal,
}

#[async_trait]
impl RenderContext for ScriptedBrowser {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut state = self.portal.lock();
        state.calls.push(Call::Navigate(url.to_string()));
        if state.failing.contains(url) {
            bail!("net::ERR_CONNECTION_RESET");
        }
        let final_url = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.location = final_url.clone();
        state.pending = None;
        Ok(NavigationResult {
            final_url,
            status: 200,
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        Ok(self.portal.run_script(script))
    }

    async fn get_html(&self) -> Result<String> {
        let state = self.portal.lock();
        Ok(state
            .documents
            .get(&state.location)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.portal.lock().location.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.portal.lock().closed = true;
        Ok(())
    }
}

// ── Event helpers ────────────────────────────────────────────────────────────

/// The next event matching `pred`, skipping others. Panics after five seconds.
pub async fn next_event(
    rx: &mut broadcast::Receiver<ScoutEvent>,
    pred: impl Fn(&ScoutEvent) -> bool,
) -> ScoutEvent {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for event")
}

/// Every event already queued on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<ScoutEvent>) -> Vec<ScoutEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
