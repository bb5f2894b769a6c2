// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-page scripts and the shapes of their results.
//!
//! Templates carry `{{NAME}}` placeholders. Every substituted value is a
//! JSON literal, so strings arrive quoted and escaped.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

const DETAIL_FETCH: &str = include_str!("scripts/detail_fetch.js");
const DETAIL_POLL: &str = include_str!("scripts/detail_poll.js");
const FILL_LOGIN: &str = include_str!("scripts/fill_login.js");
const CHECK_LOGIN: &str = include_str!("scripts/check_login.js");

/// Start the in-page detail request for `url` under `request_id`.
///
/// Returns immediately; the outcome is read back with [`detail_poll`].
pub fn detail_fetch(url: &str, request_id: u64, abort_after: Duration) -> String {
    render(
        DETAIL_FETCH,
        &[
            ("URL", json_string(url)),
            ("REQUEST_ID", request_id.to_string()),
            ("ABORT_MS", abort_after.as_millis().to_string()),
        ],
    )
}

/// Read-only check of the detail request state.
pub fn detail_poll(request_id: u64) -> String {
    render(DETAIL_POLL, &[("REQUEST_ID", request_id.to_string())])
}

pub fn fill_login(login: &str, secret: &str) -> String {
    render(
        FILL_LOGIN,
        &[("LOGIN", json_string(login)), ("SECRET", json_string(secret))],
    )
}

pub fn check_login() -> String {
    CHECK_LOGIN.to_string()
}

fn json_string(s: &str) -> String {
    Value::from(s).to_string()
}

/// Single-pass placeholder substitution. Substituted text is never
/// rescanned, and unknown placeholders are left as they are.
fn render(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

// ── Results ──────────────────────────────────────────────────────────────────

/// One tick of the detail poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPoll {
    /// Not finished yet.
    Pending,
    /// The page state belongs to another request.
    Cancelled,
    /// The in-page request failed; `"Timeout"` marks an abort.
    Failed(String),
    /// The raw detail document.
    Document(String),
    /// Anything else.
    Malformed,
}

impl DetailPoll {
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::Pending;
        }
        let Some(obj) = value.as_object() else {
            return Self::Malformed;
        };
        if obj.get("cancelled").and_then(Value::as_bool) == Some(true) {
            return Self::Cancelled;
        }
        if let Some(error) = obj.get("error") {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Self::Failed(message);
        }
        match obj.get("html").and_then(Value::as_str) {
            Some(html) => Self::Document(html.to_string()),
            None => Self::Malformed,
        }
    }
}

/// Result of one sign-in form attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FillOutcome {
    pub ready: bool,
    pub clicked: bool,
}

impl FillOutcome {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Error and second-factor indicators on the sign-in surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginCheck {
    pub has_error: bool,
    pub error_text: String,
    pub has_guard: bool,
}

impl LoginCheck {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}
