// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page extraction strategies.
//!
//! The portal's markup is an unstable external contract, so each page type
//! gets its own replaceable extractor tested against fixed fixture
//! documents. Entry points are synchronous because `scraper`'s DOM types
//! are `!Send`; callers parse inside a blocking section and only carry the
//! owned result across await points.

pub mod browse;
pub mod details;

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};

use crate::catalog::ItemDetails;
use crate::error::ScoutResult;

pub use browse::{BrowseExtractor, BrowseResult};
pub use details::DetailExtractor;

/// Turns one fetched document into a typed result.
pub trait PageExtractor: Send + Sync {
    type Output;

    /// `location` is the document's URL, used to resolve relative links.
    fn extract(&self, html: &str, location: &str) -> ScoutResult<Self::Output>;
}

/// The extractor set used by the orchestrator.
#[derive(Clone)]
pub struct Extractors {
    pub browse: Arc<dyn PageExtractor<Output = BrowseResult>>,
    pub details: Arc<dyn PageExtractor<Output = ItemDetails>>,
}

impl Default for Extractors {
    fn default() -> Self {
        Self {
            browse: Arc::new(BrowseExtractor),
            details: Arc::new(DetailExtractor),
        }
    }
}

// ── Shared DOM helpers ───────────────────────────────────────────────────────

pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    let first = scope.select(&sel).next();
    first
}

pub(crate) fn document_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    let first = document.select(&sel).next();
    first
}

/// Text content with whitespace runs collapsed to single spaces.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text a reader would see: script and style bodies are skipped.
pub(crate) fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| matches!(el.value().name(), "script" | "style" | "noscript" | "template"));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against `base` the way a browser resolves `element.src`.
pub(crate) fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}
