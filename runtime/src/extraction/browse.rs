// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog result page extraction.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use super::{document_first, element_text, resolve_url, select_first, PageExtractor};
use crate::catalog::CatalogItem;
use crate::config::ASSUMED_PAGE_SIZE;
use crate::error::{ScoutError, ScoutResult};

const ITEM_CONTAINERS: &str = ".workshopItem, .workshopItemCollection";
const PAGING_CAPTION: &str = ".workshopBrowsePagingInfo";

/// Items and pagination read from one catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResult {
    pub items: Vec<CatalogItem>,
    /// Clamped to `[1, total_pages]`.
    pub current_page: u32,
    /// Always at least 1.
    pub total_pages: u32,
    pub total_items: u64,
}

/// Reads item cards and the "range of total" pagination caption.
pub struct BrowseExtractor;

impl PageExtractor for BrowseExtractor {
    type Output = BrowseResult;

    fn extract(&self, html: &str, location: &str) -> ScoutResult<BrowseResult> {
        if html.trim().is_empty() {
            return Err(ScoutError::Extraction("empty catalog document".into()));
        }
        let document = Html::parse_document(html);

        let items = extract_items(&document, location);
        let requested = page_param(location);
        let caption = document_first(&document, PAGING_CAPTION)
            .and_then(|el| parse_caption(&element_text(&el)));

        let (mut total_pages, mut total_items) = match caption {
            Some(c) => (c.total_pages(), c.total),
            None => (0, 0),
        };

        if !items.is_empty() && total_items == 0 {
            let (pages, estimated) = estimate_totals(requested, items.len());
            total_pages = pages;
            total_items = estimated;
        }

        total_pages = total_pages.max(1);
        let current_page = requested.clamp(1, total_pages);

        tracing::debug!(
            "parsed catalog page {current_page}/{total_pages}: {} items of {total_items}",
            items.len()
        );

        Ok(BrowseResult {
            items,
            current_page,
            total_pages,
            total_items,
        })
    }
}

fn extract_items(document: &Html, location: &str) -> Vec<CatalogItem> {
    let Ok(containers) = Selector::parse(ITEM_CONTAINERS) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for card in document.select(&containers) {
        let Some(link) = select_first(card, r#"a[href*="filedetails"]"#) else {
            continue;
        };
        let href = resolve_url(location, link.value().attr("href").unwrap_or_default());
        let Some(id) = item_id(&href) else {
            continue;
        };

        let title = select_first(card, ".workshopItemTitle")
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Wallpaper {id}"));

        let preview_url = select_first(card, "img")
            .and_then(|img| {
                let v = img.value();
                v.attr("src")
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| v.attr("data-src"))
            })
            .map(|src| resolve_url(location, src))
            .unwrap_or_default();

        let (author, author_url) = select_first(card, ".workshopItemAuthorName a")
            .map(|a| {
                (
                    element_text(&a),
                    resolve_url(location, a.value().attr("href").unwrap_or_default()),
                )
            })
            .unwrap_or_default();

        items.push(CatalogItem::stub(id, title, preview_url, author, author_url));
    }
    items
}

fn item_id(href: &str) -> Option<String> {
    static ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = ID_RE.get_or_init(|| Regex::new(r"id=(\d+)").expect("id regex is valid"));
    re.captures(href).map(|c| c[1].to_string())
}

/// The `p` query parameter of `location`, defaulting to 1.
fn page_param(location: &str) -> u32 {
    url::Url::parse(location)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "p")
                .and_then(|(_, v)| v.trim().parse::<u32>().ok())
        })
        .unwrap_or(1)
}

/// A parsed "start-end of total" caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PagingCaption {
    start: u64,
    end: u64,
    total: u64,
}

impl PagingCaption {
    fn total_pages(&self) -> u32 {
        let per_page = (self.end + 1).saturating_sub(self.start);
        if per_page == 0 {
            return 0;
        }
        u32::try_from(self.total.div_ceil(per_page)).unwrap_or(u32::MAX)
    }
}

fn parse_caption(text: &str) -> Option<PagingCaption> {
    static CAPTION_RE: OnceLock<Regex> = OnceLock::new();
    let re = CAPTION_RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)[\s\-–](\d+)\s+(?:of|из)\s+([\d,\. ]+)")
            .expect("paging caption regex is valid")
    });
    let caps = re.captures(text)?;
    Some(PagingCaption {
        start: parse_count(&caps[1])?,
        end: parse_count(&caps[2])?,
        total: parse_count(&caps[3])?,
    })
}

/// Digits with thousands separators and spaces removed.
fn parse_count(s: &str) -> Option<u64> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Fallback when no caption is present: assume [`ASSUMED_PAGE_SIZE`] items
/// per page and at least one full page up to the requested one.
fn estimate_totals(page: u32, found: usize) -> (u32, u64) {
    let page_size = u64::from(ASSUMED_PAGE_SIZE);
    let total = (found as u64).max(u64::from(page) * page_size);
    let pages = u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX);
    (pages.max(page), total)
}
