// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Item detail document extraction.
//!
//! Labeled metadata ("Type: Scene Age Rating: Everyone ...") is read from
//! the collapsed visible text of the stats column. Each label's value runs
//! until the next label that may follow it, or until the file-size / posted
//! markers, or to the end of the text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use super::{collapse_whitespace, document_first, element_text, resolve_url, visible_text, PageExtractor};
use crate::catalog::ItemDetails;
use crate::error::ScoutResult;

const DESCRIPTION_LIMIT: usize = 1000;
const TAG_VALUE_LIMIT: usize = 100;

const PREVIEW_CANDIDATES: [&str; 3] = [
    "#previewImageMain",
    ".workshopItemPreviewImage img",
    ".highlight_screenshot img",
];

/// Labels in the order they terminate one another.
pub const TAG_LABELS: [&str; 10] = [
    "Miscellaneous",
    "Type",
    "Age Rating",
    "Genre",
    "Resolution",
    "Category",
    "Content Descriptors",
    "Script Type",
    "Asset Type",
    "Asset Genre",
];

const TAIL_MARKERS: [&str; 2] = ["File Size", "Posted"];

/// Reads title, description, preview, rating and labeled metadata.
pub struct DetailExtractor;

impl PageExtractor for DetailExtractor {
    type Output = ItemDetails;

    fn extract(&self, html: &str, location: &str) -> ScoutResult<ItemDetails> {
        let document = Html::parse_document(html);
        let mut details = ItemDetails::default();

        if let Some(el) = document_first(&document, ".workshopItemTitle") {
            details.title = element_text(&el);
        }

        if let Some(el) = document_first(&document, ".workshopItemDescription") {
            details.description = element_text(&el).chars().take(DESCRIPTION_LIMIT).collect();
        }

        details.preview_url = PREVIEW_CANDIDATES
            .iter()
            .filter_map(|css| document_first(&document, css))
            .filter_map(|el| el.value().attr("src").filter(|s| !s.trim().is_empty()))
            .map(|src| resolve_url(location, src))
            .next()
            .unwrap_or_default();

        if let Some(img) =
            document_first(&document, "#detailsHeaderRight > div > div.fileRatingDetails img")
        {
            details.rating_token = rating_token(img.value().attr("src").unwrap_or_default());
        }

        if let Some(el) = document_first(&document, "#detailsHeaderRight > div > div.numRatings") {
            details.rating_count = rating_count(&element_text(&el));
        }

        let text = document_first(&document, "#mainContents .col_right.responsive_local_menu")
            .or_else(|| document_first(&document, "body"))
            .map(visible_text)
            .unwrap_or_default();

        details.file_size = file_size(&text).unwrap_or_default();
        let (posted, updated) = dates(&text);
        details.posted_date = posted;
        details.updated_date = updated;
        details.tags = labeled_tags(&text);

        Ok(details)
    }
}

/// `https://cdn/x/4-star_large.png?v=2` becomes `4-star_large`.
fn rating_token(src: &str) -> String {
    let path = src.split('?').next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    [".png", ".jpg", ".gif"]
        .iter()
        .fold(file.to_string(), |name, ext| name.replace(ext, ""))
}

/// `"1,154 ratings"` becomes `"1154"`.
fn rating_count(text: &str) -> String {
    static COUNT_RE: OnceLock<Regex> = OnceLock::new();
    let re = COUNT_RE.get_or_init(|| Regex::new(r"\d[\d\s,\.]*").expect("count regex is valid"));
    re.find(text)
        .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect())
        .unwrap_or_default()
}

fn file_size(text: &str) -> Option<String> {
    static SIZE_RE: OnceLock<Regex> = OnceLock::new();
    let re = SIZE_RE.get_or_init(|| {
        Regex::new(r"(?i)File Size.*?(\d+(?:[.,]\d+)?)\s*(GB|MB|KB)").expect("size regex is valid")
    });
    let caps = re.captures(text)?;
    Some(format!("{} {}", &caps[1], caps[2].to_ascii_uppercase()))
}

const DATE_PATTERN: &str = r"\d{1,2}\s+\w{3},?\s*(?:\d{4})?\s*@\s*\d{1,2}:\d{2}(?:am|pm)?";

/// Posted date (first date after the marker) and updated date (second
/// date anywhere in the text).
fn dates(text: &str) -> (String, String) {
    static POSTED_RE: OnceLock<Regex> = OnceLock::new();
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let posted_re = POSTED_RE.get_or_init(|| {
        Regex::new(&format!("(?i)Posted.*?({DATE_PATTERN})")).expect("posted regex is valid")
    });
    let date_re = DATE_RE
        .get_or_init(|| Regex::new(&format!("(?i){DATE_PATTERN}")).expect("date regex is valid"));

    let posted = posted_re
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let updated = date_re
        .find_iter(text)
        .nth(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    (posted, updated)
}

/// Extract every labeled value present in `text`.
pub fn labeled_tags(text: &str) -> BTreeMap<String, String> {
    let text = collapse_whitespace(text);
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();

    let mut tags = BTreeMap::new();
    for (index, label) in TAG_LABELS.iter().enumerate() {
        if let Some(value) = labeled_value(&text, &lower, index) {
            tags.insert(label.to_string(), value);
        }
    }
    tags
}

fn labeled_value(text: &str, lower: &str, index: usize) -> Option<String> {
    let label = format!("{}:", TAG_LABELS[index]).to_ascii_lowercase();
    let start = find_label(lower, &label)? + label.len();
    let rest = &lower[start..];

    let terminators = TAG_LABELS[index + 1..]
        .iter()
        .map(|l| format!("{l}:"))
        .chain(TAIL_MARKERS.iter().map(|m| m.to_string()));
    let end = terminators
        .filter_map(|t| rest.find(&t.to_ascii_lowercase()))
        .min()
        .unwrap_or(rest.len());

    let value = text[start..start + end].trim();
    (!value.is_empty() && value.chars().count() < TAG_VALUE_LIMIT).then(|| value.to_string())
}

/// First occurrence of `label` that is not the tail of a longer label
/// (e.g. `type:` inside `script type:`).
fn find_label(lower: &str, label: &str) -> Option<usize> {
    let longer: Vec<String> = TAG_LABELS
        .iter()
        .map(|l| format!("{l}:").to_ascii_lowercase())
        .filter(|l| l.len() > label.len() && l.ends_with(label))
        .map(|l| l[..l.len() - label.len()].to_string())
        .collect();

    lower
        .match_indices(label)
        .map(|(pos, _)| pos)
        .find(|&pos| !longer.iter().any(|prefix| lower[..pos].ends_with(prefix.as_str())))
}
