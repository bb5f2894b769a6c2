// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog data model: items, pages, filters and the two-level cache.

pub mod cache;
pub mod filters;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use cache::CatalogCache;
pub use filters::CatalogFilters;

/// One catalog entry, identified by its stable external id.
///
/// Created as a stub from a catalog page sighting and enriched in place
/// when its detail record arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub preview_url: String,
    pub author: String,
    pub author_url: String,

    pub description: String,
    pub file_size: String,
    pub posted_date: String,
    pub updated_date: String,
    pub tags: BTreeMap<String, String>,

    /// Rating icon file stem, e.g. `4-star_large`.
    pub rating_token: String,
    /// Number of ratings as a bare digit string.
    pub rating_count: String,

    pub is_installed: bool,
    pub is_downloading: bool,
}

impl CatalogItem {
    /// Summary record as first seen on a catalog page.
    pub fn stub(
        id: impl Into<String>,
        title: impl Into<String>,
        preview_url: impl Into<String>,
        author: impl Into<String>,
        author_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            preview_url: preview_url.into(),
            author: author.into(),
            author_url: author_url.into(),
            ..Default::default()
        }
    }

    /// Whether a detail record has been merged in.
    pub fn has_details(&self) -> bool {
        !self.file_size.is_empty()
    }

    /// Take the summary fields of a fresh page sighting, keeping details.
    ///
    /// Blank fields in the sighting leave the known value in place.
    pub fn refresh_summary(&mut self, seen: &CatalogItem) {
        for (field, value) in [
            (&mut self.title, &seen.title),
            (&mut self.preview_url, &seen.preview_url),
            (&mut self.author, &seen.author),
            (&mut self.author_url, &seen.author_url),
        ] {
            if !value.is_empty() {
                field.clone_from(value);
            }
        }
    }

    /// Build the enriched record for `id` from a detail extraction.
    ///
    /// Title and preview fall back to the existing record when the detail
    /// document lacks them. Author fields are never carried by detail
    /// documents and always come from the existing record.
    pub fn with_details(id: &str, details: ItemDetails, existing: Option<&CatalogItem>) -> Self {
        Self {
            id: id.to_string(),
            title: or_existing(details.title, existing.map(|e| &e.title)),
            preview_url: or_existing(details.preview_url, existing.map(|e| &e.preview_url)),
            author: existing.map(|e| e.author.clone()).unwrap_or_default(),
            author_url: existing.map(|e| e.author_url.clone()).unwrap_or_default(),
            description: details.description,
            file_size: details.file_size,
            posted_date: details.posted_date,
            updated_date: details.updated_date,
            tags: details.tags,
            rating_token: details.rating_token,
            rating_count: details.rating_count,
            is_installed: existing.map(|e| e.is_installed).unwrap_or(false),
            is_downloading: existing.map(|e| e.is_downloading).unwrap_or(false),
        }
    }

    /// Copy local install state from a collaborator.
    pub fn annotate(&mut self, status: &dyn InstallStatus) {
        self.is_installed = status.is_installed(&self.id);
        self.is_downloading = status.is_downloading(&self.id);
    }
}

fn or_existing(new: String, existing: Option<&String>) -> String {
    if new.is_empty() {
        existing.cloned().unwrap_or_default()
    } else {
        new
    }
}

/// Fields parsed from an item's detail document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub title: String,
    pub description: String,
    pub preview_url: String,
    pub file_size: String,
    pub posted_date: String,
    pub updated_date: String,
    pub tags: BTreeMap<String, String>,
    pub rating_token: String,
    pub rating_count: String,
}

/// One parsed catalog result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub current_page: u32,
    /// Always at least 1.
    pub total_pages: u32,
    pub total_items: u64,
    pub filters: CatalogFilters,
}

/// Local install state, owned by the download subsystem.
pub trait InstallStatus: Send + Sync {
    fn is_installed(&self, id: &str) -> bool;

    fn is_downloading(&self, _id: &str) -> bool {
        false
    }
}
