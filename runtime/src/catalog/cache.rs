// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog cache: parsed pages by query URL and items by id.
//!
//! Two independent LRU maps. Reads promote; inserting a new key into a
//! full map evicts the least-recently-used entry first.

use scout_assets::LruMap;

use super::{CatalogItem, CatalogPage};
use crate::config::CatalogCacheConfig;

pub struct CatalogCache {
    pages: LruMap<String, CatalogPage>,
    items: LruMap<String, CatalogItem>,
}

impl CatalogCache {
    pub fn new(config: CatalogCacheConfig) -> Self {
        Self {
            pages: LruMap::new(config.max_pages),
            items: LruMap::new(config.max_items),
        }
    }

    pub fn get_page(&mut self, query_url: &str) -> Option<&CatalogPage> {
        let hit = self.pages.get(query_url);
        tracing::debug!(
            "catalog page cache {}: {query_url}",
            if hit.is_some() { "hit" } else { "miss" }
        );
        hit
    }

    pub fn set_page(&mut self, query_url: impl Into<String>, page: CatalogPage) {
        if let Some((evicted, _)) = self.pages.insert(query_url.into(), page) {
            tracing::debug!("evicting LRU catalog page: {evicted}");
        }
    }

    pub fn get_item(&mut self, id: &str) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    /// Read an item without promoting it.
    pub fn peek_item(&self, id: &str) -> Option<&CatalogItem> {
        self.items.peek(id)
    }

    pub fn set_item(&mut self, item: CatalogItem) {
        if let Some((evicted, _)) = self.items.insert(item.id.clone(), item) {
            tracing::debug!("evicting LRU catalog item: {evicted}");
        }
    }

    /// Merge a catalog page sighting: refresh summary fields of a known
    /// record, or insert a new stub.
    pub fn merge_summary(&mut self, seen: &CatalogItem) {
        match self.items.get_mut(seen.id.as_str()) {
            Some(existing) => existing.refresh_summary(seen),
            None => self.set_item(seen.clone()),
        }
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.items.clear();
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(CatalogCacheConfig::default())
    }
}
