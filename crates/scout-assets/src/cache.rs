// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared preview cache with request coalescing.
//!
//! ## Admission
//!
//! Before every insertion the cache evicts, oldest-first, while the tracked
//! byte total plus the incoming asset would exceed the memory ceiling. A
//! sub-cache already above its own entry ceiling is drained first;
//! otherwise the sub-cache holding more tracked bytes gives way. After the
//! memory pass, entry ceilings are enforced on their own so they hold even
//! when the byte total is small.
//!
//! ## Coalescing
//!
//! At most one fetch is in flight per URL. Later callers for the same URL
//! join its waiter list; every waiter hears the single outcome exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::decode::decode;
use crate::fetch::{AssetFetcher, HttpAssetFetcher};
use crate::lru::LruMap;
use crate::types::{
    Asset, AssetCacheConfig, AssetError, AssetKind, AssetResult, CacheStats, LoadOutcome,
};

/// Callback invoked once when a load settles.
pub type Waiter = Box<dyn FnOnce(LoadOutcome) + Send + 'static>;

/// How a [`AssetCache::load`] call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Served from cache; the callback already ran.
    Cached,
    /// Attached to a fetch already in flight for the same URL.
    Joined,
    /// A new fetch was issued.
    Started,
    /// The URL was empty; the callback already ran with an error.
    Rejected,
}

struct Entry<T> {
    value: T,
    size: u64,
}

struct PendingFetch {
    generation: u64,
    task: Option<AbortHandle>,
    waiters: Vec<Waiter>,
}

struct CacheState {
    images: LruMap<String, Entry<Arc<DynamicImage>>>,
    animations: LruMap<String, Entry<Bytes>>,
    static_bytes: u64,
    animated_bytes: u64,
    pending: HashMap<String, PendingFetch>,
    next_generation: u64,
}

impl CacheState {
    fn new() -> Self {
        Self {
            images: LruMap::unbounded(),
            animations: LruMap::unbounded(),
            static_bytes: 0,
            animated_bytes: 0,
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    fn total_bytes(&self) -> u64 {
        self.static_bytes + self.animated_bytes
    }

    fn count(&self, kind: AssetKind) -> usize {
        match kind {
            AssetKind::Static => self.images.len(),
            AssetKind::Animated => self.animations.len(),
        }
    }

    fn evict_oldest(&mut self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Static => match self.images.pop_lru() {
                Some((url, entry)) => {
                    self.static_bytes = self.static_bytes.saturating_sub(entry.size);
                    tracing::debug!("evicted static asset {url} ({} bytes)", entry.size);
                    true
                }
                None => false,
            },
            AssetKind::Animated => match self.animations.pop_lru() {
                Some((url, entry)) => {
                    self.animated_bytes = self.animated_bytes.saturating_sub(entry.size);
                    tracing::debug!("evicted animated asset {url} ({} bytes)", entry.size);
                    true
                }
                None => false,
            },
        }
    }

    /// Sub-cache holding more tracked bytes, ties going to the static side.
    fn larger_sub_cache(&self) -> Option<AssetKind> {
        match (self.images.is_empty(), self.animations.is_empty()) {
            (true, true) => None,
            (false, true) => Some(AssetKind::Static),
            (true, false) => Some(AssetKind::Animated),
            (false, false) if self.static_bytes >= self.animated_bytes => Some(AssetKind::Static),
            (false, false) => Some(AssetKind::Animated),
        }
    }

    fn remove(&mut self, url: &str) {
        if let Some(entry) = self.images.remove(url) {
            self.static_bytes = self.static_bytes.saturating_sub(entry.size);
        }
        if let Some(entry) = self.animations.remove(url) {
            self.animated_bytes = self.animated_bytes.saturating_sub(entry.size);
        }
    }

    fn drain_pending(&mut self) -> Vec<Waiter> {
        let mut waiters = Vec::new();
        for (_, pending) in self.pending.drain() {
            if let Some(task) = pending.task {
                task.abort();
            }
            waiters.extend(pending.waiters);
        }
        waiters
    }
}

/// Memory-bounded cache of preview images and animations.
///
/// Construct once per process and share the returned `Arc` with every
/// component that displays previews. Loads must be issued from within a
/// Tokio runtime.
pub struct AssetCache {
    config: AssetCacheConfig,
    fetcher: Arc<dyn AssetFetcher>,
    state: Mutex<CacheState>,
}

impl AssetCache {
    /// Create a cache backed by the given fetcher.
    pub fn new(config: AssetCacheConfig, fetcher: Arc<dyn AssetFetcher>) -> Arc<Self> {
        tracing::debug!(
            "asset cache ready: ceiling={}MB static<{} animated<{}",
            config.memory_ceiling / (1024 * 1024),
            config.max_static,
            config.max_animated
        );
        Arc::new(Self {
            config,
            fetcher,
            state: Mutex::new(CacheState::new()),
        })
    }

    /// Create a cache that downloads over HTTP.
    pub fn with_http(config: AssetCacheConfig) -> Arc<Self> {
        Self::new(config, Arc::new(HttpAssetFetcher::new()))
    }

    pub fn config(&self) -> &AssetCacheConfig {
        &self.config
    }

    /// Decoded still image for `url`, promoting it on a hit.
    pub fn get_cached_image(&self, url: &str) -> Option<Arc<DynamicImage>> {
        let mut state = self.state.lock();
        state.images.get(url).map(|entry| Arc::clone(&entry.value))
    }

    /// Raw animated payload for `url`, promoting it on a hit.
    pub fn get_cached_animation(&self, url: &str) -> Option<Bytes> {
        let mut state = self.state.lock();
        state.animations.get(url).map(|entry| entry.value.clone())
    }

    /// Whichever kind of asset is cached for `url`.
    pub fn get_cached(&self, url: &str) -> Option<Asset> {
        let mut state = self.state.lock();
        if let Some(entry) = state.images.get(url) {
            return Some(Asset::Static(Arc::clone(&entry.value)));
        }
        state
            .animations
            .get(url)
            .map(|entry| Asset::Animated(entry.value.clone()))
    }

    pub fn is_cached(&self, url: &str) -> bool {
        let state = self.state.lock();
        state.images.contains_key(url) || state.animations.contains_key(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.state.lock().pending.contains_key(url)
    }

    /// Load `url`, invoking `callback` exactly once with the outcome.
    ///
    /// A cache hit runs the callback before returning. A URL already in
    /// flight gains another waiter and no new fetch is issued.
    pub fn load<F>(self: &Arc<Self>, url: &str, callback: F) -> LoadStatus
    where
        F: FnOnce(LoadOutcome) + Send + 'static,
    {
        self.load_inner(url, Some(Box::new(callback)))
    }

    fn load_inner(self: &Arc<Self>, url: &str, waiter: Option<Waiter>) -> LoadStatus {
        if url.is_empty() {
            if let Some(waiter) = waiter {
                waiter(LoadOutcome {
                    url: String::new(),
                    result: Err(AssetError::InvalidUrl(String::new())),
                    fetched: false,
                });
            }
            return LoadStatus::Rejected;
        }

        let mut state = self.state.lock();

        let hit = if let Some(entry) = state.images.get(url) {
            Some(Asset::Static(Arc::clone(&entry.value)))
        } else {
            state
                .animations
                .get(url)
                .map(|entry| Asset::Animated(entry.value.clone()))
        };
        if let Some(asset) = hit {
            drop(state);
            if let Some(waiter) = waiter {
                waiter(LoadOutcome {
                    url: url.to_string(),
                    result: Ok(asset),
                    fetched: false,
                });
            }
            return LoadStatus::Cached;
        }

        if let Some(pending) = state.pending.get_mut(url) {
            pending.waiters.extend(waiter);
            return LoadStatus::Joined;
        }

        state.next_generation += 1;
        let generation = state.next_generation;

        let cache = Arc::clone(self);
        let owned = url.to_string();
        let task = tokio::spawn(async move {
            let result = match cache.fetcher.fetch(&owned).await {
                Ok(data) => tokio::task::spawn_blocking(move || decode(data))
                    .await
                    .unwrap_or_else(|e| Err(AssetError::Decode(format!("decoder task failed: {e}")))),
                Err(e) => Err(e),
            };
            cache.complete(&owned, generation, result);
        });

        state.pending.insert(
            url.to_string(),
            PendingFetch {
                generation,
                task: Some(task.abort_handle()),
                waiters: waiter.into_iter().collect(),
            },
        );
        LoadStatus::Started
    }

    /// Load `url` and wait for the outcome.
    pub async fn fetch(self: &Arc<Self>, url: &str) -> AssetResult<Asset> {
        let (tx, rx) = oneshot::channel();
        self.load(url, move |outcome| {
            let _ = tx.send(outcome.result);
        });
        rx.await.unwrap_or(Err(AssetError::Cancelled))
    }

    /// Warm the cache for every URL not already cached or in flight.
    pub fn preload<I, S>(self: &Arc<Self>, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = url.as_ref();
            if !url.is_empty() && !self.is_cached(url) {
                self.load_inner(url, None);
            }
        }
    }

    /// Abort the in-flight fetch for `url`. Its waiters receive `Cancelled`.
    pub fn cancel(&self, url: &str) -> bool {
        let pending = self.state.lock().pending.remove(url);
        let Some(pending) = pending else {
            return false;
        };
        if let Some(task) = pending.task {
            task.abort();
        }
        notify_cancelled(pending.waiters, url);
        true
    }

    /// Abort all fetches and drop every cached entry.
    pub fn clear(&self) {
        let waiters = {
            let mut state = self.state.lock();
            let waiters = state.drain_pending();
            state.images.clear();
            state.animations.clear();
            state.static_bytes = 0;
            state.animated_bytes = 0;
            waiters
        };
        notify_cancelled(waiters, "");
    }

    /// Drop every cached entry whose URL is not in `keep`.
    pub fn clear_except(&self, keep: &HashSet<String>) {
        let mut state = self.state.lock();
        let freed_static: u64 = state
            .images
            .retain_with(|url, _| keep.contains(url))
            .iter()
            .map(|(_, entry)| entry.size)
            .sum();
        let freed_animated: u64 = state
            .animations
            .retain_with(|url, _| keep.contains(url))
            .iter()
            .map(|(_, entry)| entry.size)
            .sum();
        state.static_bytes = state.static_bytes.saturating_sub(freed_static);
        state.animated_bytes = state.animated_bytes.saturating_sub(freed_animated);
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            static_count: state.images.len(),
            animated_count: state.animations.len(),
            tracked_bytes: state.total_bytes(),
            pending_fetches: state.pending.len(),
        }
    }

    fn complete(&self, url: &str, generation: u64, result: AssetResult<Asset>) {
        let waiters = {
            let mut state = self.state.lock();
            match state.pending.get(url) {
                Some(pending) if pending.generation == generation => {}
                // Cancelled, or replaced by a newer fetch for the same URL.
                _ => return,
            }
            let Some(pending) = state.pending.remove(url) else {
                return;
            };
            if let Ok(asset) = &result {
                self.admit(&mut state, url, asset.clone());
            }
            pending.waiters
        };

        match &result {
            Ok(asset) => tracing::debug!(
                "fetched {:?} asset {url} ({} bytes, {} waiter(s))",
                asset.kind(),
                asset.estimated_size(),
                waiters.len()
            ),
            Err(e) => tracing::warn!("asset load failed for {url}: {e}"),
        }

        // Waiters run outside the lock; they may call back into the cache.
        for waiter in waiters {
            waiter(LoadOutcome {
                url: url.to_string(),
                result: result.clone(),
                fetched: true,
            });
        }
    }

    fn admit(&self, state: &mut CacheState, url: &str, asset: Asset) {
        let size = asset.estimated_size();
        if size > self.config.memory_ceiling {
            tracing::warn!(
                "asset {url} ({size} bytes) exceeds the {} byte ceiling; not cached",
                self.config.memory_ceiling
            );
            return;
        }

        state.remove(url);
        let kind = asset.kind();

        while state.total_bytes() + size > self.config.memory_ceiling {
            let victim = if state.images.len() > self.config.max_static {
                Some(AssetKind::Static)
            } else if state.animations.len() > self.config.max_animated {
                Some(AssetKind::Animated)
            } else {
                state.larger_sub_cache()
            };
            match victim {
                Some(victim) if state.evict_oldest(victim) => {}
                _ => break,
            }
        }

        let ceiling = |k: AssetKind| match k {
            AssetKind::Static => self.config.max_static,
            AssetKind::Animated => self.config.max_animated,
        };
        // Each sub-cache is trimmed while its count after this insertion
        // would exceed its ceiling: equal-or-above for the incoming kind.
        for k in [AssetKind::Static, AssetKind::Animated] {
            let incoming = usize::from(k == kind);
            while state.count(k) + incoming > ceiling(k) {
                if !state.evict_oldest(k) {
                    break;
                }
            }
        }

        match asset {
            Asset::Static(value) => {
                state.static_bytes += size;
                state.images.insert(url.to_string(), Entry { value, size });
            }
            Asset::Animated(value) => {
                state.animated_bytes += size;
                state.animations.insert(url.to_string(), Entry { value, size });
            }
        }
    }
}

fn notify_cancelled(waiters: Vec<Waiter>, url: &str) {
    for waiter in waiters {
        waiter(LoadOutcome {
            url: url.to_string(),
            result: Err(AssetError::Cancelled),
            fetched: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::fixtures;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FixtureFetcher {
        payloads: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl FixtureFetcher {
        fn with(mut self, url: &str, data: Vec<u8>) -> Self {
            self.payloads.insert(url.to_string(), data);
            self
        }
    }

    #[async_trait]
    impl AssetFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads
                .get(url)
                .map(|data| Bytes::from(data.clone()))
                .ok_or_else(|| AssetError::Network("HTTP 404".to_string()))
        }
    }

    fn cache_with(config: AssetCacheConfig, fetcher: FixtureFetcher) -> Arc<AssetCache> {
        AssetCache::new(config, Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_memory_ceiling_evicts_oldest() {
        // 10x10 decodes to 400 tracked bytes; two fit under 1000.
        let fetcher = FixtureFetcher::default()
            .with("a", fixtures::png(10, 10))
            .with("b", fixtures::png(10, 10))
            .with("c", fixtures::png(10, 10));
        let cache = cache_with(
            AssetCacheConfig {
                memory_ceiling: 1000,
                ..Default::default()
            },
            fetcher,
        );

        for url in ["a", "b", "c"] {
            cache.fetch(url).await.unwrap();
        }

        let stats = cache.stats();
        assert!(stats.tracked_bytes <= 1000);
        assert_eq!(stats.static_count, 2);
        assert!(!cache.is_cached("a"));
        assert!(cache.is_cached("b"));
        assert!(cache.is_cached("c"));
    }

    #[tokio::test]
    async fn test_count_ceiling_holds_with_small_bytes() {
        let fetcher = FixtureFetcher::default()
            .with("a", fixtures::png(1, 1))
            .with("b", fixtures::png(1, 1))
            .with("c", fixtures::png(1, 1));
        let cache = cache_with(
            AssetCacheConfig {
                max_static: 2,
                ..Default::default()
            },
            fetcher,
        );

        cache.fetch("a").await.unwrap();
        cache.fetch("b").await.unwrap();
        // Touch "a" so "b" becomes the oldest.
        assert!(cache.get_cached_image("a").is_some());
        cache.fetch("c").await.unwrap();

        assert_eq!(cache.stats().static_count, 2);
        assert!(cache.is_cached("a"));
        assert!(!cache.is_cached("b"));
    }

    #[tokio::test]
    async fn test_animated_ceiling_is_independent() {
        let fetcher = FixtureFetcher::default()
            .with("still", fixtures::png(2, 2))
            .with("g1", fixtures::gif(2, 2))
            .with("g2", fixtures::gif(2, 2));
        let cache = cache_with(
            AssetCacheConfig {
                max_animated: 1,
                ..Default::default()
            },
            fetcher,
        );

        cache.fetch("still").await.unwrap();
        let first = cache.fetch("g1").await.unwrap();
        assert!(first.is_animated());
        cache.fetch("g2").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.animated_count, 1);
        assert_eq!(stats.static_count, 1);
        assert!(cache.get_cached_animation("g2").is_some());
        assert!(cache.get_cached_animation("g1").is_none());
    }

    #[tokio::test]
    async fn test_full_sub_cache_keeps_entries_when_other_kind_arrives() {
        let fetcher = FixtureFetcher::default()
            .with("g1", fixtures::gif(2, 2))
            .with("g2", fixtures::gif(2, 2))
            .with("s1", fixtures::png(2, 2))
            .with("s2", fixtures::png(2, 2))
            .with("s3", fixtures::png(2, 2));
        let cache = cache_with(
            AssetCacheConfig {
                max_static: 2,
                max_animated: 2,
                ..Default::default()
            },
            fetcher,
        );

        for url in ["g1", "g2", "s1", "s2"] {
            cache.fetch(url).await.unwrap();
        }
        let stats = cache.stats();
        assert_eq!((stats.static_count, stats.animated_count), (2, 2));

        // A third still at the static ceiling evicts only the oldest still.
        cache.fetch("s3").await.unwrap();
        let stats = cache.stats();
        assert_eq!((stats.static_count, stats.animated_count), (2, 2));
        assert!(!cache.is_cached("s1"));
        assert!(cache.is_cached("g1"));
    }

    #[tokio::test]
    async fn test_memory_pressure_drains_larger_sub_cache() {
        let gif_size = fixtures::gif(2, 2).len() as u64;
        assert!(gif_size < 400, "fixture gif unexpectedly large");

        let fetcher = FixtureFetcher::default()
            .with("s1", fixtures::png(10, 10))
            .with("s2", fixtures::png(10, 10))
            .with("g1", fixtures::gif(2, 2))
            .with("g2", fixtures::gif(2, 2))
            .with("big", fixtures::png(20, 20));
        let cache = cache_with(
            AssetCacheConfig {
                memory_ceiling: 1600 + 2 * gif_size,
                ..Default::default()
            },
            fetcher,
        );

        for url in ["s1", "s2", "g1", "g2", "big"] {
            cache.fetch(url).await.unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.animated_count, 2);
        assert_eq!(stats.static_count, 1);
        assert!(cache.is_cached("big"));
        assert!(stats.tracked_bytes <= cache.config().memory_ceiling);
    }

    #[tokio::test]
    async fn test_hit_reports_not_fetched() {
        let fetcher = Arc::new(FixtureFetcher::default().with("a", fixtures::png(2, 2)));
        let cache = AssetCache::new(AssetCacheConfig::default(), fetcher.clone());
        cache.fetch("a").await.unwrap();

        let (tx, rx) = oneshot::channel();
        let status = cache.load("a", move |outcome| {
            let _ = tx.send(outcome);
        });
        assert_eq!(status, LoadStatus::Cached);
        let outcome = rx.await.unwrap();
        assert!(!outcome.fetched);
        assert!(outcome.result.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_reaches_every_waiter_and_caches_nothing() {
        let fetcher = FixtureFetcher::default().with("bad", b"<html>nope</html>".to_vec());
        let cache = cache_with(AssetCacheConfig::default(), fetcher);

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        cache.load("bad", move |o| {
            let _ = tx1.send(o.result);
        });
        cache.load("bad", move |o| {
            let _ = tx2.send(o.result);
        });

        assert!(matches!(rx1.await.unwrap(), Err(AssetError::Decode(_))));
        assert!(matches!(rx2.await.unwrap(), Err(AssetError::Decode(_))));
        assert!(!cache.is_cached("bad"));
        assert_eq!(cache.stats().tracked_bytes, 0);
    }

    #[tokio::test]
    async fn test_network_failure_is_not_cached() {
        let cache = cache_with(AssetCacheConfig::default(), FixtureFetcher::default());
        let err = cache.fetch("missing").await.unwrap_err();
        assert_eq!(err, AssetError::Network("HTTP 404".to_string()));
        assert!(!cache.is_cached("missing"));
        assert!(!cache.is_pending("missing"));
    }

    #[tokio::test]
    async fn test_oversized_asset_delivered_but_not_admitted() {
        let fetcher = FixtureFetcher::default().with("huge", fixtures::png(20, 20));
        let cache = cache_with(
            AssetCacheConfig {
                memory_ceiling: 100,
                ..Default::default()
            },
            fetcher,
        );
        let asset = cache.fetch("huge").await.unwrap();
        assert_eq!(asset.estimated_size(), 1600);
        assert!(!cache.is_cached("huge"));
    }

    #[tokio::test]
    async fn test_clear_except_keeps_listed_urls() {
        let fetcher = FixtureFetcher::default()
            .with("a", fixtures::png(2, 2))
            .with("b", fixtures::png(2, 2))
            .with("g", fixtures::gif(2, 2));
        let cache = cache_with(AssetCacheConfig::default(), fetcher);
        for url in ["a", "b", "g"] {
            cache.fetch(url).await.unwrap();
        }

        let keep: HashSet<String> = ["b".to_string()].into_iter().collect();
        cache.clear_except(&keep);

        let stats = cache.stats();
        assert_eq!(stats.static_count, 1);
        assert_eq!(stats.animated_count, 0);
        assert_eq!(stats.tracked_bytes, 16);
        assert!(cache.is_cached("b"));
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let cache = cache_with(AssetCacheConfig::default(), FixtureFetcher::default());
        let (tx, rx) = oneshot::channel();
        let status = cache.load("", move |o| {
            let _ = tx.send(o.result);
        });
        assert_eq!(status, LoadStatus::Rejected);
        assert!(matches!(rx.await.unwrap(), Err(AssetError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_preload_skips_cached() {
        let fetcher = Arc::new(
            FixtureFetcher::default()
                .with("a", fixtures::png(2, 2))
                .with("b", fixtures::png(2, 2)),
        );
        let cache = AssetCache::new(AssetCacheConfig::default(), fetcher.clone());
        cache.fetch("a").await.unwrap();

        cache.preload(["a", "", "b"]);
        // "b" is in flight; wait for it through the normal path.
        cache.fetch("b").await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_cached("b"));
    }
}
