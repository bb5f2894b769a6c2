// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core value and error types for the asset cache.

use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Default memory ceiling across both sub-caches (150 MiB).
pub const DEFAULT_MEMORY_CEILING: u64 = 150 * 1024 * 1024;

/// Default entry ceiling for decoded static images.
pub const DEFAULT_MAX_STATIC: usize = 100;

/// Default entry ceiling for animated payloads.
pub const DEFAULT_MAX_ANIMATED: usize = 30;

/// Which sub-cache an asset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Static,
    Animated,
}

/// A cached preview asset.
///
/// Static images are held decoded; animated images are held as their raw
/// encoded bytes so the presentation layer can drive playback itself.
#[derive(Debug, Clone)]
pub enum Asset {
    Static(Arc<DynamicImage>),
    Animated(Bytes),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Static(_) => AssetKind::Static,
            Self::Animated(_) => AssetKind::Animated,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }

    /// Approximate resident size used for admission accounting.
    ///
    /// Decoded images count four bytes per pixel; animated payloads count
    /// their encoded length.
    pub fn estimated_size(&self) -> u64 {
        match self {
            Self::Static(img) => u64::from(img.width()) * u64::from(img.height()) * 4,
            Self::Animated(data) => data.len() as u64,
        }
    }
}

/// What a waiter receives when a load settles.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub url: String,
    pub result: AssetResult<Asset>,
    /// `true` when the value came from a network fetch, `false` on a cache hit.
    pub fetched: bool,
}

/// Errors delivered to waiters.
///
/// Cloneable so a single fetch outcome can fan out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("load cancelled")]
    Cancelled,

    #[error("invalid asset url: {0:?}")]
    InvalidUrl(String),
}

/// Convenience result type.
pub type AssetResult<T> = Result<T, AssetError>;

/// Limits applied by the asset cache's admission policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetCacheConfig {
    /// Ceiling on the sum of tracked size estimates, in bytes.
    pub memory_ceiling: u64,
    /// Entry ceiling for the static sub-cache.
    pub max_static: usize,
    /// Entry ceiling for the animated sub-cache.
    pub max_animated: usize,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            memory_ceiling: DEFAULT_MEMORY_CEILING,
            max_static: DEFAULT_MAX_STATIC,
            max_animated: DEFAULT_MAX_ANIMATED,
        }
    }
}

/// Point-in-time cache occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub static_count: usize,
    pub animated_count: usize,
    pub tracked_bytes: u64,
    pub pending_fetches: usize,
}

impl CacheStats {
    pub fn tracked_mb(&self) -> f64 {
        self.tracked_bytes as f64 / (1024.0 * 1024.0)
    }
}
