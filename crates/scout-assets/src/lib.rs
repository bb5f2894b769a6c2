// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scout assets: memory-bounded preview cache shared across the UI.

pub mod cache;
pub mod decode;
pub mod fetch;
pub mod lru;
pub mod types;

pub use cache::{AssetCache, LoadStatus, Waiter};
pub use decode::is_animated;
pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use lru::LruMap;
pub use types::*;
