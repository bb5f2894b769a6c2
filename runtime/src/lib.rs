// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scout runtime library: browser-driven catalog browsing for a portal
//! without a public API.
//!
//! The [`session::CatalogSession`] actor owns one browser context and the
//! catalog cache; it signs in, loads filtered catalog pages and fetches
//! item detail records, reporting every outcome on the [`events::EventBus`].
//! Preview images are served separately by `scout_assets::AssetCache`.

#![allow(clippy::new_without_default)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod renderer;
pub mod session;
pub mod trust;

pub use catalog::{CatalogFilters, CatalogItem, CatalogPage, InstallStatus};
pub use config::ScoutConfig;
pub use error::{AuthFailure, ScoutError, ScoutResult};
pub use events::{EventBus, ScoutEvent};
pub use session::{AuthState, CatalogSession};
