// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Defaults are overridden by `SCOUT_*` environment variables, then by CLI
//! flags (applied by the binary after [`ScoutConfig::from_env`]).

use std::path::PathBuf;
use std::time::Duration;

use scout_assets::AssetCacheConfig;

const DEFAULT_SITE: &str = "https://steamcommunity.com";
const DEFAULT_APP_ID: &str = "431960";
const DEFAULT_ACCOUNT_INDEX: u32 = 6;
const DEFAULT_PAGE_CAPACITY: usize = 30;
const DEFAULT_ITEM_CAPACITY: usize = 150;
const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;

/// Page size assumed when a catalog page carries no pagination caption.
///
/// A heuristic: the portal's real page size is not confirmed, so totals
/// derived from it are estimates.
pub const ASSUMED_PAGE_SIZE: u32 = 15;

/// Portal URLs derived from a site base and an app scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    pub site: String,
    pub app_id: String,
}

impl PortalEndpoints {
    pub fn new(site: impl Into<String>, app_id: impl Into<String>) -> Self {
        let site = site.into();
        Self {
            site: site.trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }

    pub fn browse_url(&self) -> String {
        format!("{}/workshop/browse/", self.site)
    }

    pub fn details_url(&self, item_id: &str) -> String {
        format!("{}/sharedfiles/filedetails/?id={item_id}", self.site)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login/home/", self.site)
    }

    /// Host part of the site base, used to tell whether the browser is
    /// already on the portal.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.site)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Whether `location` is on the portal.
    pub fn is_on_site(&self, location: &str) -> bool {
        match (self.host(), url::Url::parse(location)) {
            (Some(host), Ok(loc)) => loc.host_str() == Some(host.as_str()),
            _ => false,
        }
    }

    /// Whether `location` is the sign-in surface.
    pub fn is_sign_in(location: &str) -> bool {
        location.contains("/login")
    }
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_SITE, DEFAULT_APP_ID)
    }
}

/// Every delay, interval, attempt cap and timeout used by the session flows.
///
/// All fields are public so embedders and tests can shrink them.
#[derive(Debug, Clone)]
pub struct SessionTimings {
    /// Upper bound for a single browser navigation.
    pub navigation_timeout: Duration,
    /// Pause after landing on the sign-in surface before looking for the form.
    pub login_settle: Duration,
    /// Number of attempts to locate the sign-in form.
    pub login_form_attempts: u32,
    /// Delay between sign-in form attempts.
    pub login_form_retry: Duration,
    /// Pause between submission and the first verification check.
    pub login_submit_wait: Duration,
    /// Interval between verification checks.
    pub login_check_interval: Duration,
    /// Total verification budget.
    pub login_timeout: Duration,
    /// Pause after a catalog navigation before extraction.
    pub page_settle: Duration,
    /// Pause after a detail navigation before injecting the fetch script.
    pub detail_settle: Duration,
    /// Abort deadline enforced inside the page for the detail request.
    pub detail_fetch_abort: Duration,
    /// Interval between detail result polls.
    pub detail_poll_interval: Duration,
    /// Total detail polling budget.
    pub detail_timeout: Duration,
}

impl SessionTimings {
    /// Number of verification checks allowed after submission.
    pub fn login_check_attempts(&self) -> u32 {
        attempts(self.login_timeout, self.login_check_interval)
    }

    /// Number of detail polls allowed before giving up.
    pub fn detail_poll_attempts(&self) -> u32 {
        attempts(self.detail_timeout, self.detail_poll_interval)
    }
}

fn attempts(total: Duration, interval: Duration) -> u32 {
    let interval = interval.as_millis().max(1);
    (total.as_millis() / interval).min(u128::from(u32::MAX)) as u32
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(DEFAULT_NAV_TIMEOUT_MS),
            login_settle: Duration::from_millis(500),
            login_form_attempts: 20,
            login_form_retry: Duration::from_millis(250),
            login_submit_wait: Duration::from_millis(2000),
            login_check_interval: Duration::from_millis(500),
            login_timeout: Duration::from_millis(30_000),
            page_settle: Duration::from_millis(500),
            detail_settle: Duration::from_millis(100),
            detail_fetch_abort: Duration::from_millis(8000),
            detail_poll_interval: Duration::from_millis(50),
            detail_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Capacities of the two catalog LRU maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCacheConfig {
    pub max_pages: usize,
    pub max_items: usize,
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_PAGE_CAPACITY,
            max_items: DEFAULT_ITEM_CAPACITY,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub endpoints: PortalEndpoints,
    pub timings: SessionTimings,
    pub catalog_cache: CatalogCacheConfig,
    pub assets: AssetCacheConfig,
    /// Credential slot used for sign-in.
    pub account_index: u32,
    /// Persistent browser profile (cookies survive between runs).
    pub profile_dir: PathBuf,
    /// Explicit browser binary, bypassing discovery.
    pub chromium_path: Option<PathBuf>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            endpoints: PortalEndpoints::default(),
            timings: SessionTimings::default(),
            catalog_cache: CatalogCacheConfig::default(),
            assets: AssetCacheConfig::default(),
            account_index: DEFAULT_ACCOUNT_INDEX,
            profile_dir: scout_home().join("profile"),
            chromium_path: None,
        }
    }
}

impl ScoutConfig {
    /// Defaults overridden by `SCOUT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let site = read_env_string("SCOUT_PORTAL_URL");
        let app_id = read_env_string("SCOUT_APP_ID");
        if site.is_some() || app_id.is_some() {
            config.endpoints = PortalEndpoints::new(
                site.unwrap_or_else(|| DEFAULT_SITE.to_string()),
                app_id.unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            );
        }

        config.account_index = read_env_u32("SCOUT_ACCOUNT_INDEX", config.account_index);

        if let Some(dir) = read_env_string("SCOUT_PROFILE_DIR") {
            config.profile_dir = PathBuf::from(dir);
        }
        if let Some(path) = read_env_string("SCOUT_CHROMIUM_PATH") {
            config.chromium_path = Some(PathBuf::from(path));
        }

        let nav_ms = read_env_u64("SCOUT_NAV_TIMEOUT_MS", DEFAULT_NAV_TIMEOUT_MS);
        config.timings.navigation_timeout = Duration::from_millis(nav_ms);

        let default_mb = config.assets.memory_ceiling / MIB;
        config.assets.memory_ceiling = memory_ceiling_bytes(
            read_env_u64("SCOUT_ASSET_MEMORY_MB", default_mb),
            config.assets.memory_ceiling,
        );

        config
    }
}

/// `~/.scout`, or `/tmp/.scout` when no home directory is known.
pub fn scout_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".scout")
}

const MIB: u64 = 1024 * 1024;

/// Megabytes to bytes, at least 1 MiB. Values that overflow keep `fallback`.
fn memory_ceiling_bytes(mb: u64, fallback: u64) -> u64 {
    mb.max(1).checked_mul(MIB).unwrap_or(fallback)
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u32(name: &str, default_value: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
