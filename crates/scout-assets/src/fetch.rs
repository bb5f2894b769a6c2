// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Network seam for the asset cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{AssetError, AssetResult};

/// Default per-request timeout for preview downloads.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = "Mozilla/5.0";

/// Fetches raw asset bytes for a URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes>;
}

/// reqwest-backed fetcher following a bounded number of redirects.
#[derive(Clone)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Falls back to a default client, without the timeout or redirect
    /// cap, when the configured one cannot be built.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::try_with_timeout(timeout).unwrap_or_else(|e| {
            tracing::warn!("asset HTTP client setup failed, using defaults: {e}");
            Self {
                client: reqwest::Client::new(),
            }
        })
    }

    pub fn try_with_timeout(timeout: Duration) -> AssetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AssetError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Default for HttpAssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssetError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AssetError::Network(format!("HTTP {}", status.as_u16())));
        }

        resp.bytes()
            .await
            .map_err(|e| AssetError::Network(e.to_string()))
    }
}
