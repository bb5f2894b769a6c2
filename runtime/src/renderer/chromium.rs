// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-backed render context via chromiumoxide.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::scout_home;

const SYSTEM_BINARIES: [&str; 3] = ["google-chrome", "chromium", "chromium-browser"];

/// Locations under `base` where a downloaded Chrome for Testing build lands.
fn bundled_candidates(base: &Path) -> Vec<PathBuf> {
    let dir = base.join("chromium");
    if cfg!(target_os = "macos") {
        let app = "Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing";
        vec![
            dir.join("chrome-mac-arm64").join(app),
            dir.join("chrome-mac-x64").join(app),
            dir.join("chrome"),
        ]
    } else {
        vec![dir.join("chrome-linux64/chrome"), dir.join("chrome")]
    }
}

/// Locate a Chromium binary: `SCOUT_CHROMIUM_PATH`, then `~/.scout/chromium`,
/// then the system `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    let explicit = std::env::var_os("SCOUT_CHROMIUM_PATH").map(PathBuf::from);
    explicit
        .into_iter()
        .chain(bundled_candidates(&scout_home()))
        .find(|p| p.exists())
        .or_else(|| SYSTEM_BINARIES.iter().find_map(|name| which::which(name).ok()))
}

/// How the browser is started.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Explicit binary; discovered with [`find_chromium`] when absent.
    pub chromium_path: Option<PathBuf>,
    /// Persistent profile so the portal session cookie survives between runs.
    pub profile_dir: Option<PathBuf>,
    pub headful: bool,
}

/// One launched Chromium process.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let binary = options
            .chromium_path
            .or_else(find_chromium)
            .context("Chromium not found. Set SCOUT_CHROMIUM_PATH or install Chrome.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(binary)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox");
        builder = if options.headful {
            builder.with_head()
        } else {
            builder.arg("--headless=new")
        };
        if let Some(dir) = &options.profile_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create profile dir {}", dir.display()))?;
            builder = builder.user_data_dir(dir);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;
        let handler = tokio::spawn(async move { while events.next().await.is_some() {} });

        tracing::info!("chromium launched (headful: {})", options.headful);
        Ok(Self { browser, handler })
    }

    /// Close the browser process and stop the protocol handler.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await.map(|_| ());
        self.handler.abort();
        closed.context("failed to close Chromium")
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open a browser tab")?;
        Ok(Box::new(ChromiumContext { page }))
    }
}

/// A single Chromium tab.
pub struct ChromiumContext {
    page: Page,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url))
            .await
            .map_err(|_| anyhow!("navigation timed out after {timeout_ms}ms"))?
            .with_context(|| format!("navigation to {url} failed"))?;

        // Redirects may still be in flight when goto resolves.
        let _ = self.page.wait_for_navigation().await;
        let final_url = self.page.url().await.ok().flatten().unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            status: 200,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.context("script failed")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to read page HTML")
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("failed to read page URL")?
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close tab")
    }
}
