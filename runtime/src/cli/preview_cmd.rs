// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch preview assets through the asset cache and report what arrived.

use anyhow::{bail, Result};
use futures::future::join_all;
use scout_assets::{Asset, AssetCache};

use super::output;
use crate::config::ScoutConfig;

pub async fn run(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        bail!("no preview URLs given");
    }

    let config = ScoutConfig::from_env();
    let cache = AssetCache::with_http(config.assets);

    // Duplicate URLs share one fetch.
    let results = join_all(urls.iter().map(|url| {
        let cache = cache.clone();
        async move { (url.as_str(), cache.fetch(url).await) }
    }))
    .await;

    let mut failures = 0usize;
    let mut rows = Vec::with_capacity(results.len());
    for (url, result) in results {
        match result {
            Ok(asset) => rows.push(describe(url, &asset)),
            Err(e) => {
                failures += 1;
                tracing::warn!("preview fetch failed for {url}: {e}");
                rows.push(serde_json::json!({ "url": url, "error": e.to_string() }));
            }
        }
    }
    let stats = cache.stats();

    if output::is_json() {
        output::print_json(&serde_json::json!({ "assets": rows, "stats": stats }));
    } else {
        for row in &rows {
            match row.get("error") {
                Some(err) => println!("[!!] {}  {}", row["url"].as_str().unwrap_or_default(), err),
                None => println!(
                    "[OK] {}  {} {}",
                    row["url"].as_str().unwrap_or_default(),
                    row["kind"].as_str().unwrap_or_default(),
                    row["detail"].as_str().unwrap_or_default()
                ),
            }
        }
        println!();
        println!(
            "Cache: {} static, {} animated, {:.1} MB tracked",
            stats.static_count,
            stats.animated_count,
            stats.tracked_mb()
        );
    }

    if failures > 0 {
        bail!("{failures} of {} previews failed", urls.len());
    }
    Ok(())
}

fn describe(url: &str, asset: &Asset) -> serde_json::Value {
    let detail = match asset {
        Asset::Static(img) => format!("{}x{}", img.width(), img.height()),
        Asset::Animated(data) => format!("{} bytes", data.len()),
    };
    serde_json::json!({
        "url": url,
        "kind": asset.kind(),
        "detail": detail,
        "estimated_size": asset.estimated_size(),
    })
}
