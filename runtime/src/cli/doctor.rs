// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use std::path::Path;

use anyhow::Result;

use super::output;
use crate::config::{scout_home, ScoutConfig};
use crate::renderer::chromium::find_chromium;

/// Check Chromium availability, the profile directory and the vault.
pub async fn run() -> Result<()> {
    let config = ScoutConfig::from_env();
    let chromium = config.chromium_path.clone().or_else(find_chromium);
    let profile_ok = writable_dir(&config.profile_dir);
    let vault_path = scout_home().join("vault.db");

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "profile_dir": config.profile_dir.display().to_string(),
            "profile_writable": profile_ok,
            "vault": vault_path.display().to_string(),
            "vault_exists": vault_path.exists(),
            "portal": config.endpoints.site,
            "ready": chromium.is_some() && profile_ok,
        }));
        return Ok(());
    }

    println!("Scout Doctor");
    println!("============");
    println!();
    println!("OS:     {}", std::env::consts::OS);
    println!("Arch:   {}", std::env::consts::ARCH);
    println!("Portal: {}", config.endpoints.site);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome or set SCOUT_CHROMIUM_PATH."),
    }

    if profile_ok {
        println!("[OK] Profile directory: {}", config.profile_dir.display());
    } else {
        println!(
            "[!!] Profile directory not writable: {}",
            config.profile_dir.display()
        );
    }

    if vault_path.exists() {
        println!("[OK] Credential vault: {}", vault_path.display());
    } else {
        println!("[??] No credential vault yet. Run `scout credentials set` to create one.");
    }

    println!();
    if chromium.is_some() && profile_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

fn writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".scout-doctor");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}
