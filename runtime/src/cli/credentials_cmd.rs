// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Manage credentials in the local vault.

use std::io::BufRead;

use anyhow::{bail, Context, Result};

use super::output;
use crate::trust::CredentialVault;

/// Store a login/secret pair. The secret comes from `--secret`,
/// `SCOUT_SECRET`, or one line of stdin, in that order.
pub async fn run_set(account: u32, login: &str, secret: Option<String>) -> Result<()> {
    let login = login.trim();
    if login.is_empty() {
        bail!("login must not be empty");
    }

    let secret = match secret.or_else(|| std::env::var("SCOUT_SECRET").ok()) {
        Some(s) => s,
        None => {
            output::status("Reading secret from stdin...");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read secret from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if secret.is_empty() {
        bail!("secret must not be empty");
    }

    let vault = CredentialVault::default_vault()?;
    vault.store(account, login, &secret)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "account": account, "login": login, "stored": true }));
    } else if !output::is_quiet() {
        println!("Stored credentials for account {account} ({login})");
    }
    Ok(())
}

pub async fn run_list() -> Result<()> {
    let vault = CredentialVault::default_vault()?;
    let accounts = vault.list_accounts()?;

    if output::is_json() {
        let rows: Vec<_> = accounts
            .iter()
            .map(|(index, login)| serde_json::json!({ "account": index, "login": login }))
            .collect();
        output::print_json(&rows);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No stored credentials.");
        return Ok(());
    }
    for (index, login) in accounts {
        println!("  {index:>3}  {login}");
    }
    Ok(())
}

pub async fn run_delete(account: u32) -> Result<()> {
    let vault = CredentialVault::default_vault()?;
    if !vault.delete(account)? {
        bail!("no credentials stored for account {account}");
    }

    if output::is_json() {
        output::print_json(&serde_json::json!({ "account": account, "deleted": true }));
    } else if !output::is_quiet() {
        println!("Deleted credentials for account {account}");
    }
    Ok(())
}
