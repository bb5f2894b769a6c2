// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Credential vault using SQLite, keyed by account index.
//!
//! Secrets are stored as-is; restrict access to the vault file (the CLI
//! creates it under `~/.scout/` with the user's default permissions).

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

use super::{CredentialProvider, Credentials};
use crate::config::scout_home;
use crate::error::{ScoutError, ScoutResult};

/// Credential store backed by SQLite.
pub struct CredentialVault {
    db: Mutex<Connection>,
}

impl CredentialVault {
    /// Open or create a credential vault.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path)
            .with_context(|| format!("failed to open vault: {}", path.display()))?;

        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                account_index INTEGER PRIMARY KEY,
                login TEXT NOT NULL,
                secret TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .context("failed to create accounts table")?;

        Ok(Self { db: Mutex::new(db) })
    }

    /// Open the default vault at ~/.scout/vault.db.
    pub fn default_vault() -> Result<Self> {
        let path = scout_home().join("vault.db");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open(&path)
    }

    /// Store credentials for an account slot, replacing any existing pair.
    pub fn store(&self, account_index: u32, login: &str, secret: &str) -> Result<()> {
        self.db.lock().execute(
            "INSERT OR REPLACE INTO accounts (account_index, login, secret, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
            rusqlite::params![account_index, login, secret],
        )?;
        Ok(())
    }

    /// Retrieve credentials for an account slot.
    pub fn retrieve(&self, account_index: u32) -> Result<Option<Credentials>> {
        let db = self.db.lock();
        let mut stmt = db.prepare("SELECT login, secret FROM accounts WHERE account_index = ?1")?;

        let result = stmt.query_row(rusqlite::params![account_index], |row| {
            Ok(Credentials::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });

        match result {
            Ok(creds) => Ok(Some(creds)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete credentials for an account slot.
    pub fn delete(&self, account_index: u32) -> Result<bool> {
        let rows = self.db.lock().execute(
            "DELETE FROM accounts WHERE account_index = ?1",
            rusqlite::params![account_index],
        )?;
        Ok(rows > 0)
    }

    /// List all account slots with their logins.
    pub fn list_accounts(&self) -> Result<Vec<(u32, String)>> {
        let db = self.db.lock();
        let mut stmt = db.prepare("SELECT account_index, login FROM accounts ORDER BY account_index")?;
        let accounts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(u32, String)>, _>>()?;
        Ok(accounts)
    }
}

impl CredentialProvider for CredentialVault {
    fn credentials(&self, account_index: u32) -> ScoutResult<Option<Credentials>> {
        let creds = self
            .retrieve(account_index)
            .map_err(|e| ScoutError::Credentials(format!("{e:#}")))?;
        Ok(creds.filter(Credentials::is_complete))
    }
}
