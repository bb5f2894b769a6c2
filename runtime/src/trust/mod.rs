// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Credential providers for portal sign-in.

pub mod credentials;

use std::fmt;

use crate::error::ScoutResult;

pub use credentials::CredentialVault;

/// A login/secret pair for one account slot.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
        }
    }

    /// Both halves present. An incomplete pair counts as absent.
    pub fn is_complete(&self) -> bool {
        !self.login.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials by account index.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self, account_index: u32) -> ScoutResult<Option<Credentials>>;
}

/// Reads `SCOUT_LOGIN` / `SCOUT_SECRET` for every account index.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn credentials(&self, _account_index: u32) -> ScoutResult<Option<Credentials>> {
        let login = std::env::var("SCOUT_LOGIN").unwrap_or_default();
        let secret = std::env::var("SCOUT_SECRET").unwrap_or_default();
        let creds = Credentials::new(login.trim(), secret);
        Ok(creds.is_complete().then_some(creds))
    }
}

/// Fixed in-memory credentials, mainly for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    accounts: Vec<(u32, Credentials)>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, account_index: u32, credentials: Credentials) -> Self {
        self.accounts.retain(|(i, _)| *i != account_index);
        self.accounts.push((account_index, credentials));
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self, account_index: u32) -> ScoutResult<Option<Credentials>> {
        Ok(self
            .accounts
            .iter()
            .find(|(i, _)| *i == account_index)
            .map(|(_, c)| c.clone())
            .filter(Credentials::is_complete))
    }
}

/// Tries each provider in order and returns the first complete pair.
pub struct ChainedCredentials {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }
}

impl CredentialProvider for ChainedCredentials {
    fn credentials(&self, account_index: u32) -> ScoutResult<Option<Credentials>> {
        for provider in &self.providers {
            match provider.credentials(account_index) {
                Ok(Some(creds)) => return Ok(Some(creds)),
                Ok(None) => {}
                Err(e) => tracing::warn!("credential provider failed: {e}"),
            }
        }
        Ok(None)
    }
}
