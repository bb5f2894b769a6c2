// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the Scout binary.

pub mod browse_cmd;
pub mod credentials_cmd;
pub mod details_cmd;
pub mod doctor;
pub mod login_cmd;
pub mod output;
pub mod preview_cmd;
pub mod url_cmd;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use clap::Args;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::catalog::filters::{
    option_label, OptionTable, AGE_RATINGS, ASSET_GENRES, ASSET_TYPES, CATEGORIES, RESOLUTIONS,
    TIME_WINDOWS, TYPES,
};
use crate::catalog::filters::SortOrder;
use crate::catalog::CatalogFilters;
use crate::config::ScoutConfig;
use crate::events::{Operation, ScoutEvent};
use crate::renderer::chromium::{ChromiumRenderer, LaunchOptions};
use crate::renderer::Renderer;
use crate::session::CatalogSession;
use crate::trust::{ChainedCredentials, CredentialProvider, CredentialVault, EnvCredentials};

/// How long a CLI command waits for one flow to report back.
pub(crate) const FLOW_WAIT: Duration = Duration::from_secs(90);

/// Catalog filter flags shared by `browse` and `url`.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Search text
    #[arg(long, short = 's', default_value = "")]
    pub search: String,
    /// Sort order (trend, mostrecent, lastupdated, totaluniquesubscribers)
    #[arg(long, default_value = "trend")]
    pub sort: SortOrder,
    /// Time window in days for trend sorting (1, 7, 30, 90, 180, 365, -1)
    #[arg(long, default_value = "7")]
    pub days: String,
    /// Category tag
    #[arg(long, default_value = "")]
    pub category: String,
    /// Type tag (Scene, Video, Application, Web)
    #[arg(long = "type", default_value = "")]
    pub type_tag: String,
    /// Age rating tag
    #[arg(long, default_value = "")]
    pub age_rating: String,
    /// Resolution tag, e.g. "3840 x 2160"
    #[arg(long, default_value = "")]
    pub resolution: String,
    /// Asset type tag
    #[arg(long, default_value = "")]
    pub asset_type: String,
    /// Asset genre tag
    #[arg(long, default_value = "")]
    pub asset_genre: String,
    /// Miscellaneous tag. Can be repeated.
    #[arg(long = "misc")]
    pub misc_tags: Vec<String>,
    /// Genre tag. Can be repeated.
    #[arg(long = "genre")]
    pub genre_tags: Vec<String>,
    /// Required flag. Can be repeated.
    #[arg(long = "flag")]
    pub required_flags: Vec<String>,
    /// 1-based page number
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,
}

impl FilterArgs {
    /// Validate single-choice values against the known option tables.
    pub fn into_filters(self) -> Result<CatalogFilters> {
        check_option("days", TIME_WINDOWS, &self.days)?;
        check_option("category", CATEGORIES, &self.category)?;
        check_option("type", TYPES, &self.type_tag)?;
        check_option("age-rating", AGE_RATINGS, &self.age_rating)?;
        check_option("resolution", RESOLUTIONS, &self.resolution)?;
        check_option("asset-type", ASSET_TYPES, &self.asset_type)?;
        check_option("asset-genre", ASSET_GENRES, &self.asset_genre)?;

        Ok(CatalogFilters {
            search: self.search.trim().to_string(),
            sort: self.sort,
            days: self.days,
            category: self.category,
            type_tag: self.type_tag,
            age_rating: self.age_rating,
            resolution: self.resolution,
            asset_type: self.asset_type,
            asset_genre: self.asset_genre,
            misc_tags: self.misc_tags,
            genre_tags: self.genre_tags,
            required_flags: self.required_flags,
            page: self.page,
        })
    }
}

fn check_option(flag: &str, table: OptionTable, value: &str) -> Result<()> {
    if option_label(table, value).is_some() {
        return Ok(());
    }
    let known: Vec<String> = table
        .iter()
        .filter(|(v, _)| !v.is_empty())
        .map(|(v, l)| format!("{v:?} ({l})"))
        .collect();
    bail!("unknown --{flag} value {value:?}; expected one of: {}", known.join(", "))
}

/// Sign-in flags shared by the browsing commands.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Sign in before loading
    #[arg(long)]
    pub login: bool,
    /// Credential slot to sign in with (defaults to SCOUT_ACCOUNT_INDEX or 6)
    #[arg(long)]
    pub account: Option<u32>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

/// A launched browser plus the session actor driving it.
pub struct CliSession {
    renderer: ChromiumRenderer,
    pub session: CatalogSession,
    pub config: ScoutConfig,
}

impl CliSession {
    pub async fn open(args: &SessionArgs) -> Result<Self> {
        let mut config = ScoutConfig::from_env();
        if let Some(account) = args.account {
            config.account_index = account;
        }

        output::status("Launching browser...");
        let renderer = ChromiumRenderer::launch(LaunchOptions {
            chromium_path: config.chromium_path.clone(),
            profile_dir: Some(config.profile_dir.clone()),
            headful: args.headful,
        })
        .await?;
        let context = renderer.new_context().await?;

        let session = CatalogSession::builder(context)
            .config(config.clone())
            .credentials(credential_provider())
            .spawn();

        Ok(Self {
            renderer,
            session,
            config,
        })
    }

    /// Sign in with the configured account. Failure is reported, not fatal.
    pub async fn sign_in(&self) -> Result<bool> {
        let mut rx = self.session.events().subscribe();
        self.session.ensure_authenticated(self.config.account_index);

        wait_for(&mut rx, FLOW_WAIT, |event| match event {
            ScoutEvent::AuthStateChanged { state } => {
                tracing::debug!("auth state: {state:?}");
                None
            }
            ScoutEvent::LoginSucceeded => Some(Ok(true)),
            ScoutEvent::OperationFailed {
                operation: Operation::Authenticate,
                message,
                ..
            } => {
                output::status(format!("Sign-in failed ({message}); continuing signed out"));
                Some(Ok(false))
            }
            _ => None,
        })
        .await
    }

    pub async fn close(self) -> Result<()> {
        self.session.shutdown().await;
        self.renderer.close().await
    }
}

/// Environment credentials first, then the local vault.
pub fn credential_provider() -> Arc<dyn CredentialProvider> {
    let mut providers: Vec<Box<dyn CredentialProvider>> = vec![Box::new(EnvCredentials)];
    match CredentialVault::default_vault() {
        Ok(vault) => providers.push(Box::new(vault)),
        Err(e) => tracing::warn!("credential vault unavailable: {e:#}"),
    }
    Arc::new(ChainedCredentials::new(providers))
}

/// Receive events until `pick` settles on a result or `timeout` elapses.
pub async fn wait_for<T>(
    rx: &mut broadcast::Receiver<ScoutEvent>,
    timeout: Duration,
    mut pick: impl FnMut(ScoutEvent) -> Option<Result<T>>,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = tokio::time::timeout(remaining, rx.recv())
            .await
            .map_err(|_| anyhow!("timed out after {}s", timeout.as_secs()))?;

        match event {
            Ok(event) => {
                if let Some(result) = pick(event) {
                    return result;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("event receiver lagged by {skipped}");
            }
            Err(RecvError::Closed) => bail!("session closed while waiting for a result"),
        }
    }
}
