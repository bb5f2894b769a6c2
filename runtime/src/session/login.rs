// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sign-in flow.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::scripts::{self, FillOutcome, LoginCheck};
use super::{AuthState, Completion, FlowContext};
use crate::config::PortalEndpoints;
use crate::error::AuthFailure;
use crate::trust::{CredentialProvider, Credentials};

/// Drive the browser through sign-in.
///
/// Reports intermediate states as [`Completion::AuthProgress`]. An existing
/// session (the sign-in URL redirects away) succeeds without touching
/// credentials.
pub(crate) async fn authenticate(
    flow: &FlowContext,
    provider: &dyn CredentialProvider,
    account_index: u32,
) -> Result<(), AuthFailure> {
    let mut browser = flow.browser.lock().await;
    let timings = &flow.timings;

    let login_url = flow.endpoints.login_url();
    let nav = browser
        .navigate(&login_url, flow.navigation_timeout_ms())
        .await
        .map_err(|e| {
            warn!("failed to load login page: {e:#}");
            AuthFailure::LoginPageUnavailable
        })?;

    if !PortalEndpoints::is_sign_in(&nav.final_url) {
        info!("existing portal session is valid");
        return Ok(());
    }

    sleep(timings.login_settle).await;
    flow.complete(Completion::AuthProgress(AuthState::FillingCredentials));

    let creds = lookup(provider, account_index).ok_or(AuthFailure::NoCredentials)?;
    let fill = scripts::fill_login(&creds.login, &creds.secret);

    let mut submitted = false;
    for attempt in 1..=timings.login_form_attempts {
        let outcome = match browser.execute_js(&fill).await {
            Ok(value) => FillOutcome::from_value(value),
            Err(e) => {
                debug!("login form attempt {attempt} failed: {e:#}");
                FillOutcome::default()
            }
        };
        if outcome.ready {
            if !outcome.clicked {
                return Err(AuthFailure::SubmitNotFound);
            }
            submitted = true;
            break;
        }
        if attempt < timings.login_form_attempts {
            sleep(timings.login_form_retry).await;
        }
    }
    if !submitted {
        return Err(AuthFailure::FormNotFound);
    }

    flow.complete(Completion::AuthProgress(AuthState::AwaitingSubmitResult));
    sleep(timings.login_submit_wait).await;
    flow.complete(Completion::AuthProgress(AuthState::VerifyingSuccess));

    let check = scripts::check_login();
    for _ in 0..timings.login_check_attempts().max(1) {
        let location = browser.get_url().await.unwrap_or_default();
        if !location.is_empty() && !PortalEndpoints::is_sign_in(&location) {
            info!("signed in as account {account_index}");
            return Ok(());
        }

        let indicators = match browser.execute_js(&check).await {
            Ok(value) => LoginCheck::from_value(value),
            Err(e) => {
                debug!("login check failed: {e:#}");
                LoginCheck::default()
            }
        };
        if indicators.has_guard {
            return Err(AuthFailure::SecondFactorRequired);
        }
        if indicators.has_error {
            let text = if indicators.error_text.is_empty() {
                "Login error".to_string()
            } else {
                indicators.error_text
            };
            return Err(AuthFailure::InlineError(text));
        }

        sleep(timings.login_check_interval).await;
    }

    Err(AuthFailure::Timeout)
}

/// A complete pair for `account_index`; provider errors count as absent.
fn lookup(provider: &dyn CredentialProvider, account_index: u32) -> Option<Credentials> {
    match provider.credentials(account_index) {
        Ok(creds) => creds.filter(Credentials::is_complete),
        Err(e) => {
            warn!("credential lookup failed for account {account_index}: {e}");
            None
        }
    }
}
