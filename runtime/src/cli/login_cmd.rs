// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sign in and persist the session in the browser profile.

use anyhow::{bail, Result};

use super::output;
use super::{CliSession, SessionArgs};

pub async fn run(session_args: &SessionArgs) -> Result<()> {
    let cli = CliSession::open(session_args).await?;
    let account = cli.config.account_index;
    let signed_in = cli.sign_in().await;
    let state = cli.session.auth_state().await;
    cli.close().await?;
    let signed_in = signed_in?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "account": account,
            "signed_in": signed_in,
            "state": state,
        }));
    } else if signed_in {
        println!("Signed in (account {account})");
    }

    if !signed_in {
        bail!("sign-in failed for account {account}: {state:?}");
    }
    Ok(())
}
