// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Load one catalog page and print its items.

use anyhow::{anyhow, Result};

use super::output;
use super::{wait_for, CliSession, FilterArgs, SessionArgs, FLOW_WAIT};
use crate::catalog::CatalogPage;
use crate::events::{Operation, ScoutEvent};

pub async fn run(filters: FilterArgs, session_args: &SessionArgs) -> Result<()> {
    let filters = filters.into_filters()?;
    let cli = CliSession::open(session_args).await?;

    if session_args.login {
        cli.sign_in().await?;
    }

    let mut rx = cli.session.events().subscribe();
    cli.session.load_page(filters, true);

    let page = wait_for(&mut rx, FLOW_WAIT, |event| match event {
        ScoutEvent::PageLoadingStarted { query_url } => {
            output::status(format!("Loading {query_url}"));
            None
        }
        ScoutEvent::PageLoaded { page, .. } => Some(Ok(page)),
        ScoutEvent::OperationFailed {
            operation: Operation::LoadPage,
            message,
            ..
        } => Some(Err(anyhow!(message))),
        _ => None,
    })
    .await;

    cli.close().await?;
    let page = page?;

    if output::is_json() {
        output::print_json(&page);
    } else {
        print_page(&page);
    }

    Ok(())
}

fn print_page(page: &CatalogPage) {
    println!(
        "Page {}/{} ({} items total)",
        page.current_page, page.total_pages, page.total_items
    );
    println!();
    for item in &page.items {
        let author = if item.author.is_empty() {
            String::new()
        } else {
            format!("  by {}", item.author)
        };
        println!("  {:>12}  {}{author}", item.id, item.title);
    }
}
