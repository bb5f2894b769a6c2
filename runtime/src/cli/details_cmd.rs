// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch one item's detail record.

use anyhow::{anyhow, Result};

use super::output;
use super::{wait_for, CliSession, SessionArgs, FLOW_WAIT};
use crate::catalog::CatalogItem;
use crate::events::{Operation, ScoutEvent};

pub async fn run(item_id: &str, session_args: &SessionArgs) -> Result<()> {
    let cli = CliSession::open(session_args).await?;

    if session_args.login {
        cli.sign_in().await?;
    }

    let mut rx = cli.session.events().subscribe();
    cli.session.load_details(item_id, true);

    let item = wait_for(&mut rx, FLOW_WAIT, |event| match event {
        ScoutEvent::DetailsLoaded { item, .. } => Some(Ok(item)),
        ScoutEvent::OperationFailed {
            operation: Operation::LoadDetails,
            message,
            ..
        } => Some(Err(anyhow!(message))),
        _ => None,
    })
    .await;

    cli.close().await?;
    let item = item?;

    if output::is_json() {
        output::print_json(&item);
    } else {
        print_item(&item);
    }
    Ok(())
}

fn print_item(item: &CatalogItem) {
    println!("{}", item.title);
    println!("  id:       {}", item.id);
    if !item.author.is_empty() {
        println!("  author:   {}", item.author);
    }
    println!("  size:     {}", item.file_size);
    println!("  posted:   {}", item.posted_date);
    if !item.updated_date.is_empty() {
        println!("  updated:  {}", item.updated_date);
    }
    if !item.rating_token.is_empty() {
        println!("  rating:   {} ({} ratings)", item.rating_token, item.rating_count);
    }
    println!("  preview:  {}", item.preview_url);
    for (label, value) in &item.tags {
        println!("  {label}: {value}");
    }
    if !item.description.is_empty() {
        println!();
        println!("{}", item.description);
    }
}
