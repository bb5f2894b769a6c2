// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Print the catalog query URL for a set of filters.

use anyhow::Result;

use super::{output, FilterArgs};
use crate::config::ScoutConfig;

pub async fn run(filters: FilterArgs) -> Result<()> {
    let filters = filters.into_filters()?;
    let config = ScoutConfig::from_env();
    let url = filters.query_url(&config.endpoints);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "url": url,
            "required_tags": filters.required_tags(),
        }));
    } else {
        println!("{url}");
    }
    Ok(())
}
