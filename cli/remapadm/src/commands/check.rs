// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! `remapadm check`: verify connectivity and credentials.

use crate::config::Settings;
use anyhow::Context as _;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let jira = settings.jira_client()?;
    let user = jira
        .get_self()
        .await
        .with_context(|| format!("failed to connect to Jira site '{}'", settings.base_url))?;

    println!(
        "Connected to Jira site '{}' as user '{}' ({}) - {}",
        settings.base_url,
        user.label_name(),
        user.contact(),
        user.account_id
    );
    Ok(())
}
