// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! `remapadm find`: resolve identifiers to users.

use crate::config::Settings;
use crate::output::Reporter;
use clap::Args;

#[derive(Debug, Args)]
pub struct FindArgs {
    /// Emails or accountIds to look up (comma- or space-separated)
    #[arg(required = true, num_args = 1.., value_delimiter = ',')]
    pub identifiers: Vec<String>,
}

/// Resolution failures are warnings, not errors: this command exists to
/// sanity-check a mapping file, and a partial answer is still an answer.
pub async fn run(settings: &Settings, args: &FindArgs) -> anyhow::Result<()> {
    let jira = settings.jira_client()?;
    let reporter = Reporter::new();

    for identifier in args.identifiers.iter().map(|raw| raw.trim()) {
        if identifier.is_empty() {
            continue;
        }
        match jira.resolve_user(identifier).await {
            Ok(user) => reporter.println(format!(
                "Identifier '{identifier}' resolved to User: {} ({}), AccountId: '{}'",
                user.label_name(),
                user.contact(),
                user.account_id
            )),
            Err(error) => reporter.warn(format!(
                "Error resolving identifier '{identifier}': {error}"
            )),
        }
    }
    Ok(())
}
