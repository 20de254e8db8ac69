// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Filter ownership remapping
//!
//! Discovery lists every old user's filters concurrently. Mutation then
//! walks the pairs one at a time, reassigning that user's filters
//! concurrently; a filter that fails to hand over is warned about and
//! left out of the reassigned count.

use super::UserMapping;
use crate::output::{ProgressSink as _, Reporter, create_table};
use futures_util::future::join_all;
use jira_client::JiraClient;

pub async fn run(
    jira: &JiraClient,
    mappings: &[UserMapping],
    dry_run: bool,
    reporter: &Reporter,
) -> anyhow::Result<()> {
    let bar = reporter.bar(
        format!("Gathering filters ({} users)...", mappings.len()),
        Some(mappings.len() as u64),
    );
    let bar = &bar;
    let discovered = join_all(mappings.iter().map(|mapping| async move {
        let filters = jira.get_filters_for_user(&mapping.old).await;
        bar.advance(1);
        (mapping, filters)
    }))
    .await;
    bar.finish_and_clear();

    let mut matched: Vec<(&UserMapping, Vec<String>)> = Vec::new();
    for (mapping, filters) in discovered {
        match filters {
            Ok(filters) if filters.is_empty() => {}
            Ok(filters) => matched.push((mapping, filters)),
            Err(error) => reporter.warn(format!(
                "Failed to list filters for {}: {error}",
                mapping.old.label()
            )),
        }
    }

    if !matched.is_empty() {
        let mut table = create_table(&["Old User", "Total Filters"]);
        for (mapping, filters) in &matched {
            table.add_row(vec![mapping.old.label(), filters.len().to_string()]);
        }
        reporter.print_table(table);
    }

    let mut total: u64 = 0;
    let mut changed: u64 = 0;
    for (mapping, filters) in &matched {
        total += filters.len() as u64;
        if dry_run {
            continue;
        }

        let bar = reporter.bar(
            format!(
                "  {} -> {} ({} filters)...",
                mapping.old.contact(),
                mapping.new.contact(),
                filters.len()
            ),
            Some(filters.len() as u64),
        );
        let bar = &bar;
        let outcomes = join_all(filters.iter().map(|filter_id| async move {
            let outcome = jira
                .set_filter_owner(filter_id, &mapping.new.account_id)
                .await;
            bar.advance(1);
            (filter_id, outcome)
        }))
        .await;
        bar.finish_and_clear();

        for (filter_id, outcome) in outcomes {
            match outcome {
                Ok(()) => changed += 1,
                Err(error) => reporter.warn(format!(
                    "Failed to reassign filter {filter_id} to {}: {error}",
                    mapping.new.label()
                )),
            }
        }
    }

    let mut summary = format!("Done. Total filters matched: {total}");
    if !dry_run {
        summary.push_str(&format!(", reassigned: {changed}"));
    }
    reporter.println(summary);
    Ok(())
}
