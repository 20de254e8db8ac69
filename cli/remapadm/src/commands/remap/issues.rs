// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Issue assignee/reporter remapping
//!
//! Discovery runs the assignee and reporter searches concurrently per
//! pair, and the pairs concurrently with each other. Mutation walks the
//! pairs sequentially: both bulk submissions go out concurrently, and
//! the resulting task ids are polled to completion before the next pair
//! starts, so the reassigned count for a pair is known when its bar
//! closes.

use super::UserMapping;
use crate::output::{ProgressSink as _, Reporter, TaskBar, create_table};
use crate::tracker::TaskTracker;
use futures_util::future::join_all;
use jira_api::{IssueKey, UserField};
use jira_client::JiraClient;

pub async fn run(
    jira: &JiraClient,
    mappings: &[UserMapping],
    dry_run: bool,
    project: Option<&str>,
    reporter: &Reporter,
) -> anyhow::Result<()> {
    let bar = reporter.bar(
        format!("Gathering issues ({} users)...", mappings.len()),
        Some(mappings.len() as u64 * 2),
    );
    let bar = &bar;
    let discovered = join_all(mappings.iter().map(|mapping| async move {
        let (assigned, reported) = tokio::join!(
            search(jira, UserField::Assignee, mapping, project, &bar, reporter),
            search(jira, UserField::Reporter, mapping, project, &bar, reporter),
        );
        (mapping, assigned, reported)
    }))
    .await;
    bar.finish_and_clear();

    let matched: Vec<(&UserMapping, Vec<IssueKey>, Vec<IssueKey>)> = discovered
        .into_iter()
        .filter(|(_, assigned, reported)| !assigned.is_empty() || !reported.is_empty())
        .collect();

    if !matched.is_empty() {
        let mut table = create_table(&[
            "Old User",
            "Total Assigned",
            "Total Reported",
            "Total Issues",
        ]);
        for (mapping, assigned, reported) in &matched {
            table.add_row(vec![
                mapping.old.label(),
                assigned.len().to_string(),
                reported.len().to_string(),
                (assigned.len() + reported.len()).to_string(),
            ]);
        }
        reporter.print_table(table);
    }

    let mut total: u64 = 0;
    let mut changed: u64 = 0;
    for (mapping, assigned, reported) in &matched {
        let user_total = assigned.len() + reported.len();
        total += user_total as u64;
        if dry_run {
            continue;
        }

        // Spinner until the accepted task count fixes the bar's scale.
        let bar = reporter.bar(
            format!(
                "  {} -> {} ({user_total} issues)...",
                mapping.old.contact(),
                mapping.new.contact()
            ),
            None,
        );
        let (assigned_tasks, reported_tasks) = tokio::join!(
            jira.bulk_update_user_field(assigned, UserField::Assignee, &mapping.new.account_id),
            jira.bulk_update_user_field(reported, UserField::Reporter, &mapping.new.account_id),
        );
        let task_ids: Vec<String> = assigned_tasks
            .into_iter()
            .chain(reported_tasks)
            .collect();

        changed += TaskTracker::new(jira).track(&task_ids, &bar).await?;
        bar.finish_and_clear();
    }

    let mut summary = format!("Done. Total issues matched: {total}");
    if !dry_run {
        summary.push_str(&format!(", reassigned: {changed}"));
    }
    reporter.println(summary);
    Ok(())
}

/// One field search; a failure is warned about and contributes no keys,
/// so the sibling field and the other pairs still proceed.
async fn search(
    jira: &JiraClient,
    field: UserField,
    mapping: &UserMapping,
    project: Option<&str>,
    bar: &TaskBar,
    reporter: &Reporter,
) -> Vec<IssueKey> {
    let result = jira
        .search_issue_keys_for_user_field(field, &mapping.old, project)
        .await;
    bar.advance(1);
    match result {
        Ok(keys) => keys,
        Err(error) => {
            reporter.warn(format!(
                "Failed to search {field} issues for {}: {error}",
                mapping.old.label()
            ));
            Vec::new()
        }
    }
}
