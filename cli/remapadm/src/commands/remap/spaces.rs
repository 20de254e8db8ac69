// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Confluence space permission remapping
//!
//! Discovery elevates the session, lists every space, and fetches all
//! permission lists concurrently, keeping only user-subject grants held
//! by old users. Mutation walks the pairs sequentially; within a pair,
//! spaces and permissions run concurrently. Each grant is added for the
//! new user first and removed from the old user second, so a crash
//! mid-way leaves extra access rather than none. After a personal
//! space's grants move over, the space is renamed to mark it as
//! inherited.

use super::UserMapping;
use crate::output::{ProgressSink as _, Reporter, TaskBar, create_table};
use confluence_api::{Space, SpacePermission};
use confluence_client::ConfluenceClient;
use futures_util::future::join_all;
use jira_api::User;
use std::collections::HashSet;

/// One space holding permissions of one old user.
struct SpaceMatch<'a> {
    space: &'a Space,
    permissions: Vec<&'a SpacePermission>,
}

enum GrantOutcome {
    Reassigned,
    /// The new grant exists but the old one could not be revoked.
    RemoveFailed(confluence_client::Error),
    AddFailed(confluence_client::Error),
}

pub async fn run(
    confluence: &ConfluenceClient,
    mappings: &[UserMapping],
    dry_run: bool,
    reporter: &Reporter,
) -> anyhow::Result<()> {
    let bar = reporter.bar("Gathering spaces...", None);
    confluence.acquire_admin().await?;
    let spaces = confluence.list_spaces().await?;
    bar.set_total(spaces.len() as u64);

    let old_accounts: HashSet<&str> = mappings
        .iter()
        .map(|mapping| mapping.old.account_id.as_str())
        .collect();
    let bar = &bar;
    let fetched = join_all(spaces.iter().map(|space| async move {
        let permissions = confluence.list_space_permissions(&space.id).await;
        bar.advance(1);
        (space, permissions)
    }))
    .await;
    bar.finish_and_clear();

    // Keep only user-subject grants held by an old user; group grants
    // are never touched.
    let mut relevant: Vec<(&Space, Vec<SpacePermission>)> = Vec::new();
    for (space, permissions) in fetched {
        match permissions {
            Ok(permissions) => {
                let grants: Vec<SpacePermission> = permissions
                    .into_iter()
                    .filter(|permission| {
                        permission.subject.is_user()
                            && old_accounts.contains(permission.subject.identifier.as_str())
                    })
                    .collect();
                if !grants.is_empty() {
                    relevant.push((space, grants));
                }
            }
            Err(error) => reporter.warn(format!(
                "Failed to list permissions for space '{}': {error}",
                space.key
            )),
        }
    }

    let matched: Vec<(&UserMapping, Vec<SpaceMatch<'_>>)> = mappings
        .iter()
        .filter_map(|mapping| {
            let matches: Vec<SpaceMatch<'_>> = relevant
                .iter()
                .filter_map(|(space, grants)| {
                    let mine: Vec<&SpacePermission> = grants
                        .iter()
                        .filter(|grant| grant.subject.identifier == mapping.old.account_id)
                        .collect();
                    (!mine.is_empty()).then_some(SpaceMatch {
                        space,
                        permissions: mine,
                    })
                })
                .collect();
            (!matches.is_empty()).then_some((mapping, matches))
        })
        .collect();

    if !matched.is_empty() {
        let mut table = create_table(&["Old User", "Total Spaces", "Total Permissions"]);
        for (mapping, matches) in &matched {
            let permissions: usize = matches.iter().map(|m| m.permissions.len()).sum();
            table.add_row(vec![
                mapping.old.label(),
                matches.len().to_string(),
                permissions.to_string(),
            ]);
        }
        reporter.print_table(table);
    }

    let mut total: u64 = 0;
    let mut changed: u64 = 0;
    for (mapping, matches) in &matched {
        let user_total: usize = matches.iter().map(|m| m.permissions.len()).sum();
        total += user_total as u64;
        if dry_run {
            continue;
        }

        let bar = reporter.bar(
            format!(
                "  {} -> {} ({user_total} permissions)...",
                mapping.old.contact(),
                mapping.new.contact()
            ),
            Some(user_total as u64),
        );
        let per_space = join_all(matches.iter().map(|space_match| {
            reassign_space(confluence, space_match, &mapping.new, &bar, reporter)
        }))
        .await;
        changed += per_space.into_iter().sum::<u64>();
        bar.finish_and_clear();
    }

    let mut summary = format!("Done. Total permissions matched: {total}");
    if !dry_run {
        summary.push_str(&format!(", reassigned: {changed}"));
    }
    reporter.println(summary);
    Ok(())
}

/// Move one space's grants to the new user; returns how many changed.
async fn reassign_space(
    confluence: &ConfluenceClient,
    space_match: &SpaceMatch<'_>,
    new_user: &User,
    bar: &TaskBar,
    reporter: &Reporter,
) -> u64 {
    let space = space_match.space;
    let bar = &bar;
    let outcomes = join_all(space_match.permissions.iter().map(|permission| async move {
        let outcome = reassign_grant(confluence, space, permission, new_user).await;
        bar.advance(1);
        (permission, outcome)
    }))
    .await;

    let mut changed = 0;
    for (permission, outcome) in outcomes {
        match outcome {
            GrantOutcome::Reassigned => changed += 1,
            GrantOutcome::RemoveFailed(error) => {
                // The add landed, so the reassignment itself counts.
                changed += 1;
                reporter.warn(format!(
                    "Failed to reassign permission {} in space '{}' for {}: {error}",
                    permission.operation.key,
                    space.key,
                    new_user.label_name()
                ));
            }
            GrantOutcome::AddFailed(error) => reporter.warn(format!(
                "Failed to reassign permission {} in space '{}' for {}: {error}",
                permission.operation.key,
                space.key,
                new_user.label_name()
            )),
        }
    }

    // The old user's personal space stays behind as an archive under the
    // new user; rename it so it is not mistaken for theirs.
    if space.is_personal() {
        let name = format!("{}'s Old Personal Space", new_user.label_name());
        if let Err(error) = confluence
            .rename_space(&space.key, &space.space_type, &name)
            .await
        {
            reporter.warn(format!(
                "Failed to rename personal space '{}': {error}",
                space.key
            ));
        }
    }

    changed
}

/// Add-then-remove, in that order: interrupted half-way, the resource is
/// over-granted rather than orphaned.
async fn reassign_grant(
    confluence: &ConfluenceClient,
    space: &Space,
    old_grant: &SpacePermission,
    new_user: &User,
) -> GrantOutcome {
    let new_grant = old_grant.granted_to(new_user.account_id.clone());
    if let Err(error) = confluence.add_space_permission(&space.key, &new_grant).await {
        return GrantOutcome::AddFailed(error);
    }

    let removal = match old_grant.id.as_deref() {
        Some(permission_id) => {
            confluence
                .remove_space_permission(&space.key, permission_id)
                .await
        }
        // A grant the listing returned without an id cannot be revoked.
        None => Ok(()),
    };
    match removal {
        Ok(()) => GrantOutcome::Reassigned,
        Err(error) => GrantOutcome::RemoveFailed(error),
    }
}
