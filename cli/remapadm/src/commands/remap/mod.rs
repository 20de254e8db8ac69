// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! `remapadm remap`: bulk-reassign ownership per a CSV mapping
//!
//! All three targets share the same first act: read the mapping file and
//! resolve every row's identifiers to concrete users. Rows that do not
//! resolve cleanly are warned about and dropped; whatever survives is
//! handed to the target orchestrator.

mod filters;
mod issues;
mod spaces;

use crate::config::Settings;
use crate::mapping::{self, IdentifierPair};
use crate::output::{ProgressSink as _, Reporter};
use clap::{Args, Subcommand};
use futures_util::future::join_all;
use jira_api::User;
use jira_client::JiraClient;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RemapArgs {
    /// CSV file with `old` and `new` identifier columns
    pub mapping_csv: PathBuf,

    #[command(subcommand)]
    pub target: RemapTarget,
}

#[derive(Debug, Subcommand)]
pub enum RemapTarget {
    /// Reassign saved filter ownership
    Filters {
        /// Discover and report only; mutate nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Reassign issue assignee and reporter fields
    Issues {
        /// Discover and report only; mutate nothing
        #[arg(long)]
        dry_run: bool,

        /// Restrict issue searches to one project key
        #[arg(long, value_name = "KEY")]
        project: Option<String>,
    },
    /// Reassign Confluence space permissions
    Spaces {
        /// Discover and report only; mutate nothing
        #[arg(long)]
        dry_run: bool,
    },
}

/// One resolved mapping row.
#[derive(Debug, Clone)]
pub struct UserMapping {
    pub old: User,
    pub new: User,
}

pub async fn run(settings: &Settings, args: &RemapArgs) -> anyhow::Result<()> {
    let pairs = mapping::read_mapping(&args.mapping_csv)?;
    let jira = settings.jira_client()?;
    let reporter = Reporter::new();

    let mappings = resolve_pairs(&jira, &pairs, &reporter).await;

    match &args.target {
        RemapTarget::Filters { dry_run } => {
            filters::run(&jira, &mappings, *dry_run, &reporter).await
        }
        RemapTarget::Issues { dry_run, project } => {
            issues::run(&jira, &mappings, *dry_run, project.as_deref(), &reporter).await
        }
        RemapTarget::Spaces { dry_run } => {
            let confluence = settings.confluence_client()?;
            spaces::run(&confluence, &mappings, *dry_run, &reporter).await
        }
    }
}

/// Resolve every row to a pair of users. Rows resolve concurrently, and
/// within a row old and new resolve concurrently. Unresolvable or
/// degenerate rows are dropped with a warning; surviving mappings keep
/// row order.
async fn resolve_pairs(
    jira: &JiraClient,
    rows: &[IdentifierPair],
    reporter: &Reporter,
) -> Vec<UserMapping> {
    let bar = reporter.bar(
        format!("Resolving users ({} rows)...", rows.len()),
        Some(rows.len() as u64),
    );

    let resolved = join_all(rows.iter().map(|row| async {
        let mapping = resolve_row(jira, row, reporter).await;
        bar.advance(1);
        mapping
    }))
    .await;
    bar.finish_and_clear();

    resolved.into_iter().flatten().collect()
}

async fn resolve_row(
    jira: &JiraClient,
    row: &IdentifierPair,
    reporter: &Reporter,
) -> Option<UserMapping> {
    if row.old.is_empty() || row.new.is_empty() {
        reporter.warn(format!(
            "Mapping row ('{}' -> '{}') has a blank identifier; skipping.",
            row.old, row.new
        ));
        return None;
    }

    let (old, new) = tokio::join!(jira.resolve_user(&row.old), jira.resolve_user(&row.new));
    match (old, new) {
        (Ok(old), Ok(new)) => {
            // A mapping from a user to itself would discover resources
            // and then "reassign" them to their current owner.
            if old.account_id == new.account_id {
                reporter.warn(format!(
                    "Row maps '{}' to itself ({}); skipping.",
                    row.old, old.account_id
                ));
                return None;
            }
            Some(UserMapping { old, new })
        }
        (old, new) => {
            if let Err(error) = old {
                reporter.warn(format!(
                    "Old user '{}' not found; skipping. {error}",
                    row.old
                ));
            }
            if let Err(error) = new {
                reporter.warn(format!(
                    "New user '{}' not found; skipping. {error}",
                    row.new
                ));
            }
            None
        }
    }
}
