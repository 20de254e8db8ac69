// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! End-to-end issue remapping: searches, bulk batching, task tracking.

mod common;

use atlassian_stub_server::{Mutation, StubServerBuilder};
use common::{mapping_csv, path_arg, remapadm};
use jira_api::UserField;

fn users() -> StubServerBuilder {
    StubServerBuilder::new()
        .user("A1", "mia@example.com", "Mia Krystosek")
        .user("B1", "petra@example.com", "Petra Novak")
}

#[tokio::test(flavor = "multi_thread")]
async fn apply_batches_tracks_and_reassigns() {
    // 120 assigned issues force three bulk chunks; one reported issue
    // adds a fourth task.
    let mut builder = users();
    for n in 1..=120 {
        builder = builder.issue(&format!("ENG-{n}"), Some("A1"), None);
    }
    let server = builder
        .issue("OPS-1", None, Some("A1"))
        .start()
        .await
        .expect("server starts");
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "issues"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Total Assigned"));
    assert!(output.stdout.contains("120"));
    assert!(output.stdout.contains("Done. Total issues matched: 121, reassigned: 121"));

    // Both fields submit concurrently, so only the chunk multiset is
    // deterministic, not the interleaving.
    let mut chunk_sizes: Vec<usize> = server
        .mutations()
        .await
        .iter()
        .filter_map(|mutation| match mutation {
            Mutation::BulkEdit { issue_keys, .. } => Some(issue_keys.len()),
            _ => None,
        })
        .collect();
    chunk_sizes.sort_unstable();
    assert_eq!(chunk_sizes, vec![1, 20, 50, 50]);

    assert_eq!(
        server.issue_field("ENG-120", UserField::Assignee).await.as_deref(),
        Some("B1")
    );
    assert_eq!(
        server.issue_field("OPS-1", UserField::Reporter).await.as_deref(),
        Some("B1")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn poisoned_chunk_lowers_the_reassigned_count() {
    let mut builder = users().poison_issue("ENG-60");
    for n in 1..=120 {
        builder = builder.issue(&format!("ENG-{n}"), Some("A1"), None);
    }
    let server = builder.start().await.expect("server starts");
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "issues"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    // The second chunk (ENG-51..=ENG-100) was rejected wholesale.
    assert!(output.stdout.contains("Done. Total issues matched: 120, reassigned: 70"));
    assert_eq!(
        server.issue_field("ENG-60", UserField::Assignee).await.as_deref(),
        Some("A1")
    );
    assert_eq!(
        server.issue_field("ENG-110", UserField::Assignee).await.as_deref(),
        Some("B1")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn project_scope_limits_the_blast_radius() {
    let server = users()
        .issue("OPS-1", Some("A1"), None)
        .issue("OPS-2", Some("A1"), None)
        .issue("ENG-7", Some("A1"), None)
        .start()
        .await
        .expect("server starts");
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(
        &server,
        &["remap", path_arg(&csv), "issues", "--project", "OPS"],
    )
    .await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Done. Total issues matched: 2, reassigned: 2"));
    assert_eq!(
        server.issue_field("ENG-7", UserField::Assignee).await.as_deref(),
        Some("A1"),
        "out-of-project issue must be untouched"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_submits_no_bulk_edits() {
    let server = users()
        .issue("OPS-1", Some("A1"), Some("A1"))
        .start()
        .await
        .expect("server starts");
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(
        &server,
        &["remap", path_arg(&csv), "issues", "--dry-run"],
    )
    .await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    // Assigned and reported both count the same issue.
    assert!(output.stdout.contains("Done. Total issues matched: 2"));
    assert!(!output.stdout.contains("reassigned"));
    assert!(server.mutations().await.is_empty());
}
