// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! End-to-end filter remapping.

mod common;

use atlassian_stub_server::{Mutation, StubServer, StubServerBuilder};
use common::{mapping_csv, path_arg, remapadm};

async fn seeded() -> StubServer {
    StubServerBuilder::new()
        .user("A1", "mia@example.com", "Mia Krystosek")
        .user("B1", "petra@example.com", "Petra Novak")
        .filter_page_size(2)
        .filter("10010", "A1")
        .filter("10011", "A1")
        .filter("10012", "A1")
        .start()
        .await
        .expect("server starts")
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_reports_without_mutating() {
    let server = seeded().await;
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(
        &server,
        &["remap", path_arg(&csv), "filters", "--dry-run"],
    )
    .await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Old User"));
    assert!(output.stdout.contains("Mia Krystosek (mia@example.com)"));
    assert!(output.stdout.contains("Done. Total filters matched: 3"));
    assert!(!output.stdout.contains("reassigned"));

    assert!(server.mutations().await.is_empty());
    assert_eq!(server.filter_owner("10010").await.as_deref(), Some("A1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn apply_reassigns_every_filter() {
    let server = seeded().await;
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "filters"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Done. Total filters matched: 3, reassigned: 3"));

    for filter_id in ["10010", "10011", "10012"] {
        assert_eq!(
            server.filter_owner(filter_id).await.as_deref(),
            Some("B1"),
            "filter {filter_id} should belong to the new user"
        );
    }
    let reassignments = server
        .mutations()
        .await
        .iter()
        .filter(|mutation| matches!(mutation, Mutation::FilterOwner { .. }))
        .count();
    assert_eq!(reassignments, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolvable_rows_warn_and_the_rest_proceed() {
    let server = seeded().await;
    let csv = mapping_csv(&[
        ("ghost@example.com", "petra@example.com"),
        ("mia@example.com", "petra@example.com"),
    ]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "filters"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output
        .stderr
        .contains("Old user 'ghost@example.com' not found; skipping."));
    assert!(output.stdout.contains("Done. Total filters matched: 3, reassigned: 3"));
}

#[tokio::test(flavor = "multi_thread")]
async fn self_mapping_rows_are_dropped() {
    let server = seeded().await;
    let csv = mapping_csv(&[("mia@example.com", "A1")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "filters"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stderr.contains("maps 'mia@example.com' to itself"));
    assert!(output.stdout.contains("Done. Total filters matched: 0, reassigned: 0"));
    assert!(server.mutations().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_mapping_file_exits_two() {
    let server = seeded().await;

    let headerless = common::mapping_csv(&[]);
    // Overwrite with wrong headers.
    std::fs::write(headerless.path(), "from,to\na,b\n").expect("rewrite csv");
    let output = remapadm(&server, &["remap", path_arg(&headerless), "filters"]).await;
    assert_eq!(output.code, Some(2));
    assert!(output.stderr.contains("must have 'old' and 'new' columns"));

    let output = remapadm(&server, &["remap", "/nonexistent/mapping.csv", "filters"]).await;
    assert_eq!(output.code, Some(2));
}
