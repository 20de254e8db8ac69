// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! End-to-end space permission remapping.

mod common;

use atlassian_stub_server::{Mutation, StubServer, StubServerBuilder};
use common::{mapping_csv, path_arg, remapadm};

async fn seeded() -> StubServer {
    StubServerBuilder::new()
        .user("A1", "mia@example.com", "Mia Krystosek")
        .user("B1", "petra@example.com", "Petra Novak")
        .space("98304", "OPS", "Operations", "global")
        .space("98307", "~A1", "Mia Krystosek", "personal")
        .space_permission("98304", "A1", "read", "space")
        .space_permission("98307", "A1", "administer", "space")
        .group_space_permission("98304", "ops-team", "read", "space")
        .start()
        .await
        .expect("server starts")
}

#[tokio::test(flavor = "multi_thread")]
async fn apply_moves_grants_and_renames_the_personal_space() {
    let server = seeded().await;
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "spaces"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Old User"));
    assert!(output.stdout.contains("Total Spaces"));
    assert!(output.stdout.contains("Done. Total permissions matched: 2, reassigned: 2"));

    // Every grant is added for the new user before the old one goes.
    let mutations = server.mutations().await;
    for (index, mutation) in mutations.iter().enumerate() {
        if let Mutation::PermissionRemoved { space_key, .. } = mutation {
            assert!(
                mutations[..index].iter().any(|earlier| matches!(
                    earlier,
                    Mutation::PermissionAdded { space_key: added, .. } if added == space_key
                )),
                "removal in '{space_key}' must follow an add there"
            );
        }
    }

    // OPS: the user grant moved, the group grant survived.
    let ops = server.space_permissions("98304").await;
    assert!(ops.iter().any(|permission| {
        permission.subject.subject_type == "group" && permission.subject.identifier == "ops-team"
    }));
    assert!(ops.iter().any(|permission| permission.subject.identifier == "B1"));
    assert!(!ops.iter().any(|permission| permission.subject.identifier == "A1"));

    // The old personal space is marked as inherited.
    assert_eq!(
        server.space_name("~A1").await.as_deref(),
        Some("Petra Novak's Old Personal Space")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn existing_grant_on_the_new_user_still_counts_as_reassigned() {
    let server = StubServerBuilder::new()
        .user("A1", "mia@example.com", "Mia Krystosek")
        .user("B1", "petra@example.com", "Petra Novak")
        .space("98304", "OPS", "Operations", "global")
        .space_permission("98304", "A1", "read", "space")
        .space_permission("98304", "B1", "read", "space")
        .start()
        .await
        .expect("server starts");
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(&server, &["remap", path_arg(&csv), "spaces"]).await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    // The duplicate add comes back 400 "Permission already exists.";
    // that is the target state, so the grant counts and the old one is
    // still removed.
    assert!(output.stdout.contains("Done. Total permissions matched: 1, reassigned: 1"));

    let remaining = server.space_permissions("98304").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].subject.identifier, "B1");
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_touches_nothing() {
    let server = seeded().await;
    let csv = mapping_csv(&[("mia@example.com", "petra@example.com")]);

    let output = remapadm(
        &server,
        &["remap", path_arg(&csv), "spaces", "--dry-run"],
    )
    .await;
    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Done. Total permissions matched: 2"));
    assert!(!output.stdout.contains("reassigned"));

    assert!(server.mutations().await.is_empty());
    assert_eq!(server.space_name("~A1").await.as_deref(), Some("Mia Krystosek"));
}
