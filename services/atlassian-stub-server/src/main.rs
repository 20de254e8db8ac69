// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Standalone stub Atlassian server for testing and development
//!
//! Run with:
//! ```bash
//! cargo run -p atlassian-stub-server
//! ```
//!
//! Then point remapadm at it:
//! ```bash
//! REMAPADM_BASE_URL=http://localhost:9090 \
//! REMAPADM_EMAIL=svc@example.com \
//! REMAPADM_API_TOKEN=stub-token \
//! cargo run -p remapadm -- check
//! ```

use anyhow::Result;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;

use atlassian_stub_server::{StubServerBuilder, router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlassian_stub_server=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // A small demo dataset: two mapped user pairs with filters, issues,
    // and spaces to remap.
    let builder = StubServerBuilder::new()
        .user("A1", "mia@example.com", "Mia Krystosek")
        .user("A2", "deepak@example.com", "Deepak Rao")
        .user("B1", "petra@example.com", "Petra Novak")
        .user("B2", "tomas@example.com", "Tomas Lindqvist")
        .filter("10010", "A1")
        .filter("10011", "A1")
        .filter("10012", "A2")
        .issue("OPS-1", Some("A1"), Some("A2"))
        .issue("OPS-2", Some("A1"), None)
        .issue("ENG-7", None, Some("A1"))
        .issue("ENG-8", Some("A2"), Some("A2"))
        .space("98304", "OPS", "Operations", "global")
        .space("98307", "~A1", "Mia Krystosek", "personal")
        .space_permission("98304", "A1", "read", "space")
        .space_permission("98304", "A2", "administer", "space")
        .space_permission("98307", "A1", "administer", "space");

    // Serve on the fixed development port rather than the ephemeral one
    // the test builder picks.
    let state = builder.into_state();
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 9090));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("stub Atlassian server listening on http://{addr}");
    tracing::info!("credentials: svc@example.com / stub-token");
    tracing::info!("available endpoints:");
    tracing::info!("  GET  /rest/api/3/myself");
    tracing::info!("  GET  /rest/api/3/user/search?query=...");
    tracing::info!("  GET  /rest/api/3/filter/search?accountId=...");
    tracing::info!("  PUT  /rest/api/3/filter/{{id}}/owner");
    tracing::info!("  GET  /rest/api/3/search/jql?jql=...");
    tracing::info!("  POST /rest/api/3/bulk/issues/fields");
    tracing::info!("  GET  /rest/api/3/bulk/queue/{{taskId}}");
    tracing::info!("  POST /wiki/api/v2/admin-key");
    tracing::info!("  GET  /wiki/api/v2/spaces");
    tracing::info!("  GET  /wiki/api/v2/spaces/{{id}}/permissions");
    tracing::info!("  POST /wiki/rest/api/space/{{key}}/permission");
    tracing::info!("  DEL  /wiki/rest/api/space/{{key}}/permission/{{id}}");
    tracing::info!("  PUT  /wiki/rest/api/space/{{key}}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
