// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Stub Atlassian server for testing
//!
//! An axum service implementing the Jira and Confluence API subsets the
//! workspace clients consume, backed by in-memory state. It is used
//! for:
//!
//! - Integration testing of the clients without a real Atlassian site
//! - End-to-end testing of the remapadm CLI
//! - Local development and demos (see the binary in this crate)
//!
//! Tests build a dataset through [`StubServerBuilder`], start the server
//! on an ephemeral port, run the code under test against
//! [`StubServer::base_url`], and then assert on the recorded
//! [`Mutation`] log, the final state, and the high-water mark of
//! concurrently in-flight requests.

mod confluence;
mod jira;
mod state;

pub use state::{
    Dataset, Mutation, SpaceRecord, StubConfig, StubFilter, StubIssue, StubState, TaskRecord,
};

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use confluence_api::{
    PermissionOperation, PermissionSubject, Space, SpacePermission,
};
use jira_api::{IssueKey, User};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Build the stub's router over shared state.
pub fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/rest/api/3/myself", get(jira::myself))
        .route("/rest/api/3/user/search", get(jira::user_search))
        .route("/rest/api/3/filter/search", get(jira::filter_search))
        .route("/rest/api/3/filter/{id}/owner", put(jira::set_filter_owner))
        .route("/rest/api/3/search/jql", get(jira::search_jql))
        .route("/rest/api/3/bulk/issues/fields", post(jira::bulk_edit))
        .route("/rest/api/3/bulk/queue/{taskId}", get(jira::task_status))
        .route("/wiki/api/v2/admin-key", post(confluence::acquire_admin_key))
        .route("/wiki/api/v2/spaces", get(confluence::list_spaces))
        .route(
            "/wiki/api/v2/spaces/{id}/permissions",
            get(confluence::list_space_permissions),
        )
        .route(
            "/wiki/rest/api/space/{key}/permission",
            post(confluence::add_space_permission),
        )
        .route(
            "/wiki/rest/api/space/{key}/permission/{id}",
            delete(confluence::remove_space_permission),
        )
        .route("/wiki/rest/api/space/{key}", put(confluence::update_space))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), guard))
        .with_state(state)
}

/// Per-request wrapper: tracks the in-flight count (and its high-water
/// mark), applies the configured artificial delay, and enforces Basic
/// auth on every route.
async fn guard(State(state): State<Arc<StubState>>, request: Request, next: Next) -> Response {
    state.request_started();
    if let Some(delay) = state.config.request_delay {
        tokio::time::sleep(delay).await;
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(state.expected_authorization.as_str());
    let response = if authorized {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({
                "errorMessages": ["Basic authentication required."]
            })),
        )
            .into_response()
    };

    state.request_finished();
    response
}

/// Builder for a stub server's dataset and behavior.
#[derive(Debug, Default)]
pub struct StubServerBuilder {
    config: StubConfig,
    dataset: Dataset,
}

impl StubServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials the server accepts (defaults match [`StubConfig`]).
    pub fn credentials(mut self, email: &str, api_token: &str) -> Self {
        self.config.email = email.to_string();
        self.config.api_token = api_token.to_string();
        self
    }

    pub fn user(mut self, account_id: &str, email: &str, display_name: &str) -> Self {
        self.dataset.users.push(User {
            account_id: account_id.to_string(),
            email_address: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        });
        self
    }

    /// A user whose email is hidden by privacy settings.
    pub fn user_without_email(mut self, account_id: &str, display_name: &str) -> Self {
        self.dataset.users.push(User {
            account_id: account_id.to_string(),
            email_address: None,
            display_name: Some(display_name.to_string()),
        });
        self
    }

    pub fn filter(mut self, id: &str, owner_account_id: &str) -> Self {
        self.dataset.filters.push(StubFilter {
            id: id.to_string(),
            owner: owner_account_id.to_string(),
        });
        self
    }

    pub fn issue(mut self, key: &str, assignee: Option<&str>, reporter: Option<&str>) -> Self {
        let id = 10000 + self.dataset.issues.len() as u64;
        self.dataset.issues.push(StubIssue {
            id,
            key: IssueKey::new_unchecked(key),
            assignee: assignee.map(String::from),
            reporter: reporter.map(String::from),
        });
        self
    }

    /// Mark an issue key as poison: any bulk-edit chunk containing it
    /// is rejected wholesale.
    pub fn poison_issue(mut self, key: &str) -> Self {
        self.dataset.poison_keys.insert(key.to_string());
        self
    }

    pub fn space(mut self, id: &str, key: &str, name: &str, space_type: &str) -> Self {
        self.dataset.spaces.push(SpaceRecord {
            space: Space {
                id: id.to_string(),
                key: key.to_string(),
                name: name.to_string(),
                space_type: space_type.to_string(),
            },
            permissions: Vec::new(),
        });
        self
    }

    /// Grant a user permission in a previously added space. Panics on an
    /// unknown space id; that is a broken test, not a runtime case.
    pub fn space_permission(
        mut self,
        space_id: &str,
        account_id: &str,
        operation_key: &str,
        target: &str,
    ) -> Self {
        self.dataset.next_permission_id += 1;
        let permission = SpacePermission {
            id: Some((7000 + self.dataset.next_permission_id).to_string()),
            subject: PermissionSubject {
                subject_type: "user".to_string(),
                identifier: account_id.to_string(),
            },
            operation: PermissionOperation {
                key: operation_key.to_string(),
                target: target.to_string(),
            },
        };
        let record = self
            .dataset
            .spaces
            .iter_mut()
            .find(|record| record.space.id == space_id)
            .unwrap_or_else(|| panic!("no space with id '{space_id}' in the builder"));
        record.permissions.push(permission);
        self
    }

    /// Grant a group permission; groups must never be touched by the
    /// remap, so tests seed them to prove they survive.
    pub fn group_space_permission(
        mut self,
        space_id: &str,
        group_id: &str,
        operation_key: &str,
        target: &str,
    ) -> Self {
        self.dataset.next_permission_id += 1;
        let permission = SpacePermission {
            id: Some((7000 + self.dataset.next_permission_id).to_string()),
            subject: PermissionSubject {
                subject_type: "group".to_string(),
                identifier: group_id.to_string(),
            },
            operation: PermissionOperation {
                key: operation_key.to_string(),
                target: target.to_string(),
            },
        };
        let record = self
            .dataset
            .spaces
            .iter_mut()
            .find(|record| record.space.id == space_id)
            .unwrap_or_else(|| panic!("no space with id '{space_id}' in the builder"));
        record.permissions.push(permission);
        self
    }

    pub fn filter_page_size(mut self, size: usize) -> Self {
        self.config.filter_page_size = size;
        self
    }

    pub fn space_page_size(mut self, size: usize) -> Self {
        self.config.space_page_size = size;
        self
    }

    pub fn issue_page_size(mut self, size: usize) -> Self {
        self.config.issue_page_size = size;
        self
    }

    /// Queue polls a bulk task takes to reach COMPLETE (default 3:
    /// ENQUEUED, RUNNING, COMPLETE).
    pub fn task_polls_to_terminal(mut self, polls: u32) -> Self {
        self.config.task_polls_to_terminal = polls;
        self
    }

    /// Artificial delay per request, so overlap is observable.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.request_delay = Some(delay);
        self
    }

    /// Finish the build without serving; for callers that bind their
    /// own listener (the demo binary).
    pub fn into_state(self) -> Arc<StubState> {
        Arc::new(StubState::new(self.config, self.dataset))
    }

    /// Bind to an ephemeral localhost port and start serving.
    pub async fn start(self) -> anyhow::Result<StubServer> {
        let state = self.into_state();
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(%error, "stub server exited");
            }
        });

        tracing::debug!(%addr, "stub server started");
        Ok(StubServer {
            addr,
            state,
            handle,
        })
    }
}

/// A running stub server plus handles for asserting on its state.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Base URL clients should be pointed at.
    pub fn base_url(&self) -> Url {
        // The bound address always formats as a valid URL.
        #[allow(clippy::unwrap_used)]
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every mutation applied so far, in order.
    pub async fn mutations(&self) -> Vec<Mutation> {
        self.state.dataset.lock().await.mutations.clone()
    }

    /// Current owner of a filter.
    pub async fn filter_owner(&self, filter_id: &str) -> Option<String> {
        let dataset = self.state.dataset.lock().await;
        dataset
            .filters
            .iter()
            .find(|filter| filter.id == filter_id)
            .map(|filter| filter.owner.clone())
    }

    /// Current value of an issue's user field.
    pub async fn issue_field(&self, key: &str, field: jira_api::UserField) -> Option<String> {
        let dataset = self.state.dataset.lock().await;
        dataset
            .issues
            .iter()
            .find(|issue| issue.key.as_str() == key)
            .and_then(|issue| issue.field(field).map(String::from))
    }

    /// Current permissions of a space.
    pub async fn space_permissions(&self, space_id: &str) -> Vec<SpacePermission> {
        let dataset = self.state.dataset.lock().await;
        dataset
            .spaces
            .iter()
            .find(|record| record.space.id == space_id)
            .map(|record| record.permissions.clone())
            .unwrap_or_default()
    }

    /// Current display name of a space.
    pub async fn space_name(&self, space_key: &str) -> Option<String> {
        let dataset = self.state.dataset.lock().await;
        dataset
            .spaces
            .iter()
            .find(|record| record.space.key == space_key)
            .map(|record| record.space.name.clone())
    }

    pub async fn admin_acquired(&self) -> bool {
        self.state.dataset.lock().await.admin_acquired
    }

    /// Most requests ever observed in flight at once.
    pub fn high_water_mark(&self) -> usize {
        self.state.high_water_mark()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
