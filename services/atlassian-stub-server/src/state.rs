// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! In-memory state behind the stub endpoints
//!
//! Everything lives under one async mutex; handlers lock, read or
//! mutate, and release before responding. Mutations are additionally
//! appended to an ordered log so tests can assert both effects and the
//! order they happened in.

use confluence_api::{Space, SpacePermission};
use jira_api::{IssueKey, User, UserField};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Fixed knobs, set by the builder and read-only once serving.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Basic-auth credentials every request must carry.
    pub email: String,
    pub api_token: String,
    /// Filters per page of `/rest/api/3/filter/search`.
    pub filter_page_size: usize,
    /// Spaces/permissions per page of the v2 listing endpoints.
    pub space_page_size: usize,
    /// Issues per page of `/rest/api/3/search/jql`, before the
    /// requested `maxResults` is applied on top.
    pub issue_page_size: usize,
    /// Queue polls a bulk task takes to reach COMPLETE.
    pub task_polls_to_terminal: u32,
    /// Artificial delay added to every request, so concurrency tests
    /// can observe requests overlapping.
    pub request_delay: Option<Duration>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            email: "svc@example.com".to_string(),
            api_token: "stub-token".to_string(),
            filter_page_size: 2,
            space_page_size: 2,
            issue_page_size: 100,
            task_polls_to_terminal: 3,
            request_delay: None,
        }
    }
}

/// A filter and its current owner.
#[derive(Debug, Clone)]
pub struct StubFilter {
    pub id: String,
    pub owner: String,
}

/// An issue with its two reassignable user fields.
#[derive(Debug, Clone)]
pub struct StubIssue {
    /// Numeric issue id, reported in `processedAccessibleIssues`.
    pub id: u64,
    pub key: IssueKey,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
}

impl StubIssue {
    pub fn field(&self, field: UserField) -> Option<&str> {
        match field {
            UserField::Assignee => self.assignee.as_deref(),
            UserField::Reporter => self.reporter.as_deref(),
        }
    }

    pub fn set_field(&mut self, field: UserField, account_id: &str) {
        match field {
            UserField::Assignee => self.assignee = Some(account_id.to_string()),
            UserField::Reporter => self.reporter = Some(account_id.to_string()),
        }
    }

    /// Project key portion of the issue key.
    pub fn project(&self) -> &str {
        self.key
            .as_str()
            .rsplit_once('-')
            .map_or(self.key.as_str(), |(project, _)| project)
    }
}

/// A space together with its granted permissions.
#[derive(Debug, Clone)]
pub struct SpaceRecord {
    pub space: Space,
    pub permissions: Vec<SpacePermission>,
}

/// A registered bulk task and how far its polling has come.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub total_issue_count: u64,
    /// Issue ids of the submitted keys the stub actually knows.
    pub processed_ids: Vec<u64>,
    /// Queue polls observed so far.
    pub polls: u32,
}

/// One recorded server-side mutation, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    FilterOwner {
        filter_id: String,
        account_id: String,
    },
    BulkEdit {
        task_id: String,
        field: UserField,
        issue_keys: Vec<String>,
        account_id: String,
    },
    PermissionAdded {
        space_key: String,
        account_id: String,
        operation: String,
    },
    PermissionRemoved {
        space_key: String,
        permission_id: String,
    },
    SpaceRenamed {
        space_key: String,
        name: String,
    },
}

/// Mutable portion of the stub state.
#[derive(Debug, Default)]
pub struct Dataset {
    pub users: Vec<User>,
    pub filters: Vec<StubFilter>,
    pub issues: Vec<StubIssue>,
    pub spaces: Vec<SpaceRecord>,
    pub tasks: HashMap<String, TaskRecord>,
    /// Issue keys whose presence fails an entire bulk-edit chunk.
    pub poison_keys: HashSet<String>,
    pub mutations: Vec<Mutation>,
    pub admin_acquired: bool,
    pub next_task_id: u64,
    pub next_permission_id: u64,
}

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct StubState {
    pub config: StubConfig,
    pub dataset: Mutex<Dataset>,
    /// The exact `Authorization` header value every request must carry.
    pub expected_authorization: String,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl StubState {
    pub fn new(config: StubConfig, dataset: Dataset) -> Self {
        use base64::Engine as _;
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.email, config.api_token));
        Self {
            expected_authorization: format!("Basic {credentials}"),
            config,
            dataset: Mutex::new(dataset),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    /// Record a request entering; returns nothing, but updates the
    /// high-water mark of concurrently in-flight requests.
    pub fn request_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
    }

    pub fn request_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Most requests ever observed in flight at once.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}
