// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Jira endpoints of the stub
//!
//! Implements the exact subset jira-client consumes: current user, user
//! search, filter search and ownership, JQL issue search, bulk edit
//! submission, and the bulk task queue. Wire shapes come from the
//! jira-api crate so the stub cannot drift from the client.

use crate::state::{Mutation, StubState, TaskRecord};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jira_api::{
    BulkEditRequest, BulkEditResponse, BulkTask, FilterOwnerRequest, FilterRef, FilterSearchPage,
    SearchIssue, SearchResponse, TaskStatus, User, UserField,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Issues per bulk-edit chunk the real endpoint accepts.
const BULK_CHUNK_LIMIT: usize = 50;

/// A Jira-style error response: `{"errorMessages": ["..."]}`.
fn jira_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "errorMessages": [message.into()] })),
    )
        .into_response()
}

/// `GET /rest/api/3/myself`
pub async fn myself(State(state): State<Arc<StubState>>) -> Json<User> {
    Json(User {
        account_id: "stub-service-account".to_string(),
        email_address: Some(state.config.email.clone()),
        display_name: Some("Stub Service".to_string()),
    })
}

/// `GET /rest/api/3/user/search?query=...`
///
/// Exact accountId/email matches always qualify; otherwise a
/// case-insensitive substring match over accountId, email, and display
/// name, which is how ambiguous prefix queries come back multi-valued.
pub async fn user_search(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<User>> {
    let query = params.get("query").cloned().unwrap_or_default();
    let needle = query.to_lowercase();

    let dataset = state.dataset.lock().await;
    let matches = dataset
        .users
        .iter()
        .filter(|user| {
            user.account_id == query
                || user.email_address.as_deref() == Some(query.as_str())
                || user.account_id.to_lowercase().contains(&needle)
                || user
                    .email_address
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
                || user
                    .display_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    Json(matches)
}

/// `GET /rest/api/3/filter/search?accountId=...&startAt=N`
pub async fn filter_search(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(account_id) = params.get("accountId") else {
        return jira_error(StatusCode::BAD_REQUEST, "accountId is required");
    };
    let start_at: usize = params
        .get("startAt")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    let dataset = state.dataset.lock().await;
    let owned: Vec<FilterRef> = dataset
        .filters
        .iter()
        .filter(|filter| filter.owner == *account_id)
        .map(|filter| FilterRef {
            id: filter.id.clone(),
        })
        .collect();

    let end = (start_at + state.config.filter_page_size).min(owned.len());
    let next_page = (end < owned.len()).then(|| {
        format!("/rest/api/3/filter/search?accountId={account_id}&startAt={end}")
    });

    Json(FilterSearchPage {
        values: owned.get(start_at..end).unwrap_or_default().to_vec(),
        next_page,
    })
    .into_response()
}

/// `PUT /rest/api/3/filter/{id}/owner`
pub async fn set_filter_owner(
    State(state): State<Arc<StubState>>,
    Path(filter_id): Path<String>,
    Json(body): Json<FilterOwnerRequest>,
) -> Response {
    let mut dataset = state.dataset.lock().await;
    let Some(filter) = dataset
        .filters
        .iter_mut()
        .find(|filter| filter.id == filter_id)
    else {
        return jira_error(
            StatusCode::NOT_FOUND,
            format!("The filter with id '{filter_id}' does not exist."),
        );
    };

    filter.owner = body.account_id.clone();
    dataset.mutations.push(Mutation::FilterOwner {
        filter_id,
        account_id: body.account_id,
    });
    StatusCode::NO_CONTENT.into_response()
}

/// Parsed form of the only JQL shape the remap tool emits:
/// `assignee|reporter = ACCOUNTID [AND project = KEY]`.
pub(crate) fn parse_jql(jql: &str) -> Option<(UserField, String, Option<String>)> {
    let mut clauses = jql.split(" AND ");

    let (field_name, account_id) = split_eq(clauses.next()?)?;
    let field = match field_name {
        "assignee" => UserField::Assignee,
        "reporter" => UserField::Reporter,
        _ => return None,
    };

    let project = match clauses.next() {
        Some(clause) => {
            let (key, value) = split_eq(clause)?;
            if key != "project" {
                return None;
            }
            Some(value.to_string())
        }
        None => None,
    };

    if clauses.next().is_some() {
        return None;
    }
    Some((field, account_id.to_string(), project))
}

fn split_eq(clause: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = clause.split_once('=')?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    (!lhs.is_empty() && !rhs.is_empty()).then_some((lhs, rhs))
}

/// `GET /rest/api/3/search/jql?jql=...&nextPageToken=N`
///
/// Token pagination: the token is the offset of the next page, opaque to
/// the client, echoed back verbatim.
pub async fn search_jql(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let jql = params.get("jql").cloned().unwrap_or_default();
    let Some((field, account_id, project)) = parse_jql(&jql) else {
        return jira_error(
            StatusCode::BAD_REQUEST,
            format!("Could not parse JQL: '{jql}'"),
        );
    };
    let offset: usize = params
        .get("nextPageToken")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);
    let max_results: usize = params
        .get("maxResults")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(50);

    let dataset = state.dataset.lock().await;
    let matched: Vec<&crate::state::StubIssue> = dataset
        .issues
        .iter()
        .filter(|issue| issue.field(field) == Some(account_id.as_str()))
        .filter(|issue| {
            project
                .as_deref()
                .is_none_or(|project| issue.project() == project)
        })
        .collect();

    let page_size = max_results.min(state.config.issue_page_size).max(1);
    let end = (offset + page_size).min(matched.len());
    let issues = matched
        .get(offset..end)
        .unwrap_or_default()
        .iter()
        .map(|issue| SearchIssue {
            key: issue.key.clone(),
        })
        .collect();

    Json(SearchResponse {
        issues,
        is_last: Some(end >= matched.len()),
        next_page_token: (end < matched.len()).then(|| end.to_string()),
    })
    .into_response()
}

/// `POST /rest/api/3/bulk/issues/fields`
///
/// Validates the chunk, fails it wholesale if it contains a poison key,
/// otherwise applies the edit immediately and registers a task whose
/// progress is scripted across subsequent queue polls.
pub async fn bulk_edit(
    State(state): State<Arc<StubState>>,
    Json(body): Json<BulkEditRequest>,
) -> Response {
    let Some(picker) = body
        .edited_fields_input
        .single_select_clearable_user_picker_fields
        .first()
    else {
        return jira_error(StatusCode::BAD_REQUEST, "No field edits supplied.");
    };
    let field = match picker.field_id.as_str() {
        "assignee" => UserField::Assignee,
        "reporter" => UserField::Reporter,
        other => {
            return jira_error(
                StatusCode::BAD_REQUEST,
                format!("Field '{other}' cannot be bulk edited."),
            );
        }
    };
    if body.selected_actions != vec![picker.field_id.clone()] {
        return jira_error(
            StatusCode::BAD_REQUEST,
            "selectedActions does not match the edited fields.",
        );
    }
    if body.selected_issue_ids_or_keys.is_empty() {
        return jira_error(StatusCode::BAD_REQUEST, "No issues selected.");
    }
    if body.selected_issue_ids_or_keys.len() > BULK_CHUNK_LIMIT {
        return jira_error(
            StatusCode::BAD_REQUEST,
            format!("At most {BULK_CHUNK_LIMIT} issues may be edited per request."),
        );
    }

    let account_id = picker.user.account_id.clone();
    let mut dataset = state.dataset.lock().await;

    if let Some(poison) = body
        .selected_issue_ids_or_keys
        .iter()
        .find(|key| dataset.poison_keys.contains(key.as_str()))
    {
        return jira_error(
            StatusCode::BAD_REQUEST,
            format!("Issue '{poison}' cannot be bulk edited."),
        );
    }

    let mut processed_ids = Vec::new();
    for key in &body.selected_issue_ids_or_keys {
        if let Some(issue) = dataset.issues.iter_mut().find(|issue| issue.key == *key) {
            issue.set_field(field, &account_id);
            processed_ids.push(issue.id);
        }
    }

    dataset.next_task_id += 1;
    let task_id = (10000 + dataset.next_task_id).to_string();
    dataset.tasks.insert(
        task_id.clone(),
        TaskRecord {
            total_issue_count: body.selected_issue_ids_or_keys.len() as u64,
            processed_ids,
            polls: 0,
        },
    );
    dataset.mutations.push(Mutation::BulkEdit {
        task_id: task_id.clone(),
        field,
        issue_keys: body
            .selected_issue_ids_or_keys
            .iter()
            .map(ToString::to_string)
            .collect(),
        account_id,
    });

    Json(BulkEditResponse { task_id }).into_response()
}

/// `GET /rest/api/3/bulk/queue/{taskId}`
///
/// Each poll advances the task one step along
/// ENQUEUED -> RUNNING -> COMPLETE, reaching COMPLETE on poll number
/// `task_polls_to_terminal`. `processedAccessibleIssues` only appears on
/// the terminal observation, as on the real queue.
pub async fn task_status(
    State(state): State<Arc<StubState>>,
    Path(task_id): Path<String>,
) -> Response {
    let mut dataset = state.dataset.lock().await;
    let Some(task) = dataset.tasks.get_mut(&task_id) else {
        return jira_error(
            StatusCode::NOT_FOUND,
            format!("Task '{task_id}' does not exist."),
        );
    };

    task.polls += 1;
    let terminal_at = state.config.task_polls_to_terminal.max(1);

    let observation = if task.polls >= terminal_at {
        BulkTask {
            task_id,
            status: TaskStatus::Complete,
            progress_percent: 100,
            total_issue_count: task.total_issue_count,
            processed_accessible_issues: task
                .processed_ids
                .iter()
                .map(|id| serde_json::Value::from(*id))
                .collect(),
        }
    } else {
        let status = if task.polls == 1 && terminal_at >= 3 {
            TaskStatus::Enqueued
        } else {
            TaskStatus::Running
        };
        BulkTask {
            task_id,
            status,
            progress_percent: (task.polls * 100 / terminal_at).min(99),
            total_issue_count: task.total_issue_count,
            processed_accessible_issues: Vec::new(),
        }
    };

    Json(observation).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn parses_bare_user_field_clause() {
        let (field, account, project) = parse_jql("assignee = A1").expect("parse");
        assert_eq!(field, UserField::Assignee);
        assert_eq!(account, "A1");
        assert_eq!(project, None);
    }

    #[test]
    fn parses_project_scoped_clause() {
        let (field, account, project) = parse_jql("reporter = 712020:abc AND project = OPS")
            .expect("parse");
        assert_eq!(field, UserField::Reporter);
        assert_eq!(account, "712020:abc");
        assert_eq!(project.as_deref(), Some("OPS"));
    }

    #[test_case("" ; "empty")]
    #[test_case("labels = backend" ; "unknown field")]
    #[test_case("assignee =" ; "missing value")]
    #[test_case("assignee = A1 AND labels = x" ; "unknown second clause")]
    #[test_case("assignee = A1 AND project = OPS AND project = ENG" ; "too many clauses")]
    fn rejects_unsupported_jql(jql: &str) {
        assert_eq!(parse_jql(jql), None);
    }
}
