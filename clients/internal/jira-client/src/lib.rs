// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Hand-written client for the Jira REST API v3 subset in [`jira_api`]
//!
//! Every outbound request passes through the client's [`RequestGate`], so
//! no matter how many logical operations a caller fans out, the site
//! never sees more than the configured number of concurrent requests
//! from this client. The gate belongs to the client instance; a
//! Confluence client in the same process has its own.
//!
//! Bulk edits are asynchronous on the Jira side: a submission returns a
//! task id, and the task is observed via [`JiraClient::get_task_status`]
//! until it reports a terminal status. Driving that polling loop is the
//! caller's job (see the remapadm task tracker); this crate only issues
//! the individual requests.

use atlassian_http::{ApiError, HttpClient, RequestGate};
use atlassian_pagination::{DrainError, drain};
use futures_util::future::join_all;
use jira_api::{
    BulkEditRequest, BulkEditResponse, BulkTask, FilterOwnerRequest, FilterSearchPage, IssueKey,
    SearchResponse, User, UserField,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Issues per bulk-edit submission; the endpoint rejects larger chunks.
pub const BULK_BATCH_SIZE: usize = 50;

/// Stagger spacing for bulk-edit submissions. Wider than the default
/// because the bulk endpoint sits behind a much stricter burst limit
/// than reads.
pub const BULK_SUBMIT_SPACING: Duration = Duration::from_millis(500);

/// Failure of a Jira API operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A user search returned nothing usable for the identifier: zero
    /// candidates, or several with no exact accountId/email member.
    #[error("no exact match found for '{identifier}'")]
    NoExactMatch { identifier: String },

    /// The server rejected a request and said why in a Jira error body.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiError,
    },

    /// An HTTP failure with no Jira error body to mine.
    #[error(transparent)]
    Http(ApiError),

    /// A paginated listing misbehaved (pointer loop or runaway paging).
    #[error("{0}")]
    Pagination(String),
}

impl From<ApiError> for Error {
    fn from(source: ApiError) -> Self {
        match mine_error_messages(&source) {
            Some(message) => Error::Rejected { message, source },
            None => Error::Http(source),
        }
    }
}

impl From<DrainError<Error>> for Error {
    fn from(error: DrainError<Error>) -> Self {
        match error {
            DrainError::Fetch(inner) => inner,
            other => Error::Pagination(other.to_string()),
        }
    }
}

/// Pull human-readable messages out of a Jira error body.
///
/// Jira reports failures as `{"errorMessages": [..]}` and/or
/// `{"errors": [{"message": ..}, ..]}`; either list joined with `; ` is
/// far more useful than the raw HTTP summary.
fn mine_error_messages(error: &ApiError) -> Option<String> {
    let body = error.response_json()?;

    if let Some(messages) = body.get("errorMessages").and_then(|v| v.as_array()) {
        let found: Vec<&str> = messages.iter().filter_map(|m| m.as_str()).collect();
        if !found.is_empty() {
            return Some(found.join("; "));
        }
    }

    if let Some(errors) = body.get("errors").and_then(|v| v.as_array()) {
        let found: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
            .collect();
        if !found.is_empty() {
            return Some(found.join("; "));
        }
    }

    None
}

/// Disambiguation rule for user search results.
///
/// A single candidate is trusted as-is. Among several, only an exact
/// accountId or email match is accepted; a bag of prefix matches with no
/// exact member resolves to nothing rather than to a guess.
fn select_exact(candidates: Vec<User>, identifier: &str) -> Option<User> {
    match candidates.len() {
        0 => None,
        1 => candidates.into_iter().next(),
        _ => candidates.into_iter().find(|user| {
            user.account_id == identifier || user.email_address.as_deref() == Some(identifier)
        }),
    }
}

/// Client for one Jira site.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: HttpClient,
    gate: RequestGate,
}

impl JiraClient {
    /// Build a client for `base_url` authenticating as `email` with an
    /// API token, allowing at most `concurrency` requests in flight.
    pub fn new(
        base_url: Url,
        email: &str,
        api_token: &str,
        concurrency: usize,
    ) -> Result<Self, atlassian_http::BuildError> {
        Ok(Self {
            http: HttpClient::new(base_url, email, api_token)?,
            gate: RequestGate::new(concurrency),
        })
    }

    /// The authenticated user, via `GET /rest/api/3/myself`.
    pub async fn get_self(&self) -> Result<User, Error> {
        let _permit = self.gate.acquire().await;
        Ok(self.http.get("/rest/api/3/myself", &[]).await?)
    }

    /// Resolve a free-form identifier (email or accountId) to a user.
    pub async fn resolve_user(&self, identifier: &str) -> Result<User, Error> {
        let candidates: Vec<User> = {
            let _permit = self.gate.acquire().await;
            self.http
                .get("/rest/api/3/user/search", &[("query", identifier)])
                .await?
        };

        select_exact(candidates, identifier).ok_or_else(|| Error::NoExactMatch {
            identifier: identifier.to_string(),
        })
    }

    /// Ids of every filter the given user owns, across all pages.
    pub async fn get_filters_for_user(&self, user: &User) -> Result<Vec<String>, Error> {
        let first: FilterSearchPage = {
            let _permit = self.gate.acquire().await;
            self.http
                .get(
                    "/rest/api/3/filter/search",
                    &[
                        ("accountId", user.account_id.as_str()),
                        ("overrideSharePermissions", "true"),
                    ],
                )
                .await?
        };

        let filters = drain(first, |next_page: String| async move {
            let _permit = self.gate.acquire().await;
            self.http
                .get_url::<FilterSearchPage>(&next_page)
                .await
                .map_err(Error::from)
        })
        .await
        .map_err(Error::from)?;

        debug!(
            account_id = %user.account_id,
            filters = filters.len(),
            "listed filters"
        );
        Ok(filters.into_iter().map(|filter| filter.id).collect())
    }

    /// Hand a filter to a new owner.
    pub async fn set_filter_owner(&self, filter_id: &str, account_id: &str) -> Result<(), Error> {
        let _permit = self.gate.acquire().await;
        self.http
            .put(
                &format!("/rest/api/3/filter/{filter_id}/owner"),
                &FilterOwnerRequest {
                    account_id: account_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Keys of every issue whose `field` points at `user`, optionally
    /// scoped to one project, across all token pages.
    pub async fn search_issue_keys_for_user_field(
        &self,
        field: UserField,
        user: &User,
        project_key: Option<&str>,
    ) -> Result<Vec<IssueKey>, Error> {
        let mut jql = format!("{field} = {}", user.account_id);
        if let Some(project) = project_key {
            jql.push_str(&format!(" AND project = {project}"));
        }

        let first: SearchResponse = {
            let _permit = self.gate.acquire().await;
            self.http
                .get(
                    "/rest/api/3/search/jql",
                    &[("jql", jql.as_str()), ("maxResults", "100"), ("fields", "key")],
                )
                .await?
        };

        let jql = jql.as_str();
        let issues = drain(first, |token: String| async move {
            let _permit = self.gate.acquire().await;
            self.http
                .get::<SearchResponse>(
                    "/rest/api/3/search/jql",
                    &[
                        ("jql", jql),
                        ("maxResults", "100"),
                        ("fields", "key"),
                        ("nextPageToken", token.as_str()),
                    ],
                )
                .await
                .map_err(Error::from)
        })
        .await
        .map_err(Error::from)?;

        debug!(
            account_id = %user.account_id,
            field = %field,
            issues = issues.len(),
            "searched issues"
        );
        Ok(issues.into_iter().map(|issue| issue.key).collect())
    }

    /// Submit bulk edits pointing `field` at `new_account_id` for all of
    /// `issue_keys`, in chunks of [`BULK_BATCH_SIZE`].
    ///
    /// Chunks are submitted concurrently, staggered by chunk index at
    /// [`BULK_SUBMIT_SPACING`]. A rejected chunk is warned about and
    /// skipped; its issues simply end up with no task to track, which
    /// surfaces as a lower reassigned count. Returns the task ids of the
    /// accepted chunks.
    pub async fn bulk_update_user_field(
        &self,
        issue_keys: &[IssueKey],
        field: UserField,
        new_account_id: &str,
    ) -> Vec<String> {
        let submissions = issue_keys
            .chunks(BULK_BATCH_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                let body =
                    BulkEditRequest::reassign_user_field(field, chunk.to_vec(), new_account_id);
                async move {
                    let _permit = self
                        .gate
                        .acquire_staggered(index as u32, BULK_SUBMIT_SPACING)
                        .await;
                    self.http
                        .post::<BulkEditResponse, _>("/rest/api/3/bulk/issues/fields", &body)
                        .await
                }
            });

        let mut task_ids = Vec::new();
        for (index, outcome) in join_all(submissions).await.into_iter().enumerate() {
            match outcome {
                Ok(response) => task_ids.push(response.task_id),
                Err(error) => warn!(
                    chunk = index,
                    field = %field,
                    error = %Error::from(error),
                    "bulk edit chunk rejected; its issues will not be reassigned"
                ),
            }
        }
        task_ids
    }

    /// One observation of a queued bulk task.
    ///
    /// `stagger_order` is the caller's position in its polling fan-out;
    /// polls are staggered at the default spacing to avoid re-bursting
    /// the queue endpoint every round.
    pub async fn get_task_status(
        &self,
        task_id: &str,
        stagger_order: u32,
    ) -> Result<BulkTask, Error> {
        let _permit = self
            .gate
            .acquire_staggered(stagger_order, atlassian_http::DEFAULT_SPACING)
            .await;
        Ok(self
            .http
            .get(&format!("/rest/api/3/bulk/queue/{task_id}"), &[])
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(account_id: &str, email: Option<&str>) -> User {
        User {
            account_id: account_id.to_string(),
            email_address: email.map(String::from),
            display_name: None,
        }
    }

    #[test]
    fn single_candidate_is_accepted_unconditionally() {
        // The search endpoint ranks best-first; a unique candidate needs
        // no disambiguation even when nothing matches exactly.
        let selected = select_exact(vec![user("A1", Some("mia@example.com"))], "mia");
        assert_eq!(selected.map(|u| u.account_id), Some("A1".to_string()));
    }

    #[test]
    fn zero_candidates_select_nothing() {
        assert_eq!(select_exact(vec![], "mia@example.com"), None);
    }

    #[test]
    fn multiple_candidates_require_an_exact_member() {
        let candidates = vec![
            user("A1", Some("mia@example.com")),
            user("A2", Some("miriam@example.com")),
        ];
        assert_eq!(select_exact(candidates.clone(), "mi"), None);

        let by_email = select_exact(candidates.clone(), "miriam@example.com");
        assert_eq!(by_email.map(|u| u.account_id), Some("A2".to_string()));

        let by_account = select_exact(candidates, "A1");
        assert_eq!(
            by_account.and_then(|u| u.email_address),
            Some("mia@example.com".to_string())
        );
    }

    fn status_error(body: serde_json::Value) -> ApiError {
        ApiError::from(atlassian_http::HttpFailure {
            status: 400,
            reason: "Bad Request".to_string(),
            method: "POST".to_string(),
            url: "https://example.atlassian.net/rest/api/3/bulk/issues/fields".to_string(),
            request_headers: Default::default(),
            request_body: None,
            response_headers: Default::default(),
            response_text: body.to_string(),
            response_json: Some(body),
        })
    }

    #[test]
    fn mines_error_messages_list() {
        let error = Error::from(status_error(serde_json::json!({
            "errorMessages": ["Issue does not exist", "Field cannot be set"]
        })));
        assert_eq!(
            error.to_string(),
            "Issue does not exist; Field cannot be set"
        );
    }

    #[test]
    fn mines_errors_object_list() {
        let error = Error::from(status_error(serde_json::json!({
            "errors": [{"message": "too many issues"}, {"code": 7}]
        })));
        assert_eq!(error.to_string(), "too many issues");
    }

    #[test]
    fn unmineable_body_falls_back_to_http_summary() {
        let error = Error::from(status_error(serde_json::json!({"oops": true})));
        match &error {
            Error::Http(_) => {}
            other => panic!("expected Http variant, got {other:?}"),
        }
        assert!(error.to_string().starts_with("HTTP 400 Bad Request"));
    }
}
