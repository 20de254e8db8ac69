// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Hand-written client for the Confluence REST API subset in
//! [`confluence_api`]
//!
//! Mirrors the Jira client's shape: one [`RequestGate`] per client
//! instance, every outbound request holding a permit. Spaces and
//! permissions are *read* through the v2 API and *written* through the
//! v1 API; this client converts between the two shapes so callers only
//! ever see the v1 [`SpacePermission`].
//!
//! Space-permission writes need an elevated session, acquired once per
//! run via [`ConfluenceClient::acquire_admin`].

use atlassian_http::{ApiError, HttpClient, RequestGate};
use atlassian_pagination::{DrainError, drain};
use confluence_api::{
    Space, SpacePermission, SpacePermissionsPage, SpacesPage, UpdateSpaceRequest,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Response substring that marks an add-permission conflict reported as
/// a 400 rather than a 409.
const ALREADY_EXISTS_MARKER: &str = "Permission already exists.";

/// Failure of a Confluence API operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected a request and said why in a Confluence error
    /// body.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiError,
    },

    /// An HTTP failure with no Confluence error body to mine.
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

/// Pull human-readable messages out of a Confluence error body.
///
/// The v1 endpoints nest messages under `data.errors[].message.translation`;
/// the v2 endpoints use a flat `errors[]` of `{title, detail}` records.
fn mine_error_messages(error: &ApiError) -> Option<String> {
    let body = error.response_json()?;

    if let Some(errors) = body
        .get("data")
        .and_then(|data| data.get("errors"))
        .and_then(|v| v.as_array())
    {
        let found: Vec<&str> = errors
            .iter()
            .filter_map(|e| {
                e.get("message")
                    .and_then(|m| m.get("translation"))
                    .and_then(|t| t.as_str())
            })
            .collect();
        if !found.is_empty() {
            return Some(found.join("; "));
        }
    }

    if let Some(errors) = body.get("errors").and_then(|v| v.as_array()) {
        let found: Vec<String> = errors
            .iter()
            .filter_map(|e| {
                let title = e.get("title").and_then(|t| t.as_str())?;
                match e.get("detail").and_then(|d| d.as_str()) {
                    Some(detail) => Some(format!("{title} - {detail}")),
                    None => Some(title.to_string()),
                }
            })
            .collect();
        if !found.is_empty() {
            return Some(found.join("; "));
        }
    }

    None
}

/// Whether an add-permission failure means the permission is already in
/// place, which satisfies the caller's goal as-is.
fn is_already_exists(error: &ApiError) -> bool {
    match error.status() {
        Some(409) => true,
        Some(400) => error
            .response_text()
            .is_some_and(|text| text.contains(ALREADY_EXISTS_MARKER)),
        _ => false,
    }
}

/// Client for the Confluence side of one Atlassian site.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: HttpClient,
    gate: RequestGate,
}

impl ConfluenceClient {
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

    /// Elevate the session for space-permission administration.
    pub async fn acquire_admin(&self) -> Result<(), Error> {
        let _permit = self.gate.acquire().await;
        self.http.post_empty("/wiki/api/v2/admin-key").await?;
        Ok(())
    }

    /// Every space on the site, across all pages.
    pub async fn list_spaces(&self) -> Result<Vec<Space>, Error> {
        let first: SpacesPage = {
            let _permit = self.gate.acquire().await;
            self.http
                .get("/wiki/api/v2/spaces", &[("limit", "100")])
                .await?
        };

        let spaces = drain(first, |next_page: String| async move {
            let _permit = self.gate.acquire().await;
            self.http
                .get_url::<SpacesPage>(&next_page)
                .await
                .map_err(Error::from)
        })
        .await
        .map_err(Error::from)?;

        debug!(spaces = spaces.len(), "listed spaces");
        Ok(spaces)
    }

    /// Every permission of one space, across all pages, converted to the
    /// v1 shape used for writes.
    pub async fn list_space_permissions(
        &self,
        space_id: &str,
    ) -> Result<Vec<SpacePermission>, Error> {
        let path = format!("/wiki/api/v2/spaces/{space_id}/permissions");
        let first: SpacePermissionsPage = {
            let _permit = self.gate.acquire().await;
            self.http.get(&path, &[("limit", "100")]).await?
        };

        let permissions = drain(first, |next_page: String| async move {
            let _permit = self.gate.acquire().await;
            self.http
                .get_url::<SpacePermissionsPage>(&next_page)
                .await
                .map_err(Error::from)
        })
        .await
        .map_err(Error::from)?;

        Ok(permissions.into_iter().map(SpacePermission::from).collect())
    }

    /// Grant a permission in a space.
    ///
    /// A conflict (409, or 400 carrying the "already exists" marker)
    /// means the target state already holds; it is warned about and
    /// treated as success, never surfaced as an error.
    pub async fn add_space_permission(
        &self,
        space_key: &str,
        permission: &SpacePermission,
    ) -> Result<(), Error> {
        let _permit = self.gate.acquire().await;
        let result = self
            .http
            .post_discard(
                &format!("/wiki/rest/api/space/{space_key}/permission"),
                permission,
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(error) if is_already_exists(&error) => {
                warn!(
                    space = space_key,
                    operation = %permission.operation.key,
                    subject = %permission.subject.identifier,
                    "permission already exists, skipping"
                );
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Revoke a granted permission by id.
    pub async fn remove_space_permission(
        &self,
        space_key: &str,
        permission_id: &str,
    ) -> Result<(), Error> {
        let _permit = self.gate.acquire().await;
        self.http
            .delete(&format!(
                "/wiki/rest/api/space/{space_key}/permission/{permission_id}"
            ))
            .await?;
        Ok(())
    }

    /// Rename a space, leaving its type unchanged.
    pub async fn rename_space(
        &self,
        space_key: &str,
        space_type: &str,
        new_name: &str,
    ) -> Result<(), Error> {
        let _permit = self.gate.acquire().await;
        self.http
            .put(
                &format!("/wiki/rest/api/space/{space_key}"),
                &UpdateSpaceRequest {
                    space_type: space_type.to_string(),
                    name: new_name.to_string(),
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status_error(status: u16, body: serde_json::Value) -> ApiError {
        ApiError::from(atlassian_http::HttpFailure {
            status,
            reason: String::new(),
            method: "POST".to_string(),
            url: "https://example.atlassian.net/wiki/rest/api/space/ENG/permission".to_string(),
            request_headers: Default::default(),
            request_body: None,
            response_headers: Default::default(),
            response_text: body.to_string(),
            response_json: Some(body),
        })
    }

    #[test]
    fn conflict_status_is_already_exists() {
        assert!(is_already_exists(&status_error(409, serde_json::json!({}))));
    }

    #[test]
    fn bad_request_with_marker_is_already_exists() {
        let error = status_error(
            400,
            serde_json::json!({"message": "Permission already exists."}),
        );
        assert!(is_already_exists(&error));

        let unrelated = status_error(400, serde_json::json!({"message": "bad subject"}));
        assert!(!is_already_exists(&unrelated));
    }

    #[test]
    fn server_errors_are_not_already_exists() {
        assert!(!is_already_exists(&status_error(500, serde_json::json!({}))));
    }

    #[test]
    fn mines_v1_nested_translations() {
        let error = Error::from(status_error(
            400,
            serde_json::json!({
                "data": {"errors": [
                    {"message": {"translation": "Subject type is invalid"}},
                    {"message": {"translation": "Operation is unknown"}}
                ]}
            }),
        ));
        assert_eq!(
            error.to_string(),
            "Subject type is invalid; Operation is unknown"
        );
    }

    #[test]
    fn mines_v2_title_detail_pairs() {
        let error = Error::from(status_error(
            404,
            serde_json::json!({
                "errors": [{"title": "Not Found", "detail": "Space does not exist"}]
            }),
        ));
        assert_eq!(error.to_string(), "Not Found - Space does not exist");
    }

    #[test]
    fn unmineable_body_falls_back_to_http_summary() {
        let error = Error::from(status_error(502, serde_json::json!({"oops": true})));
        match &error {
            Error::Http(_) => {}
            other => panic!("expected Http variant, got {other:?}"),
        }
    }
}
