// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Confluence endpoints of the stub
//!
//! Spaces and permissions are read through v2 shapes and written through
//! v1 shapes, exactly as on the real site, including the permission
//! listing being locked behind the admin key and the duplicate-grant 400
//! with its magic message.

use crate::state::{Mutation, StubState};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use confluence_api::{
    PageLinks, PermissionOperationV2, PermissionPrincipal, SpacePermission, SpacePermissionV2,
    SpacePermissionsPage, SpacesPage, UpdateSpaceRequest,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A Confluence v2-style error response.
fn confluence_error(status: StatusCode, title: &str, detail: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "errors": [{ "title": title, "detail": detail }]
        })),
    )
        .into_response()
}

/// `POST /wiki/api/v2/admin-key`
pub async fn acquire_admin_key(State(state): State<Arc<StubState>>) -> Response {
    let mut dataset = state.dataset.lock().await;
    dataset.admin_acquired = true;
    Json(serde_json::json!({ "expiresAt": "2099-01-01T00:00:00Z" })).into_response()
}

/// `GET /wiki/api/v2/spaces?cursor=N`
pub async fn list_spaces(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let offset: usize = params
        .get("cursor")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    let dataset = state.dataset.lock().await;
    let end = (offset + state.config.space_page_size).min(dataset.spaces.len());
    let results = dataset
        .spaces
        .get(offset..end)
        .unwrap_or_default()
        .iter()
        .map(|record| record.space.clone())
        .collect();

    Json(SpacesPage {
        results,
        links: PageLinks {
            next: (end < dataset.spaces.len())
                .then(|| format!("/wiki/api/v2/spaces?cursor={end}")),
        },
    })
    .into_response()
}

/// `GET /wiki/api/v2/spaces/{id}/permissions?cursor=N`
///
/// 401 until the admin key has been acquired, which is what forces the
/// client's `acquire_admin` call to come first.
pub async fn list_space_permissions(
    State(state): State<Arc<StubState>>,
    Path(space_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let offset: usize = params
        .get("cursor")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    let dataset = state.dataset.lock().await;
    if !dataset.admin_acquired {
        return confluence_error(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Space permissions require an active admin key.",
        );
    }
    let Some(record) = dataset
        .spaces
        .iter()
        .find(|record| record.space.id == space_id)
    else {
        return confluence_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            &format!("No space with id '{space_id}'."),
        );
    };

    let end = (offset + state.config.space_page_size).min(record.permissions.len());
    let results = record
        .permissions
        .get(offset..end)
        .unwrap_or_default()
        .iter()
        .map(to_v2)
        .collect();

    Json(SpacePermissionsPage {
        results,
        links: PageLinks {
            next: (end < record.permissions.len()).then(|| {
                format!("/wiki/api/v2/spaces/{space_id}/permissions?cursor={end}")
            }),
        },
    })
    .into_response()
}

fn to_v2(permission: &SpacePermission) -> SpacePermissionV2 {
    SpacePermissionV2 {
        id: permission.id.clone(),
        principal: PermissionPrincipal {
            principal_type: permission.subject.subject_type.clone(),
            id: permission.subject.identifier.clone(),
        },
        operation: PermissionOperationV2 {
            key: permission.operation.key.clone(),
            target_type: permission.operation.target.clone(),
        },
    }
}

/// `POST /wiki/rest/api/space/{key}/permission`
pub async fn add_space_permission(
    State(state): State<Arc<StubState>>,
    Path(space_key): Path<String>,
    Json(mut permission): Json<SpacePermission>,
) -> Response {
    let mut dataset = state.dataset.lock().await;

    let permission_id = {
        dataset.next_permission_id += 1;
        (7000 + dataset.next_permission_id).to_string()
    };
    let Some(record) = dataset
        .spaces
        .iter_mut()
        .find(|record| record.space.key == space_key)
    else {
        return confluence_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            &format!("No space with key '{space_key}'."),
        );
    };

    let duplicate = record.permissions.iter().any(|existing| {
        existing.subject == permission.subject && existing.operation == permission.operation
    });
    if duplicate {
        // The real v1 endpoint reports this as a 400, not a 409, with
        // the message the client keys off.
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "Permission already exists." })),
        )
            .into_response();
    }

    permission.id = Some(permission_id);
    let response = Json(&permission).into_response();
    let account_id = permission.subject.identifier.clone();
    let operation = permission.operation.key.clone();
    record.permissions.push(permission);
    dataset.mutations.push(Mutation::PermissionAdded {
        space_key,
        account_id,
        operation,
    });
    response
}

/// `DELETE /wiki/rest/api/space/{key}/permission/{id}`
pub async fn remove_space_permission(
    State(state): State<Arc<StubState>>,
    Path((space_key, permission_id)): Path<(String, String)>,
) -> Response {
    let mut dataset = state.dataset.lock().await;
    let Some(record) = dataset
        .spaces
        .iter_mut()
        .find(|record| record.space.key == space_key)
    else {
        return confluence_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            &format!("No space with key '{space_key}'."),
        );
    };

    let before = record.permissions.len();
    record
        .permissions
        .retain(|permission| permission.id.as_deref() != Some(permission_id.as_str()));
    if record.permissions.len() == before {
        return confluence_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            &format!("No permission with id '{permission_id}' in '{space_key}'."),
        );
    }

    dataset.mutations.push(Mutation::PermissionRemoved {
        space_key,
        permission_id,
    });
    StatusCode::NO_CONTENT.into_response()
}

/// `PUT /wiki/rest/api/space/{key}`
pub async fn update_space(
    State(state): State<Arc<StubState>>,
    Path(space_key): Path<String>,
    Json(body): Json<UpdateSpaceRequest>,
) -> Response {
    let mut dataset = state.dataset.lock().await;
    let Some(record) = dataset
        .spaces
        .iter_mut()
        .find(|record| record.space.key == space_key)
    else {
        return confluence_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            &format!("No space with key '{space_key}'."),
        );
    };

    record.space.name = body.name.clone();
    let response = Json(&record.space).into_response();
    dataset.mutations.push(Mutation::SpaceRenamed {
        space_key,
        name: body.name,
    });
    response
}
