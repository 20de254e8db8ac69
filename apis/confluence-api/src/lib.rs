// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Confluence REST API wire types
//!
//! **IMPORTANT**: These types cover a *subset* of the Confluence Cloud
//! REST APIs - only the space and space-permission endpoints used for
//! bulk user reassignment.
//!
//! Two API generations are involved. Spaces and permissions are *read*
//! through the v2 API (`/wiki/api/v2/...`), but permissions can only be
//! *written* through the v1 API (`/wiki/rest/api/space/{key}/permission`),
//! which uses a different permission shape. Both shapes live here along
//! with the v2 -> v1 conversion.
//!
//! Reference: https://developer.atlassian.com/cloud/confluence/rest/v2/

use serde::{Deserialize, Serialize};

// ============================================================================
// Spaces
// ============================================================================

/// A Confluence space as returned by `GET /wiki/api/v2/spaces`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Numeric space id, transported as a string
    pub id: String,

    /// Space key (e.g., "ENG", "~712020abc" for personal spaces)
    pub key: String,

    /// Display name
    pub name: String,

    /// Space type: "global", "personal", "collaboration", or "knowledge_base"
    #[serde(rename = "type")]
    pub space_type: String,
}

impl Space {
    pub fn is_personal(&self) -> bool {
        self.space_type == "personal"
    }
}

/// Body for `PUT /wiki/rest/api/space/{key}` when renaming a space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSpaceRequest {
    /// Space type, unchanged; the v1 update endpoint requires it
    #[serde(rename = "type")]
    pub space_type: String,

    /// New display name
    pub name: String,
}

// ============================================================================
// Space permissions (v1 shape, used for writes)
// ============================================================================

/// A space permission in the v1 API shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacePermission {
    /// Permission id; absent when constructing a permission to grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Who the permission applies to
    pub subject: PermissionSubject,

    /// What the permission allows
    pub operation: PermissionOperation,
}

impl SpacePermission {
    /// The same permission granted to a different user: no id (the server
    /// assigns one) and the subject pointed at `account_id`.
    pub fn granted_to(&self, account_id: impl Into<String>) -> Self {
        Self {
            id: None,
            subject: PermissionSubject {
                subject_type: self.subject.subject_type.clone(),
                identifier: account_id.into(),
            },
            operation: self.operation.clone(),
        }
    }
}

/// Permission subject: a user or a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSubject {
    /// "user" or "group"
    #[serde(rename = "type")]
    pub subject_type: String,

    /// Account id for users, group id for groups
    pub identifier: String,
}

impl PermissionSubject {
    pub fn is_user(&self) -> bool {
        self.subject_type == "user"
    }
}

/// Permission operation: an action key and the target it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOperation {
    /// Action, e.g. "read", "create", "delete", "administer"
    pub key: String,

    /// Target, e.g. "space", "page", "blogpost"
    pub target: String,
}

// ============================================================================
// Space permissions (v2 shape, used for reads)
// ============================================================================

/// A space permission as returned by
/// `GET /wiki/api/v2/spaces/{id}/permissions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacePermissionV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub principal: PermissionPrincipal,

    pub operation: PermissionOperationV2,
}

/// v2 permission principal; equivalent to the v1 subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPrincipal {
    /// "user", "group", or "role"
    #[serde(rename = "type")]
    pub principal_type: String,

    /// Account id for users, group id for groups
    pub id: String,
}

/// v2 permission operation; equivalent to the v1 operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOperationV2 {
    pub key: String,

    #[serde(rename = "targetType")]
    pub target_type: String,
}

impl From<SpacePermissionV2> for SpacePermission {
    fn from(v2: SpacePermissionV2) -> Self {
        SpacePermission {
            id: v2.id,
            subject: PermissionSubject {
                subject_type: v2.principal.principal_type,
                identifier: v2.principal.id,
            },
            operation: PermissionOperation {
                key: v2.operation.key,
                target: v2.operation.target_type,
            },
        }
    }
}

// ============================================================================
// Pagination envelopes
// ============================================================================

/// The `_links` block on v2 collection responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLinks {
    /// Site-relative URL of the next page, absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// One page of `GET /wiki/api/v2/spaces`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacesPage {
    pub results: Vec<Space>,

    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

impl atlassian_pagination::Page for SpacesPage {
    type Item = Space;

    fn into_page(self) -> (Vec<Space>, Option<String>) {
        (self.results, self.links.next)
    }
}

/// One page of `GET /wiki/api/v2/spaces/{id}/permissions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacePermissionsPage {
    pub results: Vec<SpacePermissionV2>,

    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

impl atlassian_pagination::Page for SpacePermissionsPage {
    type Item = SpacePermissionV2;

    fn into_page(self) -> (Vec<SpacePermissionV2>, Option<String>) {
        (self.results, self.links.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn v2_permission_converts_to_v1_shape() {
        let v2 = SpacePermissionV2 {
            id: Some("3604482".to_string()),
            principal: PermissionPrincipal {
                principal_type: "user".to_string(),
                id: "712020:abc".to_string(),
            },
            operation: PermissionOperationV2 {
                key: "read".to_string(),
                target_type: "space".to_string(),
            },
        };

        let v1 = SpacePermission::from(v2);
        assert_eq!(v1.id.as_deref(), Some("3604482"));
        assert!(v1.subject.is_user());
        assert_eq!(v1.subject.identifier, "712020:abc");
        assert_eq!(v1.operation.key, "read");
        assert_eq!(v1.operation.target, "space");
    }

    #[test]
    fn granted_permission_drops_id_and_retargets_subject() {
        let existing = SpacePermission {
            id: Some("42".to_string()),
            subject: PermissionSubject {
                subject_type: "user".to_string(),
                identifier: "old-account".to_string(),
            },
            operation: PermissionOperation {
                key: "administer".to_string(),
                target: "space".to_string(),
            },
        };

        let granted = existing.granted_to("new-account");
        assert_eq!(granted.id, None);
        assert_eq!(granted.subject.identifier, "new-account");
        assert_eq!(granted.operation, existing.operation);

        let body = serde_json::to_value(&granted).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "subject": { "type": "user", "identifier": "new-account" },
                "operation": { "key": "administer", "target": "space" }
            })
        );
    }

    #[test]
    fn pages_split_into_results_and_next_pointer() {
        use atlassian_pagination::Page as _;

        let spaces: SpacesPage = serde_json::from_value(serde_json::json!({
            "results": [{
                "id": "98304",
                "key": "OPS",
                "name": "Operations",
                "type": "global"
            }],
            "_links": { "next": "/wiki/api/v2/spaces?cursor=abc" }
        }))
        .expect("deserialize");
        let (results, next) = spaces.into_page();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "OPS");
        assert_eq!(next.as_deref(), Some("/wiki/api/v2/spaces?cursor=abc"));

        let permissions: SpacePermissionsPage = serde_json::from_value(serde_json::json!({
            "results": [{
                "id": "3604482",
                "principal": { "type": "user", "id": "712020:abc" },
                "operation": { "key": "read", "targetType": "space" }
            }]
        }))
        .expect("deserialize");
        let (results, next) = permissions.into_page();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].principal.id, "712020:abc");
        assert_eq!(next, None);
    }

    #[test]
    fn spaces_page_tolerates_missing_links() {
        let page: SpacesPage = serde_json::from_value(serde_json::json!({
            "results": [{
                "id": "98307",
                "key": "~712020abc",
                "name": "Mia Krystosek",
                "type": "personal"
            }]
        }))
        .expect("deserialize");
        assert!(page.results[0].is_personal());
        assert_eq!(page.links.next, None);
    }
}
