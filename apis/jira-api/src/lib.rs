// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! JIRA REST API v3 wire types
//!
//! **IMPORTANT**: These types cover a *subset* of the JIRA REST API v3.
//! This is NOT a complete JIRA API definition - it only includes the
//! endpoints used for bulk user reassignment: the current-user lookup,
//! user search, filter search/ownership, JQL issue search, and the bulk
//! issue-edit queue.
//!
//! The actual JIRA API is implemented by Atlassian's JIRA servers. These
//! types exist to:
//! 1. Document the exact JIRA API surface we depend on
//! 2. Share one serde vocabulary between the client and the stub server
//!
//! Reference: https://developer.atlassian.com/cloud/jira/platform/rest/v3/

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Newtypes
// ============================================================================

/// A JIRA issue key in PROJECT-123 format
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    /// Create a new IssueKey, validating the format
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidIssueKey> {
        let key = key.into();
        // Must split into a non-empty project part and an all-digit number
        match key.rsplit_once('-') {
            Some((project, number))
                if !project.is_empty()
                    && !number.is_empty()
                    && number.chars().all(|c| c.is_ascii_digit()) =>
            {
                Ok(Self(key))
            }
            _ => Err(InvalidIssueKey(key)),
        }
    }

    /// Create without validation (for trusted sources like JIRA responses)
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IssueKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
#[error("Invalid issue key format: '{0}' (expected PROJECT-123)")]
pub struct InvalidIssueKey(pub String);

// ============================================================================
// Users
// ============================================================================

/// A JIRA user as returned by `/rest/api/3/myself` and
/// `/rest/api/3/user/search`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable Atlassian account identifier
    #[serde(rename = "accountId")]
    pub account_id: String,

    /// Email address; hidden for some accounts depending on privacy settings
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,

    /// Public display name
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

impl User {
    /// Human-readable label: display name plus email (or account id when
    /// the email is hidden). Used in tables and messages.
    pub fn label(&self) -> String {
        format!("{} ({})", self.label_name(), self.contact())
    }

    /// Display name, falling back to email and then account id
    pub fn label_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email_address.as_deref())
            .unwrap_or(&self.account_id)
    }

    /// Email address, falling back to account id
    pub fn contact(&self) -> &str {
        self.email_address.as_deref().unwrap_or(&self.account_id)
    }
}

/// The two user-valued issue fields that can be bulk-reassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Assignee,
    Reporter,
}

impl UserField {
    /// Field name as used both in JQL clauses and as the bulk-edit fieldId
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Assignee => "assignee",
            UserField::Reporter => "reporter",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Filters
// ============================================================================

/// One filter record from `/rest/api/3/filter/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRef {
    /// Filter id (numeric, but transported as a string)
    pub id: String,
}

/// One page of filter search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSearchPage {
    /// Filters on this page
    pub values: Vec<FilterRef>,

    /// Absolute URL of the next page, absent on the last page
    #[serde(rename = "nextPage", default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

impl atlassian_pagination::Page for FilterSearchPage {
    type Item = FilterRef;

    fn into_page(self) -> (Vec<FilterRef>, Option<String>) {
        (self.values, self.next_page)
    }
}

/// Body for `PUT /rest/api/3/filter/{id}/owner`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOwnerRequest {
    /// Account id of the new owner
    #[serde(rename = "accountId")]
    pub account_id: String,
}

// ============================================================================
// Issue search
// ============================================================================

/// An issue as returned by `/rest/api/3/search/jql` with `fields=key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIssue {
    /// Issue key (e.g., "PROJECT-123")
    pub key: IssueKey,
}

/// Response from the JQL search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Issues matching the query
    pub issues: Vec<SearchIssue>,

    /// Whether this is the last page of results
    #[serde(rename = "isLast", default, skip_serializing_if = "Option::is_none")]
    pub is_last: Option<bool>,

    /// Token for fetching the next page (cursor-based pagination)
    #[serde(
        rename = "nextPageToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_page_token: Option<String>,
}

impl atlassian_pagination::Page for SearchResponse {
    type Item = SearchIssue;

    fn into_page(self) -> (Vec<SearchIssue>, Option<String>) {
        (self.issues, self.next_page_token)
    }
}

// ============================================================================
// Bulk edit
// ============================================================================

/// Body for `POST /rest/api/3/bulk/issues/fields`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEditRequest {
    /// Field ids being edited (e.g., `["assignee"]`)
    #[serde(rename = "selectedActions")]
    pub selected_actions: Vec<String>,

    /// Issues to edit, at most 50 per request
    #[serde(rename = "selectedIssueIdsOrKeys")]
    pub selected_issue_ids_or_keys: Vec<IssueKey>,

    /// The new field values
    #[serde(rename = "editedFieldsInput")]
    pub edited_fields_input: EditedFieldsInput,
}

impl BulkEditRequest {
    /// The request every remap submits: point one user field at a new
    /// account for a chunk of issues.
    pub fn reassign_user_field(
        field: UserField,
        issue_keys: Vec<IssueKey>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            selected_actions: vec![field.as_str().to_string()],
            selected_issue_ids_or_keys: issue_keys,
            edited_fields_input: EditedFieldsInput {
                single_select_clearable_user_picker_fields: vec![UserPickerField {
                    field_id: field.as_str().to_string(),
                    user: AccountRef {
                        account_id: account_id.into(),
                    },
                }],
            },
        }
    }
}

/// Field-value container within a bulk edit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditedFieldsInput {
    /// User-picker field edits (assignee, reporter, custom user fields)
    #[serde(rename = "singleSelectClearableUserPickerFields")]
    pub single_select_clearable_user_picker_fields: Vec<UserPickerField>,
}

/// One user-picker field edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPickerField {
    /// Field id (e.g., "assignee")
    #[serde(rename = "fieldId")]
    pub field_id: String,

    /// The user the field should point at
    pub user: AccountRef,
}

/// Reference to a user by account id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRef {
    #[serde(rename = "accountId")]
    pub account_id: String,
}

/// Response from a bulk edit submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEditResponse {
    /// Id of the queued task; poll `/rest/api/3/bulk/queue/{taskId}`
    #[serde(rename = "taskId")]
    pub task_id: String,
}

// ============================================================================
// Bulk task queue
// ============================================================================

/// Lifecycle states of a queued bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Enqueued,
    Running,
    Complete,
    Failed,
    CancelRequested,
    Cancelled,
    Dead,
}

impl TaskStatus {
    /// Whether this status is terminal; a terminal task is never
    /// re-enqueued and will not report further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Complete
                | TaskStatus::Failed
                | TaskStatus::CancelRequested
                | TaskStatus::Cancelled
                | TaskStatus::Dead
        )
    }
}

/// One observation of a queued bulk task, as returned by
/// `GET /rest/api/3/bulk/queue/{taskId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkTask {
    /// Task id, stable across observations
    #[serde(rename = "taskId")]
    pub task_id: String,

    /// Current lifecycle state
    pub status: TaskStatus,

    /// Completion percentage, 0-100
    #[serde(rename = "progressPercent", default)]
    pub progress_percent: u32,

    /// Number of issues covered by the task
    #[serde(rename = "totalIssueCount", default)]
    pub total_issue_count: u64,

    /// Issues the task actually processed; issues the credential cannot
    /// see are silently dropped, so this can be shorter than the
    /// submitted chunk. Elements are opaque issue ids.
    #[serde(rename = "processedAccessibleIssues", default)]
    pub processed_accessible_issues: Vec<serde_json::Value>,
}

impl BulkTask {
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
