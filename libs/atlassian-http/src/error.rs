// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Structured errors for Atlassian REST calls
//!
//! A failed call keeps the whole exchange - method, URL, request headers
//! and body, response headers and body - so operators can reconstruct
//! what was sent without re-running with extra logging. Credential
//! headers are masked before they are stored; an [`ApiError`] is safe to
//! log as-is.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Replacement value for masked header values.
const MASKED: &str = "[secure]";

/// Error from a single Atlassian REST exchange.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error(transparent)]
    Status(Box<HttpFailure>),

    /// The exchange never completed (connect, TLS, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected shape.
    #[error("could not decode {method} {url} response: {source}")]
    Decode {
        method: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized.
    #[error("could not encode {method} {url} request body: {source}")]
    Encode {
        method: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A next-page pointer or path did not resolve against the base URL.
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ApiError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// Decoded JSON response body, when there was one.
    pub fn response_json(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Status(failure) => failure.response_json.as_ref(),
            _ => None,
        }
    }

    /// Raw response body text, when the server answered at all.
    pub fn response_text(&self) -> Option<&str> {
        match self {
            ApiError::Status(failure) => Some(failure.response_text.as_str()),
            _ => None,
        }
    }
}

impl From<HttpFailure> for ApiError {
    fn from(failure: HttpFailure) -> Self {
        ApiError::Status(Box::new(failure))
    }
}

/// Full record of a non-success HTTP exchange.
#[derive(Debug)]
pub struct HttpFailure {
    pub status: u16,
    /// Canonical reason phrase ("Not Found"), empty when unknown.
    pub reason: String,
    pub method: String,
    pub url: String,
    /// Request headers with credential values masked.
    pub request_headers: BTreeMap<String, String>,
    /// Serialized request body, if the request carried one.
    pub request_body: Option<String>,
    pub response_headers: BTreeMap<String, String>,
    /// Response body decoded as JSON, when it was JSON.
    pub response_json: Option<serde_json::Value>,
    /// Response body as received.
    pub response_text: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {} {} for {} {}",
            self.status, self.reason, self.method, self.url
        )?;
        match &self.response_json {
            Some(json) => write!(f, "\nReturned: {json}"),
            None if self.response_text.is_empty() => Ok(()),
            None => write!(f, "\nReturned: {}", self.response_text),
        }
    }
}

impl std::error::Error for HttpFailure {}

/// Copy headers into a map, masking values that carry credentials.
///
/// `authorization` and `cookie` (any case) are replaced with `[secure]`;
/// values that are not valid UTF-8 are noted rather than dropped.
pub fn mask_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_str = name.as_str().to_string();
            let value_str = if is_sensitive(&name_str) {
                MASKED.to_string()
            } else {
                value
                    .to_str()
                    .unwrap_or("[non-utf8 value]")
                    .to_string()
            };
            (name_str, value_str)
        })
        .collect()
}

fn is_sensitive(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("cookie")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn failure_with_body(json: Option<serde_json::Value>, text: &str) -> HttpFailure {
        HttpFailure {
            status: 404,
            reason: "Not Found".to_string(),
            method: "GET".to_string(),
            url: "https://example.atlassian.net/rest/api/3/myself".to_string(),
            request_headers: BTreeMap::new(),
            request_body: None,
            response_headers: BTreeMap::new(),
            response_json: json,
            response_text: text.to_string(),
        }
    }

    #[test]
    fn masks_credential_headers_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert("Cookie", HeaderValue::from_static("session=abc"));
        headers.insert("X-Request-Id", HeaderValue::from_static("r-123"));

        let masked = mask_headers(&headers);
        assert_eq!(masked.get("authorization").map(String::as_str), Some("[secure]"));
        assert_eq!(masked.get("cookie").map(String::as_str), Some("[secure]"));
        assert_eq!(masked.get("x-request-id").map(String::as_str), Some("r-123"));
    }

    #[test]
    fn display_prefers_decoded_json_body() {
        let failure = failure_with_body(
            Some(serde_json::json!({"errorMessages": ["Issue does not exist"]})),
            "{\"errorMessages\":[\"Issue does not exist\"]}",
        );
        let rendered = failure.to_string();
        assert!(rendered.starts_with(
            "HTTP 404 Not Found for GET https://example.atlassian.net/rest/api/3/myself"
        ));
        assert!(rendered.contains("Returned: {\"errorMessages\":[\"Issue does not exist\"]}"));
    }

    #[test]
    fn display_falls_back_to_raw_text() {
        let failure = failure_with_body(None, "upstream gateway said no");
        assert!(failure.to_string().contains("Returned: upstream gateway said no"));
    }

    #[test]
    fn display_omits_returned_line_for_empty_bodies() {
        let failure = failure_with_body(None, "");
        assert!(!failure.to_string().contains("Returned:"));
    }

    #[test]
    fn api_error_exposes_status_and_body() {
        let error = ApiError::from(failure_with_body(
            Some(serde_json::json!({"ok": false})),
            "{\"ok\":false}",
        ));
        assert_eq!(error.status(), Some(404));
        assert_eq!(
            error.response_json(),
            Some(&serde_json::json!({"ok": false}))
        );
        assert_eq!(error.response_text(), Some("{\"ok\":false}"));
    }
}
