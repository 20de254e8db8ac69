// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared HTTP plumbing for Atlassian REST clients
//!
//! Jira and Confluence are served off the same site with the same
//! Basic-auth credentials, so the per-service clients in this workspace
//! share one transport layer:
//!
//! - [`HttpClient`]: a thin reqwest wrapper that owns the site base URL
//!   and credentials, speaks JSON, and turns every failure into a
//!   structured [`ApiError`] with credentials masked
//! - [`RequestGate`]: the per-client concurrency cap (see [`gate`])
//!
//! Rate limiting, pagination, and endpoint knowledge live in the client
//! crates; nothing here knows what a "filter" or a "space" is.

pub mod error;
pub mod gate;

pub use error::{ApiError, HttpFailure, mask_headers};
pub use gate::{DEFAULT_SPACING, RequestGate, RequestPermit};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Per-request timeout; Atlassian bulk endpoints can be slow to answer
/// but anything beyond this is a lost cause.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure constructing an [`HttpClient`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("credentials are not header-safe: {0}")]
    Credentials(#[from] reqwest::header::InvalidHeaderValue),

    #[error("could not construct HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// JSON-speaking HTTP transport bound to one Atlassian site.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    /// Kept so error captures can show the headers that actually went
    /// out; reqwest merges defaults at dispatch, after the request is
    /// built.
    default_headers: HeaderMap,
}

impl HttpClient {
    /// Build a transport authenticating as `email` with an API token.
    pub fn new(base_url: Url, email: &str, api_token: &str) -> Result<Self, BuildError> {
        let credentials = BASE64.encode(format!("{email}:{api_token}"));
        let mut auth = HeaderValue::from_str(&format!("Basic {credentials}"))?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("atlassian-http/", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers.clone())
            .build()?;

        Ok(Self {
            http,
            base_url,
            default_headers,
        })
    }

    /// The site this transport talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET a site-relative path and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut url = self.resolve(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        self.request_json(Method::GET, url, None).await
    }

    /// GET a next-page pointer, which may be absolute or site-relative,
    /// and decode the JSON response.
    pub async fn get_url<T: DeserializeOwned>(&self, pointer: &str) -> Result<T, ApiError> {
        let url = self.resolve(pointer)?;
        self.request_json(Method::GET, url, None).await
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;
        let body = encode(&Method::POST, &url, body)?;
        self.request_json(Method::POST, url, Some(body)).await
    }

    /// POST with no body, discarding the response body.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let url = self.resolve(path)?;
        self.dispatch(Method::POST, url, None).await.map(drop)
    }

    /// POST a JSON body, discarding the response body.
    pub async fn post_discard<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.resolve(path)?;
        let body = encode(&Method::POST, &url, body)?;
        self.dispatch(Method::POST, url, Some(body)).await.map(drop)
    }

    /// PUT a JSON body, discarding the response body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.resolve(path)?;
        let body = encode(&Method::PUT, &url, body)?;
        self.dispatch(Method::PUT, url, Some(body)).await.map(drop)
    }

    /// DELETE, discarding the response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.resolve(path)?;
        self.dispatch(Method::DELETE, url, None).await.map(drop)
    }

    fn resolve(&self, pointer: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(pointer)
            .map_err(|source| ApiError::InvalidUrl {
                url: pointer.to_string(),
                source,
            })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let method_name = method.as_str().to_string();
        let url_name = url.to_string();
        let text = self.dispatch(method, url, body).await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            method: method_name,
            url: url_name,
            source,
        })
    }

    /// Send one request; non-2xx becomes [`ApiError::Status`] carrying
    /// the full masked exchange.
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<String, ApiError> {
        let method_name = method.as_str().to_string();
        let url_name = url.to_string();

        let mut builder = self.http.request(method, url);
        if let Some(json) = &body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(json.clone());
        }
        let request = builder.build().map_err(|source| ApiError::Transport {
            url: url_name.clone(),
            source,
        })?;
        let request_headers = self.effective_headers(request.headers());

        tracing::debug!(method = %method_name, url = %url_name, "dispatching");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| ApiError::Transport {
                url: url_name.clone(),
                source,
            })?;

        let status = response.status();
        let response_headers = mask_headers(response.headers());
        let response_text = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                url: url_name.clone(),
                source,
            })?;

        if !status.is_success() {
            tracing::debug!(
                method = %method_name,
                url = %url_name,
                status = status.as_u16(),
                "request rejected"
            );
            return Err(HttpFailure {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                method: method_name,
                url: url_name,
                request_headers,
                request_body: body,
                response_headers,
                response_json: serde_json::from_str(&response_text).ok(),
                response_text,
            }
            .into());
        }

        Ok(response_text)
    }

    fn effective_headers(&self, request_headers: &HeaderMap) -> BTreeMap<String, String> {
        let mut merged = request_headers.clone();
        for (name, value) in self.default_headers.iter() {
            if !merged.contains_key(name) {
                merged.insert(name.clone(), value.clone());
            }
        }
        mask_headers(&merged)
    }
}

fn encode<B: Serialize + ?Sized>(
    method: &Method,
    url: &Url,
    body: &B,
) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|source| ApiError::Encode {
        method: method.as_str().to_string(),
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client(base: &str) -> HttpClient {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let base_url = Url::parse(base).expect("base url");
        HttpClient::new(base_url, "svc@example.com", "token").expect("client")
    }

    #[test]
    fn resolve_joins_site_relative_paths() {
        let client = client("https://example.atlassian.net");
        let url = client.resolve("/rest/api/3/myself").expect("resolve");
        assert_eq!(url.as_str(), "https://example.atlassian.net/rest/api/3/myself");
    }

    #[test]
    fn resolve_keeps_absolute_pointers() {
        let client = client("https://example.atlassian.net");
        let url = client
            .resolve("https://example.atlassian.net/rest/api/3/filter/search?startAt=2")
            .expect("resolve");
        assert_eq!(
            url.as_str(),
            "https://example.atlassian.net/rest/api/3/filter/search?startAt=2"
        );
    }

    #[test]
    fn resolve_handles_wiki_relative_pointers() {
        let client = client("https://example.atlassian.net");
        let url = client
            .resolve("/wiki/api/v2/spaces?cursor=abc")
            .expect("resolve");
        assert_eq!(
            url.as_str(),
            "https://example.atlassian.net/wiki/api/v2/spaces?cursor=abc"
        );
    }

    #[test]
    fn effective_headers_include_masked_defaults() {
        let client = client("https://example.atlassian.net");
        let headers = client.effective_headers(&HeaderMap::new());
        assert_eq!(headers.get("authorization").map(String::as_str), Some("[secure]"));
        assert_eq!(
            headers.get("accept").map(String::as_str),
            Some("application/json")
        );
    }
}
