// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Runtime configuration
//!
//! Settings come from environment variables (or their global flag
//! equivalents, which clap resolves first): `REMAPADM_BASE_URL`,
//! `REMAPADM_EMAIL`, `REMAPADM_API_TOKEN`, `REMAPADM_CONCURRENCY`. All
//! missing settings are reported in one error, before any network
//! activity.

use confluence_client::ConfluenceClient;
use jira_client::JiraClient;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing required settings; set the environment variable(s) or pass the flag(s):\n{}",
        missing.join("\n")
    )]
    Missing { missing: Vec<String> },

    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Validated settings shared by every command that talks to the site.
#[derive(Debug)]
pub struct Settings {
    pub base_url: Url,
    pub email: String,
    api_token: SecretString,
    pub concurrency: usize,
}

impl Settings {
    pub fn new(
        base_url: Option<String>,
        email: Option<String>,
        api_token: Option<SecretString>,
        concurrency: u8,
    ) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        if base_url.is_none() {
            missing.push("  REMAPADM_BASE_URL (--base-url)".to_string());
        }
        if email.is_none() {
            missing.push("  REMAPADM_EMAIL (--email)".to_string());
        }
        if api_token.is_none() {
            missing.push("  REMAPADM_API_TOKEN (--api-token)".to_string());
        }
        let (Some(base_url), Some(email), Some(api_token)) = (base_url, email, api_token) else {
            return Err(ConfigError::Missing { missing });
        };

        let base_url = Url::parse(&base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url,
            source,
        })?;

        Ok(Self {
            base_url,
            email,
            api_token,
            concurrency: usize::from(concurrency),
        })
    }

    pub fn jira_client(&self) -> Result<JiraClient, atlassian_http::BuildError> {
        JiraClient::new(
            self.base_url.clone(),
            &self.email,
            self.api_token.expose_secret(),
            self.concurrency,
        )
    }

    pub fn confluence_client(&self) -> Result<ConfluenceClient, atlassian_http::BuildError> {
        ConfluenceClient::new(
            self.base_url.clone(),
            &self.email,
            self.api_token.expose_secret(),
            self.concurrency,
        )
    }
}
