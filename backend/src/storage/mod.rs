//! Storage client for the hosted relational store.
//!
//! The store speaks a PostgREST-style HTTP dialect: one round trip per
//! query, filters and windows encoded in the query string and headers. This
//! module owns transport details only — request construction, status and
//! transport error mapping, and JSON row decoding. There is no pooling
//! beyond reqwest's own, no retry, and no caching.

mod query;

pub use query::{QueryBuilder, RowSet};

use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;

/// Failures surfaced by storage queries.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage base URL could not be shaped into an endpoint.
    #[error("storage URL is invalid: {0}")]
    Config(String),
    /// The backend answered with a non-success status. The message is the
    /// backend's own and is passed to clients verbatim.
    #[error("{message}")]
    Backend {
        /// HTTP status returned by the backend.
        status: u16,
        /// Raw backend message (body preview).
        message: String,
    },
    /// The request never completed (connect, TLS, or I/O failure).
    #[error("storage transport failure: {0}")]
    Transport(String),
    /// The backend answered 2xx but the body was not the expected shape.
    #[error("storage response could not be decoded: {0}")]
    Decode(String),
}

impl StorageError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Shared handle to the storage service.
///
/// Constructed once at startup and handed to every handler read-only via
/// `web::Data`; all state lives inside reqwest's own connection pool.
pub struct StorageClient {
    client: Client,
    base: Url,
    key: String,
}

impl StorageClient {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when the REST endpoint cannot be
    /// derived from the base URL and [`StorageError::Transport`] when the
    /// underlying HTTP client cannot be constructed.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let base = rest_endpoint(&config.url)?;
        let client = Client::builder().build().map_err(StorageError::transport)?;
        Ok(Self {
            client,
            base,
            key: config.key.clone(),
        })
    }

    /// Begin a query against one named table.
    #[must_use]
    pub fn table(&self, table: &'static str) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn table_url(&self, table: &str) -> Result<Url, StorageError> {
        self.base
            .join(table)
            .map_err(|err| StorageError::Config(err.to_string()))
    }
}

/// Derive the `/rest/v1/` endpoint from the service base URL, tolerating a
/// trailing slash in the configured value.
fn rest_endpoint(base: &Url) -> Result<Url, StorageError> {
    let raw = format!("{}/rest/v1/", base.as_str().trim_end_matches('/'));
    Url::parse(&raw).map_err(|err| StorageError::Config(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> StorageConfig {
        StorageConfig {
            url: url.parse().expect("base URL"),
            key: "service-key".into(),
        }
    }

    #[test]
    fn derives_rest_endpoint_from_bare_host() {
        let client = StorageClient::new(&config("https://project.supabase.co")).expect("client");
        assert_eq!(
            client.table_url("games").expect("url").as_str(),
            "https://project.supabase.co/rest/v1/games"
        );
    }

    #[test]
    fn tolerates_trailing_slash_in_configured_url() {
        let client = StorageClient::new(&config("https://project.supabase.co/")).expect("client");
        assert_eq!(
            client.table_url("users").expect("url").as_str(),
            "https://project.supabase.co/rest/v1/users"
        );
    }

    #[test]
    fn backend_error_displays_the_raw_message() {
        let error = StorageError::Backend {
            status: 400,
            message: "invalid input syntax for type integer".into(),
        };
        assert_eq!(error.to_string(), "invalid input syntax for type integer");
    }
}
