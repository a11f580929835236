//! Environment configuration read once at process start.
//!
//! The storage service URL and access key are mandatory; the process refuses
//! to start without them. The bind address is optional and defaults to the
//! port the frontend expects.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

/// Environment variable holding the storage service URL.
pub const STORAGE_URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the storage access key.
pub const STORAGE_KEY_VAR: &str = "SUPABASE_ANON_KEY";
/// Environment variable overriding the listen address.
pub const BIND_ADDR_VAR: &str = "BIND_ADDR";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Failures raised while assembling [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory environment variable was absent or blank.
    #[error("{0} must be set")]
    MissingVar(&'static str),
    /// The storage URL did not parse.
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },
    /// The bind address did not parse.
    #[error("{var} is not a valid socket address: {source}")]
    InvalidBindAddr {
        var: &'static str,
        source: std::net::AddrParseError,
    },
}

/// Connection settings for the hosted relational store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage service.
    pub url: Url,
    /// Access key sent with every request.
    pub key: String,
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage client settings.
    pub storage: StorageConfig,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the storage URL or key is missing or any
    /// value fails to parse. Callers treat this as fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            env::var(STORAGE_URL_VAR).ok(),
            env::var(STORAGE_KEY_VAR).ok(),
            env::var(BIND_ADDR_VAR).ok(),
        )
    }

    fn from_vars(
        url: Option<String>,
        key: Option<String>,
        bind_addr: Option<String>,
    ) -> Result<Self, ConfigError> {
        let url = non_blank(url).ok_or(ConfigError::MissingVar(STORAGE_URL_VAR))?;
        let key = non_blank(key).ok_or(ConfigError::MissingVar(STORAGE_KEY_VAR))?;

        let url = Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
            var: STORAGE_URL_VAR,
            source,
        })?;

        let bind_addr = non_blank(bind_addr).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = bind_addr
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                var: BIND_ADDR_VAR,
                source,
            })?;

        Ok(Self {
            storage: StorageConfig { url, key },
            bind_addr,
        })
    }
}

/// Blank values count as unset, matching shell-sourced environments where
/// `VAR=` and an absent variable are indistinguishable to operators.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn full_vars() -> (Option<String>, Option<String>, Option<String>) {
        (
            Some("https://project.supabase.co".into()),
            Some("anon-key".into()),
            Some("127.0.0.1:4000".into()),
        )
    }

    #[test]
    fn parses_complete_configuration() {
        let (url, key, bind) = full_vars();
        let config = AppConfig::from_vars(url, key, bind).expect("config");
        assert_eq!(config.storage.url.as_str(), "https://project.supabase.co/");
        assert_eq!(config.storage.key, "anon-key");
        assert_eq!(config.bind_addr.port(), 4000);
    }

    #[test]
    fn bind_address_defaults_when_absent() {
        let (url, key, _) = full_vars();
        let config = AppConfig::from_vars(url, key, None).expect("config");
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[rstest]
    #[case::missing_url(None, Some("anon-key".into()), STORAGE_URL_VAR)]
    #[case::blank_url(Some("  ".into()), Some("anon-key".into()), STORAGE_URL_VAR)]
    #[case::missing_key(Some("https://project.supabase.co".into()), None, STORAGE_KEY_VAR)]
    #[case::blank_key(Some("https://project.supabase.co".into()), Some(String::new()), STORAGE_KEY_VAR)]
    fn missing_storage_settings_are_fatal(
        #[case] url: Option<String>,
        #[case] key: Option<String>,
        #[case] expected_var: &str,
    ) {
        let error = AppConfig::from_vars(url, key, None).expect_err("must fail");
        match error {
            ConfigError::MissingVar(var) => assert_eq!(var, expected_var),
            other => panic!("expected MissingVar, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unparseable_storage_url() {
        let error = AppConfig::from_vars(Some("not a url".into()), Some("k".into()), None)
            .expect_err("must fail");
        assert!(matches!(error, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_unparseable_bind_address() {
        let (url, key, _) = full_vars();
        let error = AppConfig::from_vars(url, key, Some("nowhere".into())).expect_err("must fail");
        assert!(matches!(error, ConfigError::InvalidBindAddr { .. }));
    }
}
