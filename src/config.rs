//! Configuration for the giving ledger console.

use std::time::Duration;

use crate::{
    giving::{ApiCredentials, ApiError, RemoteGivingApi, ScreenSettings},
    pagination::PaginationConfig,
    timezone::get_local_offset,
};

/// The errors that can occur while validating the console configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The finance API URL could not be used.
    #[error("invalid finance API URL: {0}")]
    InvalidApiUrl(String),

    /// The timezone is not a canonical timezone name.
    #[error("invalid timezone \"{0}\", expected a canonical name such as \"Africa/Lagos\"")]
    InvalidTimezone(String),

    /// A size that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Everything the console needs to talk to the finance API and render pages.
///
/// Built once at start-up and handed to [crate::AppState]; nothing else reads
/// credentials or settings from the environment.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// The base URL of the finance API, e.g. "https://api.example.org/v1/".
    pub api_base_url: String,
    pub credentials: ApiCredentials,
    /// The number of records per ledger page.
    pub page_size: u64,
    /// The maximum number of records in a generated report.
    pub report_limit: u64,
    /// How long to wait for the finance API before giving up.
    pub request_timeout: Duration,
    /// How long banners stay visible.
    pub banner_ttl: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Africa/Lagos".
    pub local_timezone: String,
}

impl ConsoleConfig {
    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Zero("page size"));
        }

        if self.report_limit == 0 {
            return Err(ConfigError::Zero("report limit"));
        }

        if get_local_offset(&self.local_timezone).is_none() {
            return Err(ConfigError::InvalidTimezone(self.local_timezone.clone()));
        }

        Ok(())
    }

    /// Create the finance API client described by this configuration.
    ///
    /// # Errors
    /// Returns [ConfigError::InvalidApiUrl] if the base URL is not an HTTP(S) URL.
    pub fn remote_api(&self) -> Result<RemoteGivingApi, ConfigError> {
        RemoteGivingApi::new(
            &self.api_base_url,
            self.credentials.clone(),
            self.page_size,
            self.request_timeout,
        )
        .map_err(|error| match error {
            ApiError::InvalidUrl(message) => ConfigError::InvalidApiUrl(message),
            error => ConfigError::InvalidApiUrl(error.to_string()),
        })
    }

    pub fn screen_settings(&self) -> ScreenSettings {
        ScreenSettings {
            report_limit: self.report_limit,
            banner_ttl: self.banner_ttl,
        }
    }

    pub fn pagination_config(&self) -> PaginationConfig {
        PaginationConfig {
            page_size: self.page_size,
        }
    }
}

/// Pick API credentials from a bearer token or a session cookie.
///
/// A non-empty token wins over a session cookie. With neither, requests are
/// sent unauthenticated and the finance API will answer with 401s.
pub fn credentials_from(token: Option<String>, session: Option<String>) -> ApiCredentials {
    let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

    match (non_empty(token), non_empty(session)) {
        (Some(token), _) => ApiCredentials::Bearer(token),
        (None, Some(session)) => ApiCredentials::SessionCookie(session),
        (None, None) => {
            tracing::warn!("no finance API credentials configured");
            ApiCredentials::None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::giving::ApiCredentials;

    use super::{ConfigError, ConsoleConfig, credentials_from};

    fn config() -> ConsoleConfig {
        ConsoleConfig {
            api_base_url: "https://api.example.org/v1".to_owned(),
            credentials: ApiCredentials::Bearer("token".to_owned()),
            page_size: 20,
            report_limit: 1000,
            request_timeout: Duration::from_secs(10),
            banner_ttl: Duration::from_secs(5),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[test]
    fn valid_config() {
        assert_eq!(config().validate(), Ok(()));
        assert!(config().remote_api().is_ok());
    }

    #[test]
    fn rejects_zero_page_size() {
        let config = ConsoleConfig {
            page_size: 0,
            ..config()
        };

        assert_eq!(config.validate(), Err(ConfigError::Zero("page size")));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = ConsoleConfig {
            local_timezone: "Mars/Olympus_Mons".to_owned(),
            ..config()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimezone("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn rejects_non_http_api_url() {
        let config = ConsoleConfig {
            api_base_url: "file:///etc/passwd".to_owned(),
            ..config()
        };

        assert!(matches!(config.remote_api(), Err(ConfigError::InvalidApiUrl(_))));
    }

    #[test]
    fn token_wins_over_session() {
        let credentials = credentials_from(Some("abc".to_owned()), Some("sessionid=1".to_owned()));

        assert!(matches!(credentials, ApiCredentials::Bearer(token) if token == "abc"));
    }

    #[test]
    fn blank_token_falls_back_to_session() {
        let credentials = credentials_from(Some("  ".to_owned()), Some("sessionid=1".to_owned()));

        assert!(matches!(credentials, ApiCredentials::SessionCookie(cookie) if cookie == "sessionid=1"));
    }
}
