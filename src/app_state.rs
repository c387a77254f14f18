//! Implements a struct that holds the state of the console server.

use std::{sync::Arc, time::Duration};

use crate::{
    config::{ConfigError, ConsoleConfig},
    giving::{GivingApi, LedgerScreen, RemoteGivingApi, ScreenSettings},
    pagination::PaginationConfig,
};

/// The state of the console server.
///
/// `A` is the finance API the ledger talks to, [RemoteGivingApi] outside of tests.
#[derive(Debug)]
pub struct AppState<A> {
    /// The ledger shared by every request.
    pub screen: Arc<LedgerScreen<A>>,

    /// The local timezone as a canonical timezone name, e.g. "Africa/Lagos".
    pub local_timezone: String,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// How long alerts stay on screen.
    pub banner_ttl: Duration,
}

// Derived `Clone` would require `A: Clone`.
impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            screen: self.screen.clone(),
            local_timezone: self.local_timezone.clone(),
            pagination_config: self.pagination_config,
            banner_ttl: self.banner_ttl,
        }
    }
}

impl AppState<RemoteGivingApi> {
    /// Create the state for a console talking to the finance API in `config`.
    ///
    /// # Errors
    /// Returns an error if `config` is not valid.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self::with_api(
            config.remote_api()?,
            config.screen_settings(),
            &config.local_timezone,
            config.pagination_config(),
        ))
    }
}

impl<A: GivingApi> AppState<A> {
    /// Create the state for a console backed by `api`.
    pub fn with_api(
        api: A,
        settings: ScreenSettings,
        local_timezone: &str,
        pagination_config: PaginationConfig,
    ) -> Self {
        Self {
            screen: Arc::new(LedgerScreen::new(api, settings)),
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            banner_ttl: settings.banner_ttl,
        }
    }
}
