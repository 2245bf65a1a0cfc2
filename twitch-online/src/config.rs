//! Credentials and monitor tuning.

use std::time::Duration;

use helix_api::StreamsParams;

use crate::{Error, Result};

/// Environment variable holding the application client ID.
pub const CLIENT_ID_ENV: &str = "TWITCH_CLIENT_ID";
/// Environment variable holding the user access token.
pub const OAUTH_TOKEN_ENV: &str = "TWITCH_OAUTH_TOKEN";

/// Default time between automatic checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Credentials for the Helix API.
///
/// Neither value is validated against Twitch here; a bad token only shows up
/// as failed checks once the monitor is running.
#[derive(Clone, PartialEq, Eq)]
pub struct Params {
    pub client_id: String,
    pub oauth_token: String,
}

impl Params {
    pub fn new(client_id: impl Into<String>, oauth_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            oauth_token: oauth_token.into(),
        }
    }

    /// Read credentials from `TWITCH_CLIENT_ID` and `TWITCH_OAUTH_TOKEN`.
    ///
    /// The token is optional and defaults to empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id =
            lookup(CLIENT_ID_ENV).ok_or_else(|| Error::config(format!("{CLIENT_ID_ENV} is not set")))?;
        let oauth_token = lookup(OAUTH_TOKEN_ENV).unwrap_or_default();
        Ok(Self::new(client_id, oauth_token))
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Params")
            .field("client_id", &self.client_id)
            .field("oauth_token", &"<redacted>")
            .finish()
    }
}

/// Configuration for the stream monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between automatic checks.
    pub interval: Duration,
    /// Maximum channel IDs sent per query.
    pub batch_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            batch_size: StreamsParams::MAX_PER_REQUEST,
        }
    }
}

impl MonitorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_interval(self.interval)?;
        if self.batch_size == 0 || self.batch_size > StreamsParams::MAX_PER_REQUEST {
            return Err(Error::config(format!(
                "batch size must be between 1 and {}, got {}",
                StreamsParams::MAX_PER_REQUEST,
                self.batch_size
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(Error::config("check interval must be greater than zero"));
    }
    Ok(())
}
