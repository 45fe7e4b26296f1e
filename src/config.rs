use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Chargesheet";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Processing API on the analyst's machine
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Case list refresh period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Connect deadline for backend requests. There is no overall request
/// deadline, scoring a long narrative can take minutes.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polling faster than this only loads the backend.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const API_URL_ENV: &str = "CHARGESHEET_API_URL";
pub const POLL_MS_ENV: &str = "CHARGESHEET_POLL_MS";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "info,chargesheet_lib=debug,hyper=warn,reqwest=warn".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_base: String,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `CHARGESHEET_API_URL` / `CHARGESHEET_POLL_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV).map(|u| u.trim().to_string()) {
            if url.is_empty() {
                tracing::warn!(var = API_URL_ENV, "Empty API URL, using default");
            } else {
                config.api_base = url;
            }
        }

        if let Some(raw) = lookup(POLL_MS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => {
                    config.poll_interval = Duration::from_millis(ms).max(MIN_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(var = POLL_MS_ENV, value = %raw, error = %e, "Invalid poll interval, using default");
                }
            }
        }

        config
    }
}
